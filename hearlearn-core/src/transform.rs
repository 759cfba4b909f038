//! Mapping between view space and source (page) space
//!
//! A page is drawn aspect-fit and centered inside a viewport. [`FitTransform`]
//! captures that fit so word boxes can be drawn over the rendering and
//! pointer positions can be traced back to the page.

use crate::types::{Point, Rect, Size, Word};

/// Aspect-fit placement of a source page inside a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    scale: f64,
    offset_left: f64,
    offset_top: f64,
}

impl FitTransform {
    /// `None` when either size has a non-positive side
    pub fn new(source: Size, view: Size) -> Option<Self> {
        if source.is_empty() || view.is_empty() {
            return None;
        }

        let scale = (view.width / source.width).min(view.height / source.height);
        Some(Self {
            scale,
            offset_left: (view.width - source.width * scale) / 2.0,
            offset_top: (view.height - source.height * scale) / 2.0,
        })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Top-left corner of the rendered page within the viewport
    pub fn offset(&self) -> Point {
        Point::new(self.offset_left, self.offset_top)
    }

    pub fn to_source(&self, view: Point) -> Point {
        Point::new(
            (view.x - self.offset_left) / self.scale,
            (view.y - self.offset_top) / self.scale,
        )
    }

    pub fn to_view_point(&self, source: Point) -> Point {
        Point::new(
            source.x * self.scale + self.offset_left,
            source.y * self.scale + self.offset_top,
        )
    }

    pub fn to_view(&self, source: Rect) -> Rect {
        source
            .scaled_by(self.scale)
            .translated_by(self.offset_left, self.offset_top)
    }

    /// Index and word whose box contains the pointer, first match wins
    pub fn word_at<'a>(&self, words: &'a [Word], view: Point) -> Option<(usize, &'a Word)> {
        let target = self.to_source(view);
        words
            .iter()
            .enumerate()
            .find(|(_, word)| word.bounds.contains(target))
    }
}

/// Localized zoom lens drawn above the pointer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Magnifier {
    /// Lens side length in view units
    pub size: f64,

    /// Scale applied to source content inside the lens
    pub zoom: f64,

    /// Distance from the pointer to the lens top edge
    pub vertical_offset: f64,
}

impl Default for Magnifier {
    fn default() -> Self {
        Self::with_size(200.0)
    }
}

/// Where to draw the lens and how to place the page inside it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnifierFrame {
    /// Lens bounds in view space
    pub frame: Rect,

    /// Source-space point shown at the lens center
    pub focus: Point,

    /// Scale of the page content inside the lens
    pub content_scale: f64,

    /// Translation of the scaled content relative to the lens origin
    pub content_offset: Point,
}

impl Magnifier {
    /// Lens of the given size with unit zoom, lifted 1.25 sizes above the pointer
    pub fn with_size(size: f64) -> Self {
        Self {
            size,
            zoom: 1.0,
            vertical_offset: -1.25 * size,
        }
    }

    /// Lens center in view space for a pointer position
    pub fn center(&self, pointer: Point) -> Point {
        Point::new(pointer.x, pointer.y + self.vertical_offset + self.size / 2.0)
    }

    pub fn focus(&self, transform: &FitTransform, pointer: Point) -> MagnifierFrame {
        let left = pointer.x - self.size / 2.0;
        let top = pointer.y + self.vertical_offset;
        let focus = transform.to_source(self.center(pointer));
        let half = self.size / 2.0;

        MagnifierFrame {
            frame: Rect::new(left, top, left + self.size, top + self.size),
            focus,
            content_scale: self.zoom,
            content_offset: Point::new(-focus.x * self.zoom + half, -focus.y * self.zoom + half),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn letter_in_portrait() -> FitTransform {
        // 612x792 page in a 306x500 view: width-bound, scale 0.5
        FitTransform::new(Size::new(612.0, 792.0), Size::new(306.0, 500.0)).unwrap()
    }

    #[test]
    fn test_fit_centers_on_the_loose_axis() {
        let t = letter_in_portrait();
        assert_eq!(t.scale(), 0.5);
        assert_eq!(t.offset(), Point::new(0.0, 52.0));
    }

    #[test]
    fn test_degenerate_sizes_have_no_transform() {
        assert!(FitTransform::new(Size::new(0.0, 0.0), Size::new(300.0, 300.0)).is_none());
        assert!(FitTransform::new(Size::new(612.0, 792.0), Size::new(300.0, -1.0)).is_none());
    }

    #[test]
    fn test_to_view_rect() {
        let t = letter_in_portrait();
        let rect = t.to_view(Rect::new(100.0, 100.0, 200.0, 120.0));
        assert_eq!(rect, Rect::new(50.0, 102.0, 100.0, 112.0));
    }

    #[test]
    fn test_word_at_pointer() {
        let t = letter_in_portrait();
        let words = vec![
            Word::new("Hello", Rect::new(10.0, 10.0, 60.0, 30.0)),
            Word::new("world", Rect::new(70.0, 10.0, 130.0, 30.0)),
        ];
        let pointer = t.to_view_point(Point::new(100.0, 20.0));
        let (index, word) = t.word_at(&words, pointer).unwrap();
        assert_eq!(index, 1);
        assert_eq!(word.text, "world");

        assert!(t.word_at(&words, Point::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_magnifier_defaults() {
        let m = Magnifier::default();
        assert_eq!(m.size, 200.0);
        assert_eq!(m.zoom, 1.0);
        assert_eq!(m.vertical_offset, -250.0);
    }

    #[test]
    fn test_magnifier_focus() {
        let t = FitTransform::new(Size::new(400.0, 400.0), Size::new(400.0, 400.0)).unwrap();
        let lens = Magnifier::default().focus(&t, Point::new(200.0, 300.0));

        assert_eq!(lens.frame, Rect::new(100.0, 50.0, 300.0, 250.0));
        assert_eq!(lens.focus, Point::new(200.0, 150.0));
        assert_eq!(lens.content_offset, Point::new(-100.0, -50.0));
        // Lens center shows the focus point
        assert_eq!(
            lens.focus.x * lens.content_scale + lens.content_offset.x,
            lens.frame.width() / 2.0
        );
    }

    proptest! {
        #[test]
        fn prop_view_then_source_round_trips(
            sw in 1.0f64..5000.0,
            sh in 1.0f64..5000.0,
            vw in 1.0f64..5000.0,
            vh in 1.0f64..5000.0,
            x in -1000.0f64..6000.0,
            y in -1000.0f64..6000.0,
        ) {
            let t = FitTransform::new(Size::new(sw, sh), Size::new(vw, vh)).unwrap();
            let back = t.to_source(t.to_view_point(Point::new(x, y)));
            let tolerance = 1e-9 * (1.0 + x.abs().max(y.abs()));
            prop_assert!((back.x - x).abs() <= tolerance * (1.0 + 1.0 / t.scale()));
            prop_assert!((back.y - y).abs() <= tolerance * (1.0 + 1.0 / t.scale()));
        }

        #[test]
        fn prop_rect_corners_match_point_mapping(
            x0 in 0.0f64..600.0,
            y0 in 0.0f64..800.0,
            w in 0.0f64..100.0,
            h in 0.0f64..100.0,
        ) {
            let t = letter_in_portrait();
            let rect = t.to_view(Rect::new(x0, y0, x0 + w, y0 + h));
            let corner = t.to_view_point(Point::new(x0, y0));
            prop_assert!((rect.x0 - corner.x).abs() < 1e-9);
            prop_assert!((rect.y0 - corner.y).abs() < 1e-9);
        }
    }
}
