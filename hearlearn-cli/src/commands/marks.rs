//! Bookmark and annotation commands

use super::App;
use anyhow::Result;
use hearlearn_core::DocumentId;

/// Toggle a bookmark on a zero-based page index
pub async fn bookmark(app: &App, id: &DocumentId, page: u32) -> Result<()> {
    let added = app.library().toggle_bookmark(id, page).await?;
    if added {
        println!("Bookmarked page {} of {}", page + 1, id);
    } else {
        println!("Removed bookmark from page {} of {}", page + 1, id);
    }
    Ok(())
}

/// Set or clear the note on a zero-based page index
pub async fn annotate(app: &App, id: &DocumentId, page: u32, text: Option<String>) -> Result<()> {
    let doc = match text {
        Some(text) => app.library().set_annotation(id, page, text).await?,
        None => app.library().remove_annotation(id, page).await?,
    };

    match doc.annotation(page) {
        Some(note) => println!("Page {}: {}", page + 1, note),
        None => println!("No note on page {} of {}", page + 1, id),
    }
    Ok(())
}
