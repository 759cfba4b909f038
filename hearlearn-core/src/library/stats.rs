//! Aggregate listening statistics over the catalog

use super::Library;
use crate::types::Document;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LibraryStats {
    pub total_listening_seconds: u64,
    pub completed_documents: usize,
    /// Sum of every document's last position
    pub pages_read: u64,
    pub total_documents: usize,
}

impl LibraryStats {
    pub fn from_documents(documents: &[Document]) -> Self {
        Self {
            total_listening_seconds: documents.iter().map(|d| d.listening_time_seconds).sum(),
            completed_documents: documents.iter().filter(|d| d.completed).count(),
            pages_read: documents.iter().map(|d| u64::from(d.last_position)).sum(),
            total_documents: documents.len(),
        }
    }
}

impl Library {
    pub async fn stats(&self) -> LibraryStats {
        LibraryStats::from_documents(&self.list().await)
    }
}

/// Render seconds as `1h 15m 30s`, dropping leading zero units
pub fn format_duration(total_seconds: u64) -> String {
    if total_seconds == 0 {
        return "0s".to_string();
    }

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 || hours > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 || (hours == 0 && minutes == 0) {
        parts.push(format!("{}s", seconds));
    }
    parts.join(" ")
}
