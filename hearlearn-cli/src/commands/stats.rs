//! Listening statistics

use super::App;
use anyhow::Result;
use hearlearn_core::format_duration;

pub async fn stats(app: &App, json: bool) -> Result<()> {
    let stats = app.library().stats().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Documents:  {}", stats.total_documents);
        println!("Completed:  {}", stats.completed_documents);
        println!("Pages read: {}", stats.pages_read);
        println!("Listened:   {}", format_duration(stats.total_listening_seconds));
    }
    Ok(())
}
