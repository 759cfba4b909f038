//! Catalog listing, inspection and removal

use super::App;
use anyhow::{Context, Result};
use hearlearn_core::{format_duration, Document, DocumentId, DocumentStatus};

/// List documents, newest first
pub async fn list(app: &App, status: Option<DocumentStatus>, json: bool) -> Result<()> {
    let mut documents: Vec<Document> = app
        .library()
        .list()
        .await
        .into_iter()
        .filter(|d| status.map_or(true, |s| d.status == s))
        .collect();
    documents.sort_by(|a, b| b.added_at.cmp(&a.added_at));

    if json {
        println!("{}", serde_json::to_string_pretty(&documents)?);
        return Ok(());
    }

    if documents.is_empty() {
        println!("No documents");
        return Ok(());
    }

    for doc in &documents {
        let progress = if doc.completed {
            "completed".to_string()
        } else {
            format!("page {}/{}", doc.last_position + 1, doc.total_pages)
        };
        println!(
            "{:<40} {:<10} {:>14}  {}",
            doc.id.as_str(),
            doc.status.to_string(),
            progress,
            doc.original_name
        );
    }

    Ok(())
}

/// Display one document's catalog entry
pub async fn info(app: &App, id: &DocumentId, text: bool, json: bool) -> Result<()> {
    let doc = app.library().require(id).await?;

    let pages = if text {
        let pages = app
            .library()
            .get_pages(id)
            .await
            .with_context(|| format!("No page content stored for {}", id))?;
        Some(pages)
    } else {
        None
    };

    if json {
        let mut value = serde_json::to_value(&doc)?;
        if let Some(pages) = &pages {
            value["pages"] = serde_json::to_value(pages)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Id:        {}", doc.id);
    println!("Name:      {}", doc.original_name);
    println!("Status:    {}", doc.status);
    println!("Pages:     {}", doc.total_pages);
    println!("Position:  page {}", doc.last_position + 1);
    println!("Listened:  {}", format_duration(doc.listening_time_seconds));
    println!("Completed: {}", if doc.completed { "yes" } else { "no" });
    println!("Added:     {}", doc.added_at.format("%Y-%m-%d %H:%M"));
    if !doc.bookmarks.is_empty() {
        let pages: Vec<String> = doc.bookmarks.iter().map(|p| (p + 1).to_string()).collect();
        println!("Bookmarks: {}", pages.join(", "));
    }
    for (page, note) in &doc.annotations {
        println!("Note p.{}:  {}", page + 1, note);
    }

    if let Some(pages) = pages {
        for (index, page) in pages.iter().enumerate() {
            println!();
            let source = if page.recognized { " (OCR)" } else { "" };
            println!("--- Page {}{} ---", index + 1, source);
            println!("{}", page.text);
        }
    }

    Ok(())
}

/// Remove a document; removing an unknown id is not an error
pub async fn remove(app: &App, id: &DocumentId) -> Result<()> {
    let existed = app.library().get(id).await.is_some();
    app.library().remove(id).await?;

    if existed {
        tracing::info!(doc_id = %id, "Document removed");
        println!("Removed {}", id);
    } else {
        println!("{} is not in the library", id);
    }
    Ok(())
}
