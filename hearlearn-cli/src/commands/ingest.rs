//! Submission and ingestion with a progress bar

use super::App;
use anyhow::{bail, Context, Result};
use hearlearn_core::ingest::ScanOutcome;
use hearlearn_core::{DocumentId, DocumentStatus, IngestEvent, IngestPipeline};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Upload a file and, unless told otherwise, ingest it right away
pub async fn ingest(app: &App, input: &Path, wait: bool) -> Result<()> {
    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .context("Could not determine input file name")?;
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;

    let pipeline = app.pipeline();
    let doc = pipeline
        .submit(file_name, bytes)
        .await
        .with_context(|| format!("Failed to submit {}", input.display()))?;
    println!("Submitted {} as {} ({} pages)", file_name, doc.id, doc.total_pages);

    if wait {
        drain(&pipeline).await?;
        report(app, &doc.id).await?;
    }
    Ok(())
}

/// Requeue a failed document
pub async fn retry(app: &App, id: &DocumentId, wait: bool) -> Result<()> {
    let pipeline = app.pipeline();
    pipeline.retry(id).await?;
    println!("Queued {} for another attempt", id);

    if wait {
        drain(&pipeline).await?;
        report(app, id).await?;
    }
    Ok(())
}

/// Ingest every queued document, showing per-page progress
async fn drain(pipeline: &IngestPipeline) -> Result<()> {
    let mut events = pipeline.subscribe();

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")?
            .progress_chars("##-"),
    );

    let scans = async {
        loop {
            match pipeline.scan_once().await? {
                ScanOutcome::Idle | ScanOutcome::Busy => return Ok::<_, anyhow::Error>(()),
                ScanOutcome::Ready(id) | ScanOutcome::Failed(id) => {
                    tracing::debug!(doc_id = %id, "Scan finished");
                }
                ScanOutcome::Removed(id) => {
                    tracing::debug!(doc_id = %id, "Document removed while ingesting");
                }
            }
        }
    };
    tokio::pin!(scans);

    let result = loop {
        tokio::select! {
            result = &mut scans => break result,

            event = events.recv() => match event {
                Ok(event) => show(&bar, event),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => {}
            },
        }
    };

    for event in pending(&mut events) {
        show(&bar, event);
    }

    bar.finish_and_clear();
    result
}

/// Events sent before the scan returned but not yet received
fn pending(events: &mut broadcast::Receiver<IngestEvent>) -> Vec<IngestEvent> {
    let mut queued = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => queued.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return queued,
        }
    }
}

fn show(bar: &ProgressBar, event: IngestEvent) {
    match event {
        IngestEvent::Started { id, total_pages } => {
            bar.reset();
            bar.set_length(u64::from(total_pages));
            bar.set_message(id.to_string());
        }
        IngestEvent::PageFetched { page, .. } => bar.set_position(u64::from(page)),
        IngestEvent::Ready { id } => bar.println(format!("✓ {}", id)),
        IngestEvent::Failed { id, error } => bar.println(format!("✗ {}: {}", id, error)),
    }
}

async fn report(app: &App, id: &DocumentId) -> Result<()> {
    let doc = app.library().require(id).await?;
    match doc.status {
        DocumentStatus::Ready => {
            println!("{} is ready ({} pages)", doc.id, doc.total_pages);
            Ok(())
        }
        DocumentStatus::Failed => bail!(
            "Ingestion of {} failed; run `hearlearn retry {}` to try again",
            doc.id,
            doc.id
        ),
        DocumentStatus::Processing => {
            println!("{} is still queued", doc.id);
            Ok(())
        }
    }
}
