//! Library management handlers

use crate::error::{parse_id, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use hearlearn_core::{Document, DocumentStatus, Page, ValidationError};
use serde::{Deserialize, Serialize};

/// Query parameters for listing documents
#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    /// Page number (1-indexed, 0 treated as 1)
    #[serde(default = "default_page")]
    pub page: u32,

    /// Items per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Only documents in this ingestion state
    pub status: Option<DocumentStatus>,

    /// Case-insensitive match on the original name
    pub search: Option<String>,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    20
}

/// Document summary for list response
#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub original_name: String,
    pub status: DocumentStatus,
    pub total_pages: u32,
    pub last_position: u32,
    pub completed: bool,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.to_string(),
            original_name: doc.original_name.clone(),
            status: doc.status,
            total_pages: doc.total_pages,
            last_position: doc.last_position,
            completed: doc.completed,
        }
    }
}

/// List response with pagination
#[derive(Debug, Serialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<DocumentSummary>,
    pub total: u32,
    pub page: u32,
    pub per_page: u32,
}

/// List documents, most recently added first
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> Json<ListDocumentsResponse> {
    let search = query.search.as_ref().map(|s| s.to_lowercase());
    let mut documents: Vec<Document> = state
        .library
        .list()
        .await
        .into_iter()
        .filter(|doc| query.status.map_or(true, |status| doc.status == status))
        .filter(|doc| {
            search
                .as_ref()
                .map_or(true, |s| doc.original_name.to_lowercase().contains(s))
        })
        .collect();
    documents.sort_by(|a, b| b.added_at.cmp(&a.added_at));

    let total = documents.len() as u32;
    let page = query.page.max(1);
    let start = (page - 1).saturating_mul(query.per_page) as usize;
    let documents = documents
        .iter()
        .skip(start)
        .take(query.per_page as usize)
        .map(DocumentSummary::from)
        .collect();

    Json(ListDocumentsResponse {
        documents,
        total,
        page,
        per_page: query.per_page,
    })
}

/// Full catalog entry for one document
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.library.require(&id).await?))
}

/// Page content of a ready document
pub async fn get_pages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Page>>, ApiError> {
    let id = parse_id(&id)?;
    let doc = state.library.require(&id).await?;
    if !doc.is_ready() {
        return Err(ValidationError::NotReady {
            id,
            status: doc.status,
        }
        .into());
    }

    match state.library.get_pages(&id).await {
        Some(pages) => Ok(Json(pages)),
        None => Err(ValidationError::PagesUnavailable(id).into()),
    }
}

/// Upload a document and queue it for ingestion
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: axum_extra::extract::Multipart,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Invalid file name"))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        let doc = state.pipeline.submit(&file_name, data.to_vec()).await?;
        return Ok((StatusCode::ACCEPTED, Json(doc)));
    }

    Err(ApiError::bad_request("No file provided"))
}

/// Delete a document; deleting an unknown id also succeeds
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.library.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Requeue a failed document
pub async fn retry_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let id = parse_id(&id)?;
    let doc = state.pipeline.retry(&id).await?;
    Ok((StatusCode::ACCEPTED, Json(doc)))
}

/// Outcome of a listening session reported by a client
#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub page: u32,
    #[serde(default)]
    pub seconds: u64,
}

pub async fn save_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(progress): Json<ProgressRequest>,
) -> Result<Json<Document>, ApiError> {
    let id = parse_id(&id)?;
    let doc = state
        .library
        .record_session(&id, progress.page, progress.seconds)
        .await?;
    Ok(Json(doc))
}
