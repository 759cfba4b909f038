//! Bookmark and annotation handlers

use crate::error::{parse_id, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use hearlearn_core::Document;
use serde::Deserialize;

pub async fn put_bookmark(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, u32)>,
) -> Result<Json<Document>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.library.add_bookmark(&id, page).await?))
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, u32)>,
) -> Result<Json<Document>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.library.remove_bookmark(&id, page).await?))
}

#[derive(Debug, Deserialize)]
pub struct AnnotationRequest {
    pub text: String,
}

/// Set the note for a page; blank text removes it
pub async fn put_annotation(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, u32)>,
    Json(body): Json<AnnotationRequest>,
) -> Result<Json<Document>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.library.set_annotation(&id, page, body.text).await?))
}

pub async fn delete_annotation(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, u32)>,
) -> Result<Json<Document>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.library.remove_annotation(&id, page).await?))
}
