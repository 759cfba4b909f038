//! Listening statistics and user preferences

use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, Json};
use hearlearn_core::{format_duration, LibraryStats, Settings, Theme};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: LibraryStats,

    /// Total listening time, e.g. `1h 15m 30s`
    pub total_listening: String,
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.library.stats().await;
    Json(StatsResponse {
        total_listening: format_duration(stats.total_listening_seconds),
        stats,
    })
}

pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings.get().await)
}

/// Partial preferences update; absent fields are left alone
#[derive(Debug, Deserialize)]
pub struct SettingsUpdate {
    pub theme: Option<Theme>,
    /// Empty string resets to the engine default voice
    pub voice_id: Option<String>,
    pub language: Option<String>,
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Settings>, ApiError> {
    let settings = state
        .settings
        .update(|s| {
            if let Some(theme) = update.theme {
                s.theme = theme;
            }
            if let Some(voice) = update.voice_id {
                s.voice_id = Some(voice).filter(|v| !v.is_empty());
            }
            if let Some(language) = update.language {
                s.language = language;
            }
        })
        .await?;
    Ok(Json(settings))
}
