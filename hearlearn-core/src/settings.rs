//! User preferences persisted next to the catalog
//!
//! There is no global instance: a [`SettingsStore`] is created once per
//! process with [`SettingsStore::init`] and handed to whoever needs it.

use crate::error::{Result, StorageError};
use crate::playback::PlaybackConfig;
use crate::storage::StorageProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage key of the preferences blob
pub const SETTINGS_KEY: &str = "settings.json";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,

    /// Preferred speech voice; `None` uses the engine default
    pub voice_id: Option<String>,

    /// BCP 47 tag passed to the speech engine
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            voice_id: None,
            language: "pt-BR".to_string(),
        }
    }
}

/// Process-scoped preferences with explicit load and save
pub struct SettingsStore {
    storage: Arc<dyn StorageProvider>,
    current: RwLock<Settings>,
}

impl SettingsStore {
    /// Load saved preferences, falling back to defaults when none are stored
    pub async fn init(storage: Arc<dyn StorageProvider>) -> Result<Self> {
        let settings = match storage.read(SETTINGS_KEY).await {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Saved settings are unreadable, using defaults");
                Settings::default()
            }),
            Err(e) if e.is_not_found() => Settings::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            storage,
            current: RwLock::new(settings),
        })
    }

    pub async fn get(&self) -> Settings {
        self.current.read().await.clone()
    }

    /// Change preferences; the in-memory copy changes only after a successful save
    pub async fn update<F>(&self, f: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = self.current.write().await;
        let mut next = guard.clone();
        f(&mut next);

        let data = serde_json::to_vec_pretty(&next).map_err(|e| StorageError::Corrupt {
            path: SETTINGS_KEY.to_string(),
            reason: e.to_string(),
        })?;
        self.storage.write(SETTINGS_KEY, data).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to save settings");
            e
        })?;

        *guard = next.clone();
        Ok(next)
    }

    /// Speech parameters for a new playback engine
    pub async fn playback_config(&self) -> PlaybackConfig {
        let settings = self.get().await;
        PlaybackConfig {
            voice_id: settings.voice_id,
            language: settings.language,
            ..PlaybackConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_defaults_when_nothing_saved() {
        let store = SettingsStore::init(Arc::new(MemoryStorage::new()))
            .await
            .unwrap();
        assert_eq!(store.get().await, Settings::default());
    }

    #[tokio::test]
    async fn test_update_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SettingsStore::init(storage.clone()).await.unwrap();
        store
            .update(|s| {
                s.theme = s.theme.toggled();
                s.voice_id = Some("pt-br-x-afs-local".to_string());
            })
            .await
            .unwrap();

        let reloaded = SettingsStore::init(storage).await.unwrap();
        let settings = reloaded.get().await;
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.voice_id.as_deref(), Some("pt-br-x-afs-local"));

        let config = reloaded.playback_config().await;
        assert_eq!(config.voice_id.as_deref(), Some("pt-br-x-afs-local"));
        assert_eq!(config.rate, 1.0);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SettingsStore::init(storage.clone()).await.unwrap();
        storage.set_fail_writes(true);

        assert!(store.update(|s| s.theme = Theme::Dark).await.is_err());
        assert_eq!(store.get().await.theme, Theme::Light);
    }
}
