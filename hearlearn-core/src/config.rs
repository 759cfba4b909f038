//! Process configuration read from the environment

use crate::ingest::PipelineConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the local storage (catalog, pages, files, settings)
    pub data_dir: PathBuf,

    /// Base URL of the extraction service
    pub extraction_url: String,

    /// Bounded wait for a single page fetch
    pub page_timeout: Duration,

    /// How often the ingestion worker rescans the catalog
    pub scan_interval: Duration,

    /// Address the HTTP server listens on
    pub bind: SocketAddr,

    /// Comma-separated allowed origins, or `*`; unset means local dev origins
    pub cors_origins: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./hearlearn_data"),
            extraction_url: "http://127.0.0.1:5000".to_string(),
            page_timeout: Duration::from_secs(60),
            scan_interval: Duration::from_secs(5),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            cors_origins: None,
        }
    }
}

impl Config {
    /// Read `HEARLEARN_*` variables, keeping defaults for anything unset or invalid
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("HEARLEARN_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("HEARLEARN_EXTRACTION_URL") {
            config.extraction_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = seconds(&lookup, "HEARLEARN_PAGE_TIMEOUT_SECS") {
            config.page_timeout = secs;
        }
        if let Some(secs) = seconds(&lookup, "HEARLEARN_SCAN_INTERVAL_SECS") {
            config.scan_interval = secs;
        }
        if let Some(raw) = lookup("HEARLEARN_BIND") {
            match raw.trim().parse() {
                Ok(addr) => config.bind = addr,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid HEARLEARN_BIND"),
            }
        }
        config.cors_origins = lookup("HEARLEARN_CORS_ORIGINS").filter(|o| !o.trim().is_empty());

        config
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            page_timeout: self.page_timeout,
            scan_interval: self.scan_interval,
        }
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(Duration::from_secs(n)),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring invalid duration");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HEARLEARN_DATA_DIR", "/tmp/hl"),
            ("HEARLEARN_EXTRACTION_URL", "http://extract.local/"),
            ("HEARLEARN_PAGE_TIMEOUT_SECS", "15"),
            ("HEARLEARN_SCAN_INTERVAL_SECS", "zero"),
            ("HEARLEARN_BIND", "0.0.0.0:8080"),
            ("HEARLEARN_CORS_ORIGINS", "https://app.example"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/hl"));
        assert_eq!(config.extraction_url, "http://extract.local");
        assert_eq!(config.page_timeout, Duration::from_secs(15));
        assert_eq!(config.scan_interval, Duration::from_secs(5));
        assert_eq!(config.bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.cors_origins.as_deref(), Some("https://app.example"));
    }

    #[test]
    fn test_invalid_bind_keeps_default() {
        let config = Config::from_lookup(|k| {
            (k == "HEARLEARN_BIND").then(|| "not an address".to_string())
        });
        assert_eq!(config.bind, SocketAddr::from(([127, 0, 0, 1], 3000)));
        assert_eq!(config.cors_origins, None);
    }
}
