//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

/// Connection settings for the alignment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every task endpoint is resolved against.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.audioshake.ai".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// PollConfig
// ---------------------------------------------------------------------------

/// Attempt budget and spacing for the task poller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Number of fetches before the poller gives up with a timeout.
    pub max_attempts: u32,
    /// Delay between two consecutive fetches, in milliseconds.
    pub interval_ms: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval_ms: 4_000,
        }
    }
}

// ---------------------------------------------------------------------------
// AlignmentConfig
// ---------------------------------------------------------------------------

/// Defaults applied to newly created alignment tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Output formats requested from the provider.
    pub formats: Vec<String>,
    /// Language of the sung / spoken content (ISO-639-1).
    pub language: String,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            formats: vec!["json".into()],
            language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerConfig
// ---------------------------------------------------------------------------

/// Terminal player settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Interval of the time-update signal driving the highlighter, in ms.
    pub tick_ms: u64,
}

impl PlayerConfig {
    /// Tick interval, never shorter than 1 ms.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { tick_ms: 250 }
    }
}

// ---------------------------------------------------------------------------
// CatalogConfig
// ---------------------------------------------------------------------------

/// Paging defaults for listing previous alignment tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub default_skip: u32,
    pub default_take: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_skip: 0,
            default_take: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use lyric_sync::config::{AppConfig, AppPaths};
///
/// let paths = AppPaths::new();
///
/// // Load (returns Default when file is missing)
/// let mut config = AppConfig::load_from(&paths.settings_file).unwrap();
///
/// // Modify and save
/// config.poll.interval_ms = 2_000;
/// config.save_to(&paths.settings_file).unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Provider connection settings.
    pub api: ApiConfig,
    /// Task poller budget.
    pub poll: PollConfig,
    /// Alignment task defaults.
    pub alignment: AlignmentConfig,
    /// Terminal player settings.
    pub player: PlayerConfig,
    /// Task listing defaults.
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Load configuration from `path`, usually [`AppPaths::settings_file`](super::AppPaths::settings_file).
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.api.base_url, loaded.api.base_url);
        assert_eq!(original.api.timeout_secs, loaded.api.timeout_secs);
        assert_eq!(original.poll, loaded.poll);
        assert_eq!(original.alignment.formats, loaded.alignment.formats);
        assert_eq!(original.alignment.language, loaded.alignment.language);
        assert_eq!(original.player.tick_ms, loaded.player.tick_ms);
        assert_eq!(original.catalog.default_take, loaded.catalog.default_take);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.poll, PollConfig::default());
        assert_eq!(config.api.base_url, ApiConfig::default().base_url);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.api.base_url, "https://api.audioshake.ai");
        assert_eq!(cfg.poll.max_attempts, 60);
        assert_eq!(cfg.poll.interval(), Duration::from_millis(4_000));
        assert_eq!(cfg.alignment.formats, vec!["json".to_string()]);
        assert_eq!(cfg.alignment.language, "en");
        assert_eq!(cfg.player.tick_ms, 250);
        assert_eq!(cfg.catalog.default_take, 100);
    }

    #[test]
    fn zero_tick_is_clamped() {
        let player = PlayerConfig { tick_ms: 0 };
        assert_eq!(player.tick(), Duration::from_millis(1));
    }

    /// Sections left out of the file fall back to their defaults.
    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[poll]\nmax_attempts = 5\n").expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.poll.max_attempts, 5);
        assert_eq!(cfg.poll.interval_ms, 4_000);
        assert_eq!(cfg.alignment.language, "en");
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.api.base_url = "http://localhost:8080".into();
        cfg.poll.interval_ms = 500;
        cfg.alignment.language = "de".into();
        cfg.alignment.formats = vec!["json".into(), "srt".into()];

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.api.base_url, "http://localhost:8080");
        assert_eq!(loaded.poll.interval_ms, 500);
        assert_eq!(loaded.alignment.language, "de");
        assert_eq!(loaded.alignment.formats.len(), 2);
    }
}
