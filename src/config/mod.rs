//! Configuration module for lyric-sync.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform config directories, and TOML persistence via
//! `AppConfig::load_from` / `AppConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AlignmentConfig, ApiConfig, AppConfig, CatalogConfig, PlayerConfig, PollConfig,
};
