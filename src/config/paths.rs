//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout (config dir holds both settings and the stored API key):
//!
//!   Windows: %APPDATA%\lyric-sync\
//!   macOS:   ~/Library/Application Support/lyric-sync/
//!   Linux:   ~/.config/lyric-sync/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `credentials.json`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `credentials.json` (the file-backed secret store).
    pub credentials_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "lyric-sync";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self::in_dir(config_dir)
    }

    /// Lay the files out under an explicit directory (useful for tests and
    /// the `--config-dir` flag).
    pub fn in_dir(config_dir: PathBuf) -> Self {
        let settings_file = config_dir.join("settings.toml");
        let credentials_file = config_dir.join("credentials.json");

        Self {
            config_dir,
            settings_file,
            credentials_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
