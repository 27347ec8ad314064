//! Media assets the user can pick as the source of an alignment task.
//!
//! Asset lists arrive as JSON, either wrapped (`{"assets": [...]}`) or as a
//! bare array, from a local file or a remote URL. A single asset can also be
//! built from a URL, in which case the MIME type is inferred from the file
//! extension.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CatalogError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Error loading assets: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error loading assets: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON document is neither an asset array nor `{assets: [...]}`.
    #[error("Error loading assets: expected an asset list")]
    NotAnAssetList,

    #[error("No item at index {index} (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No alignment target found")]
    NoAlignmentTarget,

    #[error("Alignment status: {0}")]
    NotCompleted(String),

    #[error("No output available for this alignment")]
    NoOutput,

    #[error("No JSON output found")]
    NoJsonOutput,
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_FORMAT: &str = "audio/mpeg";

/// A playable media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub src: String,
    #[serde(default = "default_title")]
    pub title: String,
    /// MIME type, e.g. `video/mp4`.
    #[serde(default)]
    pub format: String,
    /// When a signed `src` stops working. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

/// How an asset is played back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl Asset {
    /// Build an asset from a source URL, inferring its MIME type.
    ///
    /// A missing or blank `title` becomes `"Untitled"`.
    pub fn from_source(url: &str, title: Option<&str>) -> Self {
        let src = url.trim().to_string();
        let title = title
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();
        let format = mime_for_url(&src).to_string();
        log::info!("catalog: asset created with URL: {src}, title: {title}, MIME type: {format}");
        Self {
            src,
            title,
            format,
            expiry: None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        if self.format.contains("video") {
            MediaKind::Video
        } else {
            MediaKind::Audio
        }
    }

    pub fn label(&self) -> &'static str {
        format_label(&self.format)
    }
}

/// Short display label for a MIME type.
pub fn format_label(format: &str) -> &'static str {
    if format.contains("video") {
        "Video"
    } else if format.contains("audio") {
        "Audio"
    } else if format.contains("json") {
        "JSON"
    } else {
        "File"
    }
}

/// MIME type for the file extension of `url`, ignoring query and fragment.
///
/// Unknown extensions fall back to `audio/mpeg`.
pub fn mime_for_url(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let file_name = path.rsplit('/').next().unwrap_or_default();
    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    match extension.as_str() {
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "mov" => "video/quicktime",
        "aac" => "audio/aac",
        other => {
            log::warn!("catalog: unsupported file type: {other}, defaulting to {DEFAULT_FORMAT}");
            DEFAULT_FORMAT
        }
    }
}

// ---------------------------------------------------------------------------
// AssetCatalog
// ---------------------------------------------------------------------------

/// The loaded asset list and the current selection.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AssetCatalog {
    assets: Vec<Asset>,
    selected: Option<usize>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog preloaded with [`demo_assets`].
    pub fn demo() -> Self {
        let mut catalog = Self::new();
        catalog.load_demo();
        catalog
    }

    /// Replace the asset list with the one in `data`.
    ///
    /// Accepts `{"assets": [...]}` or a bare array. The selection is cleared.
    pub fn load_json(&mut self, data: &Value) -> Result<usize, CatalogError> {
        let list = match data.get("assets") {
            Some(wrapped) if !wrapped.is_null() => wrapped,
            _ => data,
        };
        if !list.is_array() {
            return Err(CatalogError::NotAnAssetList);
        }
        let assets: Vec<Asset> = serde_json::from_value(list.clone())?;
        Ok(self.replace(assets))
    }

    /// Read and load an asset list from a local JSON file.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        let data: Value = serde_json::from_str(&text)?;
        self.load_json(&data)
    }

    /// Replace the list with the single asset at `url`.
    pub fn load_source(&mut self, url: &str, title: Option<&str>) -> usize {
        self.replace(vec![Asset::from_source(url, title)])
    }

    /// Replace the list with the built-in demo assets.
    pub fn load_demo(&mut self) -> usize {
        self.replace(demo_assets())
    }

    fn replace(&mut self, assets: Vec<Asset>) -> usize {
        self.assets = assets;
        self.selected = None;
        log::info!("catalog: loaded {} assets", self.assets.len());
        self.assets.len()
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn select(&mut self, index: usize) -> Result<&Asset, CatalogError> {
        let len = self.assets.len();
        let asset = self
            .assets
            .get(index)
            .ok_or(CatalogError::IndexOutOfRange { index, len })?;
        self.selected = Some(index);
        Ok(asset)
    }

    pub fn selected(&self) -> Option<&Asset> {
        self.selected.and_then(|i| self.assets.get(i))
    }
}

/// Public demo media.
pub fn demo_assets() -> Vec<Asset> {
    vec![Asset {
        src: "https://spatial-explorer.s3.us-east-1.amazonaws.com/spatial-Tech-Startups-DisneyAccelerator-Demo-Day-2024.mp4".into(),
        title: "DisneyAccelerator-Demo-Day-2024.mp4".into(),
        format: "video/mp4".into(),
        expiry: None,
    }]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!([
            { "src": "https://x/a.mp3", "title": "A", "format": "audio/mpeg" },
            { "src": "https://x/b.mp4", "title": "B", "format": "video/mp4" }
        ])
    }

    #[test]
    fn wrapped_and_bare_lists_load_identically() {
        let mut wrapped = AssetCatalog::new();
        let mut bare = AssetCatalog::new();

        wrapped.load_json(&json!({ "assets": sample() })).unwrap();
        bare.load_json(&sample()).unwrap();

        assert_eq!(wrapped, bare);
        assert_eq!(bare.len(), 2);
    }

    #[test]
    fn loading_clears_selection() {
        let mut catalog = AssetCatalog::new();
        catalog.load_json(&sample()).unwrap();
        catalog.select(1).unwrap();
        assert_eq!(catalog.selected().unwrap().title, "B");

        catalog.load_demo();
        assert!(catalog.selected().is_none());
    }

    #[test]
    fn select_out_of_range() {
        let mut catalog = AssetCatalog::new();
        catalog.load_json(&sample()).unwrap();
        assert!(matches!(
            catalog.select(5),
            Err(CatalogError::IndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn non_list_is_rejected() {
        let mut catalog = AssetCatalog::new();
        assert!(matches!(
            catalog.load_json(&json!({ "items": [] })),
            Err(CatalogError::NotAnAssetList)
        ));
    }

    #[test]
    fn missing_title_defaults_to_untitled() {
        let mut catalog = AssetCatalog::new();
        catalog.load_json(&json!([{ "src": "https://x/a.wav" }])).unwrap();
        assert_eq!(catalog.assets()[0].title, "Untitled");
        assert_eq!(catalog.assets()[0].label(), "File");
    }

    #[test]
    fn load_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.json");
        std::fs::write(&path, json!({ "assets": sample() }).to_string()).unwrap();

        let mut catalog = AssetCatalog::new();
        assert_eq!(catalog.load_file(&path).unwrap(), 2);
    }

    #[test]
    fn load_file_with_bad_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut catalog = AssetCatalog::new();
        assert!(matches!(catalog.load_file(&path), Err(CatalogError::Json(_))));
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_url("https://x/song.MP3"), "audio/mpeg");
        assert_eq!(mime_for_url("https://x/clip.mov?sig=abc#t=3"), "video/quicktime");
        assert_eq!(mime_for_url("https://x/take.flac"), "audio/flac");
        assert_eq!(mime_for_url("https://x/voice.aac"), "audio/aac");
        assert_eq!(mime_for_url("https://x/demo.wav"), "audio/wav");
        assert_eq!(mime_for_url("https://x/movie.mp4"), "video/mp4");
        assert_eq!(mime_for_url("https://x/track.ogg"), "audio/mpeg");
        assert_eq!(mime_for_url("https://x/stream"), "audio/mpeg");
    }

    #[test]
    fn from_source_defaults_title() {
        let asset = Asset::from_source("  https://x/clip.mp4?x=1 ", None);
        assert_eq!(asset.src, "https://x/clip.mp4?x=1");
        assert_eq!(asset.title, "Untitled");
        assert_eq!(asset.kind(), MediaKind::Video);

        let named = Asset::from_source("https://x/a.mp3", Some("Intro"));
        assert_eq!(named.title, "Intro");
        assert_eq!(named.kind(), MediaKind::Audio);
    }

    #[test]
    fn labels() {
        assert_eq!(format_label("video/mp4"), "Video");
        assert_eq!(format_label("audio/wav"), "Audio");
        assert_eq!(format_label("application/json"), "JSON");
        assert_eq!(format_label("image/png"), "File");
    }

    #[test]
    fn demo_has_only_public_urls() {
        let demo = demo_assets();
        assert!(!demo.is_empty());
        assert!(demo.iter().all(|a| !a.src.contains("X-Amz-Credential")));
    }
}
