//! Remote task client for the alignment provider.
//!
//! This module provides:
//! * [`TaskApi`]: async trait over the provider's task endpoints.
//! * [`AlignmentClient`]: the REST implementation, with API-key management
//!   and [`KeyEvent`] notifications.
//! * [`SecretStore`]: where the API key is persisted between runs.
//! * Wire types: [`Task`], [`Target`], [`Output`], [`TaskQuery`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lyric_sync::api::{AlignmentClient, FileSecretStore, TaskApi};
//! use lyric_sync::config::{AppConfig, AppPaths};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = AlignmentClient::from_config(
//!         &config.api,
//!         Arc::new(FileSecretStore::open(AppPaths::new().credentials_file)),
//!     );
//!     client.load_stored_key().await;
//!
//!     let task = client
//!         .create_alignment_task("https://example.com/song.mp3", &["json".into()], "en")
//!         .await
//!         .unwrap();
//!     println!("created {}", task.id);
//! }
//! ```

pub mod client;
pub mod credentials;
pub mod types;

// Test double shared by the pipeline tests.
#[cfg(test)]
pub mod mock;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{interpret_response, AlignmentClient, ApiError, KeyEvent, TaskApi};
pub use credentials::{FileSecretStore, MemorySecretStore, SecretStore, StoreError, API_KEY_NAME};
pub use types::{
    CreateTaskRequest, Output, Target, TargetRequest, TargetStatus, Task, TaskQuery,
    ALIGNMENT_MODEL,
};
