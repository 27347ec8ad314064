//! Task polling and the end-to-end alignment pipeline.
//!
//! # Architecture
//!
//! ```text
//! AlignmentPipeline::run(media_url)
//!        │
//!        ├─ TaskApi::create_alignment_task
//!        │
//!        ├─ TaskPoller::poll          ← sequential ticks, cancellable
//!        │     └─ TaskApi::get_task × n ──▶ PipelineEvent::TaskUpdated
//!        │
//!        └─ TaskApi::fetch_alignment → lyrics::parse_alignment
//!
//! PipelineEvent (unbounded mpsc) ───▶ front end status / diagnostics
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//! use lyric_sync::api::TaskApi;
//! use lyric_sync::config::AppConfig;
//! use lyric_sync::pipeline::AlignmentPipeline;
//!
//! # async fn example(api: Arc<dyn TaskApi>) {
//! let config = AppConfig::default();
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let pipeline = AlignmentPipeline::new(api, config.poll, config.alignment)
//!     .with_events(tx)
//!     .with_cancel(CancellationToken::new());
//!
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         println!("{event:?}");
//!     }
//! });
//!
//! let alignment = pipeline.run("https://example.com/song.mp3").await;
//! # }
//! ```

pub mod poller;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use poller::{PollError, TaskPoller};
pub use runner::{AlignmentPipeline, EventSender, PipelineError, PipelineEvent};
pub use state::PollState;
