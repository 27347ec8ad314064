//! Alignment pipeline: create → poll → fetch artifact → normalize.
//!
//! [`AlignmentPipeline`] owns an `Arc<dyn TaskApi>` and reports progress as
//! [`PipelineEvent`]s over an unbounded `tokio::sync::mpsc` channel, so a
//! front end can print status lines and diagnostic entries while the run is
//! in flight.
//!
//! # Pipeline flow
//!
//! ```text
//! run(media_url)
//!   └─▶ create_alignment_task                 [Submitting → TaskCreated]
//!         └─▶ TaskPoller::poll               [TaskUpdated × n]
//!               ├─ Err → PipelineError::Poll
//!               └─ Ok  → TaskCompleted
//!                     └─▶ fetch_alignment     [FetchingArtifact]
//!                           └─▶ parse_alignment [AlignmentLoaded]
//! ```
//!
//! Every network step races the pipeline's cancellation token, so a cancel
//! during task creation or the artifact download ends the run as promptly as
//! one during polling.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, Task, TaskApi};
use crate::config::{AlignmentConfig, PollConfig};
use crate::lyrics::{parse_alignment, top_level_keys, Alignment, AlignmentError};

use super::poller::{PollError, TaskPoller};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors that can surface inside the pipeline.
///
/// All variants carry a human-readable description so the front end can
/// show them without knowing the internal cause.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Poll(#[from] PollError),

    /// The completed task has no alignment target.
    #[error("No alignment target found in task {task_id}")]
    NoAlignmentTarget { task_id: String },

    /// The completed alignment target has no JSON artifact link.
    #[error("No JSON output found for task {task_id}")]
    NoJsonOutput { task_id: String },

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    /// The token fired outside of polling.
    #[error("Cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// Progress events delivered from the pipeline to the front end.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The task-creation request is about to be sent.
    Submitting { media_url: String },
    /// The provider accepted the task.
    TaskCreated(Task),
    /// One poll fetch returned.
    TaskUpdated(Task),
    /// The alignment target completed.
    TaskCompleted(Task),
    /// The artifact download started.
    FetchingArtifact { url: String },
    /// Normalization finished.
    AlignmentLoaded {
        lines: usize,
        words: usize,
        keys: Vec<String>,
    },
}

pub type EventSender = mpsc::UnboundedSender<PipelineEvent>;

// ---------------------------------------------------------------------------
// AlignmentPipeline
// ---------------------------------------------------------------------------

pub struct AlignmentPipeline {
    api: Arc<dyn TaskApi>,
    poll: PollConfig,
    alignment: AlignmentConfig,
    events: Option<EventSender>,
    cancel: CancellationToken,
}

impl AlignmentPipeline {
    pub fn new(api: Arc<dyn TaskApi>, poll: PollConfig, alignment: AlignmentConfig) -> Self {
        Self {
            api,
            poll,
            alignment,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report progress on `events`.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            // A closed receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    }

    async fn or_cancel<T, F>(&self, step: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                log::info!("pipeline: cancelled");
                Err(PipelineError::Cancelled)
            }
            result = step => Ok(result?),
        }
    }

    /// Submit `media_url`, wait for the task, then load its alignment.
    pub async fn run(&self, media_url: &str) -> Result<Alignment, PipelineError> {
        self.emit(PipelineEvent::Submitting {
            media_url: media_url.to_string(),
        });

        let task = self
            .or_cancel(self.api.create_alignment_task(
                media_url,
                &self.alignment.formats,
                &self.alignment.language,
            ))
            .await?;
        log::info!("pipeline: created task {}", task.id);
        self.emit(PipelineEvent::TaskCreated(task.clone()));

        let completed = self.wait_for(&task.id).await?;
        self.load_task_alignment(&completed).await
    }

    /// Poll an existing task until it settles.
    pub async fn wait_for(&self, task_id: &str) -> Result<Task, PipelineError> {
        let poller =
            TaskPoller::new(Arc::clone(&self.api), self.poll).with_cancel(self.cancel.clone());
        let completed = poller
            .poll(task_id, |update| {
                self.emit(PipelineEvent::TaskUpdated(update.clone()))
            })
            .await?;
        self.emit(PipelineEvent::TaskCompleted(completed.clone()));
        Ok(completed)
    }

    /// Fetch and normalize the JSON artifact of a completed task.
    ///
    /// The artifact is looked up on the target whose model is `alignment`.
    pub async fn load_task_alignment(&self, task: &Task) -> Result<Alignment, PipelineError> {
        let target = task
            .alignment_target()
            .ok_or_else(|| PipelineError::NoAlignmentTarget {
                task_id: task.id.clone(),
            })?;
        let link = target
            .json_output_link()
            .ok_or_else(|| PipelineError::NoJsonOutput {
                task_id: task.id.clone(),
            })?;

        self.load_artifact(link).await
    }

    /// Fetch and normalize the artifact at `url`.
    pub async fn load_artifact(&self, url: &str) -> Result<Alignment, PipelineError> {
        self.emit(PipelineEvent::FetchingArtifact {
            url: url.to_string(),
        });
        let data = self.or_cancel(self.api.fetch_alignment(url)).await?;
        let alignment = parse_alignment(&data)?;

        self.emit(PipelineEvent::AlignmentLoaded {
            lines: alignment.source_lines,
            words: alignment.word_count,
            keys: top_level_keys(&data),
        });
        Ok(alignment)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
