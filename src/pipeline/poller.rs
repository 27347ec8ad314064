//! Task poller: fetch a task at a fixed interval until it settles.
//!
//! Ticks are strictly sequential. The next fetch is scheduled only after the
//! previous one resolved and the observer ran, so two fetches for the same
//! task never overlap. Cancellation is checked while a fetch is in flight and
//! while sleeping between ticks.
//!
//! The poller looks at `targets[0]`, not at the target whose model is
//! `alignment`. Tasks created by this client carry a single alignment target,
//! so the two agree.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, TargetStatus, Task, TaskApi};
use crate::config::PollConfig;

use super::state::PollState;

// ---------------------------------------------------------------------------
// PollError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PollError {
    /// The fetched task has an empty `targets` list.
    #[error("No targets found in task")]
    NoTarget,

    /// The provider reported the target as failed.
    #[error("{message}")]
    TaskFailed { message: String },

    /// `max_attempts` fetches were made and the target is still processing.
    #[error("Polling timeout - task still processing after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// The caller cancelled the run.
    #[error("Polling cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    /// A fetch failed; polling stops at the first error.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl PollError {
    /// Terminal [`PollState`] this error leaves the run in.
    pub fn state(&self) -> PollState {
        match self {
            PollError::TaskFailed { .. } => PollState::Failed,
            PollError::Timeout { .. } => PollState::TimedOut,
            PollError::Cancelled { .. } => PollState::Cancelled,
            PollError::NoTarget | PollError::Api(_) => PollState::Errored,
        }
    }
}

// ---------------------------------------------------------------------------
// TaskPoller
// ---------------------------------------------------------------------------

/// Drives [`TaskApi::get_task`] until the first target is terminal.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use lyric_sync::api::TaskApi;
/// use lyric_sync::config::PollConfig;
/// use lyric_sync::pipeline::TaskPoller;
///
/// # async fn example(api: Arc<dyn TaskApi>) {
/// let poller = TaskPoller::new(api, PollConfig::default());
/// let task = poller
///     .poll("task-id", |t| println!("status: {:?}", t.targets.first().map(|t| &t.status)))
///     .await;
/// # }
/// ```
pub struct TaskPoller {
    api: Arc<dyn TaskApi>,
    config: PollConfig,
    cancel: CancellationToken,
}

impl TaskPoller {
    pub fn new(api: Arc<dyn TaskApi>, config: PollConfig) -> Self {
        Self {
            api,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop polling when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this poller.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Poll `task_id`, calling `on_update` after every fetch (the final one
    /// included).
    pub async fn poll<F>(&self, task_id: &str, mut on_update: F) -> Result<Task, PollError>
    where
        F: FnMut(&Task) + Send,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let interval = self.config.interval();
        let mut attempts = 0u32;

        log::info!("poller: watching task {task_id} (max {max_attempts} attempts)");

        loop {
            let task = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(PollError::Cancelled { attempts });
                }
                fetched = self.api.get_task(task_id) => fetched?,
            };
            attempts += 1;

            on_update(&task);

            let (status, error) = match task.targets.first() {
                Some(target) => (target.status.clone(), target.error.clone()),
                None => return Err(PollError::NoTarget),
            };

            match status {
                TargetStatus::Completed => {
                    log::info!("poller: task {task_id} completed after {attempts} attempts");
                    return Ok(task);
                }
                TargetStatus::Failed => {
                    let message = error
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| "Task failed".to_string());
                    log::warn!("poller: task {task_id} failed: {message}");
                    return Err(PollError::TaskFailed { message });
                }
                _ if attempts >= max_attempts => {
                    log::warn!("poller: task {task_id} still processing after {attempts} attempts");
                    return Err(PollError::Timeout { attempts });
                }
                other => {
                    log::debug!("poller: task {task_id} is {other} (attempt {attempts})");
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(PollError::Cancelled { attempts });
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
