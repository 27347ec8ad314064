//! Scripted [`TaskApi`] test double.
//!
//! `get_task` replays queued responses in order, then falls back to a
//! repeated task (if one was set). Every call is counted so tests can check
//! how many fetches the poller made.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::client::{ApiError, TaskApi};
use super::types::{Output, Target, TargetRequest, TargetStatus, Task, TaskQuery};

/// Task with one alignment target in `status`.
pub fn task_with_status(id: &str, status: &str) -> Task {
    Task {
        id: id.to_string(),
        targets: vec![Target {
            model: "alignment".into(),
            status: TargetStatus::from(status.to_string()),
            url: Some("https://cdn.example.com/media/song.mp3?sig=1".into()),
            ..Target::default()
        }],
        created_at: Some("2025-11-18T05:22:56Z".into()),
        ..Task::default()
    }
}

/// Completed alignment task whose JSON artifact lives at `link`.
pub fn completed_task(id: &str, link: &str) -> Task {
    let mut task = task_with_status(id, "completed");
    task.targets[0].output = Some(vec![Output {
        format: Some("json".into()),
        link: Some(link.to_string()),
        ..Output::default()
    }]);
    task
}

pub struct MockTaskApi {
    created: Task,
    script: Mutex<VecDeque<Result<Task, ApiError>>>,
    repeat: Option<Task>,
    artifact: Result<Value, String>,
    stall_artifact: bool,
    get_calls: AtomicU32,
    created_requests: Mutex<Vec<(String, Vec<TargetRequest>)>>,
}

impl MockTaskApi {
    pub fn new() -> Self {
        Self {
            created: task_with_status("task-1", "queued"),
            script: Mutex::new(VecDeque::new()),
            repeat: None,
            artifact: Err("no artifact configured".into()),
            stall_artifact: false,
            get_calls: AtomicU32::new(0),
            created_requests: Mutex::new(Vec::new()),
        }
    }

    /// Task returned by `create_task`.
    pub fn with_created(mut self, task: Task) -> Self {
        self.created = task;
        self
    }

    /// Queue one `get_task` response.
    pub fn then_get(self, response: Result<Task, ApiError>) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    /// Returned by `get_task` once the queue is drained.
    pub fn repeat_get(mut self, task: Task) -> Self {
        self.repeat = Some(task);
        self
    }

    pub fn with_artifact(mut self, artifact: Value) -> Self {
        self.artifact = Ok(artifact);
        self
    }

    /// `fetch_alignment` never returns.
    pub fn with_stalled_artifact(mut self) -> Self {
        self.stall_artifact = true;
        self
    }

    pub fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// `(url, targets)` of every `create_task` call.
    pub fn created_requests(&self) -> Vec<(String, Vec<TargetRequest>)> {
        self.created_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskApi for MockTaskApi {
    async fn create_task(
        &self,
        url: &str,
        targets: Vec<TargetRequest>,
        _callback_url: Option<&str>,
    ) -> Result<Task, ApiError> {
        self.created_requests
            .lock()
            .unwrap()
            .push((url.to_string(), targets));
        Ok(self.created.clone())
    }

    async fn get_task(&self, _task_id: &str) -> Result<Task, ApiError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        self.repeat
            .clone()
            .ok_or_else(|| ApiError::Network("mock script exhausted".into()))
    }

    async fn list_tasks(&self, _query: &TaskQuery) -> Result<Vec<Task>, ApiError> {
        Ok(Vec::new())
    }

    async fn fetch_alignment(&self, _url: &str) -> Result<Value, ApiError> {
        if self.stall_artifact {
            std::future::pending::<()>().await;
        }
        self.artifact
            .clone()
            .map_err(|e| ApiError::Fetch(format!("Error fetching alignment data: {e}")))
    }
}
