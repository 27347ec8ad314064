//! Previously created alignment tasks.
//!
//! [`AlignmentCatalog`] holds one page of the provider's task listing,
//! restricted to tasks that carry an `alignment` target, plus a free-text
//! source filter. Selecting an entry resolves the JSON artifact to load.

use chrono::{DateTime, Local};

use crate::api::{TargetStatus, Task};

use super::asset::{Asset, CatalogError, DEFAULT_FORMAT};

/// Title given to media taken from a task when no assets are loaded.
pub const TASK_MEDIA_TITLE: &str = "Task Media";

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Display fields for one listed task.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentSummary {
    pub id: String,
    pub status: String,
    /// File name of the source media, or `Unknown`.
    pub source: String,
    pub created: String,
    pub error: Option<String>,
}

impl AlignmentSummary {
    /// The text the source filter is matched against.
    pub fn source_line(&self) -> String {
        format!("Source: {}", self.source)
    }
}

/// Summarize `task` for display. `None` when it has no alignment target.
pub fn summary(task: &Task) -> Option<AlignmentSummary> {
    let target = task.alignment_target()?;
    let source = target
        .url
        .as_deref()
        .and_then(source_filename)
        .unwrap_or("Unknown")
        .to_string();

    Some(AlignmentSummary {
        id: task.id.clone(),
        status: target.status.to_string(),
        source,
        created: format_created(task.created_at.as_deref()),
        error: target.error.clone().filter(|e| !e.is_empty()),
    })
}

/// Last path segment of `url` with the query removed.
fn source_filename(url: &str) -> Option<&str> {
    let last = url.rsplit('/').next()?;
    let name = last.split('?').next().unwrap_or_default();
    (!name.is_empty()).then_some(name)
}

/// RFC 3339 timestamps are shown in local time; anything else verbatim.
pub fn format_created(created_at: Option<&str>) -> String {
    match created_at {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(at) => at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            Err(_) => raw.to_string(),
        },
        None => "Unknown".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// What selecting a completed alignment yields.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentSelection {
    pub task_id: String,
    /// Link to the JSON artifact.
    pub link: String,
    /// Media to play when the user has not loaded any assets.
    pub fallback_media: Option<Asset>,
}

// ---------------------------------------------------------------------------
// AlignmentCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct AlignmentCatalog {
    tasks: Vec<Task>,
    filter: String,
    selected: Option<usize>,
}

impl AlignmentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list, keeping only tasks with an alignment target.
    pub fn replace(&mut self, tasks: Vec<Task>) -> usize {
        let total = tasks.len();
        self.tasks = tasks
            .into_iter()
            .filter(Task::has_alignment_target)
            .collect();
        self.selected = None;
        log::debug!(
            "catalog: kept {} of {} tasks with an alignment target",
            self.tasks.len(),
            total
        );
        self.tasks.len()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Tasks whose `Source:` line contains the filter, case-insensitively,
    /// paired with their index in [`tasks`](Self::tasks).
    pub fn visible(&self) -> Vec<(usize, AlignmentSummary)> {
        let needle = self.filter.to_lowercase();
        self.tasks
            .iter()
            .enumerate()
            .filter_map(|(i, task)| summary(task).map(|s| (i, s)))
            .filter(|(_, s)| s.source_line().to_lowercase().contains(&needle))
            .collect()
    }

    /// Resolve the JSON artifact of the task at `index`.
    ///
    /// When `assets_loaded` is false and the target has a media URL, the
    /// selection carries that URL as fallback media.
    pub fn select(
        &mut self,
        index: usize,
        assets_loaded: bool,
    ) -> Result<AlignmentSelection, CatalogError> {
        let len = self.tasks.len();
        let task = self
            .tasks
            .get(index)
            .ok_or(CatalogError::IndexOutOfRange { index, len })?;
        self.selected = Some(index);

        let target = task
            .alignment_target()
            .ok_or(CatalogError::NoAlignmentTarget)?;
        if target.status != TargetStatus::Completed {
            return Err(CatalogError::NotCompleted(target.status.to_string()));
        }
        if target.outputs().is_empty() {
            return Err(CatalogError::NoOutput);
        }
        let link = target
            .json_output_link()
            .ok_or(CatalogError::NoJsonOutput)?
            .to_string();

        let fallback_media = match target.url.as_deref() {
            Some(url) if !url.is_empty() && !assets_loaded => Some(Asset {
                src: url.to_string(),
                title: TASK_MEDIA_TITLE.to_string(),
                format: DEFAULT_FORMAT.to_string(),
                expiry: None,
            }),
            _ => None,
        };

        Ok(AlignmentSelection {
            task_id: task.id.clone(),
            link,
            fallback_media,
        })
    }

    pub fn selected(&self) -> Option<&Task> {
        self.selected.and_then(|i| self.tasks.get(i))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
