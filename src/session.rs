//! User-facing diagnostics: the debug log and the transient status line.
//!
//! Failures never abort the process. Each one is shown on the [`StatusLine`]
//! and recorded as an error entry in the [`DebugLog`]; see
//! [`Session::report_error`]. API-key changes broadcast by the client are
//! folded into the same log with [`Session::drain_key_events`].

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde_json::{json, Value};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::api::KeyEvent;

// ---------------------------------------------------------------------------
// DebugLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Info,
    Success,
    Error,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Info => "info",
            EntryKind::Success => "success",
            EntryKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DebugEntry {
    pub at: DateTime<Local>,
    pub kind: EntryKind,
    pub payload: Value,
}

impl fmt::Display for DebugEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = serde_json::to_string_pretty(&self.payload).map_err(|_| fmt::Error)?;
        write!(
            f,
            "[{}] {}\n{}",
            self.at.format("%H:%M:%S"),
            self.kind.as_str(),
            body
        )
    }
}

/// Append-only record of API traffic and failures.
#[derive(Debug, Default, Clone)]
pub struct DebugLog {
    entries: Vec<DebugEntry>,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: EntryKind, payload: Value) {
        match kind {
            EntryKind::Error => log::warn!("session: {payload}"),
            _ => log::debug!("session: {payload}"),
        }
        self.entries.push(DebugEntry {
            at: Local::now(),
            kind,
            payload,
        });
    }

    pub fn info(&mut self, payload: Value) {
        self.push(EntryKind::Info, payload);
    }

    pub fn success(&mut self, payload: Value) {
        self.push(EntryKind::Success, payload);
    }

    pub fn error(&mut self, payload: Value) {
        self.push(EntryKind::Error, payload);
    }

    pub fn entries(&self) -> &[DebugEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// StatusLine
// ---------------------------------------------------------------------------

/// How long a status message stays visible by default.
pub const STATUS_TTL: Duration = Duration::from_secs(3);

/// A single transient notification.
#[derive(Debug, Clone)]
pub struct StatusLine {
    message: Option<(String, Instant)>,
    ttl: Duration,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::with_ttl(STATUS_TTL)
    }
}

impl StatusLine {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { message: None, ttl }
    }

    /// Replace the current message.
    pub fn show(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("status: {message}");
        self.message = Some((message, Instant::now()));
    }

    /// The message, while it has not expired.
    pub fn current(&self) -> Option<&str> {
        self.message
            .as_ref()
            .filter(|(_, shown)| shown.elapsed() < self.ttl)
            .map(|(m, _)| m.as_str())
    }

    pub fn dismiss(&mut self) {
        self.message = None;
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct Session {
    pub log: DebugLog,
    pub status: StatusLine,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `message` and record it with `context` as an error entry.
    pub fn report_error(&mut self, message: impl Into<String>, context: Value) {
        let message = message.into();
        let mut payload = json!({ "error": message });
        if let (Some(obj), Value::Object(extra)) = (payload.as_object_mut(), context) {
            obj.extend(extra);
        }
        self.log.error(payload);
        self.status.show(message);
    }

    /// Record every key change waiting on `events` as an info entry.
    ///
    /// Returns the number of events recorded.
    pub fn drain_key_events(&mut self, events: &mut broadcast::Receiver<KeyEvent>) -> usize {
        let mut recorded = 0;
        loop {
            match events.try_recv() {
                Ok(event) => {
                    log::info!("session: {}", event.message());
                    self.log.info(json!({ "info": event.message() }));
                    recorded += 1;
                }
                Err(TryRecvError::Lagged(missed)) => {
                    log::warn!("session: {missed} key events were dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return recorded,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
