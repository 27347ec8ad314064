//! Poll state machine.
//!
//! [`PollState`] is what a front end shows next to a task while the poller
//! works on it.
//!
//! ```text
//! Polling ──target completed──▶ Completed
//!         ──target failed─────▶ Failed
//!         ──budget spent──────▶ TimedOut
//!         ──fetch error / no target──▶ Errored
//!         ──token cancelled───▶ Cancelled
//! ```
//!
//! Every state except `Polling` is terminal.

/// States of one polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting on the provider; `attempt` fetches have been made so far.
    Polling { attempt: u32 },
    Completed,
    Failed,
    TimedOut,
    Errored,
    Cancelled,
}

impl PollState {
    /// `true` once the run can make no further progress.
    ///
    /// ```
    /// use lyric_sync::pipeline::PollState;
    ///
    /// assert!(!PollState::Polling { attempt: 3 }.is_terminal());
    /// assert!(PollState::Completed.is_terminal());
    /// assert!(PollState::Failed.is_terminal());
    /// assert!(PollState::TimedOut.is_terminal());
    /// assert!(PollState::Errored.is_terminal());
    /// assert!(PollState::Cancelled.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Polling { .. })
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            PollState::Polling { .. } => "Processing",
            PollState::Completed => "Completed",
            PollState::Failed => "Failed",
            PollState::TimedOut => "Timed out",
            PollState::Errored => "Error",
            PollState::Cancelled => "Cancelled",
        }
    }
}

impl Default for PollState {
    fn default() -> Self {
        Self::Polling { attempt: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_polling_before_first_fetch() {
        assert_eq!(PollState::default(), PollState::Polling { attempt: 0 });
    }

    #[test]
    fn labels_are_distinct() {
        let states = [
            PollState::Polling { attempt: 1 },
            PollState::Completed,
            PollState::Failed,
            PollState::TimedOut,
            PollState::Errored,
            PollState::Cancelled,
        ];
        let mut labels: Vec<_> = states.iter().map(|s| s.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), states.len());
    }
}
