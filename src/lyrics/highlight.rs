//! Word-level highlighter driven by a playback clock.
//!
//! [`LyricHighlighter`] owns the rendered state of every word (active or
//! not). The front end calls [`update`](LyricHighlighter::update) on each
//! time-update signal of the media element and applies the returned
//! [`HighlightChange`]; there is no independent clock.
//!
//! A word is active iff `start <= t <= end`. The rule is evaluated per word,
//! so words with touching or overlapping intervals can be active together:
//! at `t = 1.0`, both `[0, 1]` and `[1, 2]` are lit.

use std::time::{Duration, Instant};

use crate::lyrics::normalize::{Alignment, Word};

// ---------------------------------------------------------------------------
// MediaClock
// ---------------------------------------------------------------------------

/// Playback position of a media element, in seconds.
pub trait MediaClock {
    fn current_time(&self) -> f64;
    fn seek(&mut self, secs: f64);
}

// ---------------------------------------------------------------------------
// HighlightChange
// ---------------------------------------------------------------------------

/// Word indices whose state flipped during one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightChange {
    /// Words that just became active. The front end scrolls these into view.
    pub activated: Vec<usize>,
    pub deactivated: Vec<usize>,
}

impl HighlightChange {
    pub fn is_empty(&self) -> bool {
        self.activated.is_empty() && self.deactivated.is_empty()
    }
}

// ---------------------------------------------------------------------------
// LyricHighlighter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct RenderedWord {
    word: Word,
    line: usize,
    active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LyricHighlighter {
    words: Vec<RenderedWord>,
    line_count: usize,
}

impl LyricHighlighter {
    pub fn new(alignment: &Alignment) -> Self {
        let words = alignment
            .lines
            .iter()
            .enumerate()
            .flat_map(|(line, l)| {
                l.words.iter().map(move |w| RenderedWord {
                    word: w.clone(),
                    line,
                    active: false,
                })
            })
            .collect();

        Self {
            words,
            line_count: alignment.lines.len(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Re-evaluate every word against `current_time`.
    pub fn update(&mut self, current_time: f64) -> HighlightChange {
        let mut change = HighlightChange::default();

        for (i, rendered) in self.words.iter_mut().enumerate() {
            let active = rendered.word.contains(current_time);
            if active != rendered.active {
                rendered.active = active;
                if active {
                    change.activated.push(i);
                } else {
                    change.deactivated.push(i);
                }
            }
        }

        change
    }

    /// Convenience for the time-update handler.
    pub fn on_time_update(&mut self, clock: &dyn MediaClock) -> HighlightChange {
        self.update(clock.current_time())
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.words.get(index).is_some_and(|w| w.active)
    }

    pub fn active_indices(&self) -> Vec<usize> {
        self.words
            .iter()
            .enumerate()
            .filter(|(_, w)| w.active)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn word(&self, index: usize) -> Option<&Word> {
        self.words.get(index).map(|w| &w.word)
    }

    /// Line the word at `index` belongs to.
    pub fn line_of(&self, index: usize) -> Option<usize> {
        self.words.get(index).map(|w| w.line)
    }

    /// Click-to-seek: move `clock` to the start of the word at `index`.
    ///
    /// Returns the new position, or `None` for an unknown index.
    pub fn seek_to_word(&self, index: usize, clock: &mut dyn MediaClock) -> Option<f64> {
        let start = self.words.get(index)?.word.start;
        clock.seek(start);
        Some(start)
    }

    /// Draw one line, wrapping active words in `[` `]`.
    pub fn render_line(&self, line: usize) -> String {
        self.words
            .iter()
            .filter(|w| w.line == line)
            .map(|w| {
                if w.active {
                    format!("[{}]", w.word.text)
                } else {
                    w.word.text.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// SimulatedPlayer
// ---------------------------------------------------------------------------

/// Wall-clock [`MediaClock`] for the terminal player.
///
/// Time advances from the moment of construction (or the last seek) until
/// `duration`, where it stops.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    origin: Instant,
    offset: f64,
    duration: f64,
}

impl SimulatedPlayer {
    pub fn new(duration: f64) -> Self {
        Self {
            origin: Instant::now(),
            offset: 0.0,
            duration: duration.max(0.0),
        }
    }

    /// Sized to the end of the last word of `alignment`.
    pub fn for_alignment(alignment: &Alignment) -> Self {
        let end = alignment.words().map(|w| w.end).fold(0.0, f64::max);
        Self::new(end)
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_finished(&self) -> bool {
        self.current_time() >= self.duration
    }

    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl MediaClock for SimulatedPlayer {
    fn current_time(&self) -> f64 {
        (self.offset + self.elapsed().as_secs_f64()).min(self.duration)
    }

    fn seek(&mut self, secs: f64) {
        self.origin = Instant::now();
        self.offset = secs.clamp(0.0, self.duration);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::normalize::normalize;
    use serde_json::json;

    /// Test clock that only moves when told to.
    struct FixedClock(f64);

    impl MediaClock for FixedClock {
        fn current_time(&self) -> f64 {
            self.0
        }
        fn seek(&mut self, secs: f64) {
            self.0 = secs;
        }
    }

    fn two_adjacent_words() -> LyricHighlighter {
        LyricHighlighter::new(&normalize(&json!({
            "words": [
                { "text": "first", "start": 0, "end": 1 },
                { "text": "second", "start": 1, "end": 2 }
            ]
        })))
    }

    /// Closed intervals: at the shared boundary both words are active.
    #[test]
    fn shared_boundary_activates_both_words() {
        let mut h = two_adjacent_words();
        let change = h.update(1.0);
        assert_eq!(change.activated, vec![0, 1]);
        assert_eq!(h.active_indices(), vec![0, 1]);
    }

    #[test]
    fn interior_time_activates_one_word() {
        let mut h = two_adjacent_words();
        h.update(0.5);
        assert!(h.is_active(0));
        assert!(!h.is_active(1));
    }

    #[test]
    fn outside_every_interval_nothing_is_active() {
        let mut h = two_adjacent_words();
        assert!(h.update(2.5).is_empty());
        assert!(h.active_indices().is_empty());
    }

    #[test]
    fn update_reports_only_transitions() {
        let mut h = two_adjacent_words();

        assert_eq!(h.update(0.5).activated, vec![0]);
        // Same word still active: nothing to scroll to.
        assert!(h.update(0.7).is_empty());

        let change = h.update(1.5);
        assert_eq!(change.activated, vec![1]);
        assert_eq!(change.deactivated, vec![0]);
    }

    #[test]
    fn overlapping_intervals_are_not_prevented() {
        let mut h = LyricHighlighter::new(&normalize(&json!({
            "words": [
                { "text": "a", "start": 1, "end": 3 },
                { "text": "b", "start": 2, "end": 4 }
            ]
        })));
        h.update(2.5);
        assert_eq!(h.active_indices(), vec![0, 1]);
    }

    #[test]
    fn seek_to_word_moves_clock_to_word_start() {
        let h = two_adjacent_words();
        let mut clock = FixedClock(0.0);

        assert_eq!(h.seek_to_word(1, &mut clock), Some(1.0));
        assert_eq!(clock.current_time(), 1.0);
        assert_eq!(h.seek_to_word(9, &mut clock), None);
    }

    #[test]
    fn on_time_update_reads_the_clock() {
        let mut h = two_adjacent_words();
        let clock = FixedClock(1.75);
        assert_eq!(h.on_time_update(&clock).activated, vec![1]);
    }

    #[test]
    fn render_line_marks_active_words() {
        let mut h = LyricHighlighter::new(&normalize(&json!({
            "lines": [
                { "words": [{ "text": "hello", "start": 0.5, "end": 1 }, { "text": "world", "start": 1.2, "end": 2 }] },
                { "words": [{ "text": "again", "start": 3, "end": 4 }] }
            ]
        })));
        h.update(1.5);
        assert_eq!(h.render_line(0), "hello [world]");
        assert_eq!(h.render_line(1), "again");
        assert_eq!(h.line_of(2), Some(1));
        assert_eq!(h.line_count(), 2);
    }

    #[test]
    fn simulated_player_seek_and_clamp() {
        let mut player = SimulatedPlayer::new(10.0);
        player.seek(4.0);
        let t = player.current_time();
        assert!((4.0..5.0).contains(&t), "t = {t}");

        player.seek(50.0);
        assert_eq!(player.current_time(), 10.0);
        assert!(player.is_finished());

        player.seek(-3.0);
        assert!(player.current_time() < 1.0);
    }

    #[test]
    fn simulated_player_duration_follows_last_word() {
        let alignment = normalize(&json!({
            "words": [{ "text": "a", "start": 1, "end": 2 }, { "text": "b", "start": 2, "end": 7.5 }]
        }));
        assert_eq!(SimulatedPlayer::for_alignment(&alignment).duration(), 7.5);
    }
}
