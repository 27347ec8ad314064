//! Alignment normalization and playback highlighting.
//!
//! * [`normalize`] / [`parse_alignment`] turn a fetched artifact into an
//!   [`Alignment`] of timed words.
//! * [`LyricHighlighter`] tracks which words are active for a playback
//!   position read from a [`MediaClock`].
//!
//! ```rust
//! use lyric_sync::lyrics::{normalize, LyricHighlighter};
//! use serde_json::json;
//!
//! let alignment = normalize(&json!({
//!     "words": [{ "word": "hello", "startTime": 0.2, "endTime": 0.8 }]
//! }));
//! let mut highlighter = LyricHighlighter::new(&alignment);
//!
//! let change = highlighter.update(0.5);
//! assert_eq!(change.activated, vec![0]);
//! ```

pub mod highlight;
pub mod normalize;

pub use highlight::{HighlightChange, LyricHighlighter, MediaClock, SimulatedPlayer};
pub use normalize::{
    normalize, parse_alignment, top_level_keys, Alignment, AlignmentError, AlignmentLine, Word,
};
