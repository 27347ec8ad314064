//! lyric-sync: word-level lyric alignment client.
//!
//! Submits media to a remote alignment service, polls the task until it
//! settles, normalizes the returned artifact into timed words and highlights
//! them against a playback clock.

pub mod api;
pub mod catalog;
pub mod config;
pub mod lyrics;
pub mod pipeline;
pub mod session;
