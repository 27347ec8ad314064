//! Alignment artifact normalizer.
//!
//! Providers have shipped alignment JSON in several shapes over time. This
//! module folds all of them into one [`Alignment`]: lines of [`Word`]s with
//! second-based timestamps.
//!
//! Shape resolution, first match wins:
//!
//! ```text
//! { "lines":    [ { "words": [...] }, ... ] }   each entry is a line
//! { "words":    [ ... ] }                       one synthesized line
//! { "segments": [ { "words": [...] }, ... ] }   each segment is a line
//! [ ... ]                                       one line of words
//! anything else                                 empty
//! ```
//!
//! Field presence follows JavaScript truthiness: `0`, `""`, `null` and
//! `false` count as absent, so a word with `"start": 0, "startTime": 2.5`
//! starts at 2.5.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One timed word.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Word {
    pub text: String,
    /// Seconds from the start of the media.
    pub start: f64,
    /// Seconds from the start of the media.
    pub end: f64,
    /// Position of the word across the whole alignment.
    pub index: usize,
}

impl Word {
    /// Closed-interval membership: `start <= t <= end`.
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignmentLine {
    pub words: Vec<Word>,
}

impl AlignmentLine {
    /// Words joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Normalized alignment. Lines that contributed no words are not kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Alignment {
    pub lines: Vec<AlignmentLine>,
    /// Running total of words across all lines.
    pub word_count: usize,
    /// Number of line-like entries found in the input, empty ones included.
    pub source_lines: usize,
}

impl Alignment {
    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }

    /// All words in index order.
    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AlignmentError {
    /// None of the known shapes matched. `keys` lists the top-level fields
    /// of the input for diagnostics.
    #[error("Cannot parse alignment (top-level keys: {keys:?})")]
    Unrecognized { keys: Vec<String> },
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize `input`, returning an empty [`Alignment`] for unknown shapes.
pub fn normalize(input: &Value) -> Alignment {
    let source = source_lines(input);
    let source_count = source.len();

    let mut lines = Vec::new();
    let mut total = 0usize;

    for raw_words in source {
        if raw_words.is_empty() {
            continue;
        }
        let words = raw_words
            .iter()
            .map(|raw| {
                let word = parse_word(raw, total);
                total += 1;
                word
            })
            .collect();
        lines.push(AlignmentLine { words });
    }

    Alignment {
        lines,
        word_count: total,
        source_lines: source_count,
    }
}

/// Like [`normalize`], but an input with no recognizable lines is an error.
pub fn parse_alignment(input: &Value) -> Result<Alignment, AlignmentError> {
    let alignment = normalize(input);
    if alignment.source_lines == 0 {
        return Err(AlignmentError::Unrecognized {
            keys: top_level_keys(input),
        });
    }
    log::debug!(
        "lyrics: loaded {} words in {} lines",
        alignment.word_count,
        alignment.source_lines
    );
    Ok(alignment)
}

/// Top-level object keys, or an empty list for non-objects.
pub fn top_level_keys(input: &Value) -> Vec<String> {
    input
        .as_object()
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default()
}

/// The word arrays of every line-like entry in `input`.
fn source_lines(input: &Value) -> Vec<&[Value]> {
    if let Some(lines) = truthy_field(input, "lines") {
        return as_slice(lines).iter().map(words_of).collect();
    }
    if let Some(words) = truthy_field(input, "words") {
        return vec![as_slice(words)];
    }
    if let Some(segments) = truthy_field(input, "segments") {
        return as_slice(segments).iter().map(words_of).collect();
    }
    if let Value::Array(words) = input {
        return vec![words.as_slice()];
    }
    Vec::new()
}

fn words_of(line: &Value) -> &[Value] {
    line.get("words").map(as_slice).unwrap_or_default()
}

fn as_slice(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items.as_slice(),
        _ => &[],
    }
}

fn parse_word(raw: &Value, index: usize) -> Word {
    let text = ["text", "word"]
        .iter()
        .find_map(|k| truthy_field(raw, k).and_then(Value::as_str))
        .unwrap_or_default()
        .trim()
        .to_string();

    Word {
        text,
        start: first_number(raw, &["start", "startTime"]),
        end: first_number(raw, &["end", "endTime"]),
        index,
    }
}

/// First field among `keys` holding a non-zero number (or numeric string).
fn first_number(raw: &Value, keys: &[&str]) -> f64 {
    keys.iter()
        .filter_map(|k| truthy_field(raw, k))
        .find_map(as_number)
        .unwrap_or(0.0)
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n != 0.0 && !n.is_nan()).then_some(n)
}

fn truthy_field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| is_truthy(v))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn word(text: &str, start: f64, end: f64, index: usize) -> Word {
        Word {
            text: text.into(),
            start,
            end,
            index,
        }
    }

    #[test]
    fn lines_shape_is_used_directly() {
        let a = normalize(&json!({ "lines": [{ "words": [{ "text": "hi", "start": 0, "end": 1 }] }] }));
        assert_eq!(a.lines.len(), 1);
        assert_eq!(a.lines[0].words, vec![word("hi", 0.0, 1.0, 0)]);
        assert_eq!(a.word_count, 1);
    }

    #[test]
    fn words_shape_synthesizes_one_line_with_alternate_names() {
        let a = normalize(&json!({ "words": [{ "word": "x", "startTime": 2, "endTime": 3 }] }));
        assert_eq!(a.lines.len(), 1);
        assert_eq!(a.lines[0].words, vec![word("x", 2.0, 3.0, 0)]);
    }

    #[test]
    fn empty_object_yields_empty_result() {
        let a = normalize(&json!({}));
        assert!(a.lines.is_empty());
        assert!(a.is_empty());
        assert_eq!(
            parse_alignment(&json!({})),
            Err(AlignmentError::Unrecognized { keys: vec![] })
        );
    }

    #[test]
    fn unrecognized_shape_reports_keys() {
        let err = parse_alignment(&json!({ "transcript": "hello", "version": 2 })).unwrap_err();
        let AlignmentError::Unrecognized { mut keys } = err;
        keys.sort();
        assert_eq!(keys, vec!["transcript".to_string(), "version".to_string()]);
    }

    #[test]
    fn segments_shape_treats_each_segment_as_a_line() {
        let a = normalize(&json!({
            "segments": [
                { "words": [{ "text": "a", "start": 0.5, "end": 1 }] },
                { "words": [{ "text": "b", "start": 1, "end": 2 }, { "text": "c", "start": 2, "end": 3 }] }
            ]
        }));
        assert_eq!(a.lines.len(), 2);
        assert_eq!(a.lines[1].text(), "b c");
        assert_eq!(a.word_count, 3);
    }

    #[test]
    fn bare_array_is_one_line() {
        let a = normalize(&json!([{ "text": "la", "start": 1, "end": 2 }, { "text": "di", "start": 2, "end": 3 }]));
        assert_eq!(a.lines.len(), 1);
        assert_eq!(a.lines[0].text(), "la di");
    }

    #[test]
    fn lines_take_priority_over_words() {
        let a = normalize(&json!({
            "lines": [{ "words": [{ "text": "from-lines" }] }],
            "words": [{ "text": "from-words" }]
        }));
        assert_eq!(a.lines[0].words[0].text, "from-lines");
    }

    #[test]
    fn empty_lines_are_skipped_and_indices_run_across_lines() {
        let a = normalize(&json!({
            "lines": [
                { "words": [{ "text": "one" }] },
                { "words": [] },
                { "text": "no words field" },
                { "words": [{ "text": "two" }, { "text": "three" }] }
            ]
        }));
        assert_eq!(a.source_lines, 4);
        assert_eq!(a.lines.len(), 2);
        let indices: Vec<usize> = a.words().map(|w| w.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    /// A line list with no words is still a recognized shape.
    #[test]
    fn lines_without_words_parse_to_empty_alignment() {
        let a = parse_alignment(&json!({ "lines": [{ "words": [] }] })).unwrap();
        assert!(a.is_empty());
        assert_eq!(a.source_lines, 1);
    }

    #[test]
    fn missing_fields_default_and_text_is_trimmed() {
        let a = normalize(&json!({ "words": [{ "text": "  spaced  " }, {}] }));
        assert_eq!(a.lines[0].words[0], word("spaced", 0.0, 0.0, 0));
        assert_eq!(a.lines[0].words[1], word("", 0.0, 0.0, 1));
    }

    /// Zero or empty primary fields fall back to the alternate name.
    #[test]
    fn falsy_primary_fields_fall_back() {
        let a = normalize(&json!({
            "words": [{ "text": "", "word": "alt", "start": 0, "startTime": 2.5, "end": 3 }]
        }));
        assert_eq!(a.lines[0].words[0], word("alt", 2.5, 3.0, 0));
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let a = normalize(&json!({ "words": [{ "text": "s", "start": "1.25", "end": "2" }] }));
        assert_eq!(a.lines[0].words[0].start, 1.25);
        assert_eq!(a.lines[0].words[0].end, 2.0);
    }

    #[test]
    fn empty_lines_array_is_recognized_but_empty() {
        // `lines: []` is truthy, so `words` is never consulted.
        let a = normalize(&json!({ "lines": [], "words": [{ "text": "ignored" }] }));
        assert!(a.lines.is_empty());
        assert_eq!(a.source_lines, 0);
    }
}
