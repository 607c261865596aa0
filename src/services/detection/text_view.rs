// Text view
// Byte/char offset bookkeeping, context windows and record construction shared by the detectors

use crate::models::{Category, DetectionMethod, DetectionRecord, DEFAULT_CONTEXT_WINDOW};
use regex::{Regex, RegexSet};

/// Compile a built-in pattern. Only called from `OnceLock` initializers on constant tables.
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("detector regex")
}

/// Phrases that raise or lower confidence when found near a candidate
pub(crate) struct ContextTable {
    set: RegexSet,
}

impl ContextTable {
    pub(crate) fn new(patterns: &[&str]) -> Self {
        Self {
            set: RegexSet::new(patterns).expect("context regex set"),
        }
    }

    /// Substring semantics: any phrase anywhere in the window counts
    pub(crate) fn matches(&self, window: &str) -> bool {
        self.set.is_match(window)
    }
}

pub(crate) fn round_confidence(value: f64) -> f64 {
    (value.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}

pub(crate) fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Analyzed text with a char index, so regex byte offsets can be reported as char offsets
pub struct TextView<'a> {
    text: &'a str,
    char_starts: Vec<usize>,
}

impl<'a> TextView<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            char_starts: text.char_indices().map(|(i, _)| i).collect(),
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn char_len(&self) -> usize {
        self.char_starts.len()
    }

    pub fn char_offset(&self, byte: usize) -> usize {
        match self.char_starts.binary_search(&byte) {
            Ok(i) | Err(i) => i,
        }
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.char_starts
            .get(char_index)
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Lowercased window of `chars` characters ending at `byte_start`
    pub fn before(&self, byte_start: usize, chars: usize) -> String {
        let from = self.byte_offset(self.char_offset(byte_start).saturating_sub(chars));
        self.text[from..byte_start].to_lowercase()
    }

    /// Lowercased window of `chars` characters starting at `byte_end`
    pub fn after(&self, byte_end: usize, chars: usize) -> String {
        let to = self.byte_offset(self.char_offset(byte_end) + chars);
        self.text[byte_end..to].to_lowercase()
    }

    /// Before and after windows joined by a space
    pub fn around(&self, byte_start: usize, byte_end: usize, before: usize, after: usize) -> String {
        format!("{} {}", self.before(byte_start, before), self.after(byte_end, after))
    }

    /// Original-case snippet for a span given in char offsets
    pub fn snippet_chars(&self, start: usize, end: usize) -> String {
        let from = self.byte_offset(start.saturating_sub(DEFAULT_CONTEXT_WINDOW));
        let to = self.byte_offset(end.saturating_add(DEFAULT_CONTEXT_WINDOW));
        self.text[from..to].to_string()
    }

    /// Text between two char offsets; out-of-range offsets are clamped
    pub fn slice_chars(&self, start: usize, end: usize) -> &'a str {
        let from = self.byte_offset(start);
        let to = self.byte_offset(end).max(from);
        &self.text[from..to]
    }

    /// Build a record from a byte span of the analyzed text
    pub fn record(
        &self,
        category: Category,
        byte_start: usize,
        byte_end: usize,
        confidence: f64,
        validated: bool,
        method: DetectionMethod,
    ) -> DetectionRecord {
        let start_offset = self.char_offset(byte_start);
        let end_offset = self.char_offset(byte_end);
        DetectionRecord {
            category,
            raw_value: self.text[byte_start..byte_end].to_string(),
            start_offset,
            end_offset,
            confidence: round_confidence(confidence),
            validated,
            detection_method: method,
            context_snippet: self.snippet_chars(start_offset, end_offset),
        }
    }
}
