//! Splits a dual-segment completion into its English and Dominican parts.
//!
//! Markers are matched case-sensitively and only at the start of a line. When a
//! marker is missing, its segment falls back to the whole raw completion, so a
//! malformed reply shows up in both fields instead of failing the request.

use super::prompt::{DOMINICAN_MARKER, ENGLISH_MARKER};
use super::types::TranslationResult;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static ENGLISH_RE: LazyLock<Regex> = LazyLock::new(|| marker_regex(ENGLISH_MARKER));
static DOMINICAN_RE: LazyLock<Regex> = LazyLock::new(|| marker_regex(DOMINICAN_MARKER));

fn marker_regex(marker: &str) -> Regex {
    Regex::new(&format!("(?m)^{}", regex::escape(marker))).expect("marker pattern is valid")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(&self, completion: &str) -> TranslationResult {
        parse(completion)
    }
}

pub fn parse(completion: &str) -> TranslationResult {
    let english_marker = ENGLISH_RE.find(completion);
    let dominican_marker = DOMINICAN_RE.find(completion);

    let english = match english_marker {
        Some(m) => {
            let end = DOMINICAN_RE
                .find_at(completion, m.end())
                .map_or(completion.len(), |d| d.start());
            completion[m.end()..end].trim().to_string()
        }
        None => completion.to_string(),
    };

    let dominican = match dominican_marker {
        Some(m) => completion[m.end()..].trim().to_string(),
        None => completion.to_string(),
    };

    if english_marker.is_none() || dominican_marker.is_none() {
        warn!(
            "Completion missing segment markers (english: {}, dominican: {}), using raw text",
            english_marker.is_some(),
            dominican_marker.is_some()
        );
    }

    TranslationResult::new(english, dominican)
}
