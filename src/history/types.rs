use crate::translation::TranslationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of entries kept per session.
pub const HISTORY_CAPACITY: usize = 50;

pub const ENGLISH_FALLBACK: &str = "Sorry, I couldn't come up with an English response this time.";
pub const DOMINICAN_FALLBACK: &str = "Diablo, no me salió na' esta ve'. Intenta otra vez, manin.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    pub question: String,
    pub english_response: String,
    pub dominican_response: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationEntry {
    pub fn new(
        question: impl Into<String>,
        english_response: impl Into<String>,
        dominican_response: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            english_response: english_response.into(),
            dominican_response: dominican_response.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn from_result(question: impl Into<String>, result: &TranslationResult) -> Self {
        Self::new(
            question,
            result.english_response.clone(),
            result.dominican_response.clone(),
        )
    }

    fn fill_blank_responses(&mut self) {
        if self.english_response.trim().is_empty() {
            self.english_response = ENGLISH_FALLBACK.to_string();
        }
        if self.dominican_response.trim().is_empty() {
            self.dominican_response = DOMINICAN_FALLBACK.to_string();
        }
    }
}

/// Insertion-ordered session history holding at most [`HISTORY_CAPACITY`] entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ConversationEntry>", into = "Vec<ConversationEntry>")]
pub struct ConversationHistory {
    entries: VecDeque<ConversationEntry>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, replacing blank responses with fallback text and
    /// evicting the oldest entries once over capacity.
    pub fn push(&mut self, mut entry: ConversationEntry) {
        entry.fill_blank_responses();
        self.entries.push_back(entry);
        self.evict();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&ConversationEntry> {
        self.entries.front()
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.back()
    }

    pub fn into_entries(self) -> Vec<ConversationEntry> {
        self.entries.into()
    }

    fn evict(&mut self) {
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }
}

impl From<Vec<ConversationEntry>> for ConversationHistory {
    fn from(entries: Vec<ConversationEntry>) -> Self {
        let mut history = Self {
            entries: entries.into(),
        };
        history.evict();
        history
    }
}

impl From<ConversationHistory> for Vec<ConversationEntry> {
    fn from(history: ConversationHistory) -> Self {
        history.into_entries()
    }
}
