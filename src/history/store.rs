use super::{ConversationEntry, ConversationHistory, SessionStorage};
use crate::{Result, translation::TranslationResult};
use tracing::debug;

/// Bounded per-session conversation log.
///
/// Histories are passed by value: `load` reads a session's history, `append`
/// returns the updated copy, and `save` writes it back.
pub struct ConversationHistoryStore {
    storage: SessionStorage,
}

impl ConversationHistoryStore {
    pub fn new(storage: SessionStorage) -> Self {
        Self { storage }
    }

    pub async fn load(&self, session_id: &str) -> Result<ConversationHistory> {
        self.storage.load(session_id).await
    }

    /// Never fails: blank responses become fallback text, and the oldest
    /// entries are dropped past capacity.
    pub fn append(
        &self,
        mut history: ConversationHistory,
        entry: ConversationEntry,
    ) -> ConversationHistory {
        history.push(entry);
        history
    }

    pub async fn save(&self, session_id: &str, history: &ConversationHistory) -> Result<()> {
        self.storage.save(session_id, history).await
    }

    /// Load, append and save in one step. Returns the entry as stored.
    pub async fn record(
        &self,
        session_id: &str,
        question: &str,
        result: &TranslationResult,
    ) -> Result<ConversationEntry> {
        let history = self.load(session_id).await?;
        let history = self.append(history, ConversationEntry::from_result(question, result));
        self.save(session_id, &history).await?;

        debug!(
            "Session {} history now holds {} entries",
            session_id,
            history.len()
        );

        history
            .last()
            .cloned()
            .ok_or_else(|| crate::Error::internal("history empty after append"))
    }
}
