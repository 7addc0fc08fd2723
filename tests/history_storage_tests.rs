use dominicus::{
    history::{
        ConversationEntry, ConversationHistory, ConversationHistoryStore, DOMINICAN_FALLBACK,
        ENGLISH_FALLBACK, HISTORY_CAPACITY, SessionStorage,
    },
    translation::TranslationResult,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn entry(i: usize) -> ConversationEntry {
    ConversationEntry::new(format!("Question {i}"), format!("Answer {i}"), format!("Respuesta {i}"))
}

#[tokio::test]
async fn test_in_memory_database_storage() {
    let storage = SessionStorage::new(":memory:").await.unwrap();

    let mut history = ConversationHistory::new();
    history.push(ConversationEntry::new("Hello", "Hi there!", "Klk!"));
    history.push(ConversationEntry::new("How are you?", "Fine", "To jevi"));
    storage.save("test-session", &history).await.unwrap();

    let loaded = storage.load("test-session").await.unwrap();
    assert_eq!(loaded.len(), 2);
    let entries = loaded.into_entries();
    assert_eq!(entries[0].question, "Hello");
    assert_eq!(entries[1].dominican_response, "To jevi");
}

#[tokio::test]
async fn test_file_database_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("history.db");
    let db_path_str = db_path.to_string_lossy().to_string();

    let mut history = ConversationHistory::new();
    for i in 0..3 {
        history.push(entry(i));
    }

    {
        let storage = SessionStorage::new(&db_path_str).await.unwrap();
        assert!(storage.is_persistent());
        storage.save("file-session", &history).await.unwrap();
    }

    let reopened = SessionStorage::new(&db_path_str).await.unwrap();
    let loaded = reopened.load("file-session").await.unwrap();
    assert_eq!(loaded, history);
}

#[tokio::test]
async fn test_fallback_storage_when_db_fails() {
    let storage = SessionStorage::new("/invalid/path/to/database.db")
        .await
        .unwrap();
    assert!(!storage.is_persistent());

    let store = ConversationHistoryStore::new(storage);
    store
        .record("fallback-test", "Test question", &TranslationResult::new("en", "dr"))
        .await
        .unwrap();

    let history = store.load("fallback-test").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history.last().unwrap().question, "Test question");
}

#[tokio::test]
async fn test_eviction_keeps_most_recent_entries_in_order() {
    let store = ConversationHistoryStore::new(SessionStorage::in_memory());

    let mut history = store.load("s").await.unwrap();
    for i in 1..=HISTORY_CAPACITY + 1 {
        history = store.append(history, entry(i));
    }
    store.save("s", &history).await.unwrap();

    let loaded = store.load("s").await.unwrap();
    assert_eq!(loaded.len(), HISTORY_CAPACITY);
    let questions: Vec<_> = loaded.into_entries().into_iter().map(|e| e.question).collect();
    let expected: Vec<_> = (2..=HISTORY_CAPACITY + 1)
        .map(|i| format!("Question {i}"))
        .collect();
    assert_eq!(questions, expected);
}

#[tokio::test]
async fn test_append_substitutes_fallbacks() {
    let store = ConversationHistoryStore::new(SessionStorage::in_memory());

    let history = store.append(
        ConversationHistory::new(),
        ConversationEntry::new("Tell me a joke", "  ", ""),
    );

    let last = history.last().unwrap();
    assert_eq!(last.english_response, ENGLISH_FALLBACK);
    assert_eq!(last.dominican_response, DOMINICAN_FALLBACK);
    assert!(!last.english_response.is_empty());
}

#[tokio::test]
async fn test_stored_format_is_camel_case_list() {
    let mut history = ConversationHistory::new();
    history.push(ConversationEntry::new("Q", "E", "D"));

    let value = serde_json::to_value(&history).unwrap();
    let first = &value.as_array().unwrap()[0];
    assert_eq!(first["question"], json!("Q"));
    assert_eq!(first["englishResponse"], json!("E"));
    assert_eq!(first["dominicanResponse"], json!("D"));
    assert!(first["timestamp"].is_string());
}

#[tokio::test]
async fn test_legacy_entries_without_timestamp_load() {
    let raw = json!([
        { "question": "Q", "englishResponse": "E", "dominicanResponse": "D" },
        { "question": "Q2", "englishResponse": "E2", "dominicanResponse": "D2", "timestamp": null }
    ]);

    let history: ConversationHistory = serde_json::from_value(raw).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.into_entries().iter().all(|e| e.timestamp.is_none()));
}

#[tokio::test]
async fn test_concurrent_sessions_are_isolated() {
    let store = Arc::new(ConversationHistoryStore::new(SessionStorage::in_memory()));

    let mut handles = vec![];
    for s in 0..5 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let session = format!("session-{s}");
            for i in 0..=s {
                store
                    .record(&session, &format!("q{i}"), &TranslationResult::new("e", "d"))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for s in 0..5 {
        let history = store.load(&format!("session-{s}")).await.unwrap();
        assert_eq!(history.len(), s + 1);
    }
}
