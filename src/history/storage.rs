use super::ConversationHistory;
use crate::{Error, Result};
use chrono::Utc;
use libsql::{Builder, Connection, Database};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

struct Db {
    _database: Database,
    conn: Connection,
}

/// Session-scoped persistence for conversation histories.
///
/// Each session's history is stored as one JSON document. Last writer wins.
pub struct SessionStorage {
    db: Option<Db>,
    // In-memory fallback storage; an entry here wins over the database row
    fallback: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStorage {
    pub async fn new(db_path: &str) -> Result<Self> {
        let mut storage = Self {
            db: None,
            fallback: Arc::new(Mutex::new(HashMap::new())),
        };

        match storage.init_database(db_path).await {
            Ok(()) => {
                info!("Database initialized successfully: {}", db_path);
            }
            Err(e) => {
                warn!(
                    "Database initialization failed, using in-memory fallback: {}",
                    e
                );
            }
        }

        Ok(storage)
    }

    /// Storage that never touches a database.
    pub fn in_memory() -> Self {
        Self {
            db: None,
            fallback: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.db.is_some()
    }

    async fn init_database(&mut self, db_path: &str) -> Result<()> {
        let database = Builder::new_local(db_path).build().await?;
        let conn = database.connect()?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_history (
                session_id TEXT PRIMARY KEY,
                entries TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            (),
        )
        .await?;

        self.db = Some(Db {
            _database: database,
            conn,
        });
        Ok(())
    }

    pub async fn load(&self, session_id: &str) -> Result<ConversationHistory> {
        // A fallback copy only exists when the last write missed the database,
        // so it is newer than any stored row.
        if let Some(json) = self.load_from_fallback(session_id)? {
            debug!("Loading session {} from in-memory fallback", session_id);
            return Ok(serde_json::from_str(&json)?);
        }

        if let Some(ref db) = self.db {
            match self.load_from_db(&db.conn, session_id).await {
                Ok(Some(json)) => return Ok(serde_json::from_str(&json)?),
                Ok(None) => {
                    debug!("No stored history for session: {}", session_id);
                }
                Err(e) => {
                    warn!("Failed to read from database: {}", e);
                }
            }
        }

        Ok(ConversationHistory::new())
    }

    async fn load_from_db(&self, conn: &Connection, session_id: &str) -> Result<Option<String>> {
        let mut rows = conn
            .query(
                "SELECT entries FROM conversation_history WHERE session_id = ?",
                [session_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    fn load_from_fallback(&self, session_id: &str) -> Result<Option<String>> {
        let fallback = self
            .fallback
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))?;
        Ok(fallback.get(session_id).cloned())
    }

    pub async fn save(&self, session_id: &str, history: &ConversationHistory) -> Result<()> {
        let json = serde_json::to_string(history)?;

        if let Some(ref db) = self.db {
            match self.save_to_db(&db.conn, session_id, &json).await {
                Ok(()) => {
                    debug!(
                        "Saved {} entries to database for session: {}",
                        history.len(),
                        session_id
                    );
                    return self.clear_fallback(session_id);
                }
                Err(e) => {
                    warn!("Failed to save to database, using fallback: {}", e);
                }
            }
        }

        self.save_to_fallback(session_id, json)
    }

    async fn save_to_db(&self, conn: &Connection, session_id: &str, json: &str) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO conversation_history (session_id, entries, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                entries = excluded.entries,
                updated_at = excluded.updated_at
            "#,
            (session_id, json, Utc::now().to_rfc3339()),
        )
        .await?;
        Ok(())
    }

    fn save_to_fallback(&self, session_id: &str, json: String) -> Result<()> {
        let mut fallback = self
            .fallback
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))?;
        fallback.insert(session_id.to_string(), json);
        Ok(())
    }

    fn clear_fallback(&self, session_id: &str) -> Result<()> {
        let mut fallback = self
            .fallback
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))?;
        fallback.remove(session_id);
        Ok(())
    }
}
