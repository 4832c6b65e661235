//! SQLite-backed conversation storage with zstd-compressed documents

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use super::traits::{ConversationStore, DocumentId, StoredConversation};
use crate::models::Conversation;

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: conversation documents
        M::up(
            r#"
            -- One row per extracted conversation document. The full record
            -- lives in the compressed blob; the columns beside it are
            -- denormalized for the submission predicate and diagnostics.
            CREATE TABLE conversations (
                id INTEGER PRIMARY KEY,
                conversation_id INTEGER NOT NULL,
                number INTEGER NOT NULL,
                source_type TEXT NOT NULL,
                gorgias_id INTEGER,
                document BLOB NOT NULL,  -- zstd compressed JSON
                extracted_at TEXT NOT NULL,
                submitted_at TEXT
            );

            CREATE INDEX idx_conversations_source_id
                ON conversations(conversation_id);

            -- Covers the submission scan
            CREATE INDEX idx_conversations_unsubmitted
                ON conversations(id)
                WHERE source_type = 'email'
                  AND (gorgias_id IS NULL OR gorgias_id <= 0);
            "#,
        ),
    ])
}

/// SQLite-based conversation store
///
/// Documents are serialized to JSON and zstd-compressed; the submission
/// predicate runs against denormalized columns so listing does not
/// decompress ineligible rows.
pub struct SqliteConversationStore {
    conn: Mutex<Connection>,
}

impl SqliteConversationStore {
    /// Open (or create) the store at `db_path`
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        // WAL keeps readers usable during writes; NORMAL sync is safe
        // in WAL mode.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn decode_document(blob: &[u8], gorgias_id: Option<i64>) -> Result<Conversation> {
        let bytes =
            zstd::decode_all(blob).context("Failed to decompress conversation document")?;
        let mut conversation: Conversation =
            serde_json::from_slice(&bytes).context("Failed to parse conversation document")?;
        // The column is authoritative for the destination id
        conversation.gorgias_id = gorgias_id;
        Ok(conversation)
    }
}

impl ConversationStore for SqliteConversationStore {
    fn insert_conversation(&self, conversation: &Conversation) -> Result<DocumentId> {
        let document =
            serde_json::to_vec(conversation).context("Failed to encode conversation document")?;
        let compressed = zstd::encode_all(document.as_slice(), 3)
            .context("Failed to compress conversation document")?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO conversations
                 (conversation_id, number, source_type, gorgias_id, document, extracted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                conversation.id.as_i64(),
                conversation.number,
                conversation.source.kind,
                conversation.gorgias_id,
                compressed,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(DocumentId::new(conn.last_insert_rowid()))
    }

    fn list_unsubmitted(&self) -> Result<Vec<StoredConversation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, gorgias_id, document FROM conversations
             WHERE source_type = 'email' AND (gorgias_id IS NULL OR gorgias_id <= 0)
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut documents = Vec::with_capacity(rows.len());
        for (id, gorgias_id, blob) in rows {
            documents.push(StoredConversation {
                document_id: DocumentId::new(id),
                conversation: Self::decode_document(&blob, gorgias_id)?,
            });
        }
        Ok(documents)
    }

    fn set_destination_id(&self, id: DocumentId, destination_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE conversations SET gorgias_id = ?1, submitted_at = ?2 WHERE id = ?3",
            params![destination_id, Utc::now().to_rfc3339(), id.as_i64()],
        )?;
        if updated == 0 {
            anyhow::bail!("No stored conversation with document id {}", id.as_i64());
        }
        Ok(())
    }

    fn get_conversation(&self, id: DocumentId) -> Result<Option<StoredConversation>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT gorgias_id, document FROM conversations WHERE id = ?1",
                [id.as_i64()],
                |row| {
                    Ok((
                        row.get::<_, Option<i64>>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((gorgias_id, blob)) => Ok(Some(StoredConversation {
                document_id: id,
                conversation: Self::decode_document(&blob, gorgias_id)?,
            })),
            None => Ok(None),
        }
    }

    fn count_conversations(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM conversations", [])?;
        Ok(())
    }
}
