// src/store/sqlite_store.rs
// SQLite-backed document store; every call runs on the blocking pool.

use super::{validate_field, Document, DocumentStore, StoreError, StoreResult};
use crate::db::schema_init::SchemaInitializer;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::InvalidPath(format!("{}: {}", parent.display(), e)))?;
        }
        let conn = SchemaInitializer::open(path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        SchemaInitializer::init(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<F, R>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&Connection) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn json_path(field: &str) -> StoreResult<String> {
    validate_field(field)?;
    Ok(format!("$.{}", field))
}

type Row = (i64, String, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn rows_to_documents(rows: Vec<Row>) -> StoreResult<Vec<Document>> {
    rows.into_iter()
        .map(|(seq, id, data)| {
            Ok(Document {
                id,
                seq,
                data: serde_json::from_str(&data)?,
            })
        })
        .collect()
}

fn fetch_one(conn: &Connection, collection: &str, id: &str) -> StoreResult<Option<Document>> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT seq, data FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    match row {
        Some((seq, data)) => Ok(Some(Document {
            id: id.to_string(),
            seq,
            data: serde_json::from_str(&data)?,
        })),
        None => Ok(None),
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn ping(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    async fn insert(&self, collection: &str, data: Value) -> StoreResult<Document> {
        if !data.is_object() {
            return Err(StoreError::NotAnObject);
        }
        let collection = collection.to_string();
        self.with_conn(move |conn| {
            let id = Uuid::new_v4().simple().to_string();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO documents (collection, id, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![collection, id, serde_json::to_string(&data)?, now],
            )?;
            let seq = conn.last_insert_rowid();
            debug!(collection = %collection, id = %id, seq, "document inserted");
            Ok(Document { id, seq, data })
        })
        .await
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.with_conn(move |conn| fetch_one(conn, &collection, &id))
            .await
    }

    async fn prefix_query(
        &self,
        collection: &str,
        field: &str,
        prefix: &str,
    ) -> StoreResult<Vec<Document>> {
        let path = json_path(field)?;
        let collection = collection.to_string();
        let prefix = prefix.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, id, data FROM documents
                 WHERE collection = ?1
                   AND json_type(data, ?2) = 'text'
                   AND substr(json_extract(data, ?2), 1, length(?3)) = ?3
                 ORDER BY json_extract(data, ?2), seq",
            )?;
            let rows = stmt
                .query_map(params![collection, path, prefix], read_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows_to_documents(rows)
        })
        .await
    }

    async fn list(
        &self,
        collection: &str,
        limit: usize,
        start_after: Option<i64>,
    ) -> StoreResult<Vec<Document>> {
        let collection = collection.to_string();
        let limit = limit as i64;
        self.with_conn(move |conn| {
            let rows = match start_after {
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT seq, id, data FROM documents
                         WHERE collection = ?1
                         ORDER BY seq DESC
                         LIMIT ?2",
                    )?;
                    let rows = stmt
                        .query_map(params![collection, limit], read_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
                Some(cursor) => {
                    let mut stmt = conn.prepare(
                        "SELECT seq, id, data FROM documents
                         WHERE collection = ?1
                           AND seq < ?3
                         ORDER BY seq DESC
                         LIMIT ?2",
                    )?;
                    let rows = stmt
                        .query_map(params![collection, limit, cursor], read_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
            };
            rows_to_documents(rows)
        })
        .await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<Option<Document>> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.with_conn(move |conn| {
            let Some(mut doc) = fetch_one(conn, &collection, &id)? else {
                return Ok(None);
            };
            let fields = doc.data.as_object_mut().ok_or(StoreError::NotAnObject)?;
            for (key, value) in patch {
                fields.insert(key, value);
            }
            conn.execute(
                "UPDATE documents SET data = ?3, updated_at = ?4
                 WHERE collection = ?1 AND id = ?2",
                params![
                    collection,
                    id,
                    serde_json::to_string(&doc.data)?,
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(Some(doc))
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )?;
            Ok(removed > 0)
        })
        .await
    }
}
