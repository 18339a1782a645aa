// src/db/schema_init.rs
use rusqlite::{Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use tracing::info;

pub const SCHEMA_VERSION: &str = "1";

pub struct SchemaInitializer;

impl SchemaInitializer {
    pub fn init(db_conn: &Connection) -> SqlResult<()> {
        info!("Initializing database schema v{}", SCHEMA_VERSION);
        let schema_sql = include_str!("schema.sql");
        db_conn.execute_batch(schema_sql)?;
        info!("Database schema initialized");
        Ok(())
    }

    pub fn open(path: &Path) -> SqlResult<Connection> {
        info!("Opening database at: {}", path.display());
        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        Ok(conn)
    }

    pub fn schema_version(db_conn: &Connection) -> SqlResult<Option<String>> {
        db_conn
            .query_row(
                "SELECT value FROM schema_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()
    }
}
