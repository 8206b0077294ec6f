use async_trait::async_trait;
use receiptforge_core::{KvStore, ReceiptError};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::info;

/// SQLite-backed key-value store: one `kv` table, values stored as blobs.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Open or create the store at the given path.
    pub fn open(path: &str) -> Result<Self, ReceiptError> {
        let conn = Connection::open(path)
            .map_err(|e| ReceiptError::StoreUnavailable(format!("failed to open {path}: {e}")))?;
        let store = Self::init(conn)?;
        info!(path = %path, "SQLite key-value store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, ReceiptError> {
        let conn = Connection::open_in_memory().map_err(ReceiptError::store)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, ReceiptError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            );",
        )
        .map_err(ReceiptError::store)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Count all keys in the store.
    pub async fn count(&self) -> Result<usize, ReceiptError> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .map_err(ReceiptError::store)
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ReceiptError> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get::<_, Vec<u8>>(0)
        })
        .optional()
        .map_err(ReceiptError::store)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ReceiptError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(ReceiptError::store)?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ReceiptError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT key FROM kv WHERE key GLOB ?1 ORDER BY key")
            .map_err(ReceiptError::store)?;
        let keys = stmt
            .query_map(params![pattern], |row| row.get::<_, String>(0))
            .map_err(ReceiptError::store)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(ReceiptError::store)?;
        Ok(keys)
    }
}
