//! SQLite-backed hash store.
//!
//! Every process that opens the same database file sees the same buckets, which
//! is what lets cross-process crawl workers share cookie state without a
//! dedicated cache server.
//!
//! ## Schema
//! - `kv_hash(key, field, value)`: one row per hash field.
//! - `kv_expiry(key, expires_at)`: absolute deadline in Unix milliseconds.
//!
//! Expired keys are purged lazily whenever they are touched. Calls run on the
//! blocking thread pool so they never stall the async runtime.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use r2d2_sqlite::SqliteConnectionManager;

use crate::errors::{Result, SessionError};
use crate::storage::area::HashStore;

/// SQLite-based hash store
#[derive(Clone)]
pub struct SqliteHashStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteHashStore {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref())
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )
            .with_init(|c| {
                c.busy_timeout(Duration::from_millis(500))?;
                c.pragma_update(None, "journal_mode", "WAL")?;
                c.execute_batch(
                    "CREATE TABLE IF NOT EXISTS kv_hash (
                        key TEXT NOT NULL,
                        field TEXT NOT NULL,
                        value TEXT NOT NULL,
                        PRIMARY KEY(key, field)
                    );
                    CREATE TABLE IF NOT EXISTS kv_expiry (
                        key TEXT PRIMARY KEY,
                        expires_at INTEGER NOT NULL
                    );",
                )?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(16)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        log::info!("sqlite hash store opened at {}", path.as_ref().display());
        Ok(Self { pool })
    }

    /// Runs `op` with a pooled connection on the blocking thread pool.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PooledConnection<SqliteConnectionManager>) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            op(&mut conn)
        })
        .await?
    }
}

fn now_millis() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| SessionError::internal(format!("system clock before unix epoch: {e}")))?;
    Ok(elapsed.as_millis() as i64)
}

/// Drops `key` if its deadline has passed.
fn purge_expired(conn: &Connection, key: &str, now: i64) -> Result<()> {
    let expired = conn
        .query_row(
            "SELECT expires_at <= ?2 FROM kv_expiry WHERE key = ?1",
            params![key, now],
            |row| row.get::<_, bool>(0),
        )
        .optional()?
        .unwrap_or(false);

    if expired {
        conn.execute("DELETE FROM kv_hash WHERE key = ?1", params![key])?;
        conn.execute("DELETE FROM kv_expiry WHERE key = ?1", params![key])?;
    }
    Ok(())
}

#[async_trait]
impl HashStore for SqliteHashStore {
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let (key, field, value) = (key.to_string(), field.to_string(), value.to_string());
        self.run(move |conn| {
            let tx = conn.transaction()?;
            purge_expired(&tx, &key, now_millis()?)?;
            tx.execute(
                "INSERT INTO kv_hash(key, field, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
                params![key, field, value],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn hvals(&self, key: &str) -> Result<Vec<String>> {
        let key = key.to_string();
        self.run(move |conn| {
            purge_expired(conn, &key, now_millis()?)?;
            let mut stmt = conn.prepare("SELECT value FROM kv_hash WHERE key = ?1 ORDER BY field")?;
            let rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
            let mut values = Vec::new();
            for row in rows {
                values.push(row?);
            }
            Ok(values)
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let key = key.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let now = now_millis()?;
            purge_expired(&tx, &key, now)?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM kv_hash WHERE key = ?1)",
                params![key],
                |row| row.get(0),
            )?;
            if exists {
                tx.execute(
                    "INSERT INTO kv_expiry(key, expires_at) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET expires_at = excluded.expires_at",
                    params![key, now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))],
                )?;
            }
            tx.commit()?;
            Ok(exists)
        })
        .await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let key = key.to_string();
        self.run(move |conn| {
            let now = now_millis()?;
            purge_expired(conn, &key, now)?;
            let expires_at = conn
                .query_row(
                    "SELECT expires_at FROM kv_expiry WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            Ok(expires_at.map(|at| Duration::from_millis((at - now).max(0) as u64)))
        })
        .await
    }

    async fn del(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM kv_hash WHERE key = ?1", params![key])?;
            tx.execute("DELETE FROM kv_expiry WHERE key = ?1", params![key])?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
