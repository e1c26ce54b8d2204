//! SQLite storage backend for federation-relay.

use super::{FederatedPost, Peer, PeerStorage, PostStorage, ReceiptOutcome, StorePostRequest};
use crate::error::StorageError;
use async_trait::async_trait;
use federation_types::PeerScheme;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// SQLite-based peer registry and post store.
///
/// Uses WAL mode for concurrent reads/writes.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database path.
    ///
    /// Creates the database file if it doesn't exist.
    pub async fn new(path: &Path, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Create an in-memory SQLite storage (for testing).
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(":memory:")
            .map_err(StorageError::Database)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        // A single connection that never expires: the database lives in it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Create tables and indexes if they don't exist.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS peers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hostname TEXT NOT NULL UNIQUE,
                scheme TEXT,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS federated_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                origin_post_id INTEGER NOT NULL,
                origin_username TEXT NOT NULL,
                origin_hostname TEXT NOT NULL,
                content TEXT NOT NULL,
                received_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        // Makes receipt idempotent per origin.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_federated_posts_origin \
             ON federated_posts(origin_post_id, origin_hostname)",
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_federated_posts_received \
             ON federated_posts(received_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(())
    }

    fn current_timestamp() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl PeerStorage for SqliteStorage {
    async fn insert_peer(
        &self,
        hostname: &str,
        scheme: Option<PeerScheme>,
    ) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO peers (hostname, scheme) VALUES (?1, ?2)")
            .bind(hostname)
            .bind(scheme.map(|s| s.as_str()))
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict {
                    hostname: hostname.to_string(),
                },
                other => StorageError::Database(other),
            })?;

        Ok(())
    }

    async fn list_peers(&self) -> Result<Vec<Peer>, StorageError> {
        let rows = sqlx::query_as::<_, PeerRow>("SELECT hostname, scheme FROM peers")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(rows.into_iter().map(Peer::from).collect())
    }

    async fn delete_peer(&self, hostname: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM peers WHERE hostname = ?1")
            .bind(hostname)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                hostname: hostname.to_string(),
            });
        }

        Ok(())
    }

    async fn peer_count(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM peers")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(count as u64)
    }
}

#[async_trait]
impl PostStorage for SqliteStorage {
    async fn insert_post(&self, req: StorePostRequest) -> Result<ReceiptOutcome, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO federated_posts
                (origin_post_id, origin_username, origin_hostname, content, received_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(origin_post_id, origin_hostname) DO NOTHING
            "#,
        )
        .bind(req.origin_post_id)
        .bind(&req.origin_username)
        .bind(&req.origin_hostname)
        .bind(&req.content)
        .bind(Self::current_timestamp())
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        if result.rows_affected() == 0 {
            Ok(ReceiptOutcome::Duplicate)
        } else {
            Ok(ReceiptOutcome::Stored)
        }
    }

    async fn delete_posts(
        &self,
        origin_post_id: i64,
        origin_hostname: &str,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query(
            "DELETE FROM federated_posts WHERE origin_post_id = ?1 AND origin_hostname = ?2",
        )
        .bind(origin_post_id)
        .bind(origin_hostname)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(result.rows_affected())
    }

    async fn list_posts(&self, limit: u32) -> Result<Vec<FederatedPost>, StorageError> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, origin_post_id, origin_username, origin_hostname, content, received_at
            FROM federated_posts
            ORDER BY received_at DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(rows.into_iter().map(FederatedPost::from).collect())
    }

    async fn count_posts(
        &self,
        origin_post_id: i64,
        origin_hostname: &str,
    ) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM federated_posts WHERE origin_post_id = ?1 AND origin_hostname = ?2",
        )
        .bind(origin_post_id)
        .bind(origin_hostname)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(count as u64)
    }
}

/// Internal row type for peer queries.
#[derive(sqlx::FromRow)]
struct PeerRow {
    hostname: String,
    scheme: Option<String>,
}

impl From<PeerRow> for Peer {
    fn from(row: PeerRow) -> Self {
        let scheme = row.scheme.and_then(|s| match s.parse::<PeerScheme>() {
            Ok(scheme) => Some(scheme),
            Err(e) => {
                tracing::warn!("Ignoring stored scheme for peer {}: {}", row.hostname, e);
                None
            }
        });

        Peer {
            hostname: row.hostname,
            scheme,
        }
    }
}

/// Internal row type for post queries.
#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    origin_post_id: i64,
    origin_username: String,
    origin_hostname: String,
    content: String,
    received_at: i64,
}

impl From<PostRow> for FederatedPost {
    fn from(row: PostRow) -> Self {
        FederatedPost {
            id: row.id,
            origin_post_id: row.origin_post_id,
            origin_username: row.origin_username,
            origin_hostname: row.origin_hostname,
            content: row.content,
            received_at: row.received_at,
        }
    }
}
