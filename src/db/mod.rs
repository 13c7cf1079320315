// Durable user store (SQLite via sqlx).

use std::time::Duration;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use crate::engine::ledger::{signed, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    score: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            display_name: row.name,
            // Rows are only written from clamped scores; treat anything else as zero.
            score: u64::try_from(row.score).unwrap_or(0),
        }
    }
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let mut options = SqlitePoolOptions::new().max_connections(5);
        if database_url.contains(":memory:") {
            // Every connection to `sqlite::memory:` opens its own empty database,
            // so keep exactly one alive for the life of the pool.
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = options.connect(database_url).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                score INTEGER NOT NULL DEFAULT 0 CHECK (score >= 0),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All user records in insertion order.
    pub async fn load_all(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT id, name, score FROM users ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, name, score FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Insert or update one record. Updating keeps the original rowid, so load order is stable.
    pub async fn upsert(&self, id: &str, name: &str, score: u64) -> Result<(), StoreError> {
        sqlx::query(UPSERT_USER)
            .bind(id)
            .bind(name)
            .bind(signed(score))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Upsert every record inside one transaction.
    pub async fn upsert_all(&self, users: &[User]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for user in users {
            sqlx::query(UPSERT_USER)
                .bind(&user.id)
                .bind(&user.display_name)
                .bind(signed(user.score))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

const UPSERT_USER: &str = "INSERT INTO users (id, name, score) VALUES (?, ?, ?) \
     ON CONFLICT(id) DO UPDATE SET name = excluded.name, score = excluded.score, \
     updated_at = datetime('now')";
