//! SQLite-backed user directory

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::{debug, info, warn};

use super::r#trait::UserDirectory;
use crate::auth::{
    errors::AuthError,
    types::{UserPage, UserRecord},
    validators::mask_phone,
};

fn from_sqlx_error(err: sqlx::Error) -> AuthError {
    AuthError::BackendUnavailable(format!("database: {}", err))
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    phone: String,
    registered_at: DateTime<Utc>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id as u64,
            phone: row.phone,
            registered_at: row.registered_at,
        }
    }
}

/// Escape LIKE wildcards so `search` matches literally
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// User directory on a SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteUserDirectory {
    pool: SqlitePool,
}

impl SqliteUserDirectory {
    /// Connect and create the schema if needed.
    ///
    /// Accepts `sqlite:` and `sqlite://` URLs. In-memory databases are pinned to a
    /// single long-lived connection so every query sees the same data.
    pub async fn connect(database_url: &str) -> Result<Self, AuthError> {
        let mut db_url = database_url.to_string();
        if db_url.starts_with("sqlite:") && !db_url.starts_with("sqlite://") {
            db_url = db_url.replacen("sqlite:", "sqlite://", 1);
        }
        let is_memory = db_url.contains(":memory:");

        if !is_memory {
            if let Some(path) = db_url.strip_prefix("sqlite://") {
                let path_only = path.split('?').next().unwrap_or_default();
                if let Some(parent) = std::path::Path::new(path_only).parent() {
                    if !parent.as_os_str().is_empty() {
                        if let Err(e) = std::fs::create_dir_all(parent) {
                            warn!("Failed to create database dir {:?}: {}", parent, e);
                        }
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| AuthError::Config(format!("invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true);

        let pool = if is_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(5))
                .idle_timeout(Duration::from_secs(600))
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await
        }
        .map_err(from_sqlx_error)?;

        let directory = Self { pool };
        directory.initialize_schema().await?;

        info!(in_memory = is_memory, "user directory ready");
        Ok(directory)
    }

    async fn initialize_schema(&self) -> Result<(), AuthError> {
        debug!("Initializing users schema");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                phone TEXT UNIQUE NOT NULL,
                registered_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn get_or_create(&self, phone: &str) -> Result<UserRecord, AuthError> {
        let inserted = sqlx::query(
            "INSERT INTO users (phone, registered_at) VALUES (?1, ?2) ON CONFLICT(phone) DO NOTHING",
        )
        .bind(phone)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, phone, registered_at FROM users WHERE phone = ?1",
        )
        .bind(phone)
        .fetch_one(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        if inserted.rows_affected() == 1 {
            info!(user_id = row.id, phone = %mask_phone(phone), "user registered");
        }
        Ok(row.into())
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<UserRecord>, AuthError> {
        let Ok(id) = i64::try_from(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, phone, registered_at FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, page: u32, limit: u32, search: Option<&str>) -> Result<UserPage, AuthError> {
        let pattern = like_pattern(search.unwrap_or_default());
        let offset = i64::from(page.max(1) - 1) * i64::from(limit);

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE phone LIKE ?1 ESCAPE '\\'")
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await
                .map_err(from_sqlx_error)?;

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, phone, registered_at FROM users
            WHERE phone LIKE ?1 ESCAPE '\'
            ORDER BY id
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(&pattern)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        Ok(UserPage {
            users: rows.into_iter().map(Into::into).collect(),
            total: total.max(0) as u64,
        })
    }
}
