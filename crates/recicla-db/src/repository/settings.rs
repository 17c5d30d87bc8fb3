//! # Settings Repository
//!
//! Persisted key/value settings: remote credentials, last sync time and
//! the order-code sequence.
//!
//! ## Keys
//! ```text
//! remote_url            endpoint of the remote backend
//! remote_key            access key sent with every remote request
//! last_sync_at          RFC 3339 time of the last clean sync cycle
//! order_prefix          prefix of locally generated order codes ("TR")
//! order_seq:<prefix>    last sequence number issued for <prefix>
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::DbResult;
use recicla_core::order_code::{format_order_code, DEFAULT_ORDER_PREFIX};
use recicla_core::validation::validate_order_prefix;
use recicla_core::RemoteCredentials;

pub const KEY_REMOTE_URL: &str = "remote_url";
pub const KEY_REMOTE_KEY: &str = "remote_key";
pub const KEY_LAST_SYNC_AT: &str = "last_sync_at";
pub const KEY_ORDER_PREFIX: &str = "order_prefix";
const ORDER_SEQ_PREFIX: &str = "order_seq:";

/// Repository over the `settings` table.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads a raw value.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, key).await
    }

    /// Writes a raw value, replacing any previous one.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        set_in(&mut conn, key, value).await
    }

    /// Deletes a key. Missing keys are not an error.
    pub async fn delete(&self, key: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Credentials
    // -------------------------------------------------------------------------

    /// Remote credentials, when both URL and key are stored and non-blank.
    pub async fn credentials(&self) -> DbResult<Option<RemoteCredentials>> {
        let url = self.get(KEY_REMOTE_URL).await?;
        let key = self.get(KEY_REMOTE_KEY).await?;

        Ok(match (url, key) {
            (Some(url), Some(key)) => {
                Some(RemoteCredentials::new(url, key)).filter(RemoteCredentials::is_complete)
            }
            _ => None,
        })
    }

    /// Stores both credential values in one transaction.
    pub async fn save_credentials(&self, credentials: &RemoteCredentials) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        set_in(&mut tx, KEY_REMOTE_URL, credentials.url.trim()).await?;
        set_in(&mut tx, KEY_REMOTE_KEY, credentials.key.trim()).await?;
        tx.commit().await?;

        info!(url = %credentials.url, "Remote credentials saved");
        Ok(())
    }

    /// Removes the stored credentials.
    pub async fn clear_credentials(&self) -> DbResult<()> {
        sqlx::query("DELETE FROM settings WHERE key IN (?1, ?2)")
            .bind(KEY_REMOTE_URL)
            .bind(KEY_REMOTE_KEY)
            .execute(&self.pool)
            .await?;

        info!("Remote credentials cleared");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Last sync
    // -------------------------------------------------------------------------

    /// Time of the last clean sync cycle. An unparseable value reads as
    /// never synced.
    pub async fn last_sync_at(&self) -> DbResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.get(KEY_LAST_SYNC_AT).await? else {
            return Ok(None);
        };

        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                warn!(value = %raw, error = %e, "Ignoring unparseable last_sync_at");
                Ok(None)
            }
        }
    }

    pub async fn set_last_sync_at(&self, at: DateTime<Utc>) -> DbResult<()> {
        self.set(KEY_LAST_SYNC_AT, &at.to_rfc3339()).await
    }

    // -------------------------------------------------------------------------
    // Order codes
    // -------------------------------------------------------------------------

    /// Configured order prefix, or [`DEFAULT_ORDER_PREFIX`].
    pub async fn order_prefix(&self) -> DbResult<String> {
        let mut conn = self.pool.acquire().await?;
        order_prefix_in(&mut conn).await
    }

    pub async fn set_order_prefix(&self, prefix: &str) -> DbResult<()> {
        validate_order_prefix(prefix)?;
        self.set(KEY_ORDER_PREFIX, prefix).await
    }

    /// Issues the next order code (`TR-1`, `TR-2`, ...) in its own
    /// transaction.
    pub async fn next_order_code(&self) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;
        let code = Self::next_order_code_in(&mut tx).await?;
        tx.commit().await?;
        Ok(code)
    }

    /// Issues the next order code on an existing connection or transaction.
    pub async fn next_order_code_in(conn: &mut SqliteConnection) -> DbResult<String> {
        let prefix = order_prefix_in(conn).await?;
        let seq_key = format!("{ORDER_SEQ_PREFIX}{prefix}");

        let current = get_in(conn, &seq_key)
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + 1;

        set_in(conn, &seq_key, &next.to_string()).await?;

        let code = format_order_code(&prefix, next);
        debug!(code = %code, "Issued order code");
        Ok(code)
    }
}

async fn get_in(conn: &mut SqliteConnection, key: &str) -> DbResult<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(value)
}

async fn set_in(conn: &mut SqliteConnection, key: &str, value: &str) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn order_prefix_in(conn: &mut SqliteConnection) -> DbResult<String> {
    let prefix = get_in(conn, KEY_ORDER_PREFIX)
        .await?
        .filter(|p| validate_order_prefix(p).is_ok())
        .unwrap_or_else(|| DEFAULT_ORDER_PREFIX.to_string());
    Ok(prefix)
}

// =============================================================================
// Unit Tests
// =============================================================================
