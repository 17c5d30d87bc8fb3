//! # Table Replace
//!
//! The pull path's write primitive: swap the contents of a local table for
//! the rows fetched from the remote, in one transaction.
//!
//! ## Strategies
//! ```text
//! ┌──────────────────┬───────────────────────────────┬──────────────────────┐
//! │ Strategy         │ Delete                        │ Insert               │
//! ├──────────────────┼───────────────────────────────┼──────────────────────┤
//! │ Full             │ every row                     │ INSERT               │
//! │ PreserveOffline  │ rows with origem_offline = 0  │ INSERT OR IGNORE     │
//! │ Singleton        │ every row                     │ first row as id = 1, │
//! │                  │                               │ atualizado_em = now  │
//! └──────────────────┴───────────────────────────────┴──────────────────────┘
//! ```
//!
//! Fetched rows are trimmed to the columns the local table actually has
//! (`PRAGMA table_info`); every inserted row gets `data_sync = now` and
//! `origem_offline = 0`.

use chrono::Utc;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use recicla_core::validation::validate_identifier;
use recicla_core::{JsonRow, DATA_SYNC_COLUMN, OFFLINE_FLAG_COLUMN};

const SINGLETON_ID: i64 = 1;
const SINGLETON_STAMP_COLUMN: &str = "atualizado_em";

/// How a pulled table's local contents are replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStrategy {
    /// Delete everything, insert what was fetched.
    Full,
    /// Keep rows still waiting for upload (`origem_offline = 1`); fetched
    /// rows colliding with them are ignored.
    PreserveOffline,
    /// At most one row with `id = 1`; an empty fetch clears the table.
    Singleton,
}

/// Replaces local table contents with fetched rows.
#[derive(Debug, Clone)]
pub struct TableReplacer {
    pool: SqlitePool,
}

impl TableReplacer {
    pub fn new(pool: SqlitePool) -> Self {
        TableReplacer { pool }
    }

    /// Replaces `table` with `rows` using `strategy`. Returns the number of
    /// rows inserted. Any failure rolls the whole table back.
    pub async fn replace(
        &self,
        table: &str,
        rows: &[JsonRow],
        strategy: ReplaceStrategy,
    ) -> DbResult<u64> {
        validate_identifier(table)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let columns = table_columns_in(&mut tx, table).await?;
        if columns.is_empty() {
            return Err(DbError::not_found("Local table", table));
        }

        let tracks_offline = columns.iter().any(|c| c == OFFLINE_FLAG_COLUMN);
        if strategy == ReplaceStrategy::PreserveOffline && !tracks_offline {
            return Err(DbError::QueryFailed(format!(
                "{table} has no {OFFLINE_FLAG_COLUMN} column to preserve offline rows"
            )));
        }

        let delete = match strategy {
            ReplaceStrategy::PreserveOffline => {
                format!("DELETE FROM {table} WHERE {OFFLINE_FLAG_COLUMN} = 0")
            }
            ReplaceStrategy::Full | ReplaceStrategy::Singleton => format!("DELETE FROM {table}"),
        };
        let deleted = sqlx::query(&delete).execute(&mut *tx).await?.rows_affected();

        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;

        match strategy {
            ReplaceStrategy::Full => {
                for row in rows {
                    inserted += insert_row(&mut tx, table, &columns, row, &now, false).await?;
                }
            }
            ReplaceStrategy::PreserveOffline => {
                for row in rows {
                    inserted += insert_row(&mut tx, table, &columns, row, &now, true).await?;
                }
            }
            ReplaceStrategy::Singleton => {
                if let Some(first) = rows.first() {
                    let mut row = first.clone();
                    row.insert("id".to_string(), Value::from(SINGLETON_ID));
                    row.insert(SINGLETON_STAMP_COLUMN.to_string(), Value::from(now.clone()));
                    inserted += insert_row(&mut tx, table, &columns, &row, &now, false).await?;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            table = %table,
            strategy = ?strategy,
            fetched = rows.len(),
            deleted,
            inserted,
            "Replaced local table"
        );

        Ok(inserted)
    }

    /// Column names of a local table; empty when the table doesn't exist.
    pub async fn table_columns(&self, table: &str) -> DbResult<Vec<String>> {
        validate_identifier(table)?;
        let mut conn = self.pool.acquire().await?;
        table_columns_in(&mut conn, table).await
    }

    /// Row count of a local table.
    pub async fn count(&self, table: &str) -> DbResult<i64> {
        validate_identifier(table)?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn table_columns_in(conn: &mut SqliteConnection, table: &str) -> DbResult<Vec<String>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(DbError::from))
        .collect()
}

async fn insert_row(
    conn: &mut SqliteConnection,
    table: &str,
    local_columns: &[String],
    row: &JsonRow,
    now: &str,
    or_ignore: bool,
) -> DbResult<u64> {
    let mut names: Vec<&str> = Vec::new();
    let mut values: Vec<&Value> = Vec::new();

    for (key, value) in row {
        if key == DATA_SYNC_COLUMN || key == OFFLINE_FLAG_COLUMN {
            continue;
        }
        if local_columns.iter().any(|c| c == key) {
            validate_identifier(key)?;
            names.push(key);
            values.push(value);
        }
    }

    if names.is_empty() {
        debug!(table = %table, "Skipping fetched row with no local columns");
        return Ok(0);
    }

    let stamp_sync = local_columns.iter().any(|c| c == DATA_SYNC_COLUMN);
    let mark_confirmed = local_columns.iter().any(|c| c == OFFLINE_FLAG_COLUMN);

    let mut column_list = names.join(", ");
    let mut placeholders = vec!["?"; names.len()].join(", ");
    if stamp_sync {
        column_list.push_str(&format!(", {DATA_SYNC_COLUMN}"));
        placeholders.push_str(", ?");
    }
    if mark_confirmed {
        column_list.push_str(&format!(", {OFFLINE_FLAG_COLUMN}"));
        placeholders.push_str(", 0");
    }

    let verb = if or_ignore { "INSERT OR IGNORE" } else { "INSERT" };
    let sql = format!("{verb} INTO {table} ({column_list}) VALUES ({placeholders})");

    let mut query = sqlx::query(&sql);
    for value in values {
        query = bind_json(query, value);
    }
    if stamp_sync {
        query = query.bind(now.to_string());
    }

    let result = query.execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

/// Binds a JSON value as the closest SQLite storage class. Booleans become
/// 0/1, nested arrays and objects are stored as JSON text.
fn bind_json<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
