//! # Sync Outbox Repository
//!
//! The durable queue of local mutations waiting to reach the remote backend.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  LOCAL OPERATION (e.g., create_pending order)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. INSERT INTO pedido_pendente (...)                           │   │
//! │  │  2. INSERT INTO sync_outbox (table_name, operation, payload)    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            PUSH (recicla-sync OutboxProcessor)                  │   │
//! │  │  1. list_pending()  (synced = 0, not quarantined, by id)        │   │
//! │  │  2. remote call per entry                                       │   │
//! │  │     ✓ acknowledge(): local row confirmed + synced + deleted     │   │
//! │  │     ✗ record_failure(): attempts += 1, last_error               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • A mutation is never lost (it's in the local DB)                     │
//! │  • An outbox entry is never orphaned (same transaction)                │
//! │  • Entries are deleted only after the remote confirmed them            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use recicla_core::validation::validate_identifier;
use recicla_core::{OutboxEntry, OutboxOperation, DATA_SYNC_COLUMN, OFFLINE_FLAG_COLUMN};

const SELECT_ENTRY: &str = r#"
    SELECT id, table_name, operation, record_id, payload, created_at,
           synced, attempts, last_error, quarantined
    FROM sync_outbox
"#;

// =============================================================================
// Local Acknowledgement
// =============================================================================

/// Identifies the local row whose `origem_offline` flag is cleared when its
/// outbox entry is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAck {
    pub table: String,
    /// `id`, or the natural key column when the entry has no record id.
    pub column: String,
    pub value: String,
}

impl LocalAck {
    pub fn by_id(table: impl Into<String>, id: impl Into<String>) -> Self {
        LocalAck {
            table: table.into(),
            column: "id".to_string(),
            value: id.into(),
        }
    }

    pub fn by_key(
        table: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        LocalAck {
            table: table.into(),
            column: column.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sync outbox operations.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
    /// Creates a new OutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OutboxRepository { pool }
    }

    /// Appends an entry to the outbox and returns its id.
    ///
    /// `payload` must be a JSON object; it is stored as a frozen snapshot.
    /// Prefer [`OutboxRepository::enqueue_in`] when the entity row is written
    /// in the same call, so both land in one transaction.
    pub async fn enqueue(
        &self,
        table: &str,
        operation: OutboxOperation,
        record_id: Option<&str>,
        payload: &Value,
    ) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::enqueue_in(&mut conn, table, operation, record_id, payload).await
    }

    /// Appends an entry using an existing connection or transaction.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let mut tx = pool.begin().await?;
    /// sqlx::query("INSERT INTO material ...").execute(&mut *tx).await?;
    /// OutboxRepository::enqueue_in(&mut tx, "material", OutboxOperation::Insert, None, &payload).await?;
    /// tx.commit().await?;
    /// ```
    pub async fn enqueue_in(
        conn: &mut SqliteConnection,
        table: &str,
        operation: OutboxOperation,
        record_id: Option<&str>,
        payload: &Value,
    ) -> DbResult<i64> {
        validate_identifier(table)?;

        if !payload.is_object() {
            return Err(DbError::Serialization(
                "outbox payload must be a JSON object".to_string(),
            ));
        }

        let payload_text = serde_json::to_string(payload)?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO sync_outbox (table_name, operation, record_id, payload, created_at, synced)
            VALUES (?1, ?2, ?3, ?4, ?5, 0)
            "#,
        )
        .bind(table)
        .bind(operation)
        .bind(record_id)
        .bind(&payload_text)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();

        debug!(
            entry_id = id,
            table = %table,
            operation = %operation,
            record_id = ?record_id,
            "Queued for sync"
        );

        Ok(id)
    }

    /// Pending entries, oldest first.
    pub async fn list_pending(&self) -> DbResult<Vec<OutboxEntry>> {
        let sql = format!("{SELECT_ENTRY} WHERE synced = 0 AND quarantined = 0 ORDER BY id ASC");

        let entries = sqlx::query_as::<_, OutboxEntry>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Entries set aside after repeated malformed-payload failures.
    pub async fn list_quarantined(&self) -> DbResult<Vec<OutboxEntry>> {
        let sql = format!("{SELECT_ENTRY} WHERE quarantined = 1 ORDER BY id ASC");

        let entries = sqlx::query_as::<_, OutboxEntry>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Fetches a single entry.
    pub async fn get(&self, id: i64) -> DbResult<Option<OutboxEntry>> {
        let sql = format!("{SELECT_ENTRY} WHERE id = ?1");

        let entry = sqlx::query_as::<_, OutboxEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    /// Marks an entry as delivered without deleting it.
    pub async fn mark_synced(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE sync_outbox SET synced = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Deletes an entry.
    pub async fn remove(&self, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM sync_outbox WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Records a successful push in one transaction: confirms the local row
    /// (when given), marks the entry synced and deletes it.
    pub async fn acknowledge(&self, id: i64, local: Option<&LocalAck>) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        if let Some(ack) = local {
            let updated = confirm_local_row(&mut tx, ack).await?;
            if updated == 0 {
                debug!(
                    table = %ack.table,
                    column = %ack.column,
                    value = %ack.value,
                    "No local row to confirm"
                );
            }
        }

        sqlx::query("UPDATE sync_outbox SET synced = 1 WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM sync_outbox WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Records a failed delivery; the entry stays pending.
    pub async fn record_failure(&self, id: i64, error: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE sync_outbox SET
                attempts = attempts + 1,
                last_error = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a malformed payload. Returns `true` when this failure moved
    /// the entry into quarantine.
    pub async fn record_malformed(&self, id: i64, error: &str, max_attempts: u32) -> DbResult<bool> {
        let quarantined: Option<bool> = sqlx::query_scalar(
            r#"
            UPDATE sync_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                quarantined = CASE WHEN attempts + 1 >= ?3 THEN 1 ELSE 0 END
            WHERE id = ?1
            RETURNING quarantined
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(i64::from(max_attempts))
        .fetch_optional(&self.pool)
        .await?;

        let quarantined = quarantined.unwrap_or(false);
        if quarantined {
            warn!(entry_id = id, error = %error, "Outbox entry quarantined");
        }

        Ok(quarantined)
    }

    /// Returns a quarantined entry to the pending queue with a fresh counter.
    pub async fn requeue(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sync_outbox SET
                quarantined = 0,
                attempts = 0,
                last_error = NULL
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Outbox entry", id.to_string()));
        }

        Ok(())
    }

    /// Counts pending entries.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sync_outbox WHERE synced = 0 AND quarantined = 0",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Deletes entries marked synced but left behind by an interrupted
    /// acknowledgement. Returns the number removed.
    pub async fn purge_synced(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sync_outbox WHERE synced = 1")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

async fn confirm_local_row(conn: &mut SqliteConnection, ack: &LocalAck) -> DbResult<u64> {
    validate_identifier(&ack.table)?;
    validate_identifier(&ack.column)?;

    let sql = format!(
        "UPDATE {table} SET {flag} = 0, {stamp} = ?1 WHERE {column} = ?2",
        table = ack.table,
        flag = OFFLINE_FLAG_COLUMN,
        stamp = DATA_SYNC_COLUMN,
        column = ack.column,
    );

    let result = sqlx::query(&sql)
        .bind(Utc::now().to_rfc3339())
        .bind(&ack.value)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{Database, DbConfig};

    use super::*;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_and_list_fifo() {
        let db = setup().await;
        let outbox = db.outbox();

        let a = outbox
            .enqueue("material", OutboxOperation::Insert, None, &json!({"nome": "Papelão"}))
            .await
            .unwrap();
        let b = outbox
            .enqueue("vale_pendente", OutboxOperation::Update, Some("3"), &json!({"status": 1}))
            .await
            .unwrap();

        let pending = outbox.list_pending().await.unwrap();
        assert_eq!(pending.iter().map(|e| e.id).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(pending[0].operation, OutboxOperation::Insert);
        assert_eq!(pending[0].record_id, None);
        assert_eq!(pending[1].record_id.as_deref(), Some("3"));
        assert!(!pending[0].synced);
        assert_eq!(outbox.count_pending().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_enqueue_rejects_non_object_payload() {
        let db = setup().await;

        let err = db
            .outbox()
            .enqueue("material", OutboxOperation::Insert, None, &json!([1, 2]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_acknowledge_confirms_local_row_and_deletes_entry() {
        let db = setup().await;
        sqlx::query("INSERT INTO material (nome, origem_offline) VALUES ('Papelão', 1)")
            .execute(db.pool())
            .await
            .unwrap();

        let outbox = db.outbox();
        let id = outbox
            .enqueue("material", OutboxOperation::Insert, Some(""), &json!({"nome": "Papelão"}))
            .await
            .unwrap();

        outbox
            .acknowledge(id, Some(&LocalAck::by_key("material", "nome", "Papelão")))
            .await
            .unwrap();

        assert!(outbox.get(id).await.unwrap().is_none());
        let (flag, stamp): (i64, Option<String>) =
            sqlx::query_as("SELECT origem_offline, data_sync FROM material WHERE nome = 'Papelão'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(flag, 0);
        assert!(stamp.is_some());
    }

    #[tokio::test]
    async fn test_acknowledge_rolls_back_on_bad_local_table() {
        let db = setup().await;
        let outbox = db.outbox();
        let id = outbox
            .enqueue("material", OutboxOperation::Insert, None, &json!({"nome": "Vidro"}))
            .await
            .unwrap();

        let result = outbox
            .acknowledge(id, Some(&LocalAck::by_id("tabela_inexistente", "1")))
            .await;

        assert!(result.is_err());
        assert!(outbox.get(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failure_keeps_entry_pending() {
        let db = setup().await;
        let outbox = db.outbox();
        let id = outbox
            .enqueue("pendencia", OutboxOperation::Insert, None, &json!({"nome": "x"}))
            .await
            .unwrap();

        outbox.record_failure(id, "HTTP 503").await.unwrap();
        outbox.record_failure(id, "timeout").await.unwrap();

        let entry = outbox.get(id).await.unwrap().unwrap();
        assert_eq!(entry.attempts, 2);
        assert_eq!(entry.last_error.as_deref(), Some("timeout"));
        assert!(!entry.quarantined);
        assert_eq!(outbox.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_entries_are_quarantined_then_requeued() {
        let db = setup().await;
        let outbox = db.outbox();
        let id = outbox
            .enqueue("material", OutboxOperation::Insert, None, &json!({}))
            .await
            .unwrap();

        assert!(!outbox.record_malformed(id, "bad json", 2).await.unwrap());
        assert!(outbox.record_malformed(id, "bad json", 2).await.unwrap());

        assert!(outbox.list_pending().await.unwrap().is_empty());
        assert_eq!(outbox.list_quarantined().await.unwrap().len(), 1);

        outbox.requeue(id).await.unwrap();
        let pending = outbox.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 0);

        assert!(matches!(
            outbox.requeue(9999).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_synced_leftovers_are_not_pending_and_get_purged() {
        let db = setup().await;
        let outbox = db.outbox();
        let id = outbox
            .enqueue("material", OutboxOperation::Update, Some("1"), &json!({"id": 1}))
            .await
            .unwrap();

        outbox.mark_synced(id).await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 0);

        assert_eq!(outbox.purge_synced().await.unwrap(), 1);
        assert!(outbox.get(id).await.unwrap().is_none());
    }
}
