//! # Outbox Processor
//!
//! Pushes the `sync_outbox` table to the remote, oldest entry first.
//!
//! ## Per-Entry Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Processor Flow                                │
//! │                                                                         │
//! │  purge synced leftovers, publish pending_count                         │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  for entry in list_pending()  (FIFO by id)                             │
//! │   │                                                                     │
//! │   ├─ 1. payload → JSON object        ✗ record_malformed, next          │
//! │   ├─ 2. route (registry)             local-only → acknowledge, next    │
//! │   ├─ 3. resolve foreign keys         unknown parent → DEFERRED, next   │
//! │   ├─ 4. send                                                            │
//! │   │     INSERT/UPDATE + natural key  → upsert(on_conflict = key)       │
//! │   │     INSERT                       → insert (local id dropped)       │
//! │   │     UPDATE                       → upsert(on_conflict = id)        │
//! │   │     DELETE                       → delete(record_id)               │
//! │   │                                  ✗ record_failure, next            │
//! │   └─ 5. acknowledge (one transaction)                                   │
//! │         origem_offline = 0, data_sync = now, synced = 1, DELETE         │
//! │                                                                         │
//! │  A failing entry never blocks the ones behind it.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use recicla_core::{JsonRow, OutboxEntry, OutboxOperation};
use recicla_db::{LocalAck, OutboxRepository};

use crate::error::{SyncError, SyncResult};
use crate::registry::{EntityRegistry, Route};
use crate::remote::{with_deadline, RemoteClient};

// =============================================================================
// Report
// =============================================================================

/// Outcome counts of one push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Delivered (or local-only) and removed from the outbox.
    pub pushed: usize,
    /// Waiting for a parent record that isn't on the remote yet.
    pub deferred: usize,
    /// Remote call failed; retried next cycle.
    pub failed: usize,
    /// Unusable entry (bad payload, DELETE without id).
    pub skipped: usize,
}

enum EntryOutcome {
    Pushed,
    Deferred,
    Failed,
    Skipped,
}

// =============================================================================
// Outbox Processor
// =============================================================================

/// Pushes pending outbox entries through a [`RemoteClient`].
pub struct OutboxProcessor {
    outbox: OutboxRepository,
    remote: Arc<dyn RemoteClient>,
    registry: Arc<EntityRegistry>,
    request_timeout: Duration,
    max_malformed_attempts: u32,
}

impl OutboxProcessor {
    pub fn new(
        outbox: OutboxRepository,
        remote: Arc<dyn RemoteClient>,
        registry: Arc<EntityRegistry>,
        request_timeout: Duration,
        max_malformed_attempts: u32,
    ) -> Self {
        OutboxProcessor {
            outbox,
            remote,
            registry,
            request_timeout,
            max_malformed_attempts,
        }
    }

    /// Pushes every pending entry once. `on_pending` receives the number of
    /// pending entries before the first one is sent.
    ///
    /// Only local store errors reading the queue abort the push; anything
    /// wrong with a single entry is logged and counted.
    pub async fn push(&self, on_pending: impl FnOnce(i64)) -> SyncResult<PushReport> {
        let purged = self.outbox.purge_synced().await?;
        if purged > 0 {
            debug!(purged, "Removed delivered outbox leftovers");
        }

        let entries = self.outbox.list_pending().await?;
        on_pending(entries.len() as i64);

        let mut report = PushReport::default();
        if entries.is_empty() {
            debug!("No pending outbox entries");
            return Ok(report);
        }

        info!(count = entries.len(), "Pushing outbox");

        for entry in &entries {
            match self.push_entry(entry).await {
                EntryOutcome::Pushed => report.pushed += 1,
                EntryOutcome::Deferred => report.deferred += 1,
                EntryOutcome::Failed => report.failed += 1,
                EntryOutcome::Skipped => report.skipped += 1,
            }
        }

        info!(
            pushed = report.pushed,
            deferred = report.deferred,
            failed = report.failed,
            skipped = report.skipped,
            "Outbox push finished"
        );

        Ok(report)
    }

    async fn push_entry(&self, entry: &OutboxEntry) -> EntryOutcome {
        let mut payload = match entry.payload_object() {
            Ok(payload) => payload,
            Err(e) => return self.reject(entry, &SyncError::from(e).to_string()).await,
        };

        let route = self.registry.route(&entry.table_name);
        let Some(remote_table) = route.remote_table else {
            debug!(entry_id = entry.id, table = %entry.table_name, "Local-only entry, no push needed");
            return self.acknowledge(entry, None).await;
        };

        match self.resolve_references(entry, &route, &mut payload).await {
            Ok(Resolution::Ready) => {}
            Ok(Resolution::Deferred(reason)) => {
                info!(
                    entry_id = entry.id,
                    table = %entry.table_name,
                    record_id = ?entry.record_id,
                    reason = %reason,
                    "Deferred until its parent is on the remote"
                );
                return EntryOutcome::Deferred;
            }
            Ok(Resolution::Unresolvable(reason)) => return self.reject(entry, &reason).await,
            Err(e) => return self.fail(entry, &e).await,
        }

        let local_ack = self.local_ack(entry, &route, &payload);

        let sent = match entry.operation {
            OutboxOperation::Delete => {
                let Some(record_id) = entry.target_record() else {
                    return self.reject(entry, "DELETE entry without record_id").await;
                };
                self.call(self.remote.delete(remote_table, record_id)).await
            }
            OutboxOperation::Insert | OutboxOperation::Update => {
                let row = route.remote_row(payload);
                match self.send_write(entry, &route, remote_table, row).await {
                    Ok(sent) => sent,
                    Err(reason) => return self.reject(entry, &reason).await,
                }
            }
        };

        match sent {
            Ok(()) => {
                debug!(
                    entry_id = entry.id,
                    table = %entry.table_name,
                    remote_table = %remote_table,
                    operation = %entry.operation,
                    "Pushed outbox entry"
                );
                self.acknowledge(entry, local_ack.as_ref()).await
            }
            Err(e) => self.fail(entry, &e).await,
        }
    }

    /// Chooses insert or upsert for a write. The outer `Err` means the entry
    /// can't be sent at all.
    async fn send_write(
        &self,
        entry: &OutboxEntry,
        route: &Route<'_>,
        remote_table: &str,
        mut row: JsonRow,
    ) -> Result<SyncResult<()>, String> {
        if let Some(key) = route.conflict_key {
            return Ok(self.call(self.remote.upsert(remote_table, &row, key)).await);
        }

        match entry.operation {
            OutboxOperation::Insert => {
                row.remove("id");
                Ok(self.call(self.remote.insert(remote_table, &row)).await)
            }
            _ => {
                if !row.get("id").is_some_and(|id| !id.is_null()) {
                    let Some(record_id) = entry.target_record() else {
                        return Err("UPDATE entry without id or record_id".to_string());
                    };
                    row.insert("id".to_string(), id_value(record_id));
                }
                Ok(self.call(self.remote.upsert(remote_table, &row, "id")).await)
            }
        }
    }

    async fn call<T>(
        &self,
        call: impl std::future::Future<Output = SyncResult<T>>,
    ) -> SyncResult<()> {
        with_deadline(self.request_timeout, call).await.map(|_| ())
    }

    // =========================================================================
    // Foreign Keys
    // =========================================================================

    async fn resolve_references(
        &self,
        entry: &OutboxEntry,
        route: &Route<'_>,
        payload: &mut JsonRow,
    ) -> SyncResult<Resolution> {
        for reference in route.references {
            if payload.get(reference.id_field).and_then(numeric_id).is_some() {
                continue;
            }

            let natural = match payload.get(reference.natural_field) {
                Some(value) if !value.is_null() => value.clone(),
                _ => {
                    return Ok(Resolution::Unresolvable(format!(
                        "neither {} nor {} in payload",
                        reference.id_field, reference.natural_field
                    )))
                }
            };

            let found = with_deadline(
                self.request_timeout,
                self.remote
                    .find_id(reference.remote_table, reference.remote_key, &natural),
            )
            .await?;

            match found {
                Some(id) => {
                    debug!(
                        entry_id = entry.id,
                        field = reference.id_field,
                        natural = %natural,
                        remote_id = id,
                        "Resolved foreign key"
                    );
                    payload.insert(reference.id_field.to_string(), Value::from(id));
                }
                None => {
                    return Ok(Resolution::Deferred(format!(
                        "no {} with {} = {}",
                        reference.remote_table, reference.remote_key, natural
                    )))
                }
            }
        }

        Ok(Resolution::Ready)
    }

    // =========================================================================
    // Bookkeeping
    // =========================================================================

    /// Local row to confirm after a successful INSERT/UPDATE.
    fn local_ack(&self, entry: &OutboxEntry, route: &Route<'_>, payload: &JsonRow) -> Option<LocalAck> {
        if entry.operation == OutboxOperation::Delete || !route.tracks_offline {
            return None;
        }

        if let Some(record_id) = entry.target_record() {
            return Some(LocalAck::by_id(route.local_table, record_id));
        }

        let key = route.conflict_key?;
        let value = match payload.get(key)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(LocalAck::by_key(route.local_table, key, value))
    }

    async fn acknowledge(&self, entry: &OutboxEntry, local: Option<&LocalAck>) -> EntryOutcome {
        match self.outbox.acknowledge(entry.id, local).await {
            Ok(()) => EntryOutcome::Pushed,
            Err(e) => {
                warn!(
                    entry_id = entry.id,
                    table = %entry.table_name,
                    error = %e,
                    "Acknowledge failed, removing entry without local confirmation"
                );
                if let Err(e) = self.outbox.mark_synced(entry.id).await {
                    error!(entry_id = entry.id, error = %e, "Failed to mark entry as synced");
                }
                if let Err(e) = self.outbox.remove(entry.id).await {
                    error!(entry_id = entry.id, error = %e, "Failed to remove synced entry");
                }
                EntryOutcome::Pushed
            }
        }
    }

    async fn fail(&self, entry: &OutboxEntry, err: &SyncError) -> EntryOutcome {
        if !err.is_retryable() {
            error!(
                entry_id = entry.id,
                table = %entry.table_name,
                operation = %entry.operation,
                record_id = ?entry.record_id,
                error = %err,
                "Remote rejected outbox entry"
            );
        } else {
            warn!(
                entry_id = entry.id,
                table = %entry.table_name,
                operation = %entry.operation,
                record_id = ?entry.record_id,
                error = %err,
                "Outbox entry push failed, will retry"
            );
        }

        if let Err(e) = self.outbox.record_failure(entry.id, &err.to_string()).await {
            error!(entry_id = entry.id, error = %e, "Failed to record push failure");
        }
        EntryOutcome::Failed
    }

    async fn reject(&self, entry: &OutboxEntry, reason: &str) -> EntryOutcome {
        error!(
            entry_id = entry.id,
            table = %entry.table_name,
            operation = %entry.operation,
            record_id = ?entry.record_id,
            reason = %reason,
            "Skipping unusable outbox entry"
        );

        if let Err(e) = self
            .outbox
            .record_malformed(entry.id, reason, self.max_malformed_attempts)
            .await
        {
            error!(entry_id = entry.id, error = %e, "Failed to record malformed entry");
        }
        EntryOutcome::Skipped
    }
}

enum Resolution {
    Ready,
    Deferred(String),
    Unresolvable(String),
}

fn numeric_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Record ids are stored as text; numeric ones go back out as numbers.
fn id_value(record_id: &str) -> Value {
    record_id
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(record_id))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use recicla_core::{NewLineItem, NewOrder, OrderKind};
    use recicla_db::Database;

    use super::*;
    use crate::test_support::{memory_db, object, MockRemote, RemoteCall};

    fn processor(db: &Database, remote: &Arc<MockRemote>) -> OutboxProcessor {
        OutboxProcessor::new(
            db.outbox(),
            remote.clone(),
            Arc::new(EntityRegistry::standard()),
            Duration::from_secs(5),
            3,
        )
    }

    async fn offline_material(db: &Database, nome: &str) {
        sqlx::query("INSERT INTO material (nome, preco_compra, preco_venda, origem_offline) VALUES (?1, 0.5, 1.0, 1)")
            .bind(nome)
            .execute(db.pool())
            .await
            .unwrap();
    }

    async fn origem_offline(db: &Database, table: &str, column: &str, value: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT origem_offline FROM {table} WHERE {column} = ?1"))
            .bind(value)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_material_insert_is_upserted_and_confirmed() {
        let db = memory_db().await;
        let remote = MockRemote::new();
        offline_material(&db, "Papelão").await;

        let entry = db
            .outbox()
            .enqueue(
                "material",
                OutboxOperation::Insert,
                Some(""),
                &json!({"nome": "Papelão", "preco_compra": 0.5, "preco_venda": 1.0}),
            )
            .await
            .unwrap();

        let mut published = None;
        let report = processor(&db, &remote)
            .push(|n| published = Some(n))
            .await
            .unwrap();

        assert_eq!(published, Some(1));
        assert_eq!(report.pushed, 1);
        assert!(db.outbox().get(entry).await.unwrap().is_none());
        assert_eq!(origem_offline(&db, "material", "nome", "Papelão").await, 0);

        assert_eq!(
            remote.writes(),
            vec![RemoteCall::Upsert {
                table: "material".into(),
                row: object(json!({"nome": "Papelão", "preco_compra": 0.5, "preco_venda": 1.0})),
                on_conflict: "nome".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_repeated_push_is_idempotent() {
        let db = memory_db().await;
        let remote = MockRemote::new();
        let payload = json!({"nome": "Cobre", "preco_compra": 30.0, "preco_venda": 35.0});

        for _ in 0..2 {
            db.outbox()
                .enqueue("material", OutboxOperation::Insert, None, &payload)
                .await
                .unwrap();
            processor(&db, &remote).push(|_| {}).await.unwrap();
        }

        assert_eq!(remote.rows("material").len(), 1);
        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deferred_entry_does_not_block_the_queue() {
        let db = memory_db().await;
        let remote = MockRemote::new();
        let outbox = db.outbox();

        let a = outbox
            .enqueue("material", OutboxOperation::Insert, None, &json!({"nome": "Alumínio"}))
            .await
            .unwrap();
        let b = outbox
            .enqueue(
                "item_pedido",
                OutboxOperation::Insert,
                Some("1"),
                &json!({"codigo_pedido": "TR-7", "material_nome": "Alumínio", "quantidade": 3.0}),
            )
            .await
            .unwrap();
        let c = outbox
            .enqueue(
                "vale_pendente",
                OutboxOperation::Insert,
                Some("1"),
                &json!({"nome": "Seu Zé", "valor": 20.0, "status": 0}),
            )
            .await
            .unwrap();

        let report = processor(&db, &remote).push(|_| {}).await.unwrap();

        assert_eq!(report.pushed, 2);
        assert_eq!(report.deferred, 1);
        assert!(outbox.get(a).await.unwrap().is_none());
        assert!(outbox.get(c).await.unwrap().is_none());

        let deferred = outbox.get(b).await.unwrap().unwrap();
        assert_eq!(deferred.attempts, 0);

        let tables: Vec<String> = remote.calls().iter().map(|c| c.table().to_string()).collect();
        assert_eq!(tables, vec!["material", "pedido", "vale"]);
        assert!(!remote
            .calls()
            .iter()
            .any(|c| matches!(c, RemoteCall::Insert { table, .. } if table == "item")));

        let vale = &remote.rows("vale")[0];
        assert_eq!(vale.get("pago"), Some(&json!(false)));
        assert!(!vale.contains_key("status"));
    }

    #[tokio::test]
    async fn test_line_item_waits_for_unknown_order() {
        let db = memory_db().await;
        let remote = MockRemote::new();
        remote.seed("material", vec![json!({"id": 9, "nome": "Cobre"})]);

        let entry = db
            .outbox()
            .enqueue(
                "item_pedido",
                OutboxOperation::Insert,
                Some("4"),
                &json!({"codigo_pedido": "TR-7", "material_nome": "Cobre", "quantidade": 1.5}),
            )
            .await
            .unwrap();

        let report = processor(&db, &remote).push(|_| {}).await.unwrap();

        assert_eq!(report.deferred, 1);
        assert!(db.outbox().get(entry).await.unwrap().is_some());
        assert!(remote.writes().is_empty());
    }

    #[tokio::test]
    async fn test_line_item_resolves_known_parents() {
        let db = memory_db().await;
        let remote = MockRemote::new();
        remote.seed("pedido", vec![json!({"id": 41, "codigo": "TR-7"})]);
        remote.seed("material", vec![json!({"id": 9, "nome": "Cobre"})]);

        db.outbox()
            .enqueue(
                "item_pedido",
                OutboxOperation::Insert,
                Some("4"),
                &json!({
                    "codigo_pedido": "TR-7", "material_nome": "Cobre",
                    "quantidade": 1.5, "preco_unitario": 30.0, "subtotal": 45.0
                }),
            )
            .await
            .unwrap();

        let report = processor(&db, &remote).push(|_| {}).await.unwrap();
        assert_eq!(report.pushed, 1);

        assert_eq!(
            remote.writes(),
            vec![RemoteCall::Insert {
                table: "item".into(),
                row: object(json!({
                    "pedido_id": 41, "material_id": 9,
                    "quantidade": 1.5, "preco_unitario": 30.0, "subtotal": 45.0
                })),
            }]
        );
    }

    #[tokio::test]
    async fn test_whole_order_reaches_the_remote_in_one_push() {
        let db = memory_db().await;
        let remote = MockRemote::new();
        remote.seed("material", vec![json!({"id": 9, "nome": "Cobre"})]);
        db.settings().set_order_prefix("TR").await.unwrap();

        let order = db
            .orders()
            .create_pending(&NewOrder {
                tipo: OrderKind::Compra,
                cliente: Some("Dona Maria".into()),
                observacao: None,
                itens: vec![NewLineItem {
                    material_nome: "Cobre".into(),
                    material_id: None,
                    quantidade: 2.0,
                    preco_unitario: 30.0,
                }],
            })
            .await
            .unwrap();

        let report = processor(&db, &remote).push(|_| {}).await.unwrap();

        // order, line item, last-item marker
        assert_eq!(report.pushed, 3);
        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);

        let pedido = &remote.rows("pedido")[0];
        assert_eq!(pedido.get("codigo"), Some(&json!(order.codigo)));
        let pedido_id = pedido.get("id").cloned().unwrap();

        let item = &remote.rows("item")[0];
        assert_eq!(item.get("pedido_id"), Some(&pedido_id));
        assert_eq!(item.get("material_id"), Some(&json!(9)));

        assert!(remote.calls().iter().all(|c| c.table() != "ultimo_item"));
        assert_eq!(
            origem_offline(&db, "pedido_pendente", "codigo", &order.codigo).await,
            0
        );
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_entry_and_counts_attempt() {
        let db = memory_db().await;
        let remote = MockRemote::new();
        remote.fail_writes("material");
        offline_material(&db, "Ferro").await;

        let entry = db
            .outbox()
            .enqueue("material", OutboxOperation::Insert, None, &json!({"nome": "Ferro"}))
            .await
            .unwrap();

        let report = processor(&db, &remote).push(|_| {}).await.unwrap();
        assert_eq!(report.failed, 1);

        let kept = db.outbox().get(entry).await.unwrap().unwrap();
        assert_eq!(kept.attempts, 1);
        assert!(kept.last_error.unwrap().contains("503"));
        assert!(!kept.quarantined);
        assert_eq!(origem_offline(&db, "material", "nome", "Ferro").await, 1);

        remote.heal_writes("material");
        let report = processor(&db, &remote).push(|_| {}).await.unwrap();
        assert_eq!(report.pushed, 1);
        assert_eq!(origem_offline(&db, "material", "nome", "Ferro").await, 0);
    }

    #[tokio::test]
    async fn test_timed_out_write_is_retried_later() {
        let db = memory_db().await;
        let remote = MockRemote::new();
        offline_material(&db, "Vidro").await;
        offline_material(&db, "Latão").await;

        let slow = db
            .outbox()
            .enqueue("material", OutboxOperation::Insert, None, &json!({"nome": "Vidro"}))
            .await
            .unwrap();
        let next = db
            .outbox()
            .enqueue("material", OutboxOperation::Insert, None, &json!({"nome": "Latão"}))
            .await
            .unwrap();

        // never released while the push runs
        let _release = remote.hold_next_write();

        let report = OutboxProcessor::new(
            db.outbox(),
            remote.clone(),
            Arc::new(EntityRegistry::standard()),
            Duration::from_millis(50),
            3,
        )
        .push(|_| {})
        .await
        .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.pushed, 1);

        let kept = db.outbox().get(slow).await.unwrap().unwrap();
        assert_eq!(kept.attempts, 1);
        assert!(kept.last_error.unwrap().contains("timed out"));
        assert!(!kept.quarantined);
        assert_eq!(origem_offline(&db, "material", "nome", "Vidro").await, 1);

        assert!(db.outbox().get(next).await.unwrap().is_none());
        assert_eq!(origem_offline(&db, "material", "nome", "Latão").await, 0);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_quarantined_after_repeated_failures() {
        let db = memory_db().await;
        let remote = MockRemote::new();

        sqlx::query(
            "INSERT INTO sync_outbox (table_name, operation, record_id, payload, created_at) VALUES ('material', 'INSERT', NULL, '{broken', '2026-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        for round in 1..=3 {
            let report = processor(&db, &remote).push(|_| {}).await.unwrap();
            assert_eq!(report.skipped, 1, "round {round}");
        }

        assert!(db.outbox().list_pending().await.unwrap().is_empty());
        let quarantined = db.outbox().list_quarantined().await.unwrap();
        assert_eq!(quarantined.len(), 1);
        assert_eq!(quarantined[0].attempts, 3);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_needs_a_record_id() {
        let db = memory_db().await;
        let remote = MockRemote::new();
        remote.seed("pendencia", vec![json!({"id": 5, "nome": "Balança"})]);
        let outbox = db.outbox();

        let without_id = outbox
            .enqueue("pendencia", OutboxOperation::Delete, None, &json!({}))
            .await
            .unwrap();
        let with_id = outbox
            .enqueue("pendencia", OutboxOperation::Delete, Some("5"), &json!({}))
            .await
            .unwrap();

        let report = processor(&db, &remote).push(|_| {}).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.pushed, 1);
        assert_eq!(outbox.get(without_id).await.unwrap().unwrap().attempts, 1);
        assert!(outbox.get(with_id).await.unwrap().is_none());
        assert!(remote.rows("pendencia").is_empty());
    }

    #[tokio::test]
    async fn test_paid_voucher_updates_by_id() {
        let db = memory_db().await;
        let remote = MockRemote::new();
        sqlx::query("INSERT INTO vale (id, nome, valor, pago, origem_offline) VALUES (12, 'Seu Zé', 20.0, 0, 0)")
            .execute(db.pool())
            .await
            .unwrap();

        db.vouchers().mark_paid(12).await.unwrap();
        processor(&db, &remote).push(|_| {}).await.unwrap();

        assert_eq!(
            remote.writes(),
            vec![RemoteCall::Upsert {
                table: "vale".into(),
                row: object(json!({"id": 12, "pago": true})),
                on_conflict: "id".into(),
            }]
        );
        assert_eq!(origem_offline(&db, "vale", "id", "12").await, 0);
    }
}
