//! # Order Repository
//!
//! Orders entered on the device go to `pedido_pendente` / `item_pedido`
//! and reach the remote `pedido` / `item` tables through the outbox.
//!
//! ## One Order, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_pending(order)                                                  │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── next order code  (settings: order_seq:TR → TR-7)                 │
//! │   ├── INSERT pedido_pendente            + outbox INSERT pedido_pendente│
//! │   ├── INSERT item_pedido  (per line)    + outbox INSERT item_pedido    │
//! │   └── UPSERT ultimo_item  (marker)      + outbox UPDATE ultimo_item    │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Line-item payloads reference the order by `codigo_pedido` and the     │
//! │  material by `material_nome`; the push resolves them to remote ids.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::outbox::OutboxRepository;
use crate::repository::settings::SettingsRepository;
use recicla_core::validation::{
    validate_material_name, validate_person_name, validate_price, validate_quantity,
};
use recicla_core::{NewOrder, OutboxOperation, PendingOrder, ValidationError};

/// Repository for orders created on the device.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Records an order with its lines and queues every remote write.
    pub async fn create_pending(&self, order: &NewOrder) -> DbResult<PendingOrder> {
        validate_order(order)?;

        let total = order.total();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let codigo = SettingsRepository::next_order_code_in(&mut tx).await?;

        let order_id = sqlx::query(
            r#"
            INSERT INTO pedido_pendente (codigo, tipo, cliente, total, data, observacao, origem_offline)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
            "#,
        )
        .bind(&codigo)
        .bind(order.tipo.as_str())
        .bind(&order.cliente)
        .bind(total)
        .bind(&now)
        .bind(&order.observacao)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let order_payload = json!({
            "codigo": codigo,
            "tipo": order.tipo.as_str(),
            "cliente": order.cliente,
            "total": total,
            "data": now,
            "observacao": order.observacao,
        });
        let order_record = order_id.to_string();
        OutboxRepository::enqueue_in(
            &mut tx,
            "pedido_pendente",
            OutboxOperation::Insert,
            Some(&order_record),
            &order_payload,
        )
        .await?;

        let mut item_ids = Vec::with_capacity(order.itens.len());
        for line in &order.itens {
            let nome = line.material_nome.trim();
            let subtotal = line.subtotal();

            let item_id = sqlx::query(
                r#"
                INSERT INTO item_pedido (
                    pedido_pendente_id, codigo_pedido, material_id, material_nome,
                    quantidade, preco_unitario, subtotal, origem_offline
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)
                "#,
            )
            .bind(order_id)
            .bind(&codigo)
            .bind(line.material_id)
            .bind(nome)
            .bind(line.quantidade)
            .bind(line.preco_unitario)
            .bind(subtotal)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            let mut payload = Map::new();
            payload.insert("codigo_pedido".into(), Value::from(codigo.clone()));
            payload.insert("material_nome".into(), Value::from(nome));
            if let Some(material_id) = line.material_id {
                payload.insert("material_id".into(), Value::from(material_id));
            }
            payload.insert("quantidade".into(), Value::from(line.quantidade));
            payload.insert("preco_unitario".into(), Value::from(line.preco_unitario));
            payload.insert("subtotal".into(), Value::from(subtotal));

            let item_record = item_id.to_string();
            OutboxRepository::enqueue_in(
                &mut tx,
                "item_pedido",
                OutboxOperation::Insert,
                Some(&item_record),
                &Value::Object(payload),
            )
            .await?;

            item_ids.push(item_id);
        }

        if let (Some(&last_id), Some(last_line)) = (item_ids.last(), order.itens.last()) {
            sqlx::query(
                r#"
                INSERT INTO ultimo_item (id, item_pedido_id, codigo_pedido, material_nome, atualizado_em)
                VALUES (1, ?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    item_pedido_id = excluded.item_pedido_id,
                    codigo_pedido = excluded.codigo_pedido,
                    material_nome = excluded.material_nome,
                    atualizado_em = excluded.atualizado_em
                "#,
            )
            .bind(last_id)
            .bind(&codigo)
            .bind(last_line.material_nome.trim())
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            let marker = json!({
                "item_pedido_id": last_id,
                "codigo_pedido": codigo,
                "material_nome": last_line.material_nome.trim(),
                "atualizado_em": now,
            });
            OutboxRepository::enqueue_in(
                &mut tx,
                "ultimo_item",
                OutboxOperation::Update,
                Some("1"),
                &marker,
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            order_id,
            codigo = %codigo,
            items = item_ids.len(),
            total,
            "Pending order recorded"
        );

        Ok(PendingOrder {
            id: order_id,
            codigo,
            total,
            item_ids,
        })
    }

    /// Local id of a pending order by its code.
    pub async fn find_pending_id(&self, codigo: &str) -> DbResult<Option<i64>> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM pedido_pendente WHERE codigo = ?1")
            .bind(codigo)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// Number of pending orders not yet confirmed by the remote.
    pub async fn count_unconfirmed(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pedido_pendente WHERE origem_offline = 1")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

fn validate_order(order: &NewOrder) -> DbResult<()> {
    if order.itens.is_empty() {
        return Err(DbError::Invalid(ValidationError::Required {
            field: "itens".to_string(),
        }));
    }

    if let Some(cliente) = order.cliente.as_deref() {
        validate_person_name(cliente)?;
    }

    for line in &order.itens {
        validate_material_name(&line.material_nome)?;
        validate_quantity(line.quantidade)?;
        validate_price("preco_unitario", line.preco_unitario)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use recicla_core::{NewLineItem, OrderKind};

    use crate::{Database, DbConfig};

    use super::*;

    fn order() -> NewOrder {
        NewOrder {
            tipo: OrderKind::Compra,
            cliente: Some("Ferro Velho São Jorge".to_string()),
            observacao: None,
            itens: vec![
                NewLineItem {
                    material_nome: "Papelão".to_string(),
                    material_id: None,
                    quantidade: 40.0,
                    preco_unitario: 0.5,
                },
                NewLineItem {
                    material_nome: "Cobre".to_string(),
                    material_id: Some(3),
                    quantidade: 2.0,
                    preco_unitario: 30.0,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_create_pending_queues_order_items_and_marker() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().set_order_prefix("TR").await.unwrap();

        let created = db.orders().create_pending(&order()).await.unwrap();
        assert_eq!(created.codigo, "TR-1");
        assert_eq!(created.total, 80.0);
        assert_eq!(created.item_ids.len(), 2);

        let pending = db.outbox().list_pending().await.unwrap();
        let tables: Vec<&str> = pending.iter().map(|e| e.table_name.as_str()).collect();
        assert_eq!(
            tables,
            vec!["pedido_pendente", "item_pedido", "item_pedido", "ultimo_item"]
        );

        let first_item = pending[1].payload_object().unwrap();
        assert_eq!(first_item["codigo_pedido"], "TR-1");
        assert!(first_item.get("material_id").is_none());
        let second_item = pending[2].payload_object().unwrap();
        assert_eq!(second_item["material_id"], 3);

        assert_eq!(db.orders().find_pending_id("TR-1").await.unwrap(), Some(created.id));
        assert_eq!(db.orders().count_unconfirmed().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_codes_advance_per_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = db.orders().create_pending(&order()).await.unwrap();
        let second = db.orders().create_pending(&order()).await.unwrap();
        assert_eq!(first.codigo, "PED-1");
        assert_eq!(second.codigo, "PED-2");

        let marker: String = sqlx::query_scalar("SELECT codigo_pedido FROM ultimo_item WHERE id = 1")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(marker, "PED-2");
    }

    #[tokio::test]
    async fn test_invalid_order_writes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut bad = order();
        bad.itens[1].quantidade = 0.0;

        assert!(db.orders().create_pending(&bad).await.is_err());
        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);
        assert_eq!(db.settings().next_order_code().await.unwrap(), "PED-1");

        bad.itens.clear();
        assert!(matches!(
            db.orders().create_pending(&bad).await,
            Err(DbError::Invalid(ValidationError::Required { .. }))
        ));
    }
}
