//! # Voucher Repository
//!
//! Vouchers (`vales`) are cash advances against future purchases. New ones
//! are written to `vale_pendente` and pushed to the remote `vale` table;
//! paying a voucher already known to the remote updates its `vale` row.

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::outbox::OutboxRepository;
use recicla_core::validation::{validate_amount, validate_person_name};
use recicla_core::{round_currency, NewVoucher, OutboxOperation};

/// Repository for voucher writes.
#[derive(Debug, Clone)]
pub struct VoucherRepository {
    pool: SqlitePool,
}

impl VoucherRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VoucherRepository { pool }
    }

    /// Issues a voucher locally and queues its remote insert.
    pub async fn create_pending(&self, voucher: &NewVoucher) -> DbResult<i64> {
        let nome = voucher.nome.trim();
        validate_person_name(nome)?;
        validate_amount(voucher.valor)?;

        let valor = round_currency(voucher.valor);
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO vale_pendente (nome, valor, data, status, observacao, origem_offline)
            VALUES (?1, ?2, ?3, 0, ?4, 1)
            "#,
        )
        .bind(nome)
        .bind(valor)
        .bind(&now)
        .bind(&voucher.observacao)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let payload = json!({
            "nome": nome,
            "valor": valor,
            "data": now,
            "status": 0,
            "observacao": voucher.observacao,
        });
        let record_id = id.to_string();
        OutboxRepository::enqueue_in(
            &mut tx,
            "vale_pendente",
            OutboxOperation::Insert,
            Some(&record_id),
            &payload,
        )
        .await?;

        tx.commit().await?;

        info!(voucher_id = id, nome = %nome, valor, "Voucher issued offline");
        Ok(id)
    }

    /// Marks a synced voucher (`vale` row, remote id) as paid and queues
    /// the remote update.
    pub async fn mark_paid(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE vale SET pago = 1, origem_offline = 1 WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Voucher", id.to_string()));
        }

        let record_id = id.to_string();
        OutboxRepository::enqueue_in(
            &mut tx,
            "vale",
            OutboxOperation::Update,
            Some(&record_id),
            &json!({ "id": id, "pago": true }),
        )
        .await?;

        tx.commit().await?;

        info!(voucher_id = id, "Voucher marked paid");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    use super::*;

    #[tokio::test]
    async fn test_create_pending_voucher() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let id = db
            .vouchers()
            .create_pending(&NewVoucher {
                nome: "Seu Zé".to_string(),
                valor: 50.004,
                observacao: None,
            })
            .await
            .unwrap();

        let pending = db.outbox().list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].table_name, "vale_pendente");
        assert_eq!(pending[0].record_id, Some(id.to_string()));

        let payload = pending[0].payload_object().unwrap();
        assert_eq!(payload["valor"], 50.0);
        assert_eq!(payload["status"], 0);
    }

    #[tokio::test]
    async fn test_mark_paid() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("INSERT INTO vale (id, nome, valor, pago, origem_offline) VALUES (12, 'Ana', 30, 0, 0)")
            .execute(db.pool())
            .await
            .unwrap();

        db.vouchers().mark_paid(12).await.unwrap();

        let (pago, offline): (i64, i64) =
            sqlx::query_as("SELECT pago, origem_offline FROM vale WHERE id = 12")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!((pago, offline), (1, 1));

        let pending = db.outbox().list_pending().await.unwrap();
        assert_eq!(pending[0].operation, OutboxOperation::Update);
        assert_eq!(pending[0].payload_object().unwrap()["pago"], true);

        assert!(matches!(
            db.vouchers().mark_paid(99).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
