//! # Material Repository
//!
//! Materials can be created and repriced offline. Each write updates the
//! `material` row and appends its outbox entry in one transaction; the row
//! stays flagged `origem_offline = 1` until the push is acknowledged, which
//! also shields it from the next pull's delete.

use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::outbox::OutboxRepository;
use recicla_core::validation::{validate_material_name, validate_price};
use recicla_core::{Material, NewMaterial, OutboxOperation};

const DEFAULT_UNIT: &str = "kg";

const SELECT_MATERIAL: &str = r#"
    SELECT id,
           nome,
           categoria,
           COALESCE(preco_compra, 0.0) AS preco_compra,
           COALESCE(preco_venda, 0.0) AS preco_venda,
           COALESCE(unidade, 'kg') AS unidade,
           COALESCE(ativo, 1) AS ativo,
           data_sync,
           origem_offline
    FROM material
"#;

/// Repository for material reads and offline writes.
#[derive(Debug, Clone)]
pub struct MaterialRepository {
    pool: SqlitePool,
}

impl MaterialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MaterialRepository { pool }
    }

    /// Creates a material locally and queues its remote insert.
    ///
    /// The outbox entry carries no record id: the remote row is matched by
    /// `nome`, which is also how the push acknowledges the local row.
    pub async fn create_offline(&self, input: &NewMaterial) -> DbResult<Material> {
        let nome = input.nome.trim();
        validate_material_name(nome)?;
        validate_price("preco_compra", input.preco_compra)?;
        validate_price("preco_venda", input.preco_venda)?;

        let unidade = input
            .unidade
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_UNIT);

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO material (nome, categoria, preco_compra, preco_venda, unidade, ativo, origem_offline)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, 1)
            "#,
        )
        .bind(nome)
        .bind(&input.categoria)
        .bind(input.preco_compra)
        .bind(input.preco_venda)
        .bind(unidade)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: nome.to_string(),
            },
            other => other,
        })?
        .last_insert_rowid();

        let payload = json!({
            "nome": nome,
            "categoria": input.categoria,
            "preco_compra": input.preco_compra,
            "preco_venda": input.preco_venda,
            "unidade": unidade,
            "ativo": true,
        });
        OutboxRepository::enqueue_in(&mut tx, "material", OutboxOperation::Insert, None, &payload)
            .await?;

        tx.commit().await?;

        info!(material_id = id, nome = %nome, "Material created offline");

        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("Material", id.to_string()))
    }

    /// Changes the prices of a material and queues the remote update.
    pub async fn update_prices(&self, id: i64, preco_compra: f64, preco_venda: f64) -> DbResult<Material> {
        validate_price("preco_compra", preco_compra)?;
        validate_price("preco_venda", preco_venda)?;

        let mut tx = self.pool.begin().await?;

        let nome: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE material SET
                preco_compra = ?2,
                preco_venda = ?3,
                origem_offline = 1
            WHERE id = ?1
            RETURNING nome
            "#,
        )
        .bind(id)
        .bind(preco_compra)
        .bind(preco_venda)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(nome) = nome else {
            return Err(DbError::not_found("Material", id.to_string()));
        };

        let payload = json!({
            "nome": nome,
            "preco_compra": preco_compra,
            "preco_venda": preco_venda,
        });
        let record_id = id.to_string();
        OutboxRepository::enqueue_in(
            &mut tx,
            "material",
            OutboxOperation::Update,
            Some(&record_id),
            &payload,
        )
        .await?;

        tx.commit().await?;

        info!(material_id = id, nome = %nome, preco_compra, preco_venda, "Material repriced");

        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("Material", id.to_string()))
    }

    pub async fn find(&self, id: i64) -> DbResult<Option<Material>> {
        let material = sqlx::query_as::<_, Material>(&format!("{SELECT_MATERIAL} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(material)
    }

    pub async fn find_by_name(&self, nome: &str) -> DbResult<Option<Material>> {
        let material = sqlx::query_as::<_, Material>(&format!("{SELECT_MATERIAL} WHERE nome = ?1"))
            .bind(nome.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(material)
    }

    /// Active materials ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<Material>> {
        let materials = sqlx::query_as::<_, Material>(&format!(
            "{SELECT_MATERIAL} WHERE COALESCE(ativo, 1) = 1 ORDER BY nome"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(materials)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
