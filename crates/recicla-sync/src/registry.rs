//! # Entity Registry
//!
//! Name and shape translation between local tables and the remote backend.
//!
//! ## Push Routes
//! ```text
//! ┌─────────────────┬──────────────┬──────────────┬──────────────────────────────┐
//! │ Local table     │ Remote table │ Conflict key │ Payload mapping              │
//! ├─────────────────┼──────────────┼──────────────┼──────────────────────────────┤
//! │ material        │ material     │ nome         │ drop id, ativo 0/1 → bool    │
//! │ vale            │ vale         │ (id)         │ pago 0/1 → bool              │
//! │ vale_pendente   │ vale         │ -            │ drop id, status → pago bool  │
//! │ pendencia       │ pendencia    │ (id)         │ as is                        │
//! │ pedido_pendente │ pedido       │ codigo       │ drop id                      │
//! │ item_pedido     │ item         │ -            │ codigo_pedido → pedido_id,   │
//! │                 │              │              │ material_nome → material_id  │
//! │ ultimo_item     │ (local only) │ -            │ never pushed                 │
//! │ anything else   │ same name    │ (id)         │ as is                        │
//! └─────────────────┴──────────────┴──────────────┴──────────────────────────────┘
//! ```
//! `data_sync` and `origem_offline` never leave the device.
//!
//! ## Pull Plan
//! Materials first so line items pulled later can refer to them; the two
//! report views last.

use serde_json::Value;

use recicla_core::{JsonRow, BOOKKEEPING_COLUMNS};
use recicla_db::ReplaceStrategy;

// =============================================================================
// Descriptors
// =============================================================================

/// A remote id the payload must carry before the push, found by natural key
/// when the device doesn't know it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKeyRef {
    /// Remote column receiving the id (`pedido_id`).
    pub id_field: &'static str,
    /// Payload field holding the natural key (`codigo_pedido`).
    pub natural_field: &'static str,
    /// Remote table to search (`pedido`).
    pub remote_table: &'static str,
    /// Column matched against the natural key (`codigo`).
    pub remote_key: &'static str,
}

/// How one local table is pushed.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    pub local_table: &'static str,
    /// `None` for local-only tables.
    pub remote_table: Option<&'static str>,
    /// Natural key for upserts; `None` means inserts are plain and updates
    /// upsert on `id`.
    pub conflict_key: Option<&'static str>,
    /// Whether the local table has an `origem_offline` flag to clear.
    pub tracks_offline: bool,
    pub references: &'static [ForeignKeyRef],
    /// Local payload to remote row.
    pub to_remote: fn(JsonRow) -> JsonRow,
}

/// Resolved push route for an outbox `table_name`.
#[derive(Debug, Clone, Copy)]
pub struct Route<'a> {
    pub local_table: &'a str,
    pub remote_table: Option<&'a str>,
    pub conflict_key: Option<&'a str>,
    pub tracks_offline: bool,
    pub references: &'a [ForeignKeyRef],
    to_remote: fn(JsonRow) -> JsonRow,
}

impl Route<'_> {
    pub fn is_local_only(&self) -> bool {
        self.remote_table.is_none()
    }

    /// Maps a payload to the row sent to the remote.
    pub fn remote_row(&self, payload: JsonRow) -> JsonRow {
        let mut row = (self.to_remote)(payload);
        for column in BOOKKEEPING_COLUMNS {
            row.remove(column);
        }
        row
    }
}

/// One table refreshed by the pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullTable {
    pub remote_table: &'static str,
    pub local_table: &'static str,
    pub strategy: ReplaceStrategy,
}

// =============================================================================
// Registry
// =============================================================================

/// Push routes and pull plan.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    entities: Vec<EntityDescriptor>,
    pull_plan: Vec<PullTable>,
}

const ITEM_REFERENCES: &[ForeignKeyRef] = &[
    ForeignKeyRef {
        id_field: "pedido_id",
        natural_field: "codigo_pedido",
        remote_table: "pedido",
        remote_key: "codigo",
    },
    ForeignKeyRef {
        id_field: "material_id",
        natural_field: "material_nome",
        remote_table: "material",
        remote_key: "nome",
    },
];

impl EntityRegistry {
    pub fn new(entities: Vec<EntityDescriptor>, pull_plan: Vec<PullTable>) -> Self {
        EntityRegistry {
            entities,
            pull_plan,
        }
    }

    /// Routes and plan of the Recicla schema.
    pub fn standard() -> Self {
        let entities = vec![
            EntityDescriptor {
                local_table: "material",
                remote_table: Some("material"),
                conflict_key: Some("nome"),
                tracks_offline: true,
                references: &[],
                to_remote: material_to_remote,
            },
            EntityDescriptor {
                local_table: "vale",
                remote_table: Some("vale"),
                conflict_key: None,
                tracks_offline: true,
                references: &[],
                to_remote: vale_to_remote,
            },
            EntityDescriptor {
                local_table: "vale_pendente",
                remote_table: Some("vale"),
                conflict_key: None,
                tracks_offline: true,
                references: &[],
                to_remote: pending_voucher_to_remote,
            },
            EntityDescriptor {
                local_table: "pendencia",
                remote_table: Some("pendencia"),
                conflict_key: None,
                tracks_offline: true,
                references: &[],
                to_remote: as_is,
            },
            EntityDescriptor {
                local_table: "pedido_pendente",
                remote_table: Some("pedido"),
                conflict_key: Some("codigo"),
                tracks_offline: true,
                references: &[],
                to_remote: without_local_id,
            },
            EntityDescriptor {
                local_table: "item_pedido",
                remote_table: Some("item"),
                conflict_key: None,
                tracks_offline: true,
                references: ITEM_REFERENCES,
                to_remote: line_item_to_remote,
            },
            EntityDescriptor {
                local_table: "ultimo_item",
                remote_table: None,
                conflict_key: None,
                tracks_offline: false,
                references: &[],
                to_remote: as_is,
            },
        ];

        let pull_plan = vec![
            PullTable {
                remote_table: "material",
                local_table: "material",
                strategy: ReplaceStrategy::PreserveOffline,
            },
            PullTable {
                remote_table: "vale",
                local_table: "vale",
                strategy: ReplaceStrategy::Full,
            },
            PullTable {
                remote_table: "pendencia",
                local_table: "pendencia",
                strategy: ReplaceStrategy::Full,
            },
            PullTable {
                remote_table: "pedido",
                local_table: "pedido",
                strategy: ReplaceStrategy::Full,
            },
            PullTable {
                remote_table: "item",
                local_table: "item",
                strategy: ReplaceStrategy::Full,
            },
            PullTable {
                remote_table: "relatorio_diario",
                local_table: "relatorio",
                strategy: ReplaceStrategy::Full,
            },
            PullTable {
                remote_table: "estoque_financeiro",
                local_table: "estoque_financeiro",
                strategy: ReplaceStrategy::Singleton,
            },
        ];

        EntityRegistry::new(entities, pull_plan)
    }

    pub fn descriptor(&self, local_table: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|d| d.local_table == local_table)
    }

    /// Push route for `table`. Unregistered tables go to the remote table of
    /// the same name and update on `id`.
    pub fn route<'a>(&'a self, table: &'a str) -> Route<'a> {
        match self.descriptor(table) {
            Some(d) => Route {
                local_table: d.local_table,
                remote_table: d.remote_table,
                conflict_key: d.conflict_key,
                tracks_offline: d.tracks_offline,
                references: d.references,
                to_remote: d.to_remote,
            },
            None => Route {
                local_table: table,
                remote_table: Some(table),
                conflict_key: None,
                tracks_offline: false,
                references: &[],
                to_remote: as_is,
            },
        }
    }

    pub fn pull_plan(&self) -> &[PullTable] {
        &self.pull_plan
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        EntityRegistry::standard()
    }
}

// =============================================================================
// Payload Mapping
// =============================================================================

fn as_is(row: JsonRow) -> JsonRow {
    row
}

fn without_local_id(mut row: JsonRow) -> JsonRow {
    row.remove("id");
    row
}

fn material_to_remote(row: JsonRow) -> JsonRow {
    let mut row = without_local_id(row);
    coerce_flag(&mut row, "ativo");
    row
}

fn vale_to_remote(mut row: JsonRow) -> JsonRow {
    coerce_flag(&mut row, "pago");
    row
}

fn pending_voucher_to_remote(row: JsonRow) -> JsonRow {
    let mut row = without_local_id(row);
    if let Some(status) = row.remove("status") {
        row.insert("pago".to_string(), status);
    }
    coerce_flag(&mut row, "pago");
    row
}

fn line_item_to_remote(row: JsonRow) -> JsonRow {
    let mut row = without_local_id(row);
    for local in ["codigo_pedido", "material_nome", "pedido_pendente_id"] {
        row.remove(local);
    }
    row
}

/// SQLite 0/1 flags become JSON booleans.
fn coerce_flag(row: &mut JsonRow, field: &str) {
    let Some(value) = row.get_mut(field) else {
        return;
    };
    let flag = match value {
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    };
    if let Some(flag) = flag {
        *value = Value::Bool(flag);
    }
}
