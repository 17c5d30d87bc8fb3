//! # Domain Types
//!
//! Types shared by the database layer, the sync engine and the UI.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  OutboxEntry    │   │   SyncStatus    │   │    Material     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (autoinc)   │   │  is_online      │   │  id             │       │
//! │  │  table_name     │   │  has_credentials│   │  nome (unique)  │       │
//! │  │  operation      │   │  syncing        │   │  preco_compra   │       │
//! │  │  record_id      │   │  last_sync_at   │   │  preco_venda    │       │
//! │  │  payload (JSON) │   │  pending_count  │   │  origem_offline │       │
//! │  │  synced         │   │  last_error     │   │  data_sync      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entity rows keep the Portuguese column names of the backend schema
//! (`nome`, `preco_compra`, `codigo`, ...) so payloads serialize 1:1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// A JSON object as stored in an outbox payload or returned by the remote.
pub type JsonRow = Map<String, Value>;

// =============================================================================
// Outbox Operation
// =============================================================================

/// The kind of remote mutation an outbox entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum OutboxOperation {
    Insert,
    Update,
    Delete,
}

impl OutboxOperation {
    /// Wire name stored in `sync_outbox.operation`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OutboxOperation::Insert => "INSERT",
            OutboxOperation::Update => "UPDATE",
            OutboxOperation::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for OutboxOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutboxOperation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INSERT" => Ok(OutboxOperation::Insert),
            "UPDATE" => Ok(OutboxOperation::Update),
            "DELETE" => Ok(OutboxOperation::Delete),
            other => Err(CoreError::UnknownOperation(other.to_string())),
        }
    }
}

// =============================================================================
// Outbox Entry
// =============================================================================

/// An entry in the durable outbox (`sync_outbox`).
///
/// `payload` is a frozen snapshot of the intended remote change taken at
/// enqueue time; later local edits never rewrite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OutboxEntry {
    /// Auto-increment id; also the FIFO order of the queue.
    pub id: i64,
    /// Logical local table name (`material`, `pedido_pendente`, ...).
    pub table_name: String,
    pub operation: OutboxOperation,
    /// Local row id, when the mutation targets a known row.
    pub record_id: Option<String>,
    /// JSON object text.
    pub payload: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub synced: bool,
    /// Failed delivery attempts (remote errors and malformed payloads).
    pub attempts: i64,
    pub last_error: Option<String>,
    /// Set once a malformed payload exhausted its attempts.
    pub quarantined: bool,
}

impl OutboxEntry {
    /// Parses the payload as a JSON object.
    pub fn payload_object(&self) -> CoreResult<JsonRow> {
        match serde_json::from_str::<Value>(&self.payload) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(CoreError::MalformedPayload {
                entry_id: self.id,
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
            Err(e) => Err(CoreError::MalformedPayload {
                entry_id: self.id,
                reason: e.to_string(),
            }),
        }
    }

    /// Returns the record id when it is present and non-blank.
    pub fn target_record(&self) -> Option<&str> {
        self.record_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// Sync Status
// =============================================================================

/// In-memory status of one sync engine, broadcast to UI subscribers.
///
/// Subscribers always receive a copy; only the engine mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SyncStatus {
    pub is_online: bool,
    pub has_credentials: bool,
    pub syncing: bool,
    #[ts(as = "Option<String>")]
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Outbox depth at the start of the most recent push.
    pub pending_count: i64,
    pub last_error: Option<String>,
}

impl SyncStatus {
    /// True when a cycle would actually talk to the remote backend.
    pub fn can_sync(&self) -> bool {
        self.is_online && self.has_credentials
    }
}

// =============================================================================
// Remote Credentials
// =============================================================================

/// Endpoint and access key of the remote backend, read from settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub url: String,
    pub key: String,
}

impl RemoteCredentials {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        RemoteCredentials {
            url: url.into(),
            key: key.into(),
        }
    }

    /// Both fields present and non-blank.
    pub fn is_complete(&self) -> bool {
        !self.url.trim().is_empty() && !self.key.trim().is_empty()
    }
}

// =============================================================================
// Material
// =============================================================================

/// A recyclable material with buy and sell prices per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Material {
    pub id: i64,
    /// Natural key, unique both locally and remotely.
    pub nome: String,
    pub categoria: Option<String>,
    pub preco_compra: f64,
    pub preco_venda: f64,
    pub unidade: String,
    pub ativo: bool,
    #[ts(as = "Option<String>")]
    pub data_sync: Option<DateTime<Utc>>,
    pub origem_offline: bool,
}

/// Input for creating a material while offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMaterial {
    pub nome: String,
    pub categoria: Option<String>,
    pub preco_compra: f64,
    pub preco_venda: f64,
    pub unidade: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

/// Direction of an order: buying scrap from a supplier or selling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum OrderKind {
    Compra,
    Venda,
}

impl OrderKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Compra => "compra",
            OrderKind::Venda => "venda",
        }
    }
}

/// One line of a new order. The material is referenced by name because
/// its numeric id may not be known while offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub material_nome: String,
    /// Numeric material id when already known (synced material).
    pub material_id: Option<i64>,
    pub quantidade: f64,
    pub preco_unitario: f64,
}

impl NewLineItem {
    /// Line subtotal rounded to centavos.
    pub fn subtotal(&self) -> f64 {
        round_currency(self.quantidade * self.preco_unitario)
    }
}

/// Input for an order created on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub tipo: OrderKind,
    pub cliente: Option<String>,
    pub observacao: Option<String>,
    pub itens: Vec<NewLineItem>,
}

impl NewOrder {
    /// Order total rounded to centavos.
    pub fn total(&self) -> f64 {
        round_currency(self.itens.iter().map(NewLineItem::subtotal).sum())
    }
}

/// Result of creating a pending order locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: i64,
    pub codigo: String,
    pub total: f64,
    pub item_ids: Vec<i64>,
}

// =============================================================================
// Vouchers
// =============================================================================

/// Input for a voucher (cash advance) issued on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVoucher {
    pub nome: String,
    pub valor: f64,
    pub observacao: Option<String>,
}

/// Rounds a currency amount to two decimal places.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Unit Tests
// =============================================================================
