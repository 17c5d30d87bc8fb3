//! # recicla-core: Pure Types for the Recicla Sync Engine
//!
//! Shared vocabulary of the workspace: the outbox entry, the sync status
//! seen by the UI, the local entity rows and the validation rules applied
//! before anything touches SQLite or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Recicla Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 UI screens (external callers)                   │   │
//! │  │   Material form ──► Order form ──► Voucher dialog ──► Sync badge│   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               recicla-sync (SyncAgent, push, pull)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    recicla-db (SQLite layer)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ recicla-core (THIS CRATE) ★                     │   │
//! │  │   types • validation • order codes                              │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Outbox entry, sync status, entity rows
//! - [`error`] - Domain error types
//! - [`validation`] - Identifier and input validation
//! - [`order_code`] - Human-readable order codes (`TR-7`)
//!
//! ## Example Usage
//!
//! ```rust
//! use recicla_core::order_code::format_order_code;
//! use recicla_core::OutboxOperation;
//!
//! assert_eq!(format_order_code("TR", 7), "TR-7");
//! assert_eq!("UPDATE".parse::<OutboxOperation>().unwrap(), OutboxOperation::Update);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod order_code;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Column holding the timestamp of the last confirmed sync of a row.
pub const DATA_SYNC_COLUMN: &str = "data_sync";

/// Column flagging a row as created or modified locally and not yet
/// confirmed by the remote backend (1 = pending, 0 = confirmed).
pub const OFFLINE_FLAG_COLUMN: &str = "origem_offline";

/// Local bookkeeping columns that never travel to the remote backend.
pub const BOOKKEEPING_COLUMNS: [&str; 2] = [DATA_SYNC_COLUMN, OFFLINE_FLAG_COLUMN];

/// Maximum quantity (kg or units) accepted on a single order line.
pub const MAX_LINE_QUANTITY: f64 = 100_000.0;
