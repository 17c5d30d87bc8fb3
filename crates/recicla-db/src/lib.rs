//! # recicla-db: Database Layer for Recicla
//!
//! Local SQLite storage for the offline-first app: entity tables, the sync
//! outbox, the settings store and the table-replace primitive the pull path
//! writes through.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Recicla Data Flow                                │
//! │                                                                         │
//! │  UI screens                        recicla-sync (push / pull)          │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    recicla-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌───────────────┐ │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations   │ │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)   │ │   │
//! │  │   │               │◄───│ Outbox         │   │ 001_initial   │ │   │
//! │  │   │ SqlitePool    │    │ Settings       │   │ 002_outbox_   │ │   │
//! │  │   │ WAL, FKs on   │    │ Material/Order │   │     retry     │ │   │
//! │  │   │               │    │ Voucher/Replace│   │               │ │   │
//! │  │   └───────────────┘    └────────────────┘   └───────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (app data dir)/recicla.db                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use recicla_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/recicla.db")).await?;
//!
//! let material = db.materials().create_offline(&new_material).await?;
//! let pending = db.outbox().count_pending().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::material::MaterialRepository;
pub use repository::order::OrderRepository;
pub use repository::outbox::{LocalAck, OutboxRepository};
pub use repository::replace::{ReplaceStrategy, TableReplacer};
pub use repository::settings::SettingsRepository;
pub use repository::voucher::VoucherRepository;
