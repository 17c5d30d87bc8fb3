//! # Repository Module
//!
//! Database repository implementations for the local store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Their Callers                       │
//! │                                                                         │
//! │  UI write paths                        Sync engine                     │
//! │  ├── db.materials().create_offline()   ├── db.outbox().list_pending()  │
//! │  ├── db.orders().create_pending()      ├── db.outbox().acknowledge()   │
//! │  └── db.vouchers().create_pending()    ├── db.settings().credentials() │
//! │       │                                └── db.tables().replace()       │
//! │       │  entity row + outbox entry            │                         │
//! │       ▼  (one transaction)                    ▼                         │
//! │  SQLite Database ◄──────────────────────────────                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`outbox::OutboxRepository`] - Sync queue management
//! - [`settings::SettingsRepository`] - Credentials, last sync, order codes
//! - [`material::MaterialRepository`] - Offline material writes
//! - [`order::OrderRepository`] - Pending orders and line items
//! - [`voucher::VoucherRepository`] - Vouchers
//! - [`replace::TableReplacer`] - Pull-side table replacement

pub mod material;
pub mod order;
pub mod outbox;
pub mod replace;
pub mod settings;
pub mod voucher;
