//! # recicla-sync: Sync Engine for Recicla
//!
//! Offline-first synchronization between the local SQLite store and a
//! PostgREST-style remote backend. Every local write lands in the store
//! together with an outbox entry; the engine later pushes the outbox and
//! pulls fresh copies of the remote tables.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Agent Architecture                          │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      SyncAgent (Main Orchestrator)               │  │
//! │  │                                                                  │  │
//! │  │  initialize() at startup, trigger_now() from the UI              │  │
//! │  │  One cycle at a time: push, then pull                            │  │
//! │  │  Status broadcast to subscribers and the event emitter           │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ OutboxProcessor│  │  RemoteClient  │  │  InboundHandler        │    │
//! │  │                │  │                │  │                        │    │
//! │  │ FIFO outbox    │  │ PostgREST over │  │ Fetches remote tables  │    │
//! │  │ FK resolution  │  │ reqwest, retry │  │ Replaces local copies  │    │
//! │  │ Deferral       │  │ on reads       │  │ (offline rows kept)    │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  Seams: SettingsStore, ConnectivityMonitor, TriggerPolicy,             │
//! │         RemoteClientFactory, SyncEventEmitter                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`agent`] - Main `SyncAgent` orchestrator and builder
//! - [`config`] - Engine configuration (TOML + environment)
//! - [`connectivity`] - Network reachability seam
//! - [`error`] - Sync error types
//! - [`inbound`] - Pull pipeline
//! - [`logging`] - Tracing subscriber setup
//! - [`outbox`] - Push pipeline
//! - [`policy`] - Which events start a cycle
//! - [`postgrest`] - HTTP remote client
//! - [`registry`] - Local/remote table mapping and pull plan
//! - [`remote`] - Remote client trait
//! - [`settings`] - Settings store seam
//! - [`status`] - Status subscription plumbing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use recicla_db::{Database, DbConfig};
//! use recicla_sync::{init_tracing, SyncAgent, SyncConfig};
//!
//! init_tracing();
//! let config = SyncConfig::load_or_default(None);
//! let db = Arc::new(Database::new(DbConfig::new(config.database_path())).await?);
//!
//! let agent = SyncAgent::new(config, db)?;
//! let _sub = agent.subscribe(|status| println!("syncing: {}", status.syncing));
//! agent.initialize().await?;
//!
//! // later, from a "sync" button
//! agent.trigger_now();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod inbound;
pub mod logging;
pub mod outbox;
pub mod policy;
pub mod postgrest;
pub mod registry;
pub mod remote;
pub mod settings;
pub mod status;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{CycleOutcome, SkipReason, SyncAgent, SyncAgentBuilder};
pub use config::{RemoteSettings, SyncConfig, SyncSettings};
pub use connectivity::{ConnectivityMonitor, ManualConnectivity};
pub use error::{SyncError, SyncResult};
pub use inbound::{InboundHandler, PullReport};
pub use logging::init_tracing;
pub use outbox::{OutboxProcessor, PushReport};
pub use policy::{ConfiguredTrigger, ManualTrigger, TriggerEvent, TriggerPolicy};
pub use postgrest::{PostgrestClient, PostgrestFactory};
pub use recicla_core::SyncStatus;
pub use registry::{EntityRegistry, PullTable};
pub use remote::{RemoteClient, RemoteClientFactory};
pub use settings::SettingsStore;
pub use status::{NoOpEmitter, Subscription, SyncEventEmitter};
