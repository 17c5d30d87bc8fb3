//! # Sync Agent
//!
//! Main orchestrator for the sync engine. Runs push-then-pull cycles and
//! owns the status every screen renders.
//!
//! ## Cycle State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncAgent Cycle                                  │
//! │                                                                         │
//! │  trigger_now() / sync_now() / startup                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  another cycle in flight? ──yes──► coalesced (logged, nothing to do)   │
//! │         │ no                                                            │
//! │         ▼                                                               │
//! │  refresh isOnline + hasCredentials ──► broadcast                       │
//! │         │                                                               │
//! │  no credentials / offline ──► idle (no syncing, no error)              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  syncing = true, lastError = None ──► broadcast                        │
//! │         │                                                               │
//! │         ├── push (OutboxProcessor)                                      │
//! │         └── pull (InboundHandler)                                       │
//! │         │                                                               │
//! │  ok  ──► lastSyncAt = now (persisted)                                  │
//! │  err ──► lastError = message                                            │
//! │         │                                                               │
//! │  ALWAYS (drop guard, also on panic):                                    │
//! │  syncing = false ──► broadcast                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Credential saves and connectivity changes refresh the status; whether
//! they also start a cycle is up to the [`TriggerPolicy`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use recicla_core::{RemoteCredentials, SyncStatus};
use recicla_db::Database;

use crate::config::SyncConfig;
use crate::connectivity::{ConnectivityMonitor, ManualConnectivity};
use crate::error::{SyncError, SyncResult};
use crate::inbound::{InboundHandler, PullReport};
use crate::outbox::{OutboxProcessor, PushReport};
use crate::policy::{ConfiguredTrigger, TriggerEvent, TriggerPolicy};
use crate::postgrest::PostgrestFactory;
use crate::registry::EntityRegistry;
use crate::remote::{RemoteClient, RemoteClientFactory};
use crate::settings::SettingsStore;
use crate::status::{NoOpEmitter, StatusBoard, Subscription, SyncEventEmitter};

// =============================================================================
// Cycle Outcome
// =============================================================================

/// Why a cycle ended without syncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingCredentials,
    Offline,
}

/// Result of one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed { push: PushReport, pull: PullReport },
    /// The cycle ran and stopped on an error (also in `last_error`).
    Failed(String),
    Skipped(SkipReason),
    /// Another cycle was already running.
    Coalesced,
}

// =============================================================================
// Sync Agent
// =============================================================================

/// Main sync agent. Cloning is cheap; clones share one engine.
#[derive(Clone)]
pub struct SyncAgent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    config: SyncConfig,
    db: Arc<Database>,
    settings: Arc<dyn SettingsStore>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    policy: Arc<dyn TriggerPolicy>,
    factory: Arc<dyn RemoteClientFactory>,
    registry: Arc<EntityRegistry>,
    board: Arc<StatusBoard>,
    /// Client built for the credentials it was built from.
    client: Mutex<Option<(RemoteCredentials, Arc<dyn RemoteClient>)>>,
    in_flight: Arc<Mutex<()>>,
}

impl SyncAgent {
    /// Creates an agent with the HTTP remote, the SQLite settings store and
    /// a connectivity flag that starts online. Fails when `config` doesn't
    /// validate.
    pub fn new(config: SyncConfig, db: Arc<Database>) -> SyncResult<Self> {
        config.validate()?;
        Ok(SyncAgentBuilder::new(config).assemble(db))
    }

    /// Loads the persisted status, then starts the startup cycle if the
    /// trigger policy allows it.
    pub async fn initialize(&self) -> SyncResult<Option<JoinHandle<CycleOutcome>>> {
        let last_sync_at = self.inner.settings.last_sync_at().await?;
        let has_credentials = self.inner.settings.credentials().await?.is_some();
        let pending_count = self.inner.db.outbox().count_pending().await?;
        let is_online = self.inner.connectivity.is_online().await;

        self.inner.board.update(|s| {
            s.last_sync_at = last_sync_at;
            s.has_credentials = has_credentials;
            s.pending_count = pending_count;
            s.is_online = is_online;
        });

        info!(
            has_credentials,
            is_online,
            pending_count,
            last_sync_at = ?last_sync_at,
            "Sync agent initialized"
        );

        Ok(self.trigger_if(TriggerEvent::Startup))
    }

    /// Current status snapshot.
    pub fn status(&self) -> SyncStatus {
        self.inner.board.snapshot()
    }

    /// Calls `listener` now with the current status and again after every
    /// change, until the returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SyncStatus) + Send + Sync + 'static,
    {
        self.inner.board.subscribe(Arc::new(listener))
    }

    /// Starts a cycle in the background.
    pub fn trigger_now(&self) -> JoinHandle<CycleOutcome> {
        let agent = self.clone();
        tokio::spawn(async move { agent.sync_now().await })
    }

    /// Re-reads credential presence and broadcasts it. The cached remote
    /// client is dropped so the next cycle uses the new credentials.
    pub async fn notify_credentials_changed(&self) -> Option<JoinHandle<CycleOutcome>> {
        self.inner.client.lock().await.take();

        let has_credentials = self.read_credentials().await.is_some();
        self.inner.board.update(|s| s.has_credentials = has_credentials);
        info!(has_credentials, "Remote credentials changed");

        self.trigger_if(TriggerEvent::CredentialsChanged)
    }

    /// Records a connectivity transition reported by the platform.
    pub fn notify_connectivity_changed(&self, online: bool) -> Option<JoinHandle<CycleOutcome>> {
        let was_online = self.inner.board.snapshot().is_online;
        self.inner.board.update(|s| s.is_online = online);

        if online == was_online {
            return None;
        }
        info!(online, "Connectivity changed");

        if online {
            self.trigger_if(TriggerEvent::ConnectivityRestored)
        } else {
            None
        }
    }

    /// Runs one cycle and waits for it.
    pub async fn sync_now(&self) -> CycleOutcome {
        let Ok(_in_flight) = self.inner.in_flight.clone().try_lock_owned() else {
            info!("Sync already in progress, trigger coalesced");
            return CycleOutcome::Coalesced;
        };

        let is_online = self.inner.connectivity.is_online().await;
        let credentials = self.read_credentials().await;
        self.inner.board.update(|s| {
            s.is_online = is_online;
            s.has_credentials = credentials.is_some();
        });

        let Some(credentials) = credentials else {
            debug!("No remote credentials, sync skipped");
            return CycleOutcome::Skipped(SkipReason::MissingCredentials);
        };
        if !is_online {
            debug!("Offline, sync skipped");
            return CycleOutcome::Skipped(SkipReason::Offline);
        }

        info!("Sync cycle started");
        self.inner.board.update(|s| {
            s.syncing = true;
            s.last_error = None;
        });
        let mut settle = Settle::new(self.inner.board.clone());

        let outcome = match self.run_cycle(&credentials).await {
            Ok((push, pull)) => {
                let now = Utc::now();
                if let Err(e) = self.inner.settings.set_last_sync_at(now).await {
                    warn!(error = %e, "Failed to persist last sync time");
                }
                settle.last_sync_at = Some(now);

                info!(
                    pushed = push.pushed,
                    deferred = push.deferred,
                    failed = push.failed,
                    tables_refreshed = pull.tables_refreshed,
                    tables_failed = pull.tables_failed,
                    "Sync cycle completed"
                );
                CycleOutcome::Completed { push, pull }
            }
            Err(e) => {
                error!(error = %e, "Sync cycle failed");
                settle.error = Some(e.to_string());
                CycleOutcome::Failed(e.to_string())
            }
        };

        match self.inner.db.outbox().count_pending().await {
            Ok(pending) => settle.pending_count = Some(pending),
            Err(e) => warn!(error = %e, "Failed to count pending outbox entries"),
        }

        outcome
    }

    async fn run_cycle(
        &self,
        credentials: &RemoteCredentials,
    ) -> SyncResult<(PushReport, PullReport)> {
        let client = self.remote_client(credentials).await?;
        let timeout = self.inner.config.request_timeout();
        let board = &self.inner.board;

        let processor = OutboxProcessor::new(
            self.inner.db.outbox(),
            client.clone(),
            self.inner.registry.clone(),
            timeout,
            self.inner.config.sync.max_malformed_attempts,
        );
        let push = processor
            .push(|pending| board.update(|s| s.pending_count = pending))
            .await?;

        let inbound = InboundHandler::new(self.inner.db.tables(), client, timeout);
        let pull = inbound.pull(self.inner.registry.pull_plan()).await?;

        Ok((push, pull))
    }

    /// Cached client for `credentials`, rebuilt when they change.
    async fn remote_client(
        &self,
        credentials: &RemoteCredentials,
    ) -> SyncResult<Arc<dyn RemoteClient>> {
        let mut cached = self.inner.client.lock().await;

        if let Some((built_for, client)) = cached.as_ref() {
            if built_for == credentials {
                return Ok(client.clone());
            }
        }

        info!(url = %credentials.url, "Building remote client");
        let client = self.inner.factory.build(credentials)?;
        *cached = Some((credentials.clone(), client.clone()));
        Ok(client)
    }

    async fn read_credentials(&self) -> Option<RemoteCredentials> {
        match self.inner.settings.credentials().await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Failed to read remote credentials");
                None
            }
        }
    }

    fn trigger_if(&self, event: TriggerEvent) -> Option<JoinHandle<CycleOutcome>> {
        if self.inner.policy.should_trigger(event) {
            debug!(event = %event, "Trigger policy starts a cycle");
            Some(self.trigger_now())
        } else {
            None
        }
    }
}

impl std::fmt::Debug for SyncAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncAgent")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Settle Guard
// =============================================================================

/// Leaves the `syncing` state when dropped, whichever way the cycle ends.
struct Settle {
    board: Arc<StatusBoard>,
    last_sync_at: Option<DateTime<Utc>>,
    error: Option<String>,
    pending_count: Option<i64>,
}

impl Settle {
    fn new(board: Arc<StatusBoard>) -> Self {
        Settle {
            board,
            last_sync_at: None,
            error: None,
            pending_count: None,
        }
    }
}

impl Drop for Settle {
    fn drop(&mut self) {
        let error = match self.error.take() {
            Some(message) => Some(message),
            None if std::thread::panicking() => Some("sync cycle aborted unexpectedly".to_string()),
            None => None,
        };
        let last_sync_at = self.last_sync_at;
        let pending_count = self.pending_count;

        self.board.update(|s| {
            s.syncing = false;
            if let Some(at) = last_sync_at {
                s.last_sync_at = Some(at);
            }
            if let Some(message) = error {
                s.last_error = Some(message);
            }
            if let Some(pending) = pending_count {
                s.pending_count = pending;
            }
        });
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating SyncAgent with options.
pub struct SyncAgentBuilder {
    config: SyncConfig,
    db: Option<Arc<Database>>,
    emitter: Option<Arc<dyn SyncEventEmitter>>,
    settings: Option<Arc<dyn SettingsStore>>,
    connectivity: Option<Arc<dyn ConnectivityMonitor>>,
    policy: Option<Arc<dyn TriggerPolicy>>,
    factory: Option<Arc<dyn RemoteClientFactory>>,
    registry: Option<EntityRegistry>,
}

impl SyncAgentBuilder {
    /// Creates a new builder with the given config.
    pub fn new(config: SyncConfig) -> Self {
        SyncAgentBuilder {
            config,
            db: None,
            emitter: None,
            settings: None,
            connectivity: None,
            policy: None,
            factory: None,
            registry: None,
        }
    }

    /// Sets the database connection.
    pub fn with_database(mut self, db: Arc<Database>) -> Self {
        self.db = Some(db);
        self
    }

    /// Sets the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn SyncEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Replaces the SQLite settings store.
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn ConnectivityMonitor>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Defaults to the `[sync]` flags of the config.
    pub fn with_trigger_policy(mut self, policy: Arc<dyn TriggerPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Defaults to the PostgREST HTTP client.
    pub fn with_remote_factory(mut self, factory: Arc<dyn RemoteClientFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_registry(mut self, registry: EntityRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Builds the SyncAgent.
    pub fn build(mut self) -> SyncResult<SyncAgent> {
        self.config.validate()?;

        let db = self
            .db
            .take()
            .ok_or_else(|| SyncError::InvalidConfig("Database required".into()))?;

        Ok(self.assemble(db))
    }

    fn assemble(self, db: Arc<Database>) -> SyncAgent {
        let config = self.config;

        let settings = self
            .settings
            .unwrap_or_else(|| Arc::new(db.settings()));
        let connectivity = self
            .connectivity
            .unwrap_or_else(|| Arc::new(ManualConnectivity::default()));
        let policy = self
            .policy
            .unwrap_or_else(|| Arc::new(ConfiguredTrigger::from(&config.sync)));
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(PostgrestFactory::new(config.remote.clone())));
        let emitter = self.emitter.unwrap_or_else(|| Arc::new(NoOpEmitter));

        SyncAgent {
            inner: Arc::new(AgentInner {
                config,
                db,
                settings,
                connectivity,
                policy,
                factory,
                registry: Arc::new(self.registry.unwrap_or_default()),
                board: Arc::new(StatusBoard::new(SyncStatus::default(), emitter)),
                client: Mutex::new(None),
                in_flight: Arc::new(Mutex::new(())),
            }),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
