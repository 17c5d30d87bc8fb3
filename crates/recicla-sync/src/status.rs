//! # Status Broadcasting
//!
//! The engine owns one [`SyncStatus`]; every mutation goes through
//! [`StatusBoard::update`], which hands a copy to the event emitter and to
//! every subscriber.
//!
//! ## Subscription Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  agent.subscribe(listener)                                              │
//! │      │                                                                  │
//! │      ├── listener(current status)      immediate call                  │
//! │      ▼                                                                  │
//! │  Subscription ──── every update ────► listener(copy)                   │
//! │      │                                                                  │
//! │      └── unsubscribe() / drop          listener removed                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Listeners are called outside of any lock, so a listener may read the
//! status or drop its own subscription.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use recicla_core::SyncStatus;

// =============================================================================
// Event Emitter
// =============================================================================

/// Receives every status change (implemented by the UI bridge).
pub trait SyncEventEmitter: Send + Sync {
    fn emit_status(&self, status: &SyncStatus);
}

impl<F> SyncEventEmitter for F
where
    F: Fn(&SyncStatus) + Send + Sync,
{
    fn emit_status(&self, status: &SyncStatus) {
        self(status)
    }
}

/// No-op event emitter.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &SyncStatus) {}
}

// =============================================================================
// Status Board
// =============================================================================

type Listener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

/// Current status plus the parties interested in it.
pub(crate) struct StatusBoard {
    status: RwLock<SyncStatus>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
    emitter: Arc<dyn SyncEventEmitter>,
}

impl StatusBoard {
    pub(crate) fn new(initial: SyncStatus, emitter: Arc<dyn SyncEventEmitter>) -> Self {
        StatusBoard {
            status: RwLock::new(initial),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            emitter,
        }
    }

    pub(crate) fn snapshot(&self) -> SyncStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `change` and broadcasts the result.
    pub(crate) fn update(&self, change: impl FnOnce(&mut SyncStatus)) {
        let current = {
            let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
            change(&mut status);
            status.clone()
        };
        self.broadcast(&current);
    }

    fn broadcast(&self, status: &SyncStatus) {
        self.emitter.emit_status(status);

        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(status);
        }
    }

    /// Registers `listener` and calls it once with the current status.
    pub(crate) fn subscribe(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener.clone()));

        listener(&self.snapshot());

        Subscription {
            id,
            board: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(listener_id, _)| *listener_id != id);
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Keeps a status listener registered until unsubscribed or dropped.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    board: Weak<StatusBoard>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keeps the listener for the lifetime of the engine.
    pub fn detach(mut self) {
        self.board = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(board) = self.board.upgrade() {
            board.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<SyncStatus>>>, Listener) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: Listener = Arc::new(move |s: &SyncStatus| sink.lock().unwrap().push(s.clone()));
        (seen, listener)
    }

    #[test]
    fn test_subscribe_calls_immediately() {
        let board = Arc::new(StatusBoard::new(SyncStatus::default(), Arc::new(NoOpEmitter)));
        let (seen, listener) = recorder();

        let _sub = board.subscribe(listener);
        assert_eq!(seen.lock().unwrap().len(), 1);

        board.update(|s| s.pending_count = 3);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].pending_count, 3);
    }

    #[test]
    fn test_unsubscribe_and_drop() {
        let board = Arc::new(StatusBoard::new(SyncStatus::default(), Arc::new(NoOpEmitter)));
        let (seen, listener) = recorder();

        let sub = board.subscribe(listener.clone());
        sub.unsubscribe();
        {
            let _scoped = board.subscribe(listener.clone());
            assert_eq!(board.listener_count(), 1);
        }
        assert_eq!(board.listener_count(), 0);

        board.update(|s| s.syncing = true);
        // two immediate calls, no broadcast after removal
        assert_eq!(seen.lock().unwrap().len(), 2);

        board.subscribe(listener).detach();
        assert_eq!(board.listener_count(), 1);
    }

    #[test]
    fn test_emitter_sees_every_update() {
        let (seen, listener) = recorder();
        let emitter = move |s: &SyncStatus| listener(s);
        let board = StatusBoard::new(SyncStatus::default(), Arc::new(emitter));

        board.update(|s| s.is_online = true);
        board.update(|s| s.syncing = true);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].is_online && seen[1].syncing);
    }
}
