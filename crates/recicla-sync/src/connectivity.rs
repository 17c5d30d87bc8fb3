//! # Connectivity
//!
//! The engine asks a [`ConnectivityMonitor`] whether the network is up at
//! the start of every cycle. The platform layer owns the real signal; it
//! flips [`ManualConnectivity`] and calls
//! [`crate::SyncAgent::notify_connectivity_changed`].

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

/// Source of the "network reachable" signal.
#[async_trait]
pub trait ConnectivityMonitor: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Connectivity flag set from outside.
#[derive(Debug)]
pub struct ManualConnectivity {
    online: AtomicBool,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        ManualConnectivity {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for ManualConnectivity {
    /// Starts online; the first failed request says otherwise soon enough.
    fn default() -> Self {
        ManualConnectivity::new(true)
    }
}

#[async_trait]
impl ConnectivityMonitor for ManualConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
