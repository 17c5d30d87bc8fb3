//! # Trigger Policy
//!
//! Decides which events start a sync cycle on their own. Manual triggers
//! (`trigger_now` / `sync_now`) always run regardless of the policy.
//!
//! ```text
//! ┌──────────────────────┬──────────────┬──────────────────────────────────┐
//! │ Event                │ ManualTrigger│ ConfiguredTrigger                │
//! ├──────────────────────┼──────────────┼──────────────────────────────────┤
//! │ Startup              │ yes          │ sync.sync_on_startup             │
//! │ CredentialsChanged   │ no           │ sync.sync_on_credentials_change  │
//! │ ConnectivityRestored │ no           │ sync.sync_on_reconnect           │
//! └──────────────────────┴──────────────┴──────────────────────────────────┘
//! ```

use std::fmt;

use crate::config::SyncSettings;

/// Events that may start a cycle without an explicit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Startup,
    CredentialsChanged,
    ConnectivityRestored,
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerEvent::Startup => "startup",
            TriggerEvent::CredentialsChanged => "credentials_changed",
            TriggerEvent::ConnectivityRestored => "connectivity_restored",
        };
        f.write_str(name)
    }
}

pub trait TriggerPolicy: Send + Sync {
    fn should_trigger(&self, event: TriggerEvent) -> bool;
}

/// Syncs once at startup; everything else waits for the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualTrigger;

impl TriggerPolicy for ManualTrigger {
    fn should_trigger(&self, event: TriggerEvent) -> bool {
        event == TriggerEvent::Startup
    }
}

/// Policy driven by the `[sync]` section of the config file.
#[derive(Debug, Clone, Copy)]
pub struct ConfiguredTrigger {
    on_startup: bool,
    on_credentials_change: bool,
    on_reconnect: bool,
}

impl From<&SyncSettings> for ConfiguredTrigger {
    fn from(settings: &SyncSettings) -> Self {
        ConfiguredTrigger {
            on_startup: settings.sync_on_startup,
            on_credentials_change: settings.sync_on_credentials_change,
            on_reconnect: settings.sync_on_reconnect,
        }
    }
}

impl TriggerPolicy for ConfiguredTrigger {
    fn should_trigger(&self, event: TriggerEvent) -> bool {
        match event {
            TriggerEvent::Startup => self.on_startup,
            TriggerEvent::CredentialsChanged => self.on_credentials_change,
            TriggerEvent::ConnectivityRestored => self.on_reconnect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_trigger_only_on_startup() {
        assert!(ManualTrigger.should_trigger(TriggerEvent::Startup));
        assert!(!ManualTrigger.should_trigger(TriggerEvent::CredentialsChanged));
        assert!(!ManualTrigger.should_trigger(TriggerEvent::ConnectivityRestored));
    }

    #[test]
    fn test_configured_trigger_follows_settings() {
        let defaults = ConfiguredTrigger::from(&SyncSettings::default());
        assert!(defaults.should_trigger(TriggerEvent::Startup));
        assert!(!defaults.should_trigger(TriggerEvent::ConnectivityRestored));

        let eager = ConfiguredTrigger::from(&SyncSettings {
            sync_on_startup: false,
            sync_on_reconnect: true,
            sync_on_credentials_change: true,
            ..Default::default()
        });
        assert!(!eager.should_trigger(TriggerEvent::Startup));
        assert!(eager.should_trigger(TriggerEvent::CredentialsChanged));
        assert!(eager.should_trigger(TriggerEvent::ConnectivityRestored));
    }
}
