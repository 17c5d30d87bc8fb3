//! # Settings Store
//!
//! What the engine needs from persisted settings: the remote credentials
//! and the last successful sync time. Production uses the SQLite
//! `settings` table through [`SettingsRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use recicla_core::RemoteCredentials;
use recicla_db::SettingsRepository;

use crate::error::SyncResult;

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Complete credentials, or `None` when URL or key is missing.
    async fn credentials(&self) -> SyncResult<Option<RemoteCredentials>>;

    async fn last_sync_at(&self) -> SyncResult<Option<DateTime<Utc>>>;

    async fn set_last_sync_at(&self, at: DateTime<Utc>) -> SyncResult<()>;
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn credentials(&self) -> SyncResult<Option<RemoteCredentials>> {
        Ok(SettingsRepository::credentials(self).await?)
    }

    async fn last_sync_at(&self) -> SyncResult<Option<DateTime<Utc>>> {
        Ok(SettingsRepository::last_sync_at(self).await?)
    }

    async fn set_last_sync_at(&self, at: DateTime<Utc>) -> SyncResult<()> {
        Ok(SettingsRepository::set_last_sync_at(self, at).await?)
    }
}

#[cfg(test)]
mod tests {
    use recicla_db::{Database, DbConfig};

    use super::*;

    #[tokio::test]
    async fn test_repository_as_settings_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store: Box<dyn SettingsStore> = Box::new(db.settings());

        assert!(store.credentials().await.unwrap().is_none());
        assert!(store.last_sync_at().await.unwrap().is_none());

        db.settings()
            .save_credentials(&RemoteCredentials::new("https://abc.supabase.co", "anon"))
            .await
            .unwrap();
        let at = Utc::now();
        store.set_last_sync_at(at).await.unwrap();

        assert_eq!(
            store.credentials().await.unwrap().unwrap().url,
            "https://abc.supabase.co"
        );
        assert_eq!(
            store.last_sync_at().await.unwrap().unwrap().timestamp(),
            at.timestamp()
        );
    }
}
