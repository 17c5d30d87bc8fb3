//! # Remote Client
//!
//! Table-scoped access to the remote backend. The engine only ever talks to
//! the remote through [`RemoteClient`], so tests swap in a scripted fake and
//! production uses [`crate::postgrest::PostgrestClient`].
//!
//! ## Operations
//! ```text
//! ┌──────────────┬────────────────────────────────────┬────────────────────┐
//! │ Method       │ Meaning                            │ Used by            │
//! ├──────────────┼────────────────────────────────────┼────────────────────┤
//! │ select_all   │ every row of a table / view        │ pull               │
//! │ find_id      │ id of the row where column = value │ push (FK lookup)   │
//! │ insert       │ plain insert, returns the row      │ push INSERT        │
//! │ upsert       │ insert or merge on a conflict key  │ push INSERT/UPDATE │
//! │ delete       │ delete by id                       │ push DELETE        │
//! └──────────────┴────────────────────────────────────┴────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use recicla_core::{JsonRow, RemoteCredentials};

/// Table-scoped operations against the remote backend.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetches every row of `table`.
    async fn select_all(&self, table: &str) -> SyncResult<Vec<JsonRow>>;

    /// Looks up the `id` of the first row where `column` equals `value`.
    async fn find_id(&self, table: &str, column: &str, value: &Value) -> SyncResult<Option<i64>>;

    /// Inserts a row and returns the stored representation.
    async fn insert(&self, table: &str, row: &JsonRow) -> SyncResult<Value>;

    /// Inserts or merges a row on `on_conflict` and returns the stored
    /// representation. Repeating the call is harmless.
    async fn upsert(&self, table: &str, row: &JsonRow, on_conflict: &str) -> SyncResult<Value>;

    /// Deletes the row with the given id. Deleting a missing row succeeds.
    async fn delete(&self, table: &str, id: &str) -> SyncResult<()>;
}

/// Builds remote clients from credentials. The engine calls it lazily and
/// again whenever the stored credentials change.
pub trait RemoteClientFactory: Send + Sync {
    fn build(&self, credentials: &RemoteCredentials) -> SyncResult<Arc<dyn RemoteClient>>;
}

impl<F> RemoteClientFactory for F
where
    F: Fn(&RemoteCredentials) -> SyncResult<Arc<dyn RemoteClient>> + Send + Sync,
{
    fn build(&self, credentials: &RemoteCredentials) -> SyncResult<Arc<dyn RemoteClient>> {
        self(credentials)
    }
}

/// Runs one remote call under a deadline. Expiry is reported as
/// [`SyncError::Timeout`], which is retryable.
pub(crate) async fn with_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = SyncResult<T>>,
) -> SyncResult<T> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::Timeout(deadline.as_secs())),
    }
}
