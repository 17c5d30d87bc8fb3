//! In-memory remote used by the engine tests.
//!
//! Rows written through `insert` / `upsert` are what `select_all` returns,
//! so a push followed by a pull behaves like a real backend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use recicla_core::{JsonRow, RemoteCredentials};
use recicla_db::{Database, DbConfig};

use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteClient, RemoteClientFactory};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RemoteCall {
    SelectAll(String),
    FindId {
        table: String,
        column: String,
        value: Value,
    },
    Insert {
        table: String,
        row: JsonRow,
    },
    Upsert {
        table: String,
        row: JsonRow,
        on_conflict: String,
    },
    Delete {
        table: String,
        id: String,
    },
}

impl RemoteCall {
    pub(crate) fn table(&self) -> &str {
        match self {
            RemoteCall::SelectAll(table) => table,
            RemoteCall::FindId { table, .. }
            | RemoteCall::Insert { table, .. }
            | RemoteCall::Upsert { table, .. }
            | RemoteCall::Delete { table, .. } => table,
        }
    }
}

#[derive(Default)]
pub(crate) struct MockRemote {
    rows: Mutex<HashMap<String, Vec<JsonRow>>>,
    calls: Mutex<Vec<RemoteCall>>,
    failing_reads: Mutex<HashSet<String>>,
    failing_writes: Mutex<HashSet<String>>,
    read_hold: Mutex<Option<oneshot::Receiver<()>>>,
    write_hold: Mutex<Option<oneshot::Receiver<()>>>,
    panic_on_read: AtomicBool,
    next_id: AtomicI64,
}

impl MockRemote {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(MockRemote {
            next_id: AtomicI64::new(100),
            ..Default::default()
        })
    }

    pub(crate) fn seed(&self, table: &str, rows: Vec<Value>) {
        let rows = rows
            .into_iter()
            .map(|v| v.as_object().cloned().expect("seed rows are objects"))
            .collect();
        self.rows.lock().unwrap().insert(table.to_string(), rows);
    }

    pub(crate) fn rows(&self, table: &str) -> Vec<JsonRow> {
        self.rows
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn writes(&self) -> Vec<RemoteCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, RemoteCall::SelectAll(_) | RemoteCall::FindId { .. }))
            .collect()
    }

    pub(crate) fn fail_reads(&self, table: &str) {
        self.failing_reads.lock().unwrap().insert(table.to_string());
    }

    pub(crate) fn fail_writes(&self, table: &str) {
        self.failing_writes.lock().unwrap().insert(table.to_string());
    }

    pub(crate) fn heal_writes(&self, table: &str) {
        self.failing_writes.lock().unwrap().remove(table);
    }

    /// The next `select_all` panics.
    pub(crate) fn panic_on_read(&self) {
        self.panic_on_read.store(true, Ordering::SeqCst);
    }

    /// The next `select_all` waits until the returned sender fires.
    pub(crate) fn hold_next_read(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.read_hold.lock().unwrap() = Some(rx);
        tx
    }

    /// The next `insert`, `upsert` or `delete` waits until the returned
    /// sender fires.
    pub(crate) fn hold_next_write(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.write_hold.lock().unwrap() = Some(rx);
        tx
    }

    async fn wait_for(slot: &Mutex<Option<oneshot::Receiver<()>>>) {
        let hold = slot.lock().unwrap().take();
        if let Some(hold) = hold {
            let _ = hold.await;
        }
    }

    fn record(&self, call: RemoteCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_write(&self, table: &str) -> SyncResult<()> {
        if self.failing_writes.lock().unwrap().contains(table) {
            return Err(SyncError::Http {
                table: table.to_string(),
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn store(&self, table: &str, mut row: JsonRow, on_conflict: Option<&str>) -> Value {
        let mut rows = self.rows.lock().unwrap();
        let stored = rows.entry(table.to_string()).or_default();

        if let Some(key) = on_conflict {
            if let Some(existing) = stored
                .iter_mut()
                .find(|r| row.get(key).is_some() && r.get(key) == row.get(key))
            {
                for (k, v) in row {
                    existing.insert(k, v);
                }
                return Value::Object(existing.clone());
            }
        }

        if !row.contains_key("id") {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            row.insert("id".to_string(), Value::from(id));
        }
        stored.push(row.clone());
        Value::Object(row)
    }
}

#[async_trait]
impl RemoteClient for MockRemote {
    async fn select_all(&self, table: &str) -> SyncResult<Vec<JsonRow>> {
        self.record(RemoteCall::SelectAll(table.to_string()));

        Self::wait_for(&self.read_hold).await;

        if self.panic_on_read.swap(false, Ordering::SeqCst) {
            panic!("remote exploded while reading {table}");
        }
        if self.failing_reads.lock().unwrap().contains(table) {
            return Err(SyncError::ConnectionFailed(format!("{table} unreachable")));
        }

        Ok(self.rows(table))
    }

    async fn find_id(&self, table: &str, column: &str, value: &Value) -> SyncResult<Option<i64>> {
        self.record(RemoteCall::FindId {
            table: table.to_string(),
            column: column.to_string(),
            value: value.clone(),
        });

        Ok(self
            .rows(table)
            .iter()
            .find(|r| r.get(column) == Some(value))
            .and_then(|r| r.get("id"))
            .and_then(Value::as_i64))
    }

    async fn insert(&self, table: &str, row: &JsonRow) -> SyncResult<Value> {
        self.record(RemoteCall::Insert {
            table: table.to_string(),
            row: row.clone(),
        });
        Self::wait_for(&self.write_hold).await;
        self.check_write(table)?;
        Ok(self.store(table, row.clone(), None))
    }

    async fn upsert(&self, table: &str, row: &JsonRow, on_conflict: &str) -> SyncResult<Value> {
        self.record(RemoteCall::Upsert {
            table: table.to_string(),
            row: row.clone(),
            on_conflict: on_conflict.to_string(),
        });
        Self::wait_for(&self.write_hold).await;
        self.check_write(table)?;
        Ok(self.store(table, row.clone(), Some(on_conflict)))
    }

    async fn delete(&self, table: &str, id: &str) -> SyncResult<()> {
        self.record(RemoteCall::Delete {
            table: table.to_string(),
            id: id.to_string(),
        });
        Self::wait_for(&self.write_hold).await;
        self.check_write(table)?;

        if let Some(rows) = self.rows.lock().unwrap().get_mut(table) {
            rows.retain(|r| r.get("id").map(id_text).as_deref() != Some(id));
        }
        Ok(())
    }
}

fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Factory handing out the same mock and counting builds.
pub(crate) struct MockFactory {
    pub(crate) remote: Arc<MockRemote>,
    pub(crate) builds: Mutex<Vec<RemoteCredentials>>,
}

impl MockFactory {
    pub(crate) fn new(remote: Arc<MockRemote>) -> Arc<Self> {
        Arc::new(MockFactory {
            remote,
            builds: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn build_count(&self) -> usize {
        self.builds.lock().unwrap().len()
    }
}

impl RemoteClientFactory for MockFactory {
    fn build(&self, credentials: &RemoteCredentials) -> SyncResult<Arc<dyn RemoteClient>> {
        self.builds.lock().unwrap().push(credentials.clone());
        Ok(self.remote.clone())
    }
}

pub(crate) async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) fn object(value: Value) -> JsonRow {
    value.as_object().cloned().expect("test rows are objects")
}
