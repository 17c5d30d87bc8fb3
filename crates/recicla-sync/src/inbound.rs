//! # Inbound Handler
//!
//! Pulls remote tables and replaces their local copies.
//!
//! ## Pull Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Inbound Handler Flow                              │
//! │                                                                         │
//! │  for table in pull plan (fixed order)                                  │
//! │   │                                                                     │
//! │   ├─ select_all(remote_table)        ✗ warn, next table                │
//! │   │                                                                     │
//! │   └─ replace(local_table, rows)      one local transaction             │
//! │        Full             DELETE all, INSERT fetched                      │
//! │        PreserveOffline  DELETE WHERE origem_offline = 0,                │
//! │                         INSERT OR IGNORE fetched                        │
//! │        Singleton        DELETE all, one row id = 1 (or none)            │
//! │                         ✗ rolled back, warn, next table                 │
//! │                                                                         │
//! │  Runs only after the push, so rows created on this device come back    │
//! │  with their remote ids.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use recicla_db::TableReplacer;

use crate::error::SyncResult;
use crate::registry::PullTable;
use crate::remote::{with_deadline, RemoteClient};

/// Outcome of one pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullReport {
    pub tables_refreshed: usize,
    /// Tables whose fetch failed; their local copy is untouched.
    pub tables_failed: usize,
    /// Rows written locally across all tables.
    pub rows: u64,
}

/// Applies remote table contents to the local store.
pub struct InboundHandler {
    tables: TableReplacer,
    remote: Arc<dyn RemoteClient>,
    request_timeout: Duration,
}

impl InboundHandler {
    pub fn new(tables: TableReplacer, remote: Arc<dyn RemoteClient>, request_timeout: Duration) -> Self {
        InboundHandler {
            tables,
            remote,
            request_timeout,
        }
    }

    /// Refreshes every table of `plan` in order. A table that can't be
    /// fetched or written is counted in `tables_failed` and the rest of the
    /// plan still runs.
    pub async fn pull(&self, plan: &[PullTable]) -> SyncResult<PullReport> {
        let mut report = PullReport::default();

        for table in plan {
            let fetched =
                with_deadline(self.request_timeout, self.remote.select_all(table.remote_table)).await;

            let rows = match fetched {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(
                        remote_table = %table.remote_table,
                        local_table = %table.local_table,
                        error = %e,
                        "Pull failed for table, keeping local copy"
                    );
                    report.tables_failed += 1;
                    continue;
                }
            };

            debug!(
                remote_table = %table.remote_table,
                rows = rows.len(),
                "Fetched remote table"
            );

            match self
                .tables
                .replace(table.local_table, &rows, table.strategy)
                .await
            {
                Ok(written) => {
                    report.tables_refreshed += 1;
                    report.rows += written;
                }
                Err(e) => {
                    // the replace transaction rolled back, the old copy stays
                    warn!(
                        remote_table = %table.remote_table,
                        local_table = %table.local_table,
                        error = %e,
                        "Failed to apply pulled rows, keeping local copy"
                    );
                    report.tables_failed += 1;
                }
            }
        }

        info!(
            refreshed = report.tables_refreshed,
            failed = report.tables_failed,
            rows = report.rows,
            "Pull finished"
        );

        Ok(report)
    }
}

// =============================================================================
// Tests
// =============================================================================
