//! # PostgREST Client
//!
//! [`RemoteClient`] over a PostgREST-style HTTP API (`{url}/rest/v1/{table}`).
//!
//! ## Request Mapping
//! ```text
//! select_all(t)          GET    /rest/v1/t?select=*
//! find_id(t, c, v)       GET    /rest/v1/t?select=id&c=eq.v&limit=1
//! insert(t, row)         POST   /rest/v1/t                 Prefer: return=representation
//! upsert(t, row, key)    POST   /rest/v1/t?on_conflict=key Prefer: resolution=merge-duplicates,return=representation
//! delete(t, id)          DELETE /rest/v1/t?id=eq.id
//!
//! Every request carries `apikey: <key>` and `Authorization: Bearer <key>`.
//! ```
//!
//! Reads are retried with exponential backoff on transient failures; writes
//! are sent once and left to the outbox to retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::RemoteSettings;
use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteClient, RemoteClientFactory};
use recicla_core::validation::validate_identifier;
use recicla_core::{JsonRow, RemoteCredentials};

const REST_PATH: &str = "rest/v1/";
const PREFER_REPRESENTATION: &str = "return=representation";
const PREFER_MERGE: &str = "resolution=merge-duplicates,return=representation";
const MAX_ERROR_BODY: usize = 300;

// =============================================================================
// Client
// =============================================================================

/// HTTP client for one backend endpoint and key.
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    http: reqwest::Client,
    base: Url,
    max_read_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl PostgrestClient {
    /// Builds a client for `credentials`.
    ///
    /// The URL must be absolute http(s); the key becomes both the `apikey`
    /// header and the bearer token.
    pub fn new(credentials: &RemoteCredentials, settings: &RemoteSettings) -> SyncResult<Self> {
        let mut base = Url::parse(credentials.url.trim())?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(SyncError::InvalidUrl(format!(
                "remote URL must be http or https, got: {}",
                credentials.url
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let base = base.join(REST_PATH)?;

        let key = credentials.key.trim();
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {key}"))?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(PostgrestClient {
            http,
            base,
            max_read_retries: settings.max_read_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_secs(settings.max_backoff_secs),
        })
    }

    /// Endpoint of a table, e.g. `https://x.supabase.co/rest/v1/material`.
    pub fn endpoint(&self, table: &str) -> SyncResult<Url> {
        validate_identifier(table).map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
        Ok(self.base.join(table)?)
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build()
    }

    /// GET with retry on transient failures.
    async fn get_with_retry(&self, table: &str, url: Url) -> SyncResult<Value> {
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            match send(table, self.http.get(url.clone())).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.max_read_retries => {
                    attempt += 1;
                    let delay = backoff.next_backoff().unwrap_or(self.max_backoff);
                    warn!(
                        table = %table,
                        attempt,
                        ?delay,
                        error = %e,
                        "Remote read failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl RemoteClient for PostgrestClient {
    async fn select_all(&self, table: &str) -> SyncResult<Vec<JsonRow>> {
        let mut url = self.endpoint(table)?;
        url.query_pairs_mut().append_pair("select", "*");

        let body = self.get_with_retry(table, url).await?;
        let rows = expect_rows(table, body)?;

        debug!(table = %table, rows = rows.len(), "Fetched remote rows");
        Ok(rows)
    }

    async fn find_id(&self, table: &str, column: &str, value: &Value) -> SyncResult<Option<i64>> {
        validate_identifier(column).map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        let mut url = self.endpoint(table)?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair(column, &format!("eq.{}", filter_literal(value)))
            .append_pair("limit", "1");

        let body = self.get_with_retry(table, url).await?;
        let rows = expect_rows(table, body)?;

        Ok(rows.first().and_then(|row| row.get("id")).and_then(id_of))
    }

    async fn insert(&self, table: &str, row: &JsonRow) -> SyncResult<Value> {
        let url = self.endpoint(table)?;
        let request = self
            .http
            .post(url)
            .header("Prefer", PREFER_REPRESENTATION)
            .json(row);

        send(table, request).await.map(first_row)
    }

    async fn upsert(&self, table: &str, row: &JsonRow, on_conflict: &str) -> SyncResult<Value> {
        validate_identifier(on_conflict).map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        let mut url = self.endpoint(table)?;
        url.query_pairs_mut().append_pair("on_conflict", on_conflict);

        let request = self.http.post(url).header("Prefer", PREFER_MERGE).json(row);

        send(table, request).await.map(first_row)
    }

    async fn delete(&self, table: &str, id: &str) -> SyncResult<()> {
        let mut url = self.endpoint(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));

        send(table, self.http.delete(url)).await?;
        Ok(())
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Builds [`PostgrestClient`]s with shared remote settings.
#[derive(Debug, Clone, Default)]
pub struct PostgrestFactory {
    settings: RemoteSettings,
}

impl PostgrestFactory {
    pub fn new(settings: RemoteSettings) -> Self {
        PostgrestFactory { settings }
    }
}

impl RemoteClientFactory for PostgrestFactory {
    fn build(&self, credentials: &RemoteCredentials) -> SyncResult<Arc<dyn RemoteClient>> {
        Ok(Arc::new(PostgrestClient::new(credentials, &self.settings)?))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn header_value(value: &str) -> SyncResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| SyncError::InvalidConfig(format!("invalid remote key header value: {e}")))
}

/// Sends a request; maps non-2xx answers to [`SyncError::Http`].
async fn send(table: &str, request: RequestBuilder) -> SyncResult<Value> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let mut message = text;
        if message.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| message.is_char_boundary(*i))
                .unwrap_or(0);
            message.truncate(cut);
        }
        return Err(SyncError::Http {
            table: table.to_string(),
            status: status.as_u16(),
            message,
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text)
        .map_err(|e| SyncError::InvalidResponse(format!("{table}: {e}")))
}

fn expect_rows(table: &str, body: Value) -> SyncResult<Vec<JsonRow>> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(SyncError::InvalidResponse(format!(
                    "{table}: expected row objects, got {other}"
                ))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(SyncError::InvalidResponse(format!(
            "{table}: expected an array, got {other}"
        ))),
    }
}

/// PostgREST answers writes with an array; callers want the row.
fn first_row(body: Value) -> Value {
    match body {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    }
}

fn filter_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn id_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
