//! Typed access to the hosted backend: row reads over the REST API, stored
//! procedures, object storage and the auth user endpoint.
//!
//! Every response is decoded into a concrete type at this boundary; a body
//! that does not fit is a [`GatewayError::Schema`] naming the resource.

mod auth;
mod clients;
mod files;
mod orders;
pub mod query;
mod settings;

use std::time::Duration;

use falcon_core::config::FalconConfig;
use falcon_core::FalconError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::error::{GatewayError, Result};
use crate::sse::SseChangeFeed;
pub use query::Query;

const PREFER: &str = "prefer";

// ---------------------------------------------------------------------------
// RestGateway
// ---------------------------------------------------------------------------

pub struct RestGateway {
    http: reqwest::Client,
    headers: HeaderMap,
    config: FalconConfig,
    user_id: OnceCell<Uuid>,
    org_id: OnceCell<Uuid>,
}

impl RestGateway {
    pub fn new(config: FalconConfig) -> Result<Self> {
        config.ensure_usable()?;
        let headers = auth_headers(&config)?;
        let mut builder = reqwest::Client::builder().default_headers(headers.clone());
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        Ok(Self {
            http: builder.build()?,
            headers,
            config,
            user_id: OnceCell::new(),
            org_id: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &FalconConfig {
        &self.config
    }

    /// Realtime feed sharing this gateway's credentials. The stream client
    /// has no overall timeout since its responses never end on their own.
    pub fn change_feed(&self) -> Result<SseChangeFeed> {
        let http = reqwest::Client::builder()
            .default_headers(self.headers.clone())
            .connect_timeout(Duration::from_secs(self.config.timeout_secs.max(1)))
            .build()?;
        Ok(SseChangeFeed::new(http, self.config.realtime_url()))
    }

    fn rest(&self, resource: &str) -> String {
        format!("{}/{}", self.config.rest_url(), resource)
    }

    // -- reads --------------------------------------------------------------

    pub(crate) async fn select<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &Query,
    ) -> Result<Vec<T>> {
        tracing::debug!(resource, query = ?query.pairs(), "select");
        let resp = self
            .http
            .get(self.rest(resource))
            .query(query.pairs())
            .send()
            .await?;
        let resp = check(resp).await?;
        decode(resource, resp).await
    }

    pub(crate) async fn select_one<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: Query,
    ) -> Result<Option<T>> {
        let rows: Vec<T> = self.select(resource, &query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Rows plus the exact number of matches ignoring `limit`/`offset`.
    pub(crate) async fn select_counted<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &Query,
    ) -> Result<(Vec<T>, Option<u64>)> {
        tracing::debug!(resource, query = ?query.pairs(), "select with count");
        let resp = self
            .http
            .get(self.rest(resource))
            .header(PREFER, "count=exact")
            .query(query.pairs())
            .send()
            .await?;
        let resp = check(resp).await?;
        let total = content_range_total(&resp);
        let rows = decode(resource, resp).await?;
        Ok((rows, total))
    }

    /// Number of matching rows, without fetching them.
    pub(crate) async fn count(&self, resource: &str, query: &Query) -> Result<u64> {
        let resp = self
            .http
            .head(self.rest(resource))
            .header(PREFER, "count=exact")
            .query(query.pairs())
            .send()
            .await?;
        let resp = check(resp).await?;
        Ok(content_range_total(&resp).unwrap_or(0))
    }

    // -- writes -------------------------------------------------------------

    pub(crate) async fn rpc<T: DeserializeOwned>(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<T> {
        tracing::debug!(procedure = name, "rpc");
        let resource = format!("rpc/{name}");
        let resp = self
            .http
            .post(self.rest(&resource))
            .json(&args)
            .send()
            .await?;
        let resp = check(resp).await?;
        decode(&resource, resp).await
    }

    /// Insert-or-merge a single row keyed by `on_conflict`.
    pub(crate) async fn upsert(
        &self,
        resource: &str,
        on_conflict: &str,
        row: &serde_json::Value,
    ) -> Result<()> {
        tracing::debug!(resource, on_conflict, "upsert");
        let resp = self
            .http
            .post(self.rest(resource))
            .header(PREFER, "resolution=merge-duplicates,return=minimal")
            .query(Query::new().on_conflict(on_conflict).pairs())
            .json(row)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    pub(crate) fn storage(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.config.storage_url(), path))
    }

    pub(crate) fn auth(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}/{}", self.config.auth_url(), path))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn auth_headers(config: &FalconConfig) -> Result<HeaderMap> {
    let value = |v: &str| {
        HeaderValue::from_str(v)
            .map_err(|_| FalconError::Config("credentials contain invalid characters".into()))
    };
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("apikey"), value(&config.anon_key)?);
    headers.insert(AUTHORIZATION, value(&format!("Bearer {}", config.bearer()))?);
    headers.insert(
        HeaderName::from_static("accept-profile"),
        value(&config.schema)?,
    );
    headers.insert(
        HeaderName::from_static("content-profile"),
        value(&config.schema)?,
    );
    Ok(headers)
}

/// Error body shared by the row API and storage.
#[derive(Debug, Default, Deserialize)]
struct RemoteBody {
    /// Text for SQLSTATEs, a number from the auth service.
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, alias = "msg")]
    error_description: Option<String>,
}

/// Pass successful responses through; turn anything else into
/// [`GatewayError::Remote`] with the backend's own message.
pub(crate) async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let body: RemoteBody = serde_json::from_str(&text).unwrap_or_default();
    let code = body.code.map(|c| match c.as_str() {
        Some(s) => s.to_string(),
        None => c.to_string(),
    });
    let message = body
        .message
        .or(body.error_description)
        .or(body.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                text.trim().to_string()
            }
        });
    tracing::debug!(status = status.as_u16(), code = ?code, %message, "remote error");
    Err(GatewayError::Remote {
        status: status.as_u16(),
        code,
        message,
        details: body.details,
        hint: body.hint,
    })
}

pub(crate) async fn decode<T: DeserializeOwned>(resource: &str, resp: Response) -> Result<T> {
    let bytes = resp.bytes().await?;
    // Procedures returning void answer with an empty body.
    let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &bytes
    };
    serde_json::from_slice(bytes).map_err(|source| GatewayError::Schema {
        resource: resource.to_string(),
        source,
    })
}

fn content_range_total(resp: &Response) -> Option<u64> {
    resp.headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range)
}

/// Total from `Content-Range: 0-19/57` (or `*/0`); `None` when unknown.
pub(crate) fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
