//! Trino implementation of the engine traits.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::RequestBuilder;
use tracing::{debug, info, warn};

use super::error::{EngineError, EngineResult};
use super::protocol::{headers, Column, QueryResults, STATEMENT_PATH};
use super::{Cursor, QueryEngine, Row};
use crate::config::EngineConfig;

/// Attempts per `nextUri` fetch when the coordinator is busy.
const MAX_POLL_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubled for each later one.
const POLL_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Basic-auth credentials sent with every request.
#[derive(Clone)]
struct BasicAuth {
    user: String,
    password: String,
}

/// Connection to a Trino coordinator.
///
/// Creating the engine does not contact the server; the first request is
/// made when a cursor executes a statement.
///
/// # Example
///
/// ```ignore
/// use scanguard::config::EngineConfig;
/// use scanguard::engine::{QueryEngine, TrinoEngine};
///
/// let engine = TrinoEngine::connect(&EngineConfig::from_env()?)?;
/// let mut cursor = engine.cursor().await?;
/// cursor.execute("SELECT 1").await?;
/// let rows = cursor.fetch_all().await?;
/// cursor.close().await?;
/// engine.close().await?;
/// ```
pub struct TrinoEngine {
    http: reqwest::Client,
    statement_uri: String,
    auth: Option<BasicAuth>,
    client_info: String,
}

impl TrinoEngine {
    /// Build a client for the configured coordinator.
    pub fn connect(config: &EngineConfig) -> EngineResult<Self> {
        let client_info = uuid::Uuid::new_v4().to_string();

        let mut default_headers = HeaderMap::new();
        default_headers.insert(headers::USER, header_value(headers::USER, &config.user)?);
        default_headers.insert(
            headers::SOURCE,
            header_value(headers::SOURCE, &config.source)?,
        );
        default_headers.insert(
            headers::CLIENT_INFO,
            header_value(headers::CLIENT_INFO, &client_info)?,
        );
        if let Some(catalog) = &config.catalog {
            default_headers.insert(headers::CATALOG, header_value(headers::CATALOG, catalog)?);
        }
        if let Some(schema) = &config.schema {
            default_headers.insert(headers::SCHEMA, header_value(headers::SCHEMA, schema)?);
        }

        if !config.verify_tls {
            warn!(host = %config.host, "TLS certificate verification is disabled");
        }

        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(EngineError::ClientBuild)?;

        let auth = config.password.as_ref().map(|password| BasicAuth {
            user: config.user.clone(),
            password: password.clone(),
        });

        let statement_uri = format!("{}{}", config.base_url(), STATEMENT_PATH);
        info!(uri = %statement_uri, user = %config.user, client_info = %client_info, "connected to Trino");

        Ok(Self {
            http,
            statement_uri,
            auth,
            client_info,
        })
    }

    /// Identifier sent as `X-Trino-Client-Info` on every request.
    pub fn client_info(&self) -> &str {
        &self.client_info
    }
}

#[async_trait]
impl QueryEngine for TrinoEngine {
    async fn cursor(&self) -> EngineResult<Box<dyn Cursor>> {
        Ok(Box::new(TrinoCursor {
            http: self.http.clone(),
            statement_uri: self.statement_uri.clone(),
            auth: self.auth.clone(),
            query_id: None,
            columns: None,
            rows: Vec::new(),
            pending: None,
            executed: false,
            closed: false,
        }))
    }

    async fn close(&self) -> EngineResult<()> {
        // HTTP connections are pooled by reqwest and dropped with the client.
        debug!(client_info = %self.client_info, "closing Trino engine");
        Ok(())
    }
}

/// Cursor over one Trino statement.
///
/// `execute` follows the statement to completion and buffers every row.
pub struct TrinoCursor {
    http: reqwest::Client,
    statement_uri: String,
    auth: Option<BasicAuth>,
    query_id: Option<String>,
    columns: Option<Vec<Column>>,
    rows: Vec<Row>,
    /// `nextUri` of an unfinished statement, released on close.
    pending: Option<String>,
    executed: bool,
    closed: bool,
}

impl TrinoCursor {
    /// Query ID of the last statement.
    pub fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    async fn send(&self, uri: &str, request: RequestBuilder) -> EngineResult<QueryResults> {
        let request = match &self.auth {
            Some(auth) => request.basic_auth(&auth.user, Some(&auth.password)),
            None => request,
        };

        let response = request.send().await.map_err(|source| EngineError::Transport {
            uri: uri.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<QueryResults>().await.map_err(EngineError::Decode)
    }

    /// Fetch the next page, retrying while the coordinator is busy.
    ///
    /// Only page fetches are retried; the statement itself is never
    /// resubmitted.
    async fn poll(&self, uri: &str) -> EngineResult<QueryResults> {
        let mut attempt = 1;
        loop {
            match self.send(uri, self.http.get(uri)).await {
                Err(e) if e.is_retryable() && attempt < MAX_POLL_ATTEMPTS => {
                    let delay = POLL_RETRY_DELAY * 2u32.pow(attempt - 1);
                    warn!(error = %e, attempt, ?delay, "coordinator busy, retrying page fetch");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Record one page. Returns an error if the page reports a failure.
    fn absorb(&mut self, page: QueryResults) -> EngineResult<()> {
        if self.query_id.is_none() {
            debug!(query_id = %page.id, info_uri = ?page.info_uri, "statement accepted");
        }
        self.query_id = Some(page.id);
        self.pending = page.next_uri;

        if let Some(stats) = &page.stats {
            debug!(
                state = %stats.state,
                processed_rows = stats.processed_rows,
                processed_bytes = stats.processed_bytes,
                "statement progress"
            );
        }

        if let Some(error) = page.error {
            return Err(EngineError::query(
                error.error_name,
                error.error_code,
                error.message,
            ));
        }

        if let Some(columns) = page.columns {
            self.columns = Some(columns);
        }
        if let Some(data) = page.data {
            self.rows.extend(data);
        }
        Ok(())
    }
}

#[async_trait]
impl Cursor for TrinoCursor {
    async fn execute(&mut self, sql: &str) -> EngineResult<()> {
        if self.closed {
            return Err(EngineError::CursorClosed);
        }

        self.query_id = None;
        self.columns = None;
        self.rows.clear();
        self.executed = false;

        let uri = self.statement_uri.clone();
        let page = self
            .send(&uri, self.http.post(&uri).body(sql.to_string()))
            .await?;
        self.absorb(page)?;

        while let Some(next) = self.pending.clone() {
            let page = self.poll(&next).await?;
            self.absorb(page)?;
        }

        self.executed = true;
        debug!(query_id = ?self.query_id, rows = self.rows.len(), "statement finished");
        Ok(())
    }

    async fn fetch_all(&mut self) -> EngineResult<Vec<Row>> {
        if !self.executed {
            return Err(EngineError::NoStatement);
        }
        Ok(std::mem::take(&mut self.rows))
    }

    fn description(&self) -> Option<&[Column]> {
        self.columns.as_deref()
    }

    async fn close(&mut self) -> EngineResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(uri) = self.pending.take() {
            debug!(query_id = ?self.query_id, "cancelling unfinished statement");
            let request = match &self.auth {
                Some(auth) => self
                    .http
                    .delete(&uri)
                    .basic_auth(&auth.user, Some(&auth.password)),
                None => self.http.delete(&uri),
            };
            request
                .send()
                .await
                .map_err(|source| EngineError::Transport { uri, source })?;
        }
        Ok(())
    }
}

fn header_value(name: &'static str, value: &str) -> EngineResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| EngineError::InvalidHeader(name))
}
