//! Wire types for the Trino client REST protocol.
//!
//! A statement is submitted with `POST /v1/statement`; each response is a
//! [`QueryResults`] page. The client keeps following `nextUri` until a page
//! arrives without one. Rows can appear on any page.

use serde::{Deserialize, Serialize};

use super::Row;

/// Request headers understood by the coordinator.
pub mod headers {
    pub const USER: &str = "X-Trino-User";
    pub const SOURCE: &str = "X-Trino-Source";
    pub const CATALOG: &str = "X-Trino-Catalog";
    pub const SCHEMA: &str = "X-Trino-Schema";
    pub const CLIENT_INFO: &str = "X-Trino-Client-Info";
}

/// Statement submission path.
pub const STATEMENT_PATH: &str = "/v1/statement";

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Engine type name (e.g. `bigint`, `varchar(20)`).
    #[serde(rename = "type")]
    pub type_name: String,
}

impl Column {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// One page of a statement's results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    /// Query ID assigned by the coordinator.
    pub id: String,
    /// Web UI link for the query.
    #[serde(default)]
    pub info_uri: Option<String>,
    /// Next page to fetch; absent once the query is finished.
    #[serde(default)]
    pub next_uri: Option<String>,
    /// Column metadata, sent once known.
    #[serde(default)]
    pub columns: Option<Vec<Column>>,
    /// Rows on this page.
    #[serde(default)]
    pub data: Option<Vec<Row>>,
    /// Failure details, if the query failed.
    #[serde(default)]
    pub error: Option<QueryError>,
    /// Progress statistics.
    #[serde(default)]
    pub stats: Option<StatementStats>,
}

/// Failure reported by the coordinator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    pub message: String,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_name: String,
    #[serde(default)]
    pub error_type: String,
}

/// Progress statistics for a statement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementStats {
    pub state: String,
    #[serde(default)]
    pub processed_rows: u64,
    #[serde(default)]
    pub processed_bytes: u64,
}
