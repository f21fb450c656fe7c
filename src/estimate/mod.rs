//! IO cost estimates.
//!
//! Turns the output of `EXPLAIN (TYPE IO, FORMAT JSON)` into a normalized
//! [`CostEstimate`]:
//!
//! ```text
//! EXPLAIN row ──▶ [parser] ──▶ per-table sizes ──▶ [aggregate] ──▶ CostEstimate
//!                    │                                               ▲
//!                    └──── global outputSizeInBytes ─[coerce]────────┘
//! ```
//!
//! A missing per-table size is assumed to be zero. A missing global output
//! size is NaN, which downstream policy treats as "unknown".

mod aggregate;
mod coerce;
mod parser;

pub use aggregate::{normalize_scan_bytes, total_bytes, SizeAggregator};
pub use coerce::{coerce, coerce_str};
pub use parser::{
    explain_io_sql, parse_estimate, parse_explain_rows, trim_statement, EXPLAIN_IO_PREFIX,
};

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::engine::EngineError;

/// Errors decoding an EXPLAIN IO payload.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The EXPLAIN result did not contain exactly one row.
    #[error("expected exactly one EXPLAIN row, got {0}")]
    UnexpectedRowCount(usize),

    /// The EXPLAIN row did not contain exactly one column.
    #[error("expected exactly one EXPLAIN column, got {0}")]
    UnexpectedColumnCount(usize),

    /// The EXPLAIN column was not text.
    #[error("expected the EXPLAIN column to hold JSON text, found {0}")]
    NotText(&'static str),

    /// The text was not valid JSON.
    #[error("estimate is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The JSON document was not an object.
    #[error("estimate must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// `inputTableColumnInfos` was present but not a list.
    #[error("inputTableColumnInfos must be a list, found {0}")]
    TableListNotArray(&'static str),

    /// A table-scan entry had no `table.schemaTable.table` name.
    #[error("table scan entry {index} has no table name")]
    MissingTableName {
        /// Position of the entry in `inputTableColumnInfos`.
        index: usize,
    },
}

/// Why an estimate could not be produced.
///
/// Both variants degrade to a confirmation decision rather than an abort.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// The EXPLAIN call itself failed (network, permissions, syntax).
    #[error("EXPLAIN call failed: {0}")]
    Engine(#[from] EngineError),

    /// The EXPLAIN output could not be decoded.
    #[error("could not read EXPLAIN output: {0}")]
    Parse(#[from] ParseError),
}

/// Fully qualified name of a scanned table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedTable {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table: String,
}

impl QualifiedTable {
    /// A bare table name with no catalog or schema.
    pub fn bare(table: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            table: table.into(),
        }
    }

    /// A `catalog.schema.table` name.
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            catalog: Some(catalog.into()),
            schema: Some(schema.into()),
            table: table.into(),
        }
    }
}

impl fmt::Display for QualifiedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(catalog) = &self.catalog {
            write!(f, "{}.", catalog)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        f.write_str(&self.table)
    }
}

/// Predicted scan size of one input table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableScan {
    pub table: QualifiedTable,
    /// Bytes, never negative or NaN; may be fractional or `+inf`.
    pub output_bytes: f64,
}

impl TableScan {
    /// Create a table scan; `output_bytes` is normalized.
    pub fn new(table: QualifiedTable, output_bytes: f64) -> Self {
        Self {
            table,
            output_bytes: normalize_scan_bytes(output_bytes),
        }
    }
}

/// Normalized IO estimate for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    /// Tables in the order the engine listed them.
    pub per_table: Vec<TableScan>,
    /// Exact sum of `per_table` sizes.
    pub total_input_bytes: f64,
    /// Predicted output size; NaN when the engine could not say.
    pub predicted_output_bytes: f64,
}

impl CostEstimate {
    /// Build an estimate, computing `total_input_bytes` from `per_table`.
    pub fn new(per_table: Vec<TableScan>, predicted_output_bytes: f64) -> Self {
        let total_input_bytes = total_bytes(per_table.iter().map(|scan| scan.output_bytes));
        Self {
            per_table,
            total_input_bytes,
            predicted_output_bytes,
        }
    }

    /// Whether the engine supplied a usable output size.
    pub fn output_is_known(&self) -> bool {
        !self.predicted_output_bytes.is_nan() && self.predicted_output_bytes != f64::INFINITY
    }
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}
