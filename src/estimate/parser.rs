//! Decoder for Trino's `EXPLAIN (TYPE IO, FORMAT JSON)` output.
//!
//! Payload shape (fields other than these are ignored):
//!
//! ```json
//! {
//!   "inputTableColumnInfos": [
//!     {
//!       "table": { "catalog": "hive", "schemaTable": { "schema": "sales", "table": "orders" } },
//!       "estimate": { "outputSizeInBytes": 1597590.0 }
//!     }
//!   ],
//!   "estimate": { "outputSizeInBytes": "NaN" }
//! }
//! ```

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{coerce, json_kind, CostEstimate, ParseError, QualifiedTable, TableScan};
use crate::engine::Row;

/// Statement prefix for an IO estimate.
pub const EXPLAIN_IO_PREFIX: &str = "EXPLAIN (TYPE IO, FORMAT JSON)";

/// Strip surrounding whitespace and trailing semicolons from a statement.
///
/// The engine rejects a statement that ends in `;`.
pub fn trim_statement(query: &str) -> &str {
    query
        .trim_start()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Wrap a query in an IO estimate statement.
pub fn explain_io_sql(query: &str) -> String {
    format!("{} {}", EXPLAIN_IO_PREFIX, trim_statement(query))
}

/// Decode the rows returned by the EXPLAIN statement.
///
/// The result must be exactly one row with exactly one text column.
pub fn parse_explain_rows(rows: &[Row]) -> Result<CostEstimate, ParseError> {
    let [row] = rows else {
        return Err(ParseError::UnexpectedRowCount(rows.len()));
    };
    let [cell] = row.as_slice() else {
        return Err(ParseError::UnexpectedColumnCount(row.len()));
    };
    match cell {
        Value::String(text) => parse_estimate(text),
        other => Err(ParseError::NotText(json_kind(other))),
    }
}

/// Decode the JSON text of an IO estimate.
pub fn parse_estimate(raw_text: &str) -> Result<CostEstimate, ParseError> {
    let tree: Value = serde_json::from_str(raw_text).map_err(ParseError::InvalidJson)?;
    let root = match &tree {
        Value::Object(root) => root,
        other => return Err(ParseError::NotAnObject(json_kind(other))),
    };

    let per_table = match root.get("inputTableColumnInfos") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_table_scan(index, entry))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => return Err(ParseError::TableListNotArray(json_kind(other))),
    };

    let predicted_output_bytes = coerce(output_size(root.get("estimate")), f64::NAN);
    let estimate = CostEstimate::new(per_table, predicted_output_bytes);

    debug!(
        tables = estimate.per_table.len(),
        total_input_bytes = estimate.total_input_bytes,
        predicted_output_bytes = estimate.predicted_output_bytes,
        "parsed IO estimate"
    );

    Ok(estimate)
}

fn parse_table_scan(index: usize, entry: &Value) -> Result<TableScan, ParseError> {
    let table = entry.get("table");
    let schema_table = table.and_then(|t| t.get("schemaTable"));

    let name = schema_table
        .and_then(|st| st.get("table"))
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingTableName { index })?;

    let qualified = QualifiedTable {
        catalog: string_field(table, "catalog"),
        schema: string_field(schema_table, "schema"),
        table: name.to_string(),
    };

    let raw_bytes = coerce(output_size(entry.get("estimate")), 0.0);
    let scan = TableScan::new(qualified, raw_bytes);
    if raw_bytes.is_nan() || raw_bytes < 0.0 {
        warn!(
            table = %scan.table,
            raw_bytes,
            "unusable table size estimate, assuming 0 bytes"
        );
    }
    debug!(table = %scan.table, bytes = scan.output_bytes, "table scan estimate");

    Ok(scan)
}

fn output_size(node: Option<&Value>) -> Option<&Value> {
    node.and_then(|n| n.get("outputSizeInBytes"))
}

fn string_field(node: Option<&Value>, key: &str) -> Option<String> {
    node.and_then(Value::as_object)
        .and_then(|obj: &Map<String, Value>| obj.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}
