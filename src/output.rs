//! Human-readable rendering of sizes, estimates and result sets.

use prettytable::{Cell, Row as TableRow, Table};
use serde_json::Value;

use crate::engine::ResultSet;
use crate::estimate::CostEstimate;

const MIB: f64 = (1u64 << 20) as f64;
const GIB: f64 = (1u64 << 30) as f64;

/// Format a byte count as `"<MB> MB (<GB> GB)"`.
///
/// NaN renders as `unknown` and `+inf` as `unbounded`.
pub fn format_size(bytes: f64) -> String {
    if bytes.is_nan() {
        "unknown".to_string()
    } else if bytes == f64::INFINITY {
        "unbounded".to_string()
    } else {
        format!("{:.2} MB ({:.3} GB)", bytes / MIB, bytes / GIB)
    }
}

/// Multi-line summary of an estimate.
pub fn estimate_summary(estimate: &CostEstimate) -> String {
    let mut lines = vec!["Estimated scan (input):".to_string()];
    if estimate.per_table.is_empty() {
        lines.push("  (no input tables reported)".to_string());
    }
    for scan in &estimate.per_table {
        lines.push(format!("  - {}: {}", scan.table, format_size(scan.output_bytes)));
    }
    lines.push(format!(
        "Total estimated input: {}",
        format_size(estimate.total_input_bytes)
    ));

    if estimate.output_is_known() {
        lines.push(format!(
            "Estimated output: {}",
            format_size(estimate.predicted_output_bytes)
        ));
    } else {
        lines.push(format!(
            "Estimated output: cannot be estimated (outputSizeInBytes = {})",
            estimate.predicted_output_bytes
        ));
        lines.push(format!(
            "Falling back to input estimate: {}",
            format_size(estimate.total_input_bytes)
        ));
    }

    lines.join("\n")
}

/// Render the first `limit` rows as a table, followed by a row/column count.
pub fn result_preview(result: &ResultSet, limit: usize) -> String {
    let mut out = format!(
        "Loaded {} rows, {} columns",
        result.row_count(),
        result.column_count()
    );
    if result.columns.is_empty() || limit == 0 {
        return out;
    }

    let mut table = Table::new();
    table.set_titles(TableRow::new(
        result.columns.iter().map(|c| Cell::new(&c.name)).collect(),
    ));
    for row in result.rows.iter().take(limit) {
        table.add_row(TableRow::new(
            row.iter().map(|v| Cell::new(&display_value(v))).collect(),
        ));
    }

    out.push('\n');
    out.push_str(&table.to_string());
    if result.row_count() > limit {
        out.push_str(&format!("... {} more rows", result.row_count() - limit));
    }
    out
}

/// Full result as pretty-printed JSON records.
pub fn result_json(result: &ResultSet) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&result.to_records())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
