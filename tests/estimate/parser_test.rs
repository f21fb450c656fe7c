use scanguard::estimate::{
    explain_io_sql, parse_estimate, parse_explain_rows, trim_statement, ParseError,
    QualifiedTable,
};
use serde_json::{json, Value};

const TWO_TABLES: &str = r#"{
  "inputTableColumnInfos": [
    {
      "table": {
        "catalog": "hive",
        "schemaTable": { "schema": "sales", "table": "orders" }
      },
      "columnConstraints": [],
      "estimate": {
        "outputRowCount": 15000.0,
        "outputSizeInBytes": 1597590.0,
        "cpuCost": 1597590.0,
        "maxMemory": 0.0,
        "networkCost": 0.0
      }
    },
    {
      "table": {
        "catalog": "hive",
        "schemaTable": { "schema": "sales", "table": "customers" }
      },
      "estimate": { "outputRowCount": 1500.0, "outputSizeInBytes": "2048" }
    }
  ],
  "estimate": {
    "outputRowCount": "NaN",
    "outputSizeInBytes": "NaN",
    "cpuCost": "NaN"
  }
}"#;

#[test]
fn test_parse_two_tables_with_unknown_output() {
    let estimate = parse_estimate(TWO_TABLES).unwrap();

    assert_eq!(estimate.per_table.len(), 2);
    assert_eq!(
        estimate.per_table[0].table,
        QualifiedTable::new("hive", "sales", "orders")
    );
    assert_eq!(estimate.per_table[0].output_bytes, 1597590.0);
    assert_eq!(estimate.per_table[1].table.to_string(), "hive.sales.customers");
    assert_eq!(estimate.per_table[1].output_bytes, 2048.0);
    assert_eq!(estimate.total_input_bytes, 1599638.0);
    assert!(estimate.predicted_output_bytes.is_nan());
    assert!(!estimate.output_is_known());
}

#[test]
fn test_parse_known_output() {
    let raw = json!({
        "inputTableColumnInfos": [],
        "estimate": { "outputSizeInBytes": 4096 }
    });

    let estimate = parse_estimate(&raw.to_string()).unwrap();
    assert!(estimate.per_table.is_empty());
    assert_eq!(estimate.total_input_bytes, 0.0);
    assert_eq!(estimate.predicted_output_bytes, 4096.0);
    assert!(estimate.output_is_known());
}

#[test]
fn test_missing_table_list_is_empty() {
    let estimate = parse_estimate(r#"{"estimate": {"outputSizeInBytes": 10}}"#).unwrap();
    assert!(estimate.per_table.is_empty());

    let estimate = parse_estimate(r#"{"inputTableColumnInfos": null}"#).unwrap();
    assert!(estimate.per_table.is_empty());
}

#[test]
fn test_missing_global_estimate_is_nan() {
    let estimate = parse_estimate("{}").unwrap();
    assert!(estimate.predicted_output_bytes.is_nan());

    let estimate = parse_estimate(r#"{"estimate": {}}"#).unwrap();
    assert!(estimate.predicted_output_bytes.is_nan());
}

#[test]
fn test_missing_table_size_is_zero() {
    let raw = json!({
        "inputTableColumnInfos": [
            { "table": { "schemaTable": { "table": "events" } } },
            { "table": { "schemaTable": { "table": "users" } }, "estimate": {} }
        ]
    });

    let estimate = parse_estimate(&raw.to_string()).unwrap();
    assert_eq!(estimate.per_table.len(), 2);
    assert_eq!(estimate.per_table[0].table, QualifiedTable::bare("events"));
    assert_eq!(estimate.per_table[0].output_bytes, 0.0);
    assert_eq!(estimate.per_table[1].output_bytes, 0.0);
    assert_eq!(estimate.total_input_bytes, 0.0);
}

#[test]
fn test_nan_and_negative_table_sizes_are_zero() {
    let raw = json!({
        "inputTableColumnInfos": [
            { "table": { "schemaTable": { "table": "a" } }, "estimate": { "outputSizeInBytes": "NaN" } },
            { "table": { "schemaTable": { "table": "b" } }, "estimate": { "outputSizeInBytes": -12 } },
            { "table": { "schemaTable": { "table": "c" } }, "estimate": { "outputSizeInBytes": 10.5 } }
        ]
    });

    let estimate = parse_estimate(&raw.to_string()).unwrap();
    let sizes: Vec<f64> = estimate.per_table.iter().map(|s| s.output_bytes).collect();
    assert_eq!(sizes, vec![0.0, 0.0, 10.5]);
    assert_eq!(estimate.total_input_bytes, 10.5);
}

#[test]
fn test_schema_without_catalog() {
    let raw = json!({
        "inputTableColumnInfos": [
            { "table": { "schemaTable": { "schema": "logs", "table": "fault" } } }
        ]
    });

    let estimate = parse_estimate(&raw.to_string()).unwrap();
    assert_eq!(estimate.per_table[0].table.to_string(), "logs.fault");
}

#[test]
fn test_missing_table_name_is_error() {
    let raw = json!({
        "inputTableColumnInfos": [
            { "table": { "schemaTable": { "table": "ok" } } },
            { "table": { "catalog": "hive" } }
        ]
    });

    let err = parse_estimate(&raw.to_string()).unwrap_err();
    assert!(matches!(err, ParseError::MissingTableName { index: 1 }));
}

#[test]
fn test_invalid_json_is_error() {
    let err = parse_estimate("not json").unwrap_err();
    assert!(matches!(err, ParseError::InvalidJson(_)));
}

#[test]
fn test_non_object_root_is_error() {
    let err = parse_estimate("[1, 2]").unwrap_err();
    assert!(matches!(err, ParseError::NotAnObject("a list")));
}

#[test]
fn test_table_list_must_be_array() {
    let err = parse_estimate(r#"{"inputTableColumnInfos": {"a": 1}}"#).unwrap_err();
    assert!(matches!(err, ParseError::TableListNotArray("an object")));
}

#[test]
fn test_explain_rows_single_text_cell() {
    let rows = vec![vec![Value::String(TWO_TABLES.to_string())]];
    let estimate = parse_explain_rows(&rows).unwrap();
    assert_eq!(estimate.per_table.len(), 2);
}

#[test]
fn test_explain_rows_shape_errors() {
    let err = parse_explain_rows(&[]).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedRowCount(0)));

    let two = vec![vec![json!("{}")], vec![json!("{}")]];
    let err = parse_explain_rows(&two).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedRowCount(2)));

    let wide = vec![vec![json!("{}"), json!("{}")]];
    let err = parse_explain_rows(&wide).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedColumnCount(2)));

    let number = vec![vec![json!(5)]];
    let err = parse_explain_rows(&number).unwrap_err();
    assert!(matches!(err, ParseError::NotText("a number")));
}

#[test]
fn test_explain_statement_text() {
    assert_eq!(
        explain_io_sql("  SELECT * FROM orders;\n"),
        "EXPLAIN (TYPE IO, FORMAT JSON) SELECT * FROM orders"
    );
}

#[test]
fn test_trim_statement() {
    assert_eq!(trim_statement("  SELECT 1; ;\n"), "SELECT 1");
    assert_eq!(trim_statement("SELECT ';' AS s"), "SELECT ';' AS s");
}
