//! Query engine access.
//!
//! The gate only needs a small cursor-style surface from the engine, so it is
//! expressed as two traits. [`TrinoEngine`] implements them over the Trino
//! REST protocol; tests substitute recording fakes.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     QueryEngine                          │
//! │   cursor() ──▶ Cursor: execute / fetch_all /             │
//! │                        description / close               │
//! │   close()                                                │
//! └──────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │            TrinoEngine (reqwest, /v1/statement)          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every cursor a caller opens must be closed on every exit path; the engine
//! itself is closed once the run is over.

mod error;
pub mod protocol;
mod trino;

pub use error::{EngineError, EngineResult};
pub use protocol::Column;
pub use trino::{TrinoCursor, TrinoEngine};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// One result row, in column order.
pub type Row = Vec<Value>;

/// A connection to the query engine.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Open a cursor for a single statement.
    async fn cursor(&self) -> EngineResult<Box<dyn Cursor>>;

    /// Release the connection.
    async fn close(&self) -> EngineResult<()>;
}

/// A statement handle.
#[async_trait]
pub trait Cursor: Send {
    /// Run a statement. Fails if the engine rejects it.
    async fn execute(&mut self, sql: &str) -> EngineResult<()>;

    /// Take every row produced by the last statement.
    async fn fetch_all(&mut self) -> EngineResult<Vec<Row>>;

    /// Column metadata of the last statement, if it produced any.
    fn description(&self) -> Option<&[Column]>;

    /// Release the cursor. Closing twice is a no-op.
    async fn close(&mut self) -> EngineResult<()>;
}

/// A fully materialized query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, value)| (col.name.clone(), value.clone()))
                    .collect()
            })
            .collect()
    }
}
