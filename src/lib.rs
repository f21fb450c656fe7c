//! # scanguard
//!
//! A pre-flight cost gate for large analytical queries on Trino.
//!
//! ## Architecture
//!
//! Before a query is sent, scanguard asks the engine what it would cost and
//! only lets it through automatically when the estimate is under a limit:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 SQL template (.sql file)                 │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [template]
//! ┌─────────────────────────────────────────────────────────┐
//! │          EXPLAIN (TYPE IO, FORMAT JSON) <query>          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [estimate]
//! ┌─────────────────────────────────────────────────────────┐
//! │   CostEstimate (per-table scan, total input, output)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [gate]
//! ┌─────────────────────────────────────────────────────────┐
//! │  Proceed │ ConfirmRequired(Input | Output | Failed)      │
//! │          │        └──▶ Operator: yes ──▶ run / no ──▶ stop│
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [runner, engine]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Real query, all rows fetched             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod estimate;
pub mod gate;
pub mod output;
pub mod runner;
pub mod template;

pub use engine::{QueryEngine, ResultSet, TrinoEngine};
pub use estimate::{CostEstimate, EstimateError, ParseError};
pub use gate::{Basis, Decision, GatePolicy, Operator, QueryGate};
pub use runner::{QueryRunner, RunError, RunOutcome};
