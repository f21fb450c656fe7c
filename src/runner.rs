//! End-to-end gated execution.
//!
//! One run issues at most two statements, strictly in sequence: the EXPLAIN
//! estimate and, if the gate lets it through, the real query. The real query
//! is never retried. Every cursor is closed on its way out and the engine is
//! closed once the run ends, whichever branch ended it.

use thiserror::Error;
use tracing::{info, warn};

use crate::engine::{Column, Cursor, EngineError, EngineResult, QueryEngine, ResultSet};
use crate::estimate::trim_statement;
use crate::gate::{Assessment, GatePolicy, Operator, QueryGate};

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The query ran and every row was fetched.
    Completed(ResultSet),
    /// The operator declined; the query was never sent.
    Cancelled,
}

/// Failure of the real query after the gate passed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("query execution failed: {0}")]
    Execution(#[source] EngineError),
}

/// Process exit status for a run: `0` for completion or cancellation, `1`
/// for an execution failure.
pub fn exit_status(result: &Result<RunOutcome, RunError>) -> u8 {
    match result {
        Ok(RunOutcome::Completed(_)) | Ok(RunOutcome::Cancelled) => 0,
        Err(_) => 1,
    }
}

/// Runs queries behind a [`QueryGate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryRunner {
    gate: QueryGate,
}

impl QueryRunner {
    pub fn new(policy: GatePolicy) -> Self {
        Self {
            gate: QueryGate::new(policy),
        }
    }

    pub fn gate(&self) -> &QueryGate {
        &self.gate
    }

    /// Gate `query`, then run it unless the operator declined.
    ///
    /// Trailing semicolons are dropped before either statement is sent.
    /// Closes `engine` before returning.
    pub async fn run<E, O>(
        &self,
        engine: &E,
        operator: &mut O,
        query: &str,
    ) -> Result<RunOutcome, RunError>
    where
        E: QueryEngine + ?Sized,
        O: Operator + ?Sized,
    {
        let outcome = self
            .run_gated(engine, operator, trim_statement(query))
            .await;
        close_engine(engine).await;
        outcome
    }

    /// Estimate and decide only; the real query is never sent.
    ///
    /// Closes `engine` before returning.
    pub async fn dry_run<E, O>(&self, engine: &E, operator: &mut O, query: &str) -> Assessment
    where
        E: QueryEngine + ?Sized,
        O: Operator + ?Sized,
    {
        let assessment = self
            .gate
            .assess(engine, operator, trim_statement(query))
            .await;
        close_engine(engine).await;
        assessment
    }

    async fn run_gated<E, O>(
        &self,
        engine: &E,
        operator: &mut O,
        query: &str,
    ) -> Result<RunOutcome, RunError>
    where
        E: QueryEngine + ?Sized,
        O: Operator + ?Sized,
    {
        let report = self.gate.check(engine, operator, query).await;
        if report.verdict.is_cancelled() {
            info!("query cancelled by operator");
            return Ok(RunOutcome::Cancelled);
        }

        let result = execute(engine, query).await.map_err(RunError::Execution)?;
        info!(
            rows = result.row_count(),
            columns = result.column_count(),
            "query completed"
        );
        Ok(RunOutcome::Completed(result))
    }
}

/// Run one statement on a fresh cursor and fetch every row.
///
/// The cursor is closed whether or not the statement succeeded.
pub async fn execute<E>(engine: &E, sql: &str) -> EngineResult<ResultSet>
where
    E: QueryEngine + ?Sized,
{
    let mut cursor = engine.cursor().await?;
    let result = fetch_result(cursor.as_mut(), sql).await;
    if let Err(e) = cursor.close().await {
        warn!(error = %e, "failed to close query cursor");
    }
    result
}

async fn fetch_result(cursor: &mut dyn Cursor, sql: &str) -> EngineResult<ResultSet> {
    cursor.execute(sql).await?;
    let rows = cursor.fetch_all().await?;
    let columns = cursor
        .description()
        .map(<[Column]>::to_vec)
        .unwrap_or_default();
    Ok(ResultSet::new(columns, rows))
}

async fn close_engine<E: QueryEngine + ?Sized>(engine: &E) {
    if let Err(e) = engine.close().await {
        warn!(error = %e, "failed to close engine connection");
    }
}
