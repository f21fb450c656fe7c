//! The pre-flight query cost gate.
//!
//! ```text
//! query ──▶ EXPLAIN (TYPE IO) ──▶ CostEstimate ─┐
//!               │ (fails)                       ├──▶ GatePolicy ──▶ Decision
//!               └──────────▶ EstimateError ─────┘                      │
//!                                                    ConfirmRequired ──┤
//!                                                        Operator ◀────┘
//!                                                           │
//!                                         Proceed / Confirmed / Cancelled
//! ```
//!
//! Estimation failures never abort the run and never proceed silently; they
//! become a [`Basis::EstimationFailed`] confirmation.

mod operator;
mod policy;

pub use operator::{is_affirmative, ConsoleOperator, Operator, ScriptedOperator};
pub use policy::{Basis, Decision, GatePolicy, DEFAULT_THRESHOLD_BYTES};

use tracing::{info, warn};

use crate::engine::{Cursor, QueryEngine};
use crate::estimate::{explain_io_sql, parse_explain_rows, CostEstimate, EstimateError};
use crate::output::{estimate_summary, format_size};

/// What the gate concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Under the threshold; no confirmation was needed.
    Proceed,
    /// The operator approved a confirmation request.
    Confirmed,
    /// The operator declined. The query must not be sent.
    Cancelled,
}

impl Verdict {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Verdict::Cancelled)
    }
}

/// Estimate and policy decision, before any operator input.
#[derive(Debug)]
pub struct Assessment {
    pub estimate: Result<CostEstimate, EstimateError>,
    pub decision: Decision,
}

/// Everything the gate learned about one query.
#[derive(Debug)]
pub struct GateReport {
    pub estimate: Result<CostEstimate, EstimateError>,
    pub decision: Decision,
    pub verdict: Verdict,
}

/// Runs the estimate, applies the policy and consults the operator.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryGate {
    policy: GatePolicy,
}

impl QueryGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Ask the engine for an IO estimate of `query`.
    ///
    /// Opens one cursor, issues one EXPLAIN statement and closes the cursor
    /// whether or not the call succeeded.
    pub async fn estimate<E>(&self, engine: &E, query: &str) -> Result<CostEstimate, EstimateError>
    where
        E: QueryEngine + ?Sized,
    {
        let sql = explain_io_sql(query);
        let mut cursor = engine.cursor().await?;
        let result = explain(cursor.as_mut(), &sql).await;
        if let Err(e) = cursor.close().await {
            warn!(error = %e, "failed to close EXPLAIN cursor");
        }
        result
    }

    /// Estimate and decide without asking the operator.
    ///
    /// The estimate summary (or the estimation failure) is shown through
    /// `operator`.
    pub async fn assess<E, O>(&self, engine: &E, operator: &mut O, query: &str) -> Assessment
    where
        E: QueryEngine + ?Sized,
        O: Operator + ?Sized,
    {
        let estimate = self.estimate(engine, query).await;
        match &estimate {
            Ok(estimate) => operator.notify(&estimate_summary(estimate)),
            Err(e) => {
                warn!(error = %e, "IO estimate unavailable");
                operator.notify(&format!("EXPLAIN analysis failed: {}", e));
            }
        }

        let decision = self.policy.decide(estimate.as_ref());
        info!(?decision, threshold_bytes = self.policy.threshold_bytes(), "gate decision");

        Assessment { estimate, decision }
    }

    /// Estimate, decide, and ask the operator when the policy requires it.
    pub async fn check<E, O>(&self, engine: &E, operator: &mut O, query: &str) -> GateReport
    where
        E: QueryEngine + ?Sized,
        O: Operator + ?Sized,
    {
        let Assessment { estimate, decision } = self.assess(engine, operator, query).await;

        let verdict = match decision {
            Decision::Proceed => Verdict::Proceed,
            Decision::ConfirmRequired { basis, amount } => {
                let question = confirmation_question(basis, amount, self.policy.threshold_bytes());
                if operator.confirm(&question) {
                    info!(?basis, "operator approved query");
                    Verdict::Confirmed
                } else {
                    info!(?basis, "operator declined query");
                    Verdict::Cancelled
                }
            }
        };

        if !verdict.is_cancelled() {
            operator.notify("Size check passed. Running the query.");
        }

        GateReport {
            estimate,
            decision,
            verdict,
        }
    }
}

/// The question put to the operator for a confirmation request.
///
/// Each basis gets its own wording so the operator knows what the warning
/// rests on.
pub fn confirmation_question(basis: Basis, amount: Option<f64>, threshold_bytes: u64) -> String {
    let limit = format_size(threshold_bytes as f64);
    let amount = amount.map(format_size).unwrap_or_else(|| "unknown".to_string());
    match basis {
        Basis::Output => format!(
            "Predicted output is {}, above the {} limit. The result may be very large. Continue?",
            amount, limit
        ),
        Basis::Input => format!(
            "Output size could not be estimated; predicted input scan is {}, above the {} limit. Continue?",
            amount, limit
        ),
        Basis::EstimationFailed => {
            "EXPLAIN failed, so the query size is unknown. Run the query anyway?".to_string()
        }
    }
}

async fn explain(cursor: &mut dyn Cursor, sql: &str) -> Result<CostEstimate, EstimateError> {
    cursor.execute(sql).await?;
    let rows = cursor.fetch_all().await?;
    Ok(parse_explain_rows(&rows)?)
}
