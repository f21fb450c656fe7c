//! The gate's decision function.

use serde::Serialize;

use crate::estimate::{CostEstimate, EstimateError};

/// Default confirmation threshold: 1 GiB.
pub const DEFAULT_THRESHOLD_BYTES: u64 = 1 << 30;

/// Which quantity a confirmation request rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
    /// Predicted input-scan volume (output size was unknown).
    Input,
    /// Predicted output volume.
    Output,
    /// The estimate itself could not be obtained.
    EstimationFailed,
}

/// Outcome of the gate policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Run the query without asking.
    Proceed,
    /// Ask the operator first.
    ConfirmRequired {
        basis: Basis,
        /// The size that crossed the threshold; `None` when estimation failed.
        amount: Option<f64>,
    },
}

impl Decision {
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Decision::ConfirmRequired { .. })
    }

    pub fn basis(&self) -> Option<Basis> {
        match self {
            Decision::Proceed => None,
            Decision::ConfirmRequired { basis, .. } => Some(*basis),
        }
    }
}

/// Threshold policy over a [`CostEstimate`].
///
/// Rules, in order, all with strict `>`:
/// 1. estimation failed: confirm ([`Basis::EstimationFailed`])
/// 2. output size NaN or `+inf`: confirm if the input total exceeds the
///    threshold ([`Basis::Input`])
/// 3. otherwise confirm if the output size exceeds the threshold
///    ([`Basis::Output`])
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    threshold_bytes: u64,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_BYTES)
    }
}

impl GatePolicy {
    pub fn new(threshold_bytes: u64) -> Self {
        Self { threshold_bytes }
    }

    pub fn threshold_bytes(&self) -> u64 {
        self.threshold_bytes
    }

    /// Decide whether a query may run.
    pub fn decide(&self, estimate: Result<&CostEstimate, &EstimateError>) -> Decision {
        let Ok(estimate) = estimate else {
            return Decision::ConfirmRequired {
                basis: Basis::EstimationFailed,
                amount: None,
            };
        };

        let threshold = self.threshold_bytes as f64;

        if !estimate.output_is_known() {
            let total = estimate.total_input_bytes;
            return if total > threshold {
                Decision::ConfirmRequired {
                    basis: Basis::Input,
                    amount: Some(total),
                }
            } else {
                Decision::Proceed
            };
        }

        let output = estimate.predicted_output_bytes;
        if output > threshold {
            Decision::ConfirmRequired {
                basis: Basis::Output,
                amount: Some(output),
            }
        } else {
            Decision::Proceed
        }
    }
}
