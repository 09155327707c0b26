//! Quality gate results.

use super::Phase;
use serde::{Deserialize, Serialize};

/// Outcome of one quality gate for one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    /// Gate name.
    pub gate: String,
    /// Phase the gate ran for.
    pub phase: Phase,
    /// Whether the gate passed.
    pub passed: bool,
    /// Human-readable findings, empty when the gate passed cleanly.
    pub findings: Vec<String>,
}

impl GateReport {
    /// Creates a passing report.
    #[must_use]
    pub fn passed(gate: impl Into<String>, phase: Phase) -> Self {
        Self {
            gate: gate.into(),
            phase,
            passed: true,
            findings: Vec::new(),
        }
    }

    /// Creates a failing report.
    #[must_use]
    pub fn failed(gate: impl Into<String>, phase: Phase, findings: Vec<String>) -> Self {
        Self {
            gate: gate.into(),
            phase,
            passed: false,
            findings,
        }
    }
}
