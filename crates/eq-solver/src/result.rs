//! Solve outcome reporting.

use serde::{Deserialize, Serialize};

/// Outcome of one equilibrium solve.
///
/// Returned by value; the solved state itself is written back into the
/// caller's `ChemicalState`. A solve that ran out of iterations still
/// produces a result (with `succeeded == false`) so callers can log it,
/// relax tolerances, or retry from a better guess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquilibriumResult {
    /// Whether the residual norm dropped below tolerance.
    pub succeeded: bool,

    /// Total inner Newton iterations across all phase-set rounds.
    pub iterations: usize,

    /// Final residual 2-norm.
    pub residual_norm: f64,

    /// Human-readable diagnostic for unsuccessful solves.
    pub message: Option<String>,
}

impl EquilibriumResult {
    pub(crate) fn converged(iterations: usize, residual_norm: f64) -> Self {
        Self {
            succeeded: true,
            iterations,
            residual_norm,
            message: None,
        }
    }

    pub(crate) fn failed(
        iterations: usize,
        residual_norm: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            succeeded: false,
            iterations,
            residual_norm,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_round_trips_through_serde() {
        let r = EquilibriumResult::failed(42, 3.5e-2, "iteration budget exhausted");
        let json = serde_json::to_string(&r).unwrap();
        let back: EquilibriumResult = serde_json::from_str(&json).unwrap();
        assert!(!back.succeeded);
        assert_eq!(back.iterations, 42);
        assert_eq!(back.message.as_deref(), Some("iteration budget exhausted"));
    }
}
