//! Solver error taxonomy.

use eq_core::units::UnitError;
use eq_system::SystemError;
use eq_thermo::ThermoError;
use thiserror::Error;

/// Result type for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;

/// Errors raised while declaring, binding, or driving an equilibrium solve.
///
/// Failure to converge within the iteration budget is deliberately *not* an
/// error: it is reported through [`EquilibriumResult`](crate::EquilibriumResult)
/// so callers can inspect the partial outcome. Errors here mean the problem
/// was ill-posed or the arithmetic broke down.
#[derive(Error, Debug)]
pub enum SolverError {
    /// Ill-posed problem setup: duplicate or missing constraint declarations,
    /// unbound or doubly-bound condition values, mismatched system/specs,
    /// over- or under-determined formulations.
    #[error("Configuration error: {what}")]
    Configuration { what: String },

    /// Numerical breakdown: singular Jacobian factorization, non-finite
    /// residual at the current iterate, failed least-squares initialization.
    #[error("Numerical error: {what}")]
    Numerical { what: String },

    /// Malformed or out-of-range quantity input.
    #[error(transparent)]
    Unit(#[from] UnitError),

    /// Unknown species/element names and other system-level lookups.
    #[error(transparent)]
    System(#[from] SystemError),

    /// Property model failure during a residual evaluation.
    #[error("Thermodynamic model error: {0}")]
    Thermo(#[from] ThermoError),
}

impl SolverError {
    pub(crate) fn configuration(what: impl Into<String>) -> Self {
        Self::Configuration { what: what.into() }
    }

    pub(crate) fn numerical(what: impl Into<String>) -> Self {
        Self::Numerical { what: what.into() }
    }
}
