//! eq-solver: multiphase chemical equilibrium by Gibbs energy minimization.
//!
//! The solve is posed as the stationarity system of the constrained
//! minimization: chemical potentials balanced against element-wise Lagrange
//! multipliers, element and charge totals conserved up to declared titrants,
//! and one residual per declared constraint. Constraints are declared on
//! [`EquilibriumSpecs`], bound to numbers through [`EquilibriumConditions`],
//! and driven to zero by [`EquilibriumSolver`], which wraps a damped Newton
//! iteration in an outer loop that activates and retires phases as the
//! phase assemblage changes.
//!
//! ```no_run
//! use eq_solver::{EquilibriumConditions, EquilibriumSolver, EquilibriumSpecs};
//! use eq_system::{AggregateState, ChemicalState, ChemicalSystem, Phase, Species};
//! use eq_thermo::IdealModel;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gas = Phase::new(
//!     "GaseousPhase",
//!     AggregateState::Gaseous,
//!     vec![
//!         Species::new("N2", &[("N", 2.0)], 0.0)?,
//!         Species::new("H2", &[("H", 2.0)], 0.0)?,
//!         Species::new("NH3", &[("N", 1.0), ("H", 3.0)], 0.0)?,
//!     ],
//! )?;
//! let system = Arc::new(ChemicalSystem::new(vec![gas])?);
//! let model = Arc::new(IdealModel::new(
//!     &system,
//!     &[("N2", 0.0), ("H2", 0.0), ("NH3", -20_000.0)],
//! )?);
//!
//! let mut specs = EquilibriumSpecs::new(system.clone());
//! specs.temperature()?;
//! specs.pressure()?;
//! let specs = Arc::new(specs);
//!
//! let mut conditions = EquilibriumConditions::new(specs.clone());
//! conditions.temperature(500.0, "K")?;
//! conditions.pressure(10.0, "bar")?;
//!
//! let mut state = ChemicalState::new(system);
//! state.add("N2", 1.0, "mol")?;
//! state.add("H2", 3.0, "mol")?;
//!
//! let solver = EquilibriumSolver::new(specs, model)?;
//! let result = solver.solve(&mut state, &conditions)?;
//! assert!(result.succeeded);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod conditions;
pub mod error;
pub mod jacobian;
pub mod newton;
mod residuals;
pub mod result;
pub mod solver;
pub mod specs;

// Re-exports for ergonomics
pub use batch::solve_batch;
pub use conditions::EquilibriumConditions;
pub use error::{SolverError, SolverResult};
pub use newton::NewtonConfig;
pub use result::EquilibriumResult;
pub use solver::{EquilibriumSolver, SolverConfig};
pub use specs::{ConstraintKind, ControlVariable, EquilibriumSpecs, ResidualArgs, ResidualFn};
