//! Parallel solves over independent states.

use crate::conditions::EquilibriumConditions;
use crate::error::SolverResult;
use crate::result::EquilibriumResult;
use crate::solver::EquilibriumSolver;
use eq_system::ChemicalState;
use rayon::prelude::*;

/// Equilibrate many states in parallel under the same conditions.
///
/// Each state is private to its solve; the solver, system, and model are
/// shared read-only, so the work partitions cleanly across threads. Results
/// come back in input order, one per state, and a failed or erroring solve
/// does not disturb its neighbors.
pub fn solve_batch(
    solver: &EquilibriumSolver,
    states: &mut [ChemicalState],
    conditions: &EquilibriumConditions,
) -> Vec<SolverResult<EquilibriumResult>> {
    states
        .par_iter_mut()
        .map(|state| solver.solve(state, conditions))
        .collect()
}
