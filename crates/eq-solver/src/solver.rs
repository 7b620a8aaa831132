//! Equilibrium solver: damped Newton inside a phase-set outer loop.

use crate::conditions::EquilibriumConditions;
use crate::error::{SolverError, SolverResult};
use crate::newton::{NewtonConfig, newton_solve};
use crate::residuals::{Assembly, Iterate};
use crate::result::EquilibriumResult;
use crate::specs::{ConstraintKind, ControlVariable, EquilibriumSpecs};
use eq_core::units::constants::R_J_PER_MOL_K;
use eq_system::ChemicalState;
use eq_thermo::{ThermoModel, ThermoProperties};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Inner Newton settings.
    pub newton: NewtonConfig,
    /// Budget of phase-set rounds (activations, deactivations, exchanges).
    pub max_rounds: usize,
    /// Floor amount [mol] used to seed log unknowns and ghost compositions.
    pub seed_amount: f64,
    /// Amount [mol] given to a phase when it is activated, and to species
    /// an active mixture phase starts without.
    pub activation_amount: f64,
    /// Excess over unit saturation required to activate an absent phase.
    pub stability_tol: f64,
    /// Amount [mol] below which a phase counts as vanished.
    pub vanish_threshold: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            newton: NewtonConfig::default(),
            max_rounds: 16,
            seed_amount: 1e-16,
            activation_amount: 1e-8,
            stability_tol: 1e-6,
            vanish_threshold: 1e-10,
        }
    }
}

/// Gibbs energy minimization solver for one spec set and property model.
///
/// Construction validates the specs (square formulation, no shared control
/// variables); `solve` then never has to re-check the declaration set. The
/// solver is immutable and thread-safe, so one instance can drive many
/// states, including in parallel.
pub struct EquilibriumSolver {
    specs: Arc<EquilibriumSpecs>,
    model: Arc<dyn ThermoModel>,
    config: SolverConfig,
}

impl std::fmt::Debug for EquilibriumSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EquilibriumSolver")
            .field("specs", &self.specs)
            .field("model", &self.model.name())
            .field("config", &self.config)
            .finish()
    }
}

impl EquilibriumSolver {
    pub fn new(specs: Arc<EquilibriumSpecs>, model: Arc<dyn ThermoModel>) -> SolverResult<Self> {
        specs.validate()?;
        Ok(Self {
            specs,
            model,
            config: SolverConfig::default(),
        })
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn specs(&self) -> &Arc<EquilibriumSpecs> {
        &self.specs
    }

    /// Equilibrate `state` under the bound `conditions`.
    ///
    /// On success the state's amounts, temperature, and pressure are
    /// overwritten with the equilibrium values. An exhausted iteration
    /// budget is reported through the result, not as an error; the state
    /// then holds the best point reached. Hard errors leave the state
    /// untouched.
    pub fn solve(
        &self,
        state: &mut ChemicalState,
        conditions: &EquilibriumConditions,
    ) -> SolverResult<EquilibriumResult> {
        let system = self.specs.system();
        if !Arc::ptr_eq(state.system(), system) {
            return Err(SolverError::configuration(
                "state and specs refer to different chemical systems",
            ));
        }
        if !Arc::ptr_eq(conditions.specs(), &self.specs) {
            return Err(SolverError::configuration(
                "conditions were built for a different spec set",
            ));
        }
        let targets = conditions.targets()?;
        let b0 = state.component_totals();

        // A phase starts active if the initial state put material in it.
        let mut active: Vec<bool> = (0..system.phases().len())
            .map(|p| system.phase_range(p).map(|j| state.amounts()[j]).sum::<f64>() > 0.0)
            .collect();

        let mut current = Iterate {
            n: state.amounts().clone(),
            t: state.temperature_kelvin(),
            p: state.pressure_pascal(),
            lambda: DVector::zeros(system.num_components()),
            q: self.initial_controls(&targets, state),
        };
        current.t = current.q[self.control_position(ControlVariable::Temperature)];
        current.p = current.q[self.control_position(ControlVariable::Pressure)];

        // Species an active mixture phase starts without still carry log
        // unknowns. Give them a trace amount large enough that residual
        // rows proportional to the amount keep usable Jacobian entries;
        // the balance equations squeeze the surplus back out.
        for (p, phase) in system.phases().iter().enumerate() {
            if !active[p] || phase.is_pure_condensed() {
                continue;
            }
            for j in system.phase_range(p) {
                if current.n[j] == 0.0 {
                    current.n[j] = self.config.activation_amount;
                }
            }
        }

        let mut total_iterations = 0;
        let mut last_norm = f64::NAN;
        // Phase activated by the most recent stability check, and the pure
        // phases already tried as its exchange partner.
        let mut activation: Option<usize> = None;
        let mut exchange_tried: Vec<usize> = Vec::new();

        for round in 0..self.config.max_rounds {
            let asm = Assembly::new(
                system,
                self.model.as_ref(),
                &self.specs,
                &targets,
                &b0,
                &active,
                self.config.seed_amount,
            )?;
            current.lambda = self.initial_multipliers(&asm, &current)?;

            let attempt = newton_solve(
                asm.pack(&current),
                |z| asm.residual(z),
                &self.config.newton,
            );
            let newton = match attempt {
                Ok(n) => n,
                Err(e @ SolverError::Numerical { .. }) => {
                    // A freshly activated phase can make the round's system
                    // unsolvable until its exchange partner leaves; treat the
                    // breakdown as a failed round if an exchange is possible.
                    if let Some(victim) = self.exchange_candidate(&active, activation, &exchange_tried)
                    {
                        warn!(round, victim, "numerical breakdown, trying phase exchange");
                        Self::deactivate(&mut active, &mut current, system, victim);
                        exchange_tried.push(victim);
                        continue;
                    }
                    return Err(e);
                }
                Err(e) => return Err(e),
            };
            total_iterations += newton.iterations;
            last_norm = newton.residual_norm;
            let sol = asm.unpack(&newton.x);
            debug!(
                round,
                iterations = newton.iterations,
                residual = newton.residual_norm,
                converged = newton.converged,
                "phase-set round finished"
            );

            if newton.converged {
                current = sol;

                // A pure condensed phase driven negative is oversupplied
                // and must leave the phase set.
                let negatives = self.negative_pure_phases(&asm, &current);
                if !negatives.is_empty() {
                    for p in negatives {
                        debug!(phase = system.phases()[p].name(), "deactivating exhausted phase");
                        Self::deactivate(&mut active, &mut current, system, p);
                    }
                    activation = None;
                    exchange_tried.clear();
                    continue;
                }

                // Saturation check: would any absent phase lower the Gibbs
                // energy if it formed?
                let props = asm.properties(&current)?;
                if let Some((p, weights)) = self.most_supersaturated(&active, &current, &props)? {
                    debug!(phase = system.phases()[p].name(), "activating supersaturated phase");
                    self.activate(&mut active, &mut current, p, &weights);
                    activation = Some(p);
                    exchange_tried.clear();
                    continue;
                }

                self.write_back(state, &current)?;
                return Ok(EquilibriumResult::converged(
                    total_iterations,
                    newton.residual_norm,
                ));
            }

            // Unconverged round: look for a structural repair before
            // giving up.
            let negatives = self.negative_pure_phases(&asm, &sol);
            if !negatives.is_empty() {
                for p in negatives {
                    debug!(phase = system.phases()[p].name(), "deactivating exhausted phase");
                    Self::deactivate(&mut active, &mut current, system, p);
                }
                activation = None;
                exchange_tried.clear();
                continue;
            }
            if let Some(p) = self.collapsed_mixture_phase(&sol, &active) {
                debug!(phase = system.phases()[p].name(), "deactivating collapsed phase");
                Self::deactivate(&mut active, &mut current, system, p);
                activation = None;
                exchange_tried.clear();
                continue;
            }
            if let Some(victim) = self.exchange_candidate(&active, activation, &exchange_tried) {
                debug!(
                    victim = system.phases()[victim].name(),
                    "unconverged after activation, trying phase exchange"
                );
                Self::deactivate(&mut active, &mut current, system, victim);
                exchange_tried.push(victim);
                continue;
            }

            warn!(
                round,
                residual = newton.residual_norm,
                "equilibrium solve did not converge"
            );
            self.write_back(state, &current)?;
            return Ok(EquilibriumResult::failed(
                total_iterations,
                newton.residual_norm,
                newton
                    .message
                    .unwrap_or_else(|| "did not converge".to_string()),
            ));
        }

        warn!("phase-set round budget exhausted");
        self.write_back(state, &current)?;
        Ok(EquilibriumResult::failed(
            total_iterations,
            last_norm,
            format!("phase-set round budget {} exhausted", self.config.max_rounds),
        ))
    }

    fn control_position(&self, control: ControlVariable) -> usize {
        // Guaranteed by validate() at construction.
        self.specs.control_index(control).unwrap_or(0)
    }

    /// Initial control values: bound targets for temperature and pressure
    /// constraints, the state's values when a custom constraint controls
    /// them, zero extent for titrants.
    fn initial_controls(&self, targets: &[f64], state: &ChemicalState) -> DVector<f64> {
        DVector::from_fn(self.specs.len(), |k, _| {
            let c = &self.specs.constraints()[k];
            match (&c.kind, c.control) {
                (ConstraintKind::Temperature, _) => targets[k],
                (ConstraintKind::Pressure, _) => targets[k],
                (_, ControlVariable::Temperature) => state.temperature_kelvin(),
                (_, ControlVariable::Pressure) => state.pressure_pascal(),
                _ => 0.0,
            }
        })
    }

    /// Least-squares multipliers from the stationarity conditions at the
    /// round's starting point: minimize ‖A_actᵀλ − μ/RT‖. At a previously
    /// converged state this reproduces the converged multipliers, which is
    /// what makes warm restarts terminate immediately.
    fn initial_multipliers(&self, asm: &Assembly<'_>, at: &Iterate) -> SolverResult<DVector<f64>> {
        let system = self.specs.system();
        // Evaluate at the point the Newton iteration will actually start
        // from: pack floors log amounts at the seed, so a zero amount in an
        // active mixture phase cannot reach the property model.
        let start = asm.unpack(&asm.pack(at));
        let props = asm.properties(&start)?;
        let rt = R_J_PER_MOL_K * at.t;
        let a = system.formula_matrix();

        let rows: Vec<usize> = asm.active_species().collect();
        let mut at_mat = DMatrix::zeros(rows.len(), system.num_components());
        let mut g = DVector::zeros(rows.len());
        for (r, &j) in rows.iter().enumerate() {
            at_mat.row_mut(r).tr_copy_from(&a.column(j));
            g[r] = props.mu[j] / rt;
        }
        at_mat
            .svd(true, true)
            .solve(&g, 1e-12)
            .map_err(|e| SolverError::numerical(format!("multiplier initialization: {e}")))
    }

    /// Active pure condensed phases whose converged amount went negative.
    fn negative_pure_phases(&self, asm: &Assembly<'_>, at: &Iterate) -> Vec<usize> {
        let system = self.specs.system();
        asm.pure_species()
            .iter()
            .filter(|&&j| at.n[j] < -self.config.vanish_threshold)
            .map(|&j| system.phase_of(j))
            .collect()
    }

    /// An active mixture phase whose total amount collapsed below the
    /// vanish threshold (it wants to leave but log unknowns cannot reach
    /// zero).
    fn collapsed_mixture_phase(&self, at: &Iterate, active: &[bool]) -> Option<usize> {
        let system = self.specs.system();
        let active_count = active.iter().filter(|a| **a).count();
        if active_count <= 1 {
            return None;
        }
        for (p, phase) in system.phases().iter().enumerate() {
            if !active[p] || phase.is_pure_condensed() {
                continue;
            }
            let total: f64 = system.phase_range(p).map(|j| at.n[j]).sum();
            if total < self.config.vanish_threshold {
                return Some(p);
            }
        }
        None
    }

    /// Pure phase to remove when the set became unsolvable after an
    /// activation. Candidates are tried one at a time and not restored;
    /// the activated phase is displacing one of them.
    fn exchange_candidate(
        &self,
        active: &[bool],
        activation: Option<usize>,
        tried: &[usize],
    ) -> Option<usize> {
        let just_activated = activation?;
        let system = self.specs.system();
        (0..system.phases().len()).find(|&p| {
            p != just_activated
                && active[p]
                && system.phases()[p].is_pure_condensed()
                && !tried.contains(&p)
        })
    }

    /// Saturation state of every inactive phase at the converged point.
    ///
    /// For a phase of m species with ghost (uniform) composition, the
    /// stationarity defects d_j = A_jᵀλ − μ_j/RT satisfy
    /// Σ exp(d_j) / m = Σ y*_j, the total hypothetical mole fraction the
    /// phase would take if present. Above one, forming the phase lowers the
    /// Gibbs energy. For a pure phase this reduces to the usual saturation
    /// index test d > 0.
    fn most_supersaturated(
        &self,
        active: &[bool],
        at: &Iterate,
        props: &ThermoProperties,
    ) -> SolverResult<Option<(usize, Vec<f64>)>> {
        let system = self.specs.system();
        let rt = R_J_PER_MOL_K * at.t;
        let a = system.formula_matrix();

        let mut best: Option<(usize, f64, Vec<f64>)> = None;
        for p in 0..system.phases().len() {
            if active[p] {
                continue;
            }
            let range = system.phase_range(p);
            let m = range.len() as f64;
            let weights: Vec<f64> = range
                .map(|j| (a.column(j).dot(&at.lambda) - props.mu[j] / rt).exp())
                .collect();
            let saturation = weights.iter().sum::<f64>() / m;
            if !saturation.is_finite() {
                return Err(SolverError::numerical(format!(
                    "non-finite saturation index for phase '{}'",
                    system.phases()[p].name()
                )));
            }
            if saturation > 1.0 + self.config.stability_tol
                && best.as_ref().is_none_or(|(_, s, _)| saturation > *s)
            {
                best = Some((p, saturation, weights));
            }
        }
        Ok(best.map(|(p, _, w)| (p, w)))
    }

    /// Bring a phase into the active set with a small seed amount,
    /// distributed over its species by their hypothetical mole fractions.
    fn activate(&self, active: &mut [bool], at: &mut Iterate, p: usize, weights: &[f64]) {
        let system = self.specs.system();
        active[p] = true;
        let total: f64 = weights.iter().sum();
        for (j, w) in system.phase_range(p).zip(weights) {
            at.n[j] = (self.config.activation_amount * w / total).max(self.config.seed_amount);
        }
    }

    fn deactivate(
        active: &mut [bool],
        at: &mut Iterate,
        system: &eq_system::ChemicalSystem,
        p: usize,
    ) {
        active[p] = false;
        for j in system.phase_range(p) {
            at.n[j] = 0.0;
        }
    }

    fn write_back(&self, state: &mut ChemicalState, at: &Iterate) -> SolverResult<()> {
        let mut n = at.n.clone();
        for v in n.iter_mut() {
            // Round-off can leave tiny negative pure-phase amounts.
            *v = v.max(0.0);
        }
        state.set_amounts(n)?;
        state.set_temperature(at.t, "K")?;
        state.set_pressure(at.p, "Pa")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::EquilibriumConditions;
    use eq_system::{AggregateState, ChemicalSystem, Phase, Species};
    use eq_thermo::IdealModel;

    fn gas_system() -> Arc<ChemicalSystem> {
        let gas = Phase::new(
            "GaseousPhase",
            AggregateState::Gaseous,
            vec![
                Species::new("N2", &[("N", 2.0)], 0.0).unwrap(),
                Species::new("H2", &[("H", 2.0)], 0.0).unwrap(),
                Species::new("NH3", &[("N", 1.0), ("H", 3.0)], 0.0).unwrap(),
            ],
        )
        .unwrap();
        Arc::new(ChemicalSystem::new(vec![gas]).unwrap())
    }

    #[test]
    fn construction_validates_the_specs() {
        let system = gas_system();
        let mut specs = EquilibriumSpecs::new(system.clone());
        specs.temperature().unwrap();
        let model =
            IdealModel::new(&system, &[("N2", 0.0), ("H2", 0.0), ("NH3", 0.0)]).unwrap();
        let err = EquilibriumSolver::new(Arc::new(specs), Arc::new(model)).unwrap_err();
        assert!(matches!(err, SolverError::Configuration { .. }));
    }

    #[test]
    fn mismatched_state_rejected() {
        let system = gas_system();
        let other = gas_system(); // structurally equal, distinct allocation
        let mut specs = EquilibriumSpecs::new(system.clone());
        specs.temperature().unwrap();
        specs.pressure().unwrap();
        let specs = Arc::new(specs);
        let model = Arc::new(
            IdealModel::new(&system, &[("N2", 0.0), ("H2", 0.0), ("NH3", 0.0)]).unwrap(),
        );
        let solver = EquilibriumSolver::new(specs.clone(), model).unwrap();

        let mut conditions = EquilibriumConditions::new(specs);
        conditions.temperature(500.0, "K").unwrap();
        conditions.pressure(1.0, "bar").unwrap();

        let mut state = ChemicalState::new(other);
        state.set_amount("N2", 1.0).unwrap();
        let err = solver.solve(&mut state, &conditions).unwrap_err();
        assert!(matches!(err, SolverError::Configuration { .. }));
    }

    #[test]
    fn unbound_conditions_rejected_at_solve_time() {
        let system = gas_system();
        let mut specs = EquilibriumSpecs::new(system.clone());
        specs.temperature().unwrap();
        specs.pressure().unwrap();
        let specs = Arc::new(specs);
        let model = Arc::new(
            IdealModel::new(&system, &[("N2", 0.0), ("H2", 0.0), ("NH3", 0.0)]).unwrap(),
        );
        let solver = EquilibriumSolver::new(specs.clone(), model).unwrap();

        let conditions = EquilibriumConditions::new(specs);
        let mut state = ChemicalState::new(system);
        state.set_amount("N2", 1.0).unwrap();
        let err = solver.solve(&mut state, &conditions).unwrap_err();
        assert!(err.to_string().contains("unbound"));
    }

    #[test]
    fn empty_state_rejected() {
        let system = gas_system();
        let mut specs = EquilibriumSpecs::new(system.clone());
        specs.temperature().unwrap();
        specs.pressure().unwrap();
        let specs = Arc::new(specs);
        let model = Arc::new(
            IdealModel::new(&system, &[("N2", 0.0), ("H2", 0.0), ("NH3", 0.0)]).unwrap(),
        );
        let solver = EquilibriumSolver::new(specs.clone(), model).unwrap();

        let mut conditions = EquilibriumConditions::new(specs);
        conditions.temperature(500.0, "K").unwrap();
        conditions.pressure(1.0, "bar").unwrap();

        let mut state = ChemicalState::new(system);
        let err = solver.solve(&mut state, &conditions).unwrap_err();
        assert!(matches!(err, SolverError::Configuration { .. }));
    }
}
