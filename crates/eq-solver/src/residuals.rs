//! Residual assembly for the equilibrium conditions.
//!
//! The unknown vector is `z = [u | m | λ | q]`:
//! - `u`: log amounts of species in active mixture phases (positivity by
//!   construction),
//! - `m`: linear amounts of active pure condensed phases (their stationarity
//!   does not depend on the amount, so these may cross zero and are policed
//!   by the outer phase-set loop),
//! - `λ`: one Lagrange multiplier per element row (plus charge row),
//!   normalized by RT,
//! - `q`: one control variable per declared constraint (temperature,
//!   pressure, titrant extents).
//!
//! The residual stacks, in order: stationarity `μ_i/RT − A_iᵀλ` for every
//! active species, component balances `A·n − (b0 + C·q)` scaled per row, and
//! one residual per declared constraint. Each constraint adds exactly one
//! equation and one control unknown, so the system is square whenever the
//! spec set validates.

use crate::error::{SolverError, SolverResult};
use crate::specs::{ConstraintKind, ControlVariable, EquilibriumSpecs, ResidualArgs};
use eq_core::units::constants::{P_REF_PA, R_J_PER_MOL_K};
use eq_system::ChemicalSystem;
use eq_thermo::{ThermoModel, ThermoProperties};
use nalgebra::{DMatrix, DVector};
use std::f64::consts::LN_10;

/// One point of the outer iteration, in physical variables.
#[derive(Debug, Clone)]
pub(crate) struct Iterate {
    /// Full species amounts [mol]; zero for species of inactive phases.
    /// Amounts of active pure condensed phases may be transiently negative.
    pub n: DVector<f64>,
    pub t: f64,
    pub p: f64,
    /// Multipliers per component row, normalized by RT.
    pub lambda: DVector<f64>,
    /// Control variable values, one per declared constraint.
    pub q: DVector<f64>,
}

pub(crate) struct Assembly<'a> {
    system: &'a ChemicalSystem,
    model: &'a dyn ThermoModel,
    specs: &'a EquilibriumSpecs,
    /// Canonical target per constraint, in declaration order.
    targets: &'a [f64],
    b0: &'a DVector<f64>,
    /// Per-row scale for the component balances.
    row_scale: DVector<f64>,
    /// Titrant matrix C: component rows × constraints.
    titrants: DMatrix<f64>,
    /// Active mixture-phase species columns (log unknowns).
    mix: Vec<usize>,
    /// Active pure condensed species columns (linear unknowns).
    pure: Vec<usize>,
    /// Species columns of inactive mixture phases (ghost-seeded for the
    /// property model, excluded from balances and stationarity).
    ghost: Vec<usize>,
    q_temperature: usize,
    q_pressure: usize,
    seed: f64,
}

impl<'a> Assembly<'a> {
    pub fn new(
        system: &'a ChemicalSystem,
        model: &'a dyn ThermoModel,
        specs: &'a EquilibriumSpecs,
        targets: &'a [f64],
        b0: &'a DVector<f64>,
        active_phases: &[bool],
        seed: f64,
    ) -> SolverResult<Self> {
        let q_temperature = specs
            .control_index(ControlVariable::Temperature)
            .ok_or_else(|| SolverError::configuration("temperature is uncontrolled"))?;
        let q_pressure = specs
            .control_index(ControlVariable::Pressure)
            .ok_or_else(|| SolverError::configuration("pressure is uncontrolled"))?;

        let mut mix = Vec::new();
        let mut pure = Vec::new();
        let mut ghost = Vec::new();
        for (p, phase) in system.phases().iter().enumerate() {
            let range = system.phase_range(p);
            if !active_phases[p] {
                if !phase.is_pure_condensed() {
                    ghost.extend(range);
                }
                continue;
            }
            if phase.is_pure_condensed() {
                pure.extend(range);
            } else {
                mix.extend(range);
            }
        }
        if mix.is_empty() && pure.is_empty() {
            return Err(SolverError::configuration(
                "no active phase; the initial state has no material",
            ));
        }

        let e = system.num_components();
        let a = system.formula_matrix();
        let mut titrants = DMatrix::zeros(e, specs.len());
        for (k, c) in specs.constraints().iter().enumerate() {
            match c.control {
                ControlVariable::Titrant { species } => {
                    titrants.set_column(k, &a.column(species));
                }
                ControlVariable::Charge => {
                    // Validated at declaration: the charge row exists.
                    if let Some(z) = system.charge_row() {
                        titrants[(z, k)] = 1.0;
                    }
                }
                ControlVariable::Temperature | ControlVariable::Pressure => {}
            }
        }

        let row_scale = DVector::from_fn(e, |i, _| b0[i].abs().max(1.0));

        Ok(Self {
            system,
            model,
            specs,
            targets,
            b0,
            row_scale,
            titrants,
            mix,
            pure,
            ghost,
            q_temperature,
            q_pressure,
            seed,
        })
    }

    pub fn num_unknowns(&self) -> usize {
        self.mix.len() + self.pure.len() + self.system.num_components() + self.specs.len()
    }

    pub fn mixture_species(&self) -> &[usize] {
        &self.mix
    }

    pub fn pure_species(&self) -> &[usize] {
        &self.pure
    }

    /// Species columns carrying a stationarity equation, in residual order.
    pub fn active_species(&self) -> impl Iterator<Item = usize> + '_ {
        self.mix.iter().chain(self.pure.iter()).copied()
    }

    pub fn pack(&self, iterate: &Iterate) -> DVector<f64> {
        let mut z = DVector::zeros(self.num_unknowns());
        let mut at = 0;
        for &j in &self.mix {
            z[at] = iterate.n[j].max(self.seed).ln();
            at += 1;
        }
        for &j in &self.pure {
            z[at] = iterate.n[j];
            at += 1;
        }
        for i in 0..self.system.num_components() {
            z[at] = iterate.lambda[i];
            at += 1;
        }
        for k in 0..self.specs.len() {
            z[at] = iterate.q[k];
            at += 1;
        }
        z
    }

    pub fn unpack(&self, z: &DVector<f64>) -> Iterate {
        let e = self.system.num_components();
        let mut n = DVector::zeros(self.system.num_species());
        let mut at = 0;
        for &j in &self.mix {
            n[j] = z[at].exp();
            at += 1;
        }
        for &j in &self.pure {
            n[j] = z[at];
            at += 1;
        }
        let lambda = DVector::from_fn(e, |i, _| z[at + i]);
        at += e;
        let q = DVector::from_fn(self.specs.len(), |k, _| z[at + k]);
        Iterate {
            n,
            t: q[self.q_temperature],
            p: q[self.q_pressure],
            lambda,
            q,
        }
    }

    /// Model-admissible amounts: ghost seeds for inactive mixture phases,
    /// pure condensed amounts clamped at zero.
    pub fn eval_amounts(&self, n: &DVector<f64>) -> DVector<f64> {
        let mut n_eval = n.clone();
        for &j in &self.ghost {
            n_eval[j] = self.seed;
        }
        for &j in &self.pure {
            n_eval[j] = n_eval[j].max(0.0);
        }
        n_eval
    }

    pub fn properties(&self, iterate: &Iterate) -> SolverResult<ThermoProperties> {
        let n_eval = self.eval_amounts(&iterate.n);
        Ok(self
            .model
            .properties(self.system, iterate.t, iterate.p, &n_eval)?)
    }

    pub fn residual(&self, z: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let iterate = self.unpack(z);
        let n_eval = self.eval_amounts(&iterate.n);
        // One batched property call per residual evaluation; everything
        // below reads from it.
        let props = self
            .model
            .properties(self.system, iterate.t, iterate.p, &n_eval)?;
        let rt = R_J_PER_MOL_K * iterate.t;
        let a = self.system.formula_matrix();
        let e = self.system.num_components();

        let mut r = DVector::zeros(self.num_unknowns());
        let mut at = 0;

        // Stationarity of every species in an active phase.
        for j in self.active_species() {
            r[at] = props.mu[j] / rt - a.column(j).dot(&iterate.lambda);
            at += 1;
        }

        // Component balances, titrant-adjusted and scaled per row.
        let balance = a * &iterate.n - self.b0 - &self.titrants * &iterate.q;
        for i in 0..e {
            r[at] = balance[i] / self.row_scale[i];
            at += 1;
        }

        // One residual per declared constraint.
        for (k, c) in self.specs.constraints().iter().enumerate() {
            let target = self.targets[k];
            r[at] = match &c.kind {
                ConstraintKind::Temperature => (iterate.t - target) / target,
                ConstraintKind::Pressure => (iterate.p - target) / target,
                // Fugacity and chemical potential pin the element-potential
                // combination A_jᵀλ directly, so they stay well defined even
                // when the species' phase is absent. μ_j/RT − ln a_j is the
                // standard-state part, independent of composition.
                ConstraintKind::Fugacity { species } => {
                    let mu0_rt = props.mu[*species] / rt - props.ln_activity[*species];
                    mu0_rt + (target / P_REF_PA).ln() - a.column(*species).dot(&iterate.lambda)
                }
                ConstraintKind::ChemicalPotential { species } => {
                    target / rt - a.column(*species).dot(&iterate.lambda)
                }
                ConstraintKind::Ph { species } => props.ln_activity[*species] + target * LN_10,
                ConstraintKind::ChargeBalance => {
                    let z_row = self
                        .system
                        .charge_row()
                        .ok_or_else(|| SolverError::configuration("missing charge row"))?;
                    let mut net = 0.0;
                    let mut gross = 0.0;
                    for j in 0..self.system.num_species() {
                        net += a[(z_row, j)] * iterate.n[j];
                        gross += a[(z_row, j)].abs() * n_eval[j];
                    }
                    (net - target) / gross.max(1.0)
                }
                ConstraintKind::Custom { name } => {
                    let f = c.residual.as_ref().ok_or_else(|| {
                        SolverError::configuration(format!(
                            "custom constraint '{name}' has no residual function"
                        ))
                    })?;
                    let args = ResidualArgs {
                        system: self.system,
                        n: &n_eval,
                        t: iterate.t,
                        p: iterate.p,
                        props: &props,
                    };
                    f(&args) - target
                }
            };
            at += 1;
        }

        Ok(r)
    }
}
