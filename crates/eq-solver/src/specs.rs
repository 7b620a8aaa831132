//! Declarative equilibrium constraint specifications.
//!
//! Each declared constraint contributes one residual equation and releases
//! exactly one control variable the solver may adjust to satisfy it: the
//! temperature, the pressure, or the extent of a titrant that opens the
//! corresponding element totals. A fugacity constraint on `O2(g)`, for
//! example, is paired with an O2 titrant, so the system exchanges oxygen
//! with an external reservoir until the target fugacity is met.

use crate::error::{SolverError, SolverResult};
use eq_system::{AggregateState, ChemicalSystem};
use eq_thermo::ThermoProperties;
use nalgebra::DVector;
use std::fmt;
use std::sync::Arc;

/// The degree of freedom a constraint controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlVariable {
    /// Temperature [K] becomes an unknown.
    Temperature,
    /// Pressure [Pa] becomes an unknown.
    Pressure,
    /// Extent [mol] of a titrant with the stoichiometry of species column
    /// `species`; shifts the element (and charge) totals by that column.
    Titrant { species: usize },
    /// Extent [mol] of a pure charge titrant; shifts only the charge total.
    Charge,
}

/// What a constraint pins down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    Temperature,
    Pressure,
    /// Fugacity of a gaseous species (column index).
    Fugacity { species: usize },
    /// Chemical potential of a species (column index).
    ChemicalPotential { species: usize },
    /// pH, read from the activity of the hydron species (column index).
    Ph { species: usize },
    /// Zero net electrical charge.
    ChargeBalance,
    /// User-supplied residual, identified by name.
    Custom { name: String },
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => write!(f, "temperature"),
            Self::Pressure => write!(f, "pressure"),
            Self::Fugacity { species } => write!(f, "fugacity(#{species})"),
            Self::ChemicalPotential { species } => write!(f, "chemicalPotential(#{species})"),
            Self::Ph { .. } => write!(f, "pH"),
            Self::ChargeBalance => write!(f, "chargeBalance"),
            Self::Custom { name } => write!(f, "custom({name})"),
        }
    }
}

/// Evaluation context handed to custom residual functions.
pub struct ResidualArgs<'a> {
    pub system: &'a ChemicalSystem,
    /// Species amounts [mol] at the current iterate.
    pub n: &'a DVector<f64>,
    /// Temperature [K].
    pub t: f64,
    /// Pressure [Pa].
    pub p: f64,
    /// Batched properties at `(t, p, n)`.
    pub props: &'a ThermoProperties,
}

/// Custom constraint residual: the solver drives `f(args) - target` to zero.
pub type ResidualFn = Arc<dyn Fn(&ResidualArgs<'_>) -> f64 + Send + Sync>;

pub(crate) struct Constraint {
    pub kind: ConstraintKind,
    pub control: ControlVariable,
    pub residual: Option<ResidualFn>,
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("kind", &self.kind)
            .field("control", &self.control)
            .finish()
    }
}

/// An ordered set of constraint declarations against one system.
///
/// Declarations are checked eagerly (unknown species, non-gaseous fugacity
/// targets, duplicate kinds fail at the call site); the global
/// degrees-of-freedom check runs in [`validate`](Self::validate), which the
/// solver performs at construction.
#[derive(Debug)]
pub struct EquilibriumSpecs {
    system: Arc<ChemicalSystem>,
    constraints: Vec<Constraint>,
}

impl EquilibriumSpecs {
    pub fn new(system: Arc<ChemicalSystem>) -> Self {
        Self {
            system,
            constraints: Vec::new(),
        }
    }

    pub fn system(&self) -> &Arc<ChemicalSystem> {
        &self.system
    }

    /// Declare that temperature is known (bound later via conditions).
    pub fn temperature(&mut self) -> SolverResult<()> {
        self.push(ConstraintKind::Temperature, ControlVariable::Temperature, None)
    }

    /// Declare that pressure is known.
    pub fn pressure(&mut self) -> SolverResult<()> {
        self.push(ConstraintKind::Pressure, ControlVariable::Pressure, None)
    }

    /// Declare a fugacity constraint on a gaseous species. Pairs the
    /// constraint with a titrant of that species' stoichiometry.
    pub fn fugacity(&mut self, species: &str) -> SolverResult<()> {
        let j = self.system.species_index(species)?;
        let phase = &self.system.phases()[self.system.phase_of(j)];
        if phase.state() != AggregateState::Gaseous {
            return Err(SolverError::configuration(format!(
                "fugacity constraint requires a gaseous species, but '{species}' is in phase '{}'",
                phase.name()
            )));
        }
        self.push(
            ConstraintKind::Fugacity { species: j },
            ControlVariable::Titrant { species: j },
            None,
        )
    }

    /// Declare a chemical potential constraint on any species.
    pub fn chemical_potential(&mut self, species: &str) -> SolverResult<()> {
        let j = self.system.species_index(species)?;
        self.push(
            ConstraintKind::ChemicalPotential { species: j },
            ControlVariable::Titrant { species: j },
            None,
        )
    }

    /// Declare a pH constraint. The system must contain an `H+` species;
    /// the paired titrant exchanges H+ with an external reservoir.
    pub fn ph(&mut self) -> SolverResult<()> {
        let j = self.system.species_index("H+")?;
        self.push(
            ConstraintKind::Ph { species: j },
            ControlVariable::Titrant { species: j },
            None,
        )
    }

    /// Declare that the state must carry zero net charge, adjusted through
    /// a pure charge titrant.
    pub fn charge_balance(&mut self) -> SolverResult<()> {
        if self.system.charge_row().is_none() {
            return Err(SolverError::configuration(
                "charge balance declared on a system with no charged species",
            ));
        }
        self.push(ConstraintKind::ChargeBalance, ControlVariable::Charge, None)
    }

    /// Declare a custom constraint: the solver drives `f(args) - target`
    /// to zero by adjusting `control`.
    pub fn custom(
        &mut self,
        name: &str,
        control: ControlVariable,
        f: ResidualFn,
    ) -> SolverResult<()> {
        if let ControlVariable::Titrant { species } = control {
            if species >= self.system.num_species() {
                return Err(SolverError::configuration(format!(
                    "custom constraint '{name}' names titrant species column {species}, \
                     but the system has {} species",
                    self.system.num_species()
                )));
            }
        }
        if control == ControlVariable::Charge && self.system.charge_row().is_none() {
            return Err(SolverError::configuration(format!(
                "custom constraint '{name}' uses a charge titrant on a system \
                 with no charged species"
            )));
        }
        self.push(
            ConstraintKind::Custom {
                name: name.to_string(),
            },
            control,
            Some(f),
        )
    }

    fn push(
        &mut self,
        kind: ConstraintKind,
        control: ControlVariable,
        residual: Option<ResidualFn>,
    ) -> SolverResult<()> {
        if self.constraints.iter().any(|c| c.kind == kind) {
            return Err(SolverError::configuration(format!(
                "constraint '{kind}' declared twice"
            )));
        }
        self.constraints.push(Constraint {
            kind,
            control,
            residual,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Declared constraint kinds, in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = &ConstraintKind> {
        self.constraints.iter().map(|c| &c.kind)
    }

    pub(crate) fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Index of the constraint controlling a given variable, if any.
    pub(crate) fn control_index(&self, control: ControlVariable) -> Option<usize> {
        self.constraints.iter().position(|c| c.control == control)
    }

    /// Global well-posedness check.
    ///
    /// Each constraint brings one equation and one control unknown, so the
    /// augmented system stays square if and only if temperature and pressure
    /// are each controlled by exactly one constraint and no two constraints
    /// share a control variable.
    pub fn validate(&self) -> SolverResult<()> {
        for (i, c) in self.constraints.iter().enumerate() {
            if let Some(j) = self.constraints[..i]
                .iter()
                .position(|other| other.control == c.control)
            {
                return Err(SolverError::configuration(format!(
                    "constraints '{}' and '{}' control the same variable",
                    self.constraints[j].kind, c.kind
                )));
            }
        }

        let n = self.system.num_species();
        let e = self.system.num_components();
        let missing_t = self.control_index(ControlVariable::Temperature).is_none();
        let missing_p = self.control_index(ControlVariable::Pressure).is_none();
        if missing_t || missing_p {
            let unknowns =
                n + e + self.len() + usize::from(missing_t) + usize::from(missing_p);
            let equations = n + e + self.len();
            let mut free = Vec::new();
            if missing_t {
                free.push("temperature");
            }
            if missing_p {
                free.push("pressure");
            }
            return Err(SolverError::configuration(format!(
                "under-determined formulation: {} left uncontrolled \
                 ({unknowns} unknowns vs {equations} equations); declare a \
                 constraint that controls each",
                free.join(" and ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eq_system::{Phase, Species};

    fn system() -> Arc<ChemicalSystem> {
        let aqueous = Phase::new(
            "AqueousPhase",
            AggregateState::Aqueous,
            vec![
                Species::new("H2O", &[("H", 2.0), ("O", 1.0)], 0.0).unwrap(),
                Species::new("H+", &[("H", 1.0)], 1.0).unwrap(),
                Species::new("OH-", &[("O", 1.0), ("H", 1.0)], -1.0).unwrap(),
            ],
        )
        .unwrap();
        let gas = Phase::new(
            "GaseousPhase",
            AggregateState::Gaseous,
            vec![Species::new("O2(g)", &[("O", 2.0)], 0.0).unwrap()],
        )
        .unwrap();
        Arc::new(ChemicalSystem::new(vec![aqueous, gas]).unwrap())
    }

    #[test]
    fn duplicate_kind_rejected_at_declaration() {
        let mut specs = EquilibriumSpecs::new(system());
        specs.temperature().unwrap();
        let err = specs.temperature().unwrap_err();
        assert!(matches!(err, SolverError::Configuration { .. }));
    }

    #[test]
    fn fugacity_requires_gaseous_species() {
        let mut specs = EquilibriumSpecs::new(system());
        assert!(specs.fugacity("O2(g)").is_ok());
        let err = EquilibriumSpecs::new(system()).fugacity("H2O").unwrap_err();
        assert!(matches!(err, SolverError::Configuration { .. }));
    }

    #[test]
    fn fugacity_on_unknown_species_fails() {
        let mut specs = EquilibriumSpecs::new(system());
        assert!(matches!(
            specs.fugacity("CO2(g)"),
            Err(SolverError::System(_))
        ));
    }

    #[test]
    fn ph_requires_hydron() {
        let gas = Phase::new(
            "GaseousPhase",
            AggregateState::Gaseous,
            vec![Species::new("N2", &[("N", 2.0)], 0.0).unwrap()],
        )
        .unwrap();
        let no_hydron = Arc::new(ChemicalSystem::new(vec![gas]).unwrap());
        let mut specs = EquilibriumSpecs::new(no_hydron);
        assert!(specs.ph().is_err());

        let mut specs = EquilibriumSpecs::new(system());
        assert!(specs.ph().is_ok());
    }

    #[test]
    fn validation_requires_controlled_temperature_and_pressure() {
        let mut specs = EquilibriumSpecs::new(system());
        specs.temperature().unwrap();
        let err = specs.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("under-determined"));
        assert!(msg.contains("pressure"));

        specs.pressure().unwrap();
        specs.validate().unwrap();
    }

    #[test]
    fn shared_control_variable_rejected() {
        let sys = system();
        let mut specs = EquilibriumSpecs::new(sys.clone());
        specs.temperature().unwrap();
        specs.pressure().unwrap();
        specs.fugacity("O2(g)").unwrap();
        let o2 = sys.species_index("O2(g)").unwrap();
        specs
            .custom(
                "duplicate-titrant",
                ControlVariable::Titrant { species: o2 },
                Arc::new(|_args| 0.0),
            )
            .unwrap();
        assert!(specs.validate().is_err());
    }

    #[test]
    fn full_declaration_set_validates() {
        let mut specs = EquilibriumSpecs::new(system());
        specs.temperature().unwrap();
        specs.pressure().unwrap();
        specs.fugacity("O2(g)").unwrap();
        specs.ph().unwrap();
        specs.validate().unwrap();
        assert_eq!(specs.len(), 4);
    }
}
