//! Numeric condition values bound to declared constraint specifications.

use crate::error::{SolverError, SolverResult};
use crate::specs::{ConstraintKind, EquilibriumSpecs};
use eq_core::numeric::{ensure_finite, ensure_positive};
use eq_core::units::{self, Quantity};
use std::sync::Arc;

/// Values for the constraints a spec set declares.
///
/// Setters are kind-matched: `temperature(..)` only binds a declared
/// temperature constraint, `fugacity("O2(g)", ..)` only binds the fugacity
/// constraint on that species. Binding a value for an undeclared constraint,
/// binding twice, or leaving a declared constraint unbound at solve time is
/// a configuration error. Values are validated eagerly, at bind time.
#[derive(Debug, Clone)]
pub struct EquilibriumConditions {
    specs: Arc<EquilibriumSpecs>,
    values: Vec<Option<f64>>,
}

impl EquilibriumConditions {
    pub fn new(specs: Arc<EquilibriumSpecs>) -> Self {
        // Charge balance always targets zero net charge; bind it up front.
        let values = specs
            .kinds()
            .map(|kind| (*kind == ConstraintKind::ChargeBalance).then_some(0.0))
            .collect();
        Self { specs, values }
    }

    pub fn specs(&self) -> &Arc<EquilibriumSpecs> {
        &self.specs
    }

    /// Bind the temperature target, e.g. `("C", 210.0)` or kelvin.
    pub fn temperature(&mut self, value: f64, unit: &str) -> SolverResult<()> {
        let kelvin = units::convert(value, unit, Quantity::Temperature)?;
        self.bind(|kind| *kind == ConstraintKind::Temperature, kelvin)
    }

    /// Bind the pressure target in any supported pressure unit.
    pub fn pressure(&mut self, value: f64, unit: &str) -> SolverResult<()> {
        let pascal = units::convert(value, unit, Quantity::Pressure)?;
        self.bind(|kind| *kind == ConstraintKind::Pressure, pascal)
    }

    /// Bind the fugacity target of a gaseous species, in a pressure unit.
    /// The value must be finite and strictly positive; the solver works with
    /// its logarithm.
    pub fn fugacity(&mut self, species: &str, value: f64, unit: &str) -> SolverResult<()> {
        ensure_positive(value, &format!("fugacity of '{species}'"))
            .map_err(|e| SolverError::configuration(e.to_string()))?;
        let j = self.specs.system().species_index(species)?;
        let pascal = units::convert(value, unit, Quantity::Pressure)?;
        self.bind(|kind| *kind == ConstraintKind::Fugacity { species: j }, pascal)
    }

    /// Bind the pH target (dimensionless).
    pub fn ph(&mut self, value: f64) -> SolverResult<()> {
        ensure_finite(value, "pH").map_err(|e| SolverError::configuration(e.to_string()))?;
        self.bind(|kind| matches!(kind, ConstraintKind::Ph { .. }), value)
    }

    /// Bind the chemical potential target of a species, in a molar energy
    /// unit ("J/mol", "kJ/mol", ...).
    pub fn chemical_potential(&mut self, species: &str, value: f64, unit: &str) -> SolverResult<()> {
        let j = self.specs.system().species_index(species)?;
        let joule_per_mol = units::convert(value, unit, Quantity::MolarEnergy)?;
        self.bind(
            |kind| *kind == ConstraintKind::ChemicalPotential { species: j },
            joule_per_mol,
        )
    }

    /// Bind the target of a named custom constraint (caller's units).
    pub fn custom(&mut self, name: &str, value: f64) -> SolverResult<()> {
        ensure_finite(value, &format!("target of custom constraint '{name}'"))
            .map_err(|e| SolverError::configuration(e.to_string()))?;
        self.bind(
            |kind| matches!(kind, ConstraintKind::Custom { name: n } if n == name),
            value,
        )
    }

    fn bind(&mut self, matches: impl Fn(&ConstraintKind) -> bool, value: f64) -> SolverResult<()> {
        let Some(k) = self.specs.kinds().position(matches) else {
            return Err(SolverError::configuration(
                "no declared constraint matches this condition value",
            ));
        };
        if self.values[k].is_some() {
            let kind = self.specs.kinds().nth(k).cloned();
            return Err(SolverError::configuration(format!(
                "constraint '{}' already has a bound value",
                kind.map(|k| k.to_string()).unwrap_or_default()
            )));
        }
        self.values[k] = Some(value);
        Ok(())
    }

    /// Canonical target values per constraint, in declaration order.
    /// Fails if any declared constraint is still unbound.
    pub(crate) fn targets(&self) -> SolverResult<Vec<f64>> {
        let unbound: Vec<String> = self
            .specs
            .kinds()
            .zip(&self.values)
            .filter(|(_, v)| v.is_none())
            .map(|(kind, _)| kind.to_string())
            .collect();
        if !unbound.is_empty() {
            return Err(SolverError::configuration(format!(
                "unbound condition value(s) for: {}",
                unbound.join(", ")
            )));
        }
        Ok(self.values.iter().map(|v| v.unwrap_or_default()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eq_system::{AggregateState, ChemicalSystem, Phase, Species};

    fn specs() -> Arc<EquilibriumSpecs> {
        let aqueous = Phase::new(
            "AqueousPhase",
            AggregateState::Aqueous,
            vec![
                Species::new("H2O", &[("H", 2.0), ("O", 1.0)], 0.0).unwrap(),
                Species::new("H+", &[("H", 1.0)], 1.0).unwrap(),
            ],
        )
        .unwrap();
        let gas = Phase::new(
            "GaseousPhase",
            AggregateState::Gaseous,
            vec![Species::new("O2(g)", &[("O", 2.0)], 0.0).unwrap()],
        )
        .unwrap();
        let system = Arc::new(ChemicalSystem::new(vec![aqueous, gas]).unwrap());
        let mut specs = EquilibriumSpecs::new(system);
        specs.temperature().unwrap();
        specs.pressure().unwrap();
        specs.fugacity("O2(g)").unwrap();
        specs.ph().unwrap();
        Arc::new(specs)
    }

    #[test]
    fn binds_in_caller_units() {
        let mut c = EquilibriumConditions::new(specs());
        c.temperature(210.0, "C").unwrap();
        c.pressure(19.06, "bar").unwrap();
        c.fugacity("O2(g)", 1.0e-30, "bar").unwrap();
        c.ph(2.4).unwrap();
        let targets = c.targets().unwrap();
        assert!((targets[0] - 483.15).abs() < 1e-9);
        assert!((targets[1] - 1.906e6).abs() < 1e-3);
        assert!((targets[2] - 1.0e-25).abs() < 1e-31);
        assert!((targets[3] - 2.4).abs() < 1e-12);
    }

    #[test]
    fn non_positive_fugacity_rejected() {
        let mut c = EquilibriumConditions::new(specs());
        // A broken caller-side exponent produced this kind of value once:
        // 10 * -49.38... instead of 10^-49.38...; it must not reach the solver.
        let err = c.fugacity("O2(g)", 10.0 * -49.387_755_102_040_81, "bar");
        assert!(matches!(err, Err(SolverError::Configuration { .. })));
        assert!(c.fugacity("O2(g)", 0.0, "bar").is_err());
        assert!(c.fugacity("O2(g)", f64::NAN, "bar").is_err());
    }

    #[test]
    fn undeclared_condition_rejected() {
        let mut c = EquilibriumConditions::new(specs());
        let err = c.chemical_potential("H2O", -240.0, "kJ/mol").unwrap_err();
        assert!(matches!(err, SolverError::Configuration { .. }));
    }

    #[test]
    fn double_binding_rejected() {
        let mut c = EquilibriumConditions::new(specs());
        c.temperature(483.15, "K").unwrap();
        let err = c.temperature(500.0, "K").unwrap_err();
        assert!(err.to_string().contains("already"));
    }

    #[test]
    fn unbound_values_reported_at_solve_time() {
        let mut c = EquilibriumConditions::new(specs());
        c.temperature(483.15, "K").unwrap();
        let err = c.targets().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("pressure"));
        assert!(msg.contains("pH"));
    }

    #[test]
    fn invalid_units_rejected_at_bind_time() {
        let mut c = EquilibriumConditions::new(specs());
        assert!(matches!(
            c.temperature(-500.0, "K"),
            Err(SolverError::Unit(_))
        ));
        assert!(matches!(
            c.pressure(1.0, "furlong"),
            Err(SolverError::Unit(_))
        ));
    }
}
