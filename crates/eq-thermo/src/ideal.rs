//! Ideal reference backend: ideal mixing, ideal-gas fugacity.

use crate::error::{ThermoError, ThermoResult};
use crate::model::{ThermoModel, ThermoProperties, validation};
use eq_core::units::constants::{P_REF_PA, R_J_PER_MOL_K};
use eq_system::{AggregateState, ChemicalSystem};
use nalgebra::DVector;

/// Ideal thermodynamic model.
///
/// The caller supplies a standard chemical potential μ°_i [J/mol] per
/// species (in practice taken from a thermodynamic database at the working
/// temperature and pressure). Properties follow μ_i = μ°_i + RT ln a_i with
///
/// - condensed mixtures (aqueous, solid solution): a_i = x_i,
/// - gases: a_i = y_i·P/P° (unit fugacity coefficients),
/// - pure condensed phases: a_i = 1.
#[derive(Debug, Clone)]
pub struct IdealModel {
    mu0: DVector<f64>,
}

impl IdealModel {
    /// Build from `(species name, μ° [J/mol])` pairs. Every species of the
    /// system must receive a value; unknown names and missing species fail
    /// construction.
    pub fn new(system: &ChemicalSystem, mu0_by_name: &[(&str, f64)]) -> ThermoResult<Self> {
        let mut mu0 = DVector::from_element(system.num_species(), f64::NAN);
        for (name, value) in mu0_by_name {
            let j = system
                .species_index(name)
                .map_err(|_| ThermoError::MissingData {
                    name: name.to_string(),
                })?;
            if !value.is_finite() {
                return Err(ThermoError::NonFinite {
                    what: "standard chemical potential",
                });
            }
            mu0[j] = *value;
        }
        if let Some(j) = mu0.iter().position(|v| v.is_nan()) {
            return Err(ThermoError::MissingData {
                name: system.species()[j].name().to_string(),
            });
        }
        Ok(Self { mu0 })
    }

    /// Standard chemical potential of species column `j` [J/mol].
    pub fn mu0(&self, j: usize) -> f64 {
        self.mu0[j]
    }
}

impl ThermoModel for IdealModel {
    fn name(&self) -> &str {
        "ideal"
    }

    fn properties(
        &self,
        system: &ChemicalSystem,
        t: f64,
        p: f64,
        n: &DVector<f64>,
    ) -> ThermoResult<ThermoProperties> {
        validation::validate_temperature(t)?;
        validation::validate_pressure(p)?;
        validation::validate_amounts(n)?;

        let rt = R_J_PER_MOL_K * t;
        let num = system.num_species();
        let mut ln_activity = DVector::zeros(num);
        let ln_fugacity_coeff = DVector::zeros(num);

        for (p_idx, phase) in system.phases().iter().enumerate() {
            let range = system.phase_range(p_idx);
            if phase.is_pure_condensed() {
                // a = 1; amount-independent, valid even at zero amount.
                continue;
            }
            let total: f64 = range.clone().map(|j| n[j]).sum();
            if total <= 0.0 {
                return Err(ThermoError::NonPhysical {
                    what: "mixture phase with non-positive total amount",
                });
            }
            let gaseous = phase.state() == AggregateState::Gaseous;
            for j in range {
                let ln_x = (n[j] / total).ln();
                ln_activity[j] = if gaseous {
                    ln_x + (p / P_REF_PA).ln()
                } else {
                    ln_x
                };
            }
        }

        let mu = &self.mu0 + rt * &ln_activity;
        if mu.iter().any(|v| !v.is_finite()) {
            return Err(ThermoError::NonFinite {
                what: "chemical potential",
            });
        }

        Ok(ThermoProperties {
            mu,
            ln_activity,
            ln_fugacity_coeff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eq_system::{Phase, Species};

    fn system() -> ChemicalSystem {
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
            vec![
                Species::new("H2O(g)", &[("H", 2.0), ("O", 1.0)], 0.0).unwrap(),
                Species::new("O2(g)", &[("O", 2.0)], 0.0).unwrap(),
            ],
        )
        .unwrap();
        let mineral = Phase::new(
            "Hematite",
            AggregateState::Mineral,
            vec![Species::new("Hematite", &[("Fe", 2.0), ("O", 3.0)], 0.0).unwrap()],
        )
        .unwrap();
        ChemicalSystem::new(vec![aqueous, gas, mineral]).unwrap()
    }

    fn model(system: &ChemicalSystem) -> IdealModel {
        IdealModel::new(
            system,
            &[
                ("H2O", -200_000.0),
                ("H+", 0.0),
                ("H2O(g)", -190_000.0),
                ("O2(g)", 0.0),
                ("Hematite", -700_000.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn missing_species_data_rejected() {
        let system = system();
        let err = IdealModel::new(&system, &[("H2O", -200_000.0)]).unwrap_err();
        assert!(matches!(err, ThermoError::MissingData { .. }));
    }

    #[test]
    fn gas_activity_is_partial_pressure_ratio() {
        let system = system();
        let model = model(&system);
        let mut n = DVector::from_element(system.num_species(), 1.0);
        let o2 = system.species_index("O2(g)").unwrap();
        n[o2] = 3.0; // y = 3/4 in a 2-species gas phase

        let props = model.properties(&system, 500.0, 2.0e5, &n).unwrap();
        let expected = (0.75_f64).ln() + (2.0_f64).ln();
        assert!((props.ln_activity[o2] - expected).abs() < 1e-12);
    }

    #[test]
    fn pure_mineral_has_unit_activity() {
        let system = system();
        let model = model(&system);
        let mut n = DVector::from_element(system.num_species(), 1.0);
        let hm = system.species_index("Hematite").unwrap();
        n[hm] = 0.0; // amount-independent, even at zero

        let props = model.properties(&system, 500.0, 1.0e5, &n).unwrap();
        assert_eq!(props.ln_activity[hm], 0.0);
        assert_eq!(props.mu[hm], -700_000.0);
    }

    #[test]
    fn chemical_potential_includes_mixing_term() {
        let system = system();
        let model = model(&system);
        let n = DVector::from_element(system.num_species(), 1.0);

        let t = 500.0;
        let props = model.properties(&system, t, 1.0e5, &n).unwrap();
        let h2o = system.species_index("H2O").unwrap();
        let expected = -200_000.0 + R_J_PER_MOL_K * t * (0.5_f64).ln();
        assert!((props.mu[h2o] - expected).abs() < 1e-9);
    }

    #[test]
    fn non_physical_inputs_rejected() {
        let system = system();
        let model = model(&system);
        let n = DVector::from_element(system.num_species(), 1.0);
        assert!(model.properties(&system, -1.0, 1.0e5, &n).is_err());
        assert!(model.properties(&system, 500.0, 0.0, &n).is_err());

        let mut bad = n.clone();
        bad[0] = -1.0;
        assert!(model.properties(&system, 500.0, 1.0e5, &bad).is_err());
    }
}
