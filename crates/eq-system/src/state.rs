//! Mutable per-solve snapshot of amounts, temperature, and pressure.

use crate::error::{SystemError, SystemResult};
use crate::system::ChemicalSystem;
use eq_core::units::{self, Pressure, Quantity, Temperature, UnitError, k, pa};
use nalgebra::DVector;
use std::sync::Arc;

/// Mutable chemical state: per-species amounts [mol], temperature [K],
/// pressure [Pa].
///
/// Owned by the caller and mutated in place by the equilibrium solver. Each
/// state is private to one solve; the referenced `ChemicalSystem` is shared
/// read-only.
#[derive(Debug, Clone)]
pub struct ChemicalState {
    system: Arc<ChemicalSystem>,
    amounts: DVector<f64>,
    temperature_k: f64,
    pressure_pa: f64,
}

impl ChemicalState {
    /// Fresh state: all amounts zero, ambient temperature and pressure.
    pub fn new(system: Arc<ChemicalSystem>) -> Self {
        let n = system.num_species();
        Self {
            system,
            amounts: DVector::zeros(n),
            temperature_k: 298.15,
            pressure_pa: 1.0e5,
        }
    }

    pub fn system(&self) -> &Arc<ChemicalSystem> {
        &self.system
    }

    /// Add an amount of a species, given in an amount unit ("mol", "mmol")
    /// or a mass unit ("kg", "g"); mass is converted through the species
    /// molar mass. Accumulates over repeated calls so several initial
    /// sources can be mixed.
    pub fn add(&mut self, species: &str, value: f64, unit: &str) -> SystemResult<()> {
        let j = self.system.species_index(species)?;
        let moles = match units::convert(value, unit, Quantity::Amount) {
            Ok(mol) => mol,
            Err(UnitError::UnknownUnit { .. }) => {
                // Not an amount unit; try mass and convert via molar mass.
                let mass_kg = units::convert(value, unit, Quantity::Mass)?;
                mass_kg / self.system.species()[j].molar_mass()
            }
            Err(e) => return Err(e.into()),
        };
        let next = self.amounts[j] + moles;
        if next < 0.0 {
            return Err(SystemError::NonPhysical {
                what: format!("amount of species '{species}'"),
            });
        }
        self.amounts[j] = next;
        Ok(())
    }

    /// Overwrite the amount [mol] of one species.
    pub fn set_amount(&mut self, species: &str, moles: f64) -> SystemResult<()> {
        let j = self.system.species_index(species)?;
        if !moles.is_finite() || moles < 0.0 {
            return Err(SystemError::NonPhysical {
                what: format!("amount of species '{species}'"),
            });
        }
        self.amounts[j] = moles;
        Ok(())
    }

    /// Amount [mol] of one species.
    pub fn amount(&self, species: &str) -> SystemResult<f64> {
        let j = self.system.species_index(species)?;
        Ok(self.amounts[j])
    }

    /// All amounts [mol], in species-column order.
    pub fn amounts(&self) -> &DVector<f64> {
        &self.amounts
    }

    /// Replace the full amount vector (solver write-back).
    pub fn set_amounts(&mut self, amounts: DVector<f64>) -> SystemResult<()> {
        if amounts.len() != self.system.num_species() {
            return Err(SystemError::NonPhysical {
                what: format!(
                    "amount vector length {} (system has {} species)",
                    amounts.len(),
                    self.system.num_species()
                ),
            });
        }
        if amounts.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(SystemError::NonPhysical {
                what: "amount vector entries".to_string(),
            });
        }
        self.amounts = amounts;
        Ok(())
    }

    pub fn temperature(&self) -> Temperature {
        k(self.temperature_k)
    }

    pub fn temperature_kelvin(&self) -> f64 {
        self.temperature_k
    }

    pub fn set_temperature(&mut self, value: f64, unit: &str) -> SystemResult<()> {
        self.temperature_k = units::convert(value, unit, Quantity::Temperature)?;
        Ok(())
    }

    pub fn pressure(&self) -> Pressure {
        pa(self.pressure_pa)
    }

    pub fn pressure_pascal(&self) -> f64 {
        self.pressure_pa
    }

    pub fn set_pressure(&mut self, value: f64, unit: &str) -> SystemResult<()> {
        self.pressure_pa = units::convert(value, unit, Quantity::Pressure)?;
        Ok(())
    }

    /// Element (and charge) totals implied by the current amounts.
    pub fn component_totals(&self) -> DVector<f64> {
        self.system.component_totals(&self.amounts)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::phase::{AggregateState, Phase};
    use crate::species::Species;
    use proptest::prelude::*;

    fn water_system() -> Arc<ChemicalSystem> {
        let aqueous = Phase::new(
            "AqueousPhase",
            AggregateState::Aqueous,
            vec![
                Species::new("H2O", &[("H", 2.0), ("O", 1.0)], 0.0).unwrap(),
                Species::new("H+", &[("H", 1.0)], 1.0).unwrap(),
            ],
        )
        .unwrap();
        Arc::new(ChemicalSystem::new(vec![aqueous]).unwrap())
    }

    proptest! {
        // Component rows are sorted element symbols, charge last:
        // b = [H, O, z] for this system.
        #[test]
        fn component_totals_track_random_compositions(
            n_h2o in 0.0..100.0f64,
            n_h in 0.0..1.0f64,
        ) {
            let mut state = ChemicalState::new(water_system());
            state.add("H2O", n_h2o, "mol").unwrap();
            state.add("H+", n_h, "mol").unwrap();

            let b = state.component_totals();
            let tol = 1e-9 * (1.0 + n_h2o + n_h);
            prop_assert!((b[0] - (2.0 * n_h2o + n_h)).abs() < tol);
            prop_assert!((b[1] - n_h2o).abs() < tol);
            prop_assert!((b[2] - n_h).abs() < tol);
        }

        #[test]
        fn mass_and_amount_additions_agree(m_kg in 1e-3..10.0f64) {
            let system = water_system();
            let molar_mass = system.species()[0].molar_mass();

            let mut by_mass = ChemicalState::new(system.clone());
            by_mass.add("H2O", m_kg, "kg").unwrap();
            let mut by_amount = ChemicalState::new(system);
            by_amount.add("H2O", m_kg / molar_mass, "mol").unwrap();

            let a = by_mass.amount("H2O").unwrap();
            let b = by_amount.amount("H2O").unwrap();
            prop_assert!((a - b).abs() < 1e-9 * b);
        }
    }
}
