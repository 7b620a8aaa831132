//! Chemical species definitions.

use crate::elements;
use crate::error::{SystemError, SystemResult};

/// A chemical species: name, elemental formula, electrical charge, molar mass.
///
/// Immutable once constructed. The molar mass is derived from the built-in
/// element reference table, so an unknown element symbol fails construction
/// instead of surfacing later in a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    name: String,
    formula: Vec<(String, f64)>,
    charge: f64,
    molar_mass: f64,
}

impl Species {
    /// Create a species from its elemental formula and charge.
    ///
    /// `formula` lists (element symbol, stoichiometric count) pairs, e.g.
    /// `[("Fe", 3.0), ("O", 4.0)]` for magnetite. Counts must be finite and
    /// positive; duplicate element symbols are rejected.
    pub fn new(name: &str, formula: &[(&str, f64)], charge: f64) -> SystemResult<Self> {
        if name.trim().is_empty() {
            return Err(SystemError::Empty {
                what: "species name".to_string(),
            });
        }
        if formula.is_empty() {
            return Err(SystemError::Empty {
                what: format!("formula of species '{name}'"),
            });
        }
        if !charge.is_finite() {
            return Err(SystemError::NonPhysical {
                what: format!("charge of species '{name}'"),
            });
        }

        let mut owned = Vec::with_capacity(formula.len());
        let mut molar_mass = 0.0;
        for (symbol, count) in formula {
            if !count.is_finite() || *count <= 0.0 {
                return Err(SystemError::NonPhysical {
                    what: format!("element count of '{symbol}' in species '{name}'"),
                });
            }
            if owned.iter().any(|(s, _): &(String, f64)| s == symbol) {
                return Err(SystemError::NonPhysical {
                    what: format!("duplicate element '{symbol}' in species '{name}'"),
                });
            }
            let m = elements::molar_mass(symbol).ok_or_else(|| SystemError::ElementNotFound {
                symbol: symbol.to_string(),
            })?;
            molar_mass += m * count;
            owned.push((symbol.to_string(), *count));
        }

        Ok(Self {
            name: name.to_string(),
            formula: owned,
            charge,
            molar_mass,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// (element symbol, stoichiometric count) pairs.
    pub fn formula(&self) -> &[(String, f64)] {
        &self.formula
    }

    /// Stoichiometric count of one element (0.0 if absent).
    pub fn element_count(&self, symbol: &str) -> f64 {
        self.formula
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, c)| *c)
            .unwrap_or(0.0)
    }

    /// Electrical charge (elementary charge units).
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Molar mass [kg/mol].
    pub fn molar_mass(&self) -> f64 {
        self.molar_mass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_molar_mass() {
        let h2o = Species::new("H2O", &[("H", 2.0), ("O", 1.0)], 0.0).unwrap();
        assert!((h2o.molar_mass() - 18.015e-3).abs() < 1e-5);
        assert_eq!(h2o.element_count("H"), 2.0);
        assert_eq!(h2o.element_count("Fe"), 0.0);
    }

    #[test]
    fn charged_species() {
        let fe2 = Species::new("Fe+2", &[("Fe", 1.0)], 2.0).unwrap();
        assert_eq!(fe2.charge(), 2.0);
    }

    #[test]
    fn unknown_element_rejected() {
        let err = Species::new("Bad", &[("Qq", 1.0)], 0.0).unwrap_err();
        assert!(matches!(err, SystemError::ElementNotFound { symbol } if symbol == "Qq"));
    }

    #[test]
    fn invalid_formula_rejected() {
        assert!(Species::new("X", &[], 0.0).is_err());
        assert!(Species::new("X", &[("H", 0.0)], 0.0).is_err());
        assert!(Species::new("X", &[("H", 1.0), ("H", 1.0)], 0.0).is_err());
    }
}
