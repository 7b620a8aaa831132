//! Unit-aware numeric input system.
//!
//! Two layers, both canonical-SI:
//!
//! - uom type aliases + inline constructors for typed API surfaces
//!   (`Temperature`, `Pressure`, `k(..)`, `pa(..)`);
//! - a string-keyed parser (`convert`, `parse_quantity`) for user-supplied
//!   `(value, "unit")` pairs, converting to SI base units and rejecting
//!   unknown or out-of-range inputs with [`UnitError`].

use crate::numeric::{ensure_finite, ensure_positive};
use thiserror::Error;
use uom::si::f64::{
    AmountOfSubstance as UomAmountOfSubstance, Mass as UomMass, MolarEnergy as UomMolarEnergy,
    MolarMass as UomMolarMass, Pressure as UomPressure,
    ThermodynamicTemperature as UomThermodynamicTemperature,
};

// Public canonical unit types (SI, f64)
pub type Amount = UomAmountOfSubstance;
pub type Mass = UomMass;
pub type MolarEnergy = UomMolarEnergy;
pub type MolarMass = UomMolarMass;
pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn kg(v: f64) -> Mass {
    use uom::si::mass::kilogram;
    Mass::new::<kilogram>(v)
}

#[inline]
pub fn mol(v: f64) -> Amount {
    use uom::si::amount_of_substance::mole;
    Amount::new::<mole>(v)
}

#[inline]
pub fn j_per_mol(v: f64) -> MolarEnergy {
    use uom::si::molar_energy::joule_per_mole;
    MolarEnergy::new::<joule_per_mole>(v)
}

pub mod constants {
    /// Molar gas constant [J/(mol·K)], CODATA 2018.
    pub const R_J_PER_MOL_K: f64 = 8.314_462_618;

    /// Standard-state pressure [Pa] used for activity and fugacity references.
    pub const P_REF_PA: f64 = 1.0e5;
}

/// Dimension/quantity family for a numeric input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// Temperature (canonical: Kelvin)
    Temperature,
    /// Absolute pressure (canonical: Pa)
    Pressure,
    /// Amount of substance (canonical: mol)
    Amount,
    /// Mass (canonical: kg)
    Mass,
    /// Molar energy, e.g. chemical potential (canonical: J/mol)
    MolarEnergy,
    /// Dimensionless (canonical: as-is)
    Dimensionless,
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temperature => write!(f, "Temperature"),
            Self::Pressure => write!(f, "Absolute Pressure"),
            Self::Amount => write!(f, "Amount of Substance"),
            Self::Mass => write!(f, "Mass"),
            Self::MolarEnergy => write!(f, "Molar Energy"),
            Self::Dimensionless => write!(f, "Dimensionless"),
        }
    }
}

/// Error in unit parsing or conversion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    /// Input text did not parse to a number + optional unit
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unit not recognized for this quantity
    #[error("Unknown unit '{unit}' for {quantity}")]
    UnknownUnit { unit: String, quantity: String },

    /// Value out of physical range (e.g., negative absolute temperature)
    #[error("Value {value} out of range: {reason}")]
    OutOfRange { value: f64, reason: String },
}

/// Convert a `(value, unit)` pair to canonical SI units.
///
/// This is the entry point used by `ChemicalState::add` and the
/// `EquilibriumConditions` setters, where the numeric value and the unit
/// string arrive separately.
pub fn convert(value: f64, unit: &str, quantity: Quantity) -> Result<f64, UnitError> {
    ensure_finite(value, &quantity.to_string())?;
    match quantity {
        Quantity::Temperature => convert_temperature(value, unit.trim()),
        Quantity::Pressure => convert_pressure(value, unit.trim()),
        Quantity::Amount => convert_amount(value, unit.trim()),
        Quantity::Mass => convert_mass(value, unit.trim()),
        Quantity::MolarEnergy => convert_molar_energy(value, unit.trim()),
        Quantity::Dimensionless => Ok(value),
    }
}

/// Parse a quantity value from user input text (e.g., "483.15 K", "1 kg").
pub fn parse_quantity(raw_text: &str, quantity: Quantity) -> Result<f64, UnitError> {
    let (value, unit) = split_value_and_unit(raw_text)?;
    convert(value, &unit, quantity)
}

fn convert_temperature(value: f64, unit: &str) -> Result<f64, UnitError> {
    let kelvin = match unit.to_lowercase().as_str() {
        "" | "k" | "kelvin" => value,
        "c" | "°c" | "celsius" => value + 273.15,
        "f" | "°f" | "fahrenheit" => (value + 459.67) * 5.0 / 9.0,
        "r" | "°r" | "rankine" => value * 5.0 / 9.0,
        _ => {
            return Err(UnitError::UnknownUnit {
                unit: unit.to_string(),
                quantity: "Temperature".to_string(),
            });
        }
    };

    ensure_positive(kelvin, "absolute temperature [K]")
}

fn convert_pressure(value: f64, unit: &str) -> Result<f64, UnitError> {
    let pa = match unit.to_lowercase().as_str() {
        "" | "pa" | "pascal" => value,
        "kpa" => value * 1e3,
        "mpa" => value * 1e6,
        "gpa" => value * 1e9,
        "bar" => value * 1e5,
        "mbar" | "millibar" => value * 100.0,
        "atm" => value * 101_325.0,
        "torr" | "mmhg" => value * 133.322,
        "psia" => value * 6_894.76,
        _ => {
            return Err(UnitError::UnknownUnit {
                unit: unit.to_string(),
                quantity: "Absolute Pressure".to_string(),
            });
        }
    };

    ensure_positive(pa, "absolute pressure [Pa]")
}

fn convert_amount(value: f64, unit: &str) -> Result<f64, UnitError> {
    let mol = match unit.to_lowercase().as_str() {
        "" | "mol" | "mole" | "moles" => value,
        "mmol" => value * 1e-3,
        "umol" | "µmol" => value * 1e-6,
        "kmol" => value * 1e3,
        _ => {
            return Err(UnitError::UnknownUnit {
                unit: unit.to_string(),
                quantity: "Amount of Substance".to_string(),
            });
        }
    };

    if mol < 0.0 {
        return Err(UnitError::OutOfRange {
            value: mol,
            reason: "Amount cannot be negative".to_string(),
        });
    }

    Ok(mol)
}

fn convert_mass(value: f64, unit: &str) -> Result<f64, UnitError> {
    let kg = match unit.to_lowercase().as_str() {
        "" | "kg" => value,
        "g" | "gram" | "grams" => value * 1e-3,
        "mg" => value * 1e-6,
        "ug" | "µg" => value * 1e-9,
        "tonne" | "t" => value * 1e3,
        "lbm" => value * 0.453_592,
        _ => {
            return Err(UnitError::UnknownUnit {
                unit: unit.to_string(),
                quantity: "Mass".to_string(),
            });
        }
    };

    if kg < 0.0 {
        return Err(UnitError::OutOfRange {
            value: kg,
            reason: "Mass cannot be negative".to_string(),
        });
    }

    Ok(kg)
}

fn convert_molar_energy(value: f64, unit: &str) -> Result<f64, UnitError> {
    let j_mol = match unit.to_lowercase().as_str() {
        "" | "j/mol" => value,
        "kj/mol" => value * 1e3,
        "cal/mol" => value * 4.184,
        "kcal/mol" => value * 4_184.0,
        _ => {
            return Err(UnitError::UnknownUnit {
                unit: unit.to_string(),
                quantity: "Molar Energy".to_string(),
            });
        }
    };

    Ok(j_mol)
}

/// Split a value+unit string into (numeric_value, unit_string).
///
/// Examples:
/// - "300K" -> (300.0, "K")
/// - "1 kg" -> (1.0, "kg")
/// - "1e5" -> (100000.0, "")
fn split_value_and_unit(input: &str) -> Result<(f64, String), UnitError> {
    let trimmed = input.trim();

    let split_idx = trimmed
        .find(|c: char| !c.is_numeric() && c != '.' && c != '-' && c != '+' && c != 'e' && c != 'E')
        .unwrap_or(trimmed.len());

    let (num_part, unit_part) = trimmed.split_at(split_idx);
    let num_part = num_part.trim();
    let unit_part = unit_part.trim();

    let value: f64 = num_part.parse().map_err(|_| {
        UnitError::Parse(format!("Could not parse numeric value from '{}'", input))
    })?;

    Ok((value, unit_part.to_string()))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn mass_gram_kilogram_roundtrip(v in 1e-6_f64..1e6_f64) {
            let as_g = convert(v * 1000.0, "g", Quantity::Mass).unwrap();
            let as_kg = convert(v, "kg", Quantity::Mass).unwrap();
            prop_assert!((as_g - as_kg).abs() <= 1e-9 * as_kg.abs().max(1.0));
        }

        #[test]
        fn positive_temperature_always_converts(v in 1.0_f64..5000.0_f64) {
            prop_assert!(convert(v, "K", Quantity::Temperature).is_ok());
        }
    }
}
