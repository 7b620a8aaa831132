//! Element molar-mass reference data.
//!
//! Values sourced from standard reference data (IUPAC 2021 abridged),
//! stored in SI [kg/mol].

/// (symbol, molar mass [kg/mol]) for the elements this crate knows about.
const ELEMENT_MOLAR_MASSES: &[(&str, f64)] = &[
    ("H", 1.008e-3),
    ("He", 4.0026e-3),
    ("Li", 6.94e-3),
    ("Be", 9.0122e-3),
    ("B", 10.81e-3),
    ("C", 12.011e-3),
    ("N", 14.007e-3),
    ("O", 15.999e-3),
    ("F", 18.998e-3),
    ("Ne", 20.180e-3),
    ("Na", 22.990e-3),
    ("Mg", 24.305e-3),
    ("Al", 26.982e-3),
    ("Si", 28.085e-3),
    ("P", 30.974e-3),
    ("S", 32.06e-3),
    ("Cl", 35.45e-3),
    ("Ar", 39.95e-3),
    ("K", 39.098e-3),
    ("Ca", 40.078e-3),
    ("Ti", 47.867e-3),
    ("Cr", 51.996e-3),
    ("Mn", 54.938e-3),
    ("Fe", 55.845e-3),
    ("Co", 58.933e-3),
    ("Ni", 58.693e-3),
    ("Cu", 63.546e-3),
    ("Zn", 65.38e-3),
    ("As", 74.922e-3),
    ("Se", 78.971e-3),
    ("Br", 79.904e-3),
    ("Sr", 87.62e-3),
    ("Mo", 95.95e-3),
    ("Ag", 107.87e-3),
    ("Cd", 112.41e-3),
    ("Sn", 118.71e-3),
    ("I", 126.90e-3),
    ("Ba", 137.33e-3),
    ("Au", 196.97e-3),
    ("Hg", 200.59e-3),
    ("Pb", 207.2e-3),
    ("U", 238.03e-3),
];

/// Molar mass [kg/mol] for an element symbol, or `None` if unknown.
pub fn molar_mass(symbol: &str) -> Option<f64> {
    ELEMENT_MOLAR_MASSES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, m)| *m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_elements_present() {
        assert!(molar_mass("H").is_some());
        assert!(molar_mass("O").is_some());
        assert!(molar_mass("Fe").is_some());
    }

    #[test]
    fn unknown_symbol_is_none() {
        assert_eq!(molar_mass("Xx"), None);
        assert_eq!(molar_mass("h"), None); // symbols are case-sensitive
    }

    #[test]
    fn water_molar_mass() {
        let m = 2.0 * molar_mass("H").unwrap() + molar_mass("O").unwrap();
        assert!((m - 18.015e-3).abs() < 1e-5);
    }
}
