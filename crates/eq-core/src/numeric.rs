//! Float validation helpers shared by the unit layer and the condition
//! setters.

use crate::units::UnitError;

pub fn ensure_finite(value: f64, what: &str) -> Result<f64, UnitError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(UnitError::OutOfRange {
            value,
            reason: format!("{what} must be finite"),
        })
    }
}

/// Finite and strictly positive, for absolute physical quantities
/// (temperature, pressure, fugacity).
pub fn ensure_positive(value: f64, what: &str) -> Result<f64, UnitError> {
    ensure_finite(value, what)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(UnitError::OutOfRange {
            value,
            reason: format!("{what} must be > 0"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_rejected_by_name() {
        assert!(ensure_finite(1.0, "pH").is_ok());
        let err = ensure_finite(f64::NAN, "pH").unwrap_err();
        assert!(err.to_string().contains("pH"));
        assert!(ensure_finite(f64::INFINITY, "pH").is_err());
    }

    #[test]
    fn ensure_positive_rejects_zero_and_negative() {
        assert!(ensure_positive(1.0, "t").is_ok());
        assert!(ensure_positive(0.0, "t").is_err());
        assert!(ensure_positive(-3.0, "t").is_err());
        assert!(ensure_positive(f64::NEG_INFINITY, "t").is_err());
    }
}
