//! Thermodynamic property model trait and validation helpers.

use crate::error::{ThermoError, ThermoResult};
use eq_system::ChemicalSystem;
use nalgebra::DVector;

/// Batched thermodynamic properties at one `(T, P, n)` evaluation point.
///
/// The solver needs chemical potentials and activities of *all* species at
/// every residual evaluation, so the trait returns them together in one call
/// rather than per-species queries. Backends that share intermediate results
/// (phase totals, activity-model sums) compute them once per batch.
#[derive(Clone, Debug)]
pub struct ThermoProperties {
    /// Chemical potential μ_i [J/mol] per species column.
    pub mu: DVector<f64>,

    /// ln a_i per species column. For gaseous species this is the log of the
    /// fugacity relative to the standard pressure, ln(y_i φ_i P / P°), so a
    /// fugacity constraint can read it directly.
    pub ln_activity: DVector<f64>,

    /// ln φ_i (fugacity coefficient) per species column; zero for species in
    /// condensed phases and for ideal gases.
    pub ln_fugacity_coeff: DVector<f64>,
}

/// Trait for thermodynamic property models.
///
/// Implementations must be thread-safe (Send + Sync) so independent solves
/// can share one model. All methods should validate inputs and outputs for
/// physical plausibility.
pub trait ThermoModel: Send + Sync {
    /// Model name (for debugging/logging).
    fn name(&self) -> &str;

    /// Evaluate chemical potentials, activities, and fugacity coefficients
    /// for every species at `(T [K], P [Pa], n [mol])`.
    ///
    /// Amounts of species in mixture phases must be strictly positive;
    /// species alone in a pure condensed phase may have zero amount (their
    /// activity does not depend on it).
    fn properties(
        &self,
        system: &ChemicalSystem,
        t: f64,
        p: f64,
        n: &DVector<f64>,
    ) -> ThermoResult<ThermoProperties>;
}

/// Validation helpers for property evaluations.
pub(crate) mod validation {
    use super::*;

    pub fn validate_temperature(t: f64) -> ThermoResult<()> {
        if !t.is_finite() || t <= 0.0 {
            return Err(ThermoError::NonPhysical {
                what: "temperature must be positive and finite",
            });
        }
        Ok(())
    }

    pub fn validate_pressure(p: f64) -> ThermoResult<()> {
        if !p.is_finite() || p <= 0.0 {
            return Err(ThermoError::NonPhysical {
                what: "pressure must be positive and finite",
            });
        }
        Ok(())
    }

    pub fn validate_amounts(n: &DVector<f64>) -> ThermoResult<()> {
        if n.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ThermoError::NonPhysical {
                what: "amounts must be non-negative and finite",
            });
        }
        Ok(())
    }
}
