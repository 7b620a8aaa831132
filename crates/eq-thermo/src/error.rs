//! Thermodynamic property errors.

use thiserror::Error;

/// Result type for property evaluations.
pub type ThermoResult<T> = Result<T, ThermoError>;

/// Errors that can occur during thermodynamic property calculations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThermoError {
    /// Non-physical input (negative amounts, non-positive T or P).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: &'static str },

    /// A species the model has no data for.
    #[error("Missing thermodynamic data for species '{name}'")]
    MissingData { name: String },

    /// Property evaluation produced a non-finite number.
    #[error("Non-finite evaluation for {what}")]
    NonFinite { what: &'static str },

    /// Backend-specific failure.
    #[error("Backend error: {message}")]
    Backend { message: String },
}
