//! Errors for system construction and state manipulation.

use eq_core::units::UnitError;
use thiserror::Error;

/// Result type for system operations.
pub type SystemResult<T> = Result<T, SystemError>;

/// Errors that can occur while building a chemical system or mutating a state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SystemError {
    /// Species name not present in the chemical system.
    #[error("Species not found: {name}")]
    SpeciesNotFound { name: String },

    /// Element symbol without reference data.
    #[error("Element not found: {symbol}")]
    ElementNotFound { symbol: String },

    /// Two species (possibly in different phases) share a name.
    #[error("Duplicate species name: {name}")]
    DuplicateSpecies { name: String },

    /// A system needs at least one phase with at least one species.
    #[error("Empty system or phase: {what}")]
    Empty { what: String },

    /// Non-physical value (negative amount, non-positive T/P, bad formula).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: String },

    /// Unit parsing/conversion failure.
    #[error(transparent)]
    Unit(#[from] UnitError),
}
