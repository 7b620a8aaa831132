//! eq-system: immutable chemical-system description and mutable state.
//!
//! Provides:
//! - Element molar-mass reference data
//! - `Species` (name, elemental formula, charge, molar mass)
//! - `Phase` / `AggregateState` (aqueous, gaseous, mineral, solid solution)
//! - `ChemicalSystem`: built once, then shared read-only; owns the formula
//!   matrix (rows = elements + charge, columns = species) and an interned
//!   species-name index
//! - `ChemicalState`: per-solve mutable amounts, temperature, pressure
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use eq_system::{AggregateState, ChemicalState, ChemicalSystem, Phase, Species};
//!
//! let aqueous = Phase::new(
//!     "AqueousPhase",
//!     AggregateState::Aqueous,
//!     vec![
//!         Species::new("H2O", &[("H", 2.0), ("O", 1.0)], 0.0).unwrap(),
//!         Species::new("H+", &[("H", 1.0)], 1.0).unwrap(),
//!         Species::new("OH-", &[("O", 1.0), ("H", 1.0)], -1.0).unwrap(),
//!     ],
//! )
//! .unwrap();
//!
//! let system = Arc::new(ChemicalSystem::new(vec![aqueous]).unwrap());
//! let mut state = ChemicalState::new(system.clone());
//! state.add("H2O", 1.0, "kg").unwrap();
//! assert!(state.amount("H2O").unwrap() > 55.0);
//! ```

pub mod elements;
pub mod error;
pub mod phase;
pub mod species;
pub mod state;
pub mod system;

// Re-exports for ergonomics
pub use error::{SystemError, SystemResult};
pub use phase::{AggregateState, Phase};
pub use species::Species;
pub use state::ChemicalState;
pub use system::ChemicalSystem;
