//! eq-thermo: thermodynamic property models for the equilibrium solver.
//!
//! Defines the stable `ThermoModel` trait that isolates the solver from any
//! concrete property backend (activity models, equations of state, database
//! correlations), plus a reference `IdealModel` backend: ideal mixing in
//! condensed mixtures, ideal-gas fugacity, unit activity for pure condensed
//! phases. Real activity/fugacity correlations plug in behind the same trait.

pub mod error;
pub mod ideal;
pub mod model;

// Re-exports for ergonomics
pub use error::{ThermoError, ThermoResult};
pub use ideal::IdealModel;
pub use model::{ThermoModel, ThermoProperties};
