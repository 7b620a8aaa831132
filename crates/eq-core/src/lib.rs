//! eq-core: stable foundation for the equilibrium workspace.
//!
//! Contains:
//! - units (uom SI types + constructors + unit-string parsing)
//! - numeric (shared float validation helpers)

pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use numeric::{ensure_finite, ensure_positive};
pub use units::*;
