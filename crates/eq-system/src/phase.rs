//! Phases: aggregation state plus an ordered set of species.

use crate::error::{SystemError, SystemResult};
use crate::species::Species;
use serde::{Deserialize, Serialize};

/// Aggregation state of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateState {
    Aqueous,
    Gaseous,
    Mineral,
    SolidSolution,
}

/// An ordered set of species sharing one aggregation state.
///
/// A species belongs to exactly one phase; `ChemicalSystem` enforces
/// cross-phase name uniqueness at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    name: String,
    state: AggregateState,
    species: Vec<Species>,
}

impl Phase {
    pub fn new(name: &str, state: AggregateState, species: Vec<Species>) -> SystemResult<Self> {
        if species.is_empty() {
            return Err(SystemError::Empty {
                what: format!("phase '{name}'"),
            });
        }
        for (i, s) in species.iter().enumerate() {
            if species[..i].iter().any(|other| other.name() == s.name()) {
                return Err(SystemError::DuplicateSpecies {
                    name: s.name().to_string(),
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            state,
            species,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> AggregateState {
        self.state
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// A single-species condensed phase (pure mineral). Its species activity
    /// does not depend on composition, which the solver treats specially.
    pub fn is_pure_condensed(&self) -> bool {
        self.species.len() == 1
            && matches!(
                self.state,
                AggregateState::Mineral | AggregateState::SolidSolution
            )
    }
}
