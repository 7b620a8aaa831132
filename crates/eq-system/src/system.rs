//! Immutable multi-phase chemical system with its stoichiometric matrix.

use crate::error::{SystemError, SystemResult};
use crate::phase::Phase;
use crate::species::Species;
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use std::ops::Range;

/// Immutable description of species, phases, and elemental stoichiometry.
///
/// Built once from phases, then shared read-only (typically behind an `Arc`)
/// across many solves. Owns:
/// - the flattened, ordered species list (phase order preserved),
/// - the sorted global element list,
/// - the formula matrix `A` (rows = elements, plus a trailing charge row when
///   any species carries charge; columns = species),
/// - an interned species-name index for O(1) lookup that fails fast at setup
///   instead of inside the solver loop.
#[derive(Debug, Clone)]
pub struct ChemicalSystem {
    phases: Vec<Phase>,
    species: Vec<Species>,
    /// Phase index per species column.
    species_phase: Vec<usize>,
    /// Species-column range per phase (flattening keeps phases contiguous).
    phase_ranges: Vec<Range<usize>>,
    elements: Vec<String>,
    /// Row index of the charge row, if any species is charged.
    charge_row: Option<usize>,
    formula_matrix: DMatrix<f64>,
    index: HashMap<String, usize>,
}

impl ChemicalSystem {
    pub fn new(phases: Vec<Phase>) -> SystemResult<Self> {
        if phases.is_empty() {
            return Err(SystemError::Empty {
                what: "chemical system".to_string(),
            });
        }

        // Flatten species, keeping phases contiguous, and intern names.
        let mut species = Vec::new();
        let mut species_phase = Vec::new();
        let mut phase_ranges = Vec::with_capacity(phases.len());
        let mut index = HashMap::new();
        for (p, phase) in phases.iter().enumerate() {
            let start = species.len();
            for s in phase.species() {
                if index.insert(s.name().to_string(), species.len()).is_some() {
                    return Err(SystemError::DuplicateSpecies {
                        name: s.name().to_string(),
                    });
                }
                species.push(s.clone());
                species_phase.push(p);
            }
            phase_ranges.push(start..species.len());
        }

        // Global element list, sorted for a stable row order.
        let mut elements: Vec<String> = Vec::new();
        for s in &species {
            for (symbol, _) in s.formula() {
                if !elements.iter().any(|e| e == symbol) {
                    elements.push(symbol.clone());
                }
            }
        }
        elements.sort();

        let any_charged = species.iter().any(|s| s.charge() != 0.0);
        let charge_row = any_charged.then_some(elements.len());
        let n_rows = elements.len() + usize::from(any_charged);

        let mut formula_matrix = DMatrix::zeros(n_rows, species.len());
        for (j, s) in species.iter().enumerate() {
            for (e, symbol) in elements.iter().enumerate() {
                formula_matrix[(e, j)] = s.element_count(symbol);
            }
            if let Some(z) = charge_row {
                formula_matrix[(z, j)] = s.charge();
            }
        }

        Ok(Self {
            phases,
            species,
            species_phase,
            phase_ranges,
            elements,
            charge_row,
            formula_matrix,
            index,
        })
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Flattened species list; column order of the formula matrix.
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    /// Element symbols, sorted; row order of the formula matrix (the charge
    /// row, if present, trails the elements).
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Number of balance rows: elements plus the charge row when present.
    pub fn num_components(&self) -> usize {
        self.elements.len() + usize::from(self.charge_row.is_some())
    }

    pub fn charge_row(&self) -> Option<usize> {
        self.charge_row
    }

    /// Formula matrix `A`: rows = elements (+ charge), columns = species.
    pub fn formula_matrix(&self) -> &DMatrix<f64> {
        &self.formula_matrix
    }

    /// O(1) interned lookup; unknown names fail fast at setup time.
    pub fn species_index(&self, name: &str) -> SystemResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| SystemError::SpeciesNotFound {
                name: name.to_string(),
            })
    }

    /// Phase index owning the species column `j`.
    pub fn phase_of(&self, j: usize) -> usize {
        self.species_phase[j]
    }

    /// Species-column range of phase `p`.
    pub fn phase_range(&self, p: usize) -> Range<usize> {
        self.phase_ranges[p].clone()
    }

    /// Whether species column `j` is the sole species of a pure condensed
    /// phase (composition-independent activity).
    pub fn is_pure_condensed(&self, j: usize) -> bool {
        self.phases[self.species_phase[j]].is_pure_condensed()
    }

    /// Element (and charge) totals `A·n` for an amount vector.
    pub fn component_totals(&self, n: &DVector<f64>) -> DVector<f64> {
        &self.formula_matrix * n
    }
}
