use super::error::CalculatorError;
use crate::core::models::molecule::Molecule;
use crate::core::models::state::ElectronicState;
use nalgebra::Vector3;

/// Potential energy (eV) and per-atom forces (eV/Å) for one geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub energy: f64,
    pub forces: Vec<Vector3<f64>>,
}

impl Evaluation {
    /// Checks that the evaluation describes `atom_count` atoms with finite values.
    pub fn validate(&self, atom_count: usize) -> Result<(), CalculatorError> {
        if self.forces.len() != atom_count {
            return Err(CalculatorError::ForceCountMismatch {
                expected: atom_count,
                actual: self.forces.len(),
            });
        }
        if !self.energy.is_finite() {
            return Err(CalculatorError::NonFinite("energy"));
        }
        if self.forces.iter().any(|f| !f.iter().all(|c| c.is_finite())) {
            return Err(CalculatorError::NonFinite("force"));
        }
        Ok(())
    }
}

/// Something that evaluates energies and forces for a molecule in a given electronic state.
///
/// Calculators are stateful (they may own a worker process), hence `&mut self`.
pub trait Calculator: Send {
    /// Human-readable identifier used in logs.
    fn name(&self) -> &str;

    /// Evaluates `molecule` in `state`.
    ///
    /// # Errors
    ///
    /// Returns [`CalculatorError`] if the evaluation cannot be obtained or is inconsistent
    /// with the molecule.
    fn calculate(
        &mut self,
        molecule: &Molecule,
        state: &ElectronicState,
    ) -> Result<Evaluation, CalculatorError>;
}

/// Produces independent calculators, one per worker thread.
pub trait CalculatorFactory: Sync {
    fn create(&self) -> Result<Box<dyn Calculator>, CalculatorError>;
}
