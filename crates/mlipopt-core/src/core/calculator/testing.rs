//! In-process model potentials for exercising the optimizer and workflows.

use super::error::CalculatorError;
use super::traits::{Calculator, CalculatorFactory, Evaluation};
use crate::core::geometry::{dihedral_gradient, dihedral_radians};
use crate::core::models::molecule::Molecule;
use crate::core::models::state::ElectronicState;
use nalgebra::Vector3;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Harmonic bonds plus an optional cosine torsion term.
#[derive(Debug, Clone, Default)]
pub struct ModelPotential {
    /// `(i, j, k, r0)`: E = k/2 (r - r0)².
    pub bonds: Vec<(usize, usize, f64, f64)>,
    /// `([a, b, c, d], k, phi0)`: E = k (1 - cos(phi - phi0)).
    pub torsion: Option<([usize; 4], f64, f64)>,
    pub evaluations: usize,
}

impl ModelPotential {
    pub fn bonds(bonds: Vec<(usize, usize, f64, f64)>) -> Self {
        Self {
            bonds,
            ..Self::default()
        }
    }

    pub fn with_torsion(mut self, atoms: [usize; 4], k: f64, phi0: f64) -> Self {
        self.torsion = Some((atoms, k, phi0));
        self
    }
}

impl Calculator for ModelPotential {
    fn name(&self) -> &str {
        "model-potential"
    }

    fn calculate(
        &mut self,
        molecule: &Molecule,
        _state: &ElectronicState,
    ) -> Result<Evaluation, CalculatorError> {
        self.evaluations += 1;
        let positions = molecule.positions();
        let mut energy = 0.0;
        let mut forces = vec![Vector3::zeros(); positions.len()];

        for &(i, j, k, r0) in &self.bonds {
            let d = positions[i] - positions[j];
            let r = d.norm();
            energy += 0.5 * k * (r - r0).powi(2);
            let f = d * (-k * (r - r0) / r);
            forces[i] += f;
            forces[j] -= f;
        }

        if let Some(([a, b, c, d], k, phi0)) = self.torsion {
            let (pa, pb, pc, pd) = (&positions[a], &positions[b], &positions[c], &positions[d]);
            let phi = dihedral_radians(pa, pb, pc, pd)
                .ok_or_else(|| CalculatorError::Remote("degenerate torsion".to_string()))?;
            let grad = dihedral_gradient(pa, pb, pc, pd)
                .ok_or_else(|| CalculatorError::Remote("degenerate torsion".to_string()))?;
            energy += k * (1.0 - (phi - phi0).cos());
            let scale = -k * (phi - phi0).sin();
            for (atom, g) in [a, b, c, d].into_iter().zip(grad.iter()) {
                forces[atom] += g * scale;
            }
        }

        Ok(Evaluation { energy, forces })
    }
}

/// Always fails with a remote error.
pub struct BrokenCalculator;

impl Calculator for BrokenCalculator {
    fn name(&self) -> &str {
        "broken"
    }

    fn calculate(
        &mut self,
        _molecule: &Molecule,
        _state: &ElectronicState,
    ) -> Result<Evaluation, CalculatorError> {
        Err(CalculatorError::Remote("model exploded".to_string()))
    }
}

/// Builds a diatomic model potential for every worker, or fails for molecules of the
/// wrong size.
pub struct DiatomicFactory {
    pub k: f64,
    pub r0: f64,
    pub created: AtomicUsize,
}

impl DiatomicFactory {
    pub fn new(k: f64, r0: f64) -> Self {
        Self {
            k,
            r0,
            created: AtomicUsize::new(0),
        }
    }
}

struct DiatomicOnly(ModelPotential);

impl Calculator for DiatomicOnly {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn calculate(
        &mut self,
        molecule: &Molecule,
        state: &ElectronicState,
    ) -> Result<Evaluation, CalculatorError> {
        if molecule.len() != 2 {
            return Err(CalculatorError::Remote(format!(
                "expected 2 atoms, got {}",
                molecule.len()
            )));
        }
        self.0.calculate(molecule, state)
    }
}

impl CalculatorFactory for DiatomicFactory {
    fn create(&self) -> Result<Box<dyn Calculator>, CalculatorError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(DiatomicOnly(ModelPotential::bonds(vec![(
            0, 1, self.k, self.r0,
        )]))))
    }
}
