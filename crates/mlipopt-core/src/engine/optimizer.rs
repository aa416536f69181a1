//! Cartesian BFGS geometry optimization.
//!
//! The update and step rules follow the classic quasi-Newton scheme used by ASE's `BFGS`
//! optimizer, so trajectories are comparable with runs of the reference Python tooling:
//! the inverse is never formed, steps come from an eigen-decomposition of the Hessian
//! with absolute eigenvalues, and the whole step is scaled down when any atom would move
//! farther than `max_step`.

use super::config::OptimizerConfig;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::state::OptimizationOutcome;
use crate::core::calculator::traits::Calculator;
use crate::core::constraints::DihedralConstraint;
use crate::core::models::molecule::Molecule;
use crate::core::models::state::ElectronicState;
use nalgebra::{DMatrix, DVector, Point3, SymmetricEigen, Vector3};
use tracing::{debug, warn};

const MIN_UPDATE_DISPLACEMENT: f64 = 1e-7;

/// Hessian bookkeeping for one BFGS run.
pub struct Bfgs {
    max_step: f64,
    hessian: DMatrix<f64>,
    previous: Option<(DVector<f64>, DVector<f64>)>,
}

impl Bfgs {
    pub fn new(config: &OptimizerConfig, atom_count: usize) -> Self {
        let n = 3 * atom_count;
        Self {
            max_step: config.max_step,
            hessian: DMatrix::identity(n, n) * config.initial_hessian,
            previous: None,
        }
    }

    /// Proposes a displacement from `positions` given the current `forces` (both flat, 3N).
    pub fn step(&mut self, positions: &DVector<f64>, forces: &DVector<f64>) -> DVector<f64> {
        self.update(positions, forces);

        let eigen = SymmetricEigen::new(self.hessian.clone());
        let projected = eigen.eigenvectors.tr_mul(forces);
        let scaled = projected.zip_map(&eigen.eigenvalues, |f, w| f / w.abs());
        let mut dr = &eigen.eigenvectors * scaled;

        let longest = dr
            .as_slice()
            .chunks_exact(3)
            .map(|d| Vector3::new(d[0], d[1], d[2]).norm())
            .fold(0.0_f64, f64::max);
        if longest >= self.max_step {
            dr *= self.max_step / longest;
        }

        self.previous = Some((positions.clone(), forces.clone()));
        dr
    }

    fn update(&mut self, positions: &DVector<f64>, forces: &DVector<f64>) {
        let Some((r0, f0)) = &self.previous else {
            return;
        };
        let dr = positions - r0;
        if dr.amax() < MIN_UPDATE_DISPLACEMENT {
            return;
        }
        let df = forces - f0;
        let a = dr.dot(&df);
        let dg = &self.hessian * &dr;
        let b = dr.dot(&dg);
        self.hessian -= (&df * df.transpose()) / a + (&dg * dg.transpose()) / b;
    }
}

/// Relaxes `molecule` with BFGS, holding `constraint` if given.
///
/// Running out of steps is not an error: the last geometry is returned with
/// `converged == false`.
pub fn optimize(
    molecule: &Molecule,
    state: &ElectronicState,
    constraint: Option<&DihedralConstraint>,
    config: &OptimizerConfig,
    calculator: &mut dyn Calculator,
    reporter: &ProgressReporter,
) -> Result<OptimizationOutcome, EngineError> {
    let mut current = molecule.clone();
    if let Some(constraint) = constraint {
        let mut positions = current.positions();
        let iterations = constraint.adjust_positions(&mut positions)?;
        if iterations > 0 {
            debug!(
                "Moved starting geometry onto dihedral {} in {} iterations",
                constraint.spec().label(),
                iterations
            );
        }
        current.set_positions(&positions)?;
    }

    let mut bfgs = Bfgs::new(config, current.len());
    let mut step = 0;
    loop {
        let evaluation = calculator.calculate(&current, state)?;
        evaluation.validate(current.len())?;

        let mut forces = evaluation.forces;
        if let Some(constraint) = constraint {
            constraint.adjust_forces(&current.positions(), &mut forces)?;
        }
        let fmax = max_force(&forces);

        debug!(
            "BFGS step {:>4}: E = {:.6} eV, fmax = {:.4} eV/Å",
            step, evaluation.energy, fmax
        );
        reporter.report(Progress::OptimizerStep {
            step,
            energy: evaluation.energy,
            fmax,
        });

        let converged = fmax < config.fmax;
        if converged || step >= config.max_steps {
            if !converged {
                warn!(
                    "Optimization did not converge in {} steps (fmax = {:.4} eV/Å, target {} eV/Å)",
                    config.max_steps, fmax, config.fmax
                );
            }
            return Ok(OptimizationOutcome {
                molecule: current,
                energy: evaluation.energy,
                steps: step,
                converged,
                fmax,
            });
        }

        let r = current.flat_positions();
        let dr = bfgs.step(&r, &flatten(&forces));
        if dr.iter().any(|x| !x.is_finite()) {
            return Err(EngineError::NonFiniteStep { step });
        }

        let mut next = unflatten(&(r + dr));
        if let Some(constraint) = constraint {
            constraint.adjust_positions(&mut next)?;
        }
        current.set_positions(&next)?;
        step += 1;
    }
}

/// Largest per-atom force norm.
pub fn max_force(forces: &[Vector3<f64>]) -> f64 {
    forces.iter().map(|f| f.norm()).fold(0.0, f64::max)
}

fn flatten(vectors: &[Vector3<f64>]) -> DVector<f64> {
    DVector::from_iterator(vectors.len() * 3, vectors.iter().flat_map(|v| v.iter().copied()))
}

fn unflatten(flat: &DVector<f64>) -> Vec<Point3<f64>> {
    flat.as_slice()
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect()
}
