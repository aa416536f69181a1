use super::geometry::{dihedral_gradient, dihedral_radians, wrap_radians};
use super::models::molecule::Molecule;
use nalgebra::{Point3, Vector3};
use std::fmt;
use thiserror::Error;

const POSITION_TOLERANCE_RAD: f64 = 1e-8;
const MAX_ADJUST_ITERATIONS: usize = 500;
const MAX_CORRECTION_RAD: f64 = 0.1;

#[derive(Debug, Error, PartialEq)]
pub enum ConstraintError {
    #[error("Dihedral atom indices are 1-based; 0 is not a valid index")]
    ZeroIndex,

    #[error("Dihedral atom index {index} exceeds the number of atoms ({atom_count})")]
    IndexOutOfRange { index: usize, atom_count: usize },

    #[error("Dihedral atom index {0} is used more than once")]
    DuplicateIndex(usize),

    #[error("Dihedral {0} is undefined because three of its atoms are collinear")]
    Degenerate(String),

    #[error(
        "Could not satisfy dihedral constraint after {iterations} iterations (off by {deviation_degrees:.4} degrees)"
    )]
    NotSatisfied {
        iterations: usize,
        deviation_degrees: f64,
    },
}

/// A dihedral requested by the user: four 1-based atom indices and an optional target.
///
/// Without a target the torsion is frozen at its value in the input structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DihedralSpec {
    pub indices: [usize; 4],
    pub target_degrees: Option<f64>,
}

impl DihedralSpec {
    pub fn new(indices: [usize; 4], target_degrees: Option<f64>) -> Self {
        Self {
            indices,
            target_degrees,
        }
    }

    /// The indices joined by dashes, e.g. `2-3-4-12`.
    pub fn label(&self) -> String {
        self.indices
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Validates the indices against `atom_count` and converts them to 0-based positions.
    pub fn zero_based(&self, atom_count: usize) -> Result<[usize; 4], ConstraintError> {
        let mut atoms = [0usize; 4];
        for (slot, &index) in self.indices.iter().enumerate() {
            if index == 0 {
                return Err(ConstraintError::ZeroIndex);
            }
            if index > atom_count {
                return Err(ConstraintError::IndexOutOfRange { index, atom_count });
            }
            if self.indices[..slot].contains(&index) {
                return Err(ConstraintError::DuplicateIndex(index));
            }
            atoms[slot] = index - 1;
        }
        Ok(atoms)
    }
}

/// Where the target angle of a constraint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSource {
    /// Frozen at the angle found in the input structure.
    FixedCurrent,
    /// Held at an angle given on the command line.
    UserSpecified,
}

impl fmt::Display for ConstraintSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSource::FixedCurrent => f.write_str("fixed_current"),
            ConstraintSource::UserSpecified => f.write_str("user_specified"),
        }
    }
}

/// Holds one torsion angle at a fixed value during optimization.
///
/// Forces are projected onto the subspace that leaves the torsion unchanged, and positions
/// proposed by the optimizer are pulled back onto the constraint surface.
#[derive(Debug, Clone, PartialEq)]
pub struct DihedralConstraint {
    spec: DihedralSpec,
    atoms: [usize; 4],
    target: f64,
    source: ConstraintSource,
}

impl DihedralConstraint {
    /// Builds the constraint for `molecule`, measuring the current angle when no target is given.
    pub fn from_spec(spec: DihedralSpec, molecule: &Molecule) -> Result<Self, ConstraintError> {
        let atoms = spec.zero_based(molecule.len())?;
        let positions = molecule.positions();
        let current = measure(&atoms, &positions).ok_or_else(|| {
            ConstraintError::Degenerate(spec.label())
        })?;

        let (target, source) = match spec.target_degrees {
            Some(degrees) => (wrap_radians(degrees.to_radians()), ConstraintSource::UserSpecified),
            None => (current, ConstraintSource::FixedCurrent),
        };

        Ok(Self {
            spec,
            atoms,
            target,
            source,
        })
    }

    pub fn spec(&self) -> &DihedralSpec {
        &self.spec
    }

    pub fn atoms(&self) -> [usize; 4] {
        self.atoms
    }

    pub fn source(&self) -> ConstraintSource {
        self.source
    }

    /// Target angle in degrees, in (-180, 180].
    pub fn target_degrees(&self) -> f64 {
        self.target.to_degrees()
    }

    /// Current torsion in radians, or `None` if it is undefined.
    pub fn current(&self, positions: &[Point3<f64>]) -> Option<f64> {
        measure(&self.atoms, positions)
    }

    /// Signed difference between the current torsion and the target, in (-π, π].
    pub fn deviation(&self, positions: &[Point3<f64>]) -> Option<f64> {
        self.current(positions).map(|c| wrap_radians(c - self.target))
    }

    /// Removes from `forces` the component that would change the torsion.
    pub fn adjust_forces(
        &self,
        positions: &[Point3<f64>],
        forces: &mut [Vector3<f64>],
    ) -> Result<(), ConstraintError> {
        let grad = self.gradient(positions)?;
        let norm2: f64 = grad.iter().map(|g| g.norm_squared()).sum();
        let overlap: f64 = self
            .atoms
            .iter()
            .zip(grad.iter())
            .map(|(&atom, g)| forces[atom].dot(g))
            .sum();
        let scale = overlap / norm2;
        for (&atom, g) in self.atoms.iter().zip(grad.iter()) {
            forces[atom] -= g * scale;
        }
        Ok(())
    }

    /// Moves the four atoms until the torsion matches the target.
    ///
    /// Returns the number of correction iterations performed.
    pub fn adjust_positions(&self, positions: &mut [Point3<f64>]) -> Result<usize, ConstraintError> {
        let mut deviation = 0.0;
        for iteration in 0..MAX_ADJUST_ITERATIONS {
            deviation = self
                .deviation(positions)
                .ok_or_else(|| ConstraintError::Degenerate(self.spec.label()))?;
            if deviation.abs() < POSITION_TOLERANCE_RAD {
                return Ok(iteration);
            }

            let grad = self.gradient(positions)?;
            let norm2: f64 = grad.iter().map(|g| g.norm_squared()).sum();
            let correction = deviation.clamp(-MAX_CORRECTION_RAD, MAX_CORRECTION_RAD);
            let scale = -correction / norm2;
            for (&atom, g) in self.atoms.iter().zip(grad.iter()) {
                positions[atom] += g * scale;
            }
        }

        Err(ConstraintError::NotSatisfied {
            iterations: MAX_ADJUST_ITERATIONS,
            deviation_degrees: deviation.to_degrees(),
        })
    }

    fn gradient(&self, positions: &[Point3<f64>]) -> Result<[Vector3<f64>; 4], ConstraintError> {
        let [a, b, c, d] = self.atoms;
        dihedral_gradient(&positions[a], &positions[b], &positions[c], &positions[d])
            .ok_or_else(|| ConstraintError::Degenerate(self.spec.label()))
    }
}

fn measure(atoms: &[usize; 4], positions: &[Point3<f64>]) -> Option<f64> {
    let [a, b, c, d] = *atoms;
    dihedral_radians(&positions[a], &positions[b], &positions[c], &positions[d])
}
