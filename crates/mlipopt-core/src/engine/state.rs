use crate::core::models::molecule::Molecule;

/// Final state of one geometry optimization.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    /// The last geometry visited; optimized if `converged`.
    pub molecule: Molecule,
    /// Energy of `molecule`, eV.
    pub energy: f64,
    /// Number of optimizer steps taken.
    pub steps: usize,
    pub converged: bool,
    /// Largest per-atom force norm at `molecule` after constraint projection, eV/Å.
    pub fmax: f64,
}
