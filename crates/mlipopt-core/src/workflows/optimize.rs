use super::plain_float;
use crate::core::calculator::traits::Calculator;
use crate::core::constraints::{
    ConstraintError, ConstraintSource, DihedralConstraint, DihedralSpec,
};
use crate::core::geometry::normalize_degrees;
use crate::core::models::molecule::Molecule;
use crate::core::models::state::ElectronicState;
use crate::engine::config::OptimizerConfig;
use crate::engine::error::EngineError;
use crate::engine::optimizer;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

/// The dihedral that was held during an optimization and where it ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct DihedralReport {
    pub spec: DihedralSpec,
    /// Measured torsion of the final geometry, degrees in [0, 360).
    pub actual_angle: f64,
    pub source: ConstraintSource,
}

#[derive(Debug, Clone)]
pub struct OptimizeResult {
    /// Optimized geometry, titled with [`OptimizeResult::comment`] and carrying the same
    /// values as properties.
    pub molecule: Molecule,
    pub energy: f64,
    pub state: ElectronicState,
    pub dihedral: Option<DihedralReport>,
    pub steps: usize,
    pub converged: bool,
    pub fmax: f64,
}

impl OptimizeResult {
    /// Comment line for the output structure.
    pub fn comment(&self) -> String {
        let tail = format!(
            "energy={:.6} eV charge={} spin={}",
            self.energy,
            plain_float(self.state.charge),
            plain_float(self.state.spin)
        );
        match &self.dihedral {
            Some(report) => format!(
                "dihedral={} actual_angle={:.2} {} constraint_source={}",
                report.spec.label(),
                report.actual_angle,
                tail,
                report.source
            ),
            None => tail,
        }
    }

    fn annotate(&mut self) {
        let comment = self.comment();
        let props = &mut self.molecule.properties;
        props.insert("energy".to_string(), format!("{:.6}", self.energy));
        props.insert("charge".to_string(), plain_float(self.state.charge));
        props.insert("spin".to_string(), plain_float(self.state.spin));
        if let Some(report) = &self.dihedral {
            props.insert("dihedral".to_string(), report.spec.label());
            props.insert(
                "actual_angle".to_string(),
                format!("{:.2}", report.actual_angle),
            );
            props.insert("constraint_source".to_string(), report.source.to_string());
        }
        self.molecule.title = comment;
    }
}

/// Optimizes `molecule` in `state`, optionally holding the dihedral described by `dihedral`.
#[instrument(skip_all, name = "optimize_workflow")]
pub fn run(
    molecule: &Molecule,
    state: &ElectronicState,
    dihedral: Option<DihedralSpec>,
    config: &OptimizerConfig,
    calculator: &mut dyn Calculator,
    reporter: &ProgressReporter,
) -> Result<OptimizeResult, EngineError> {
    if molecule.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    let constraint = dihedral
        .map(|spec| DihedralConstraint::from_spec(spec, molecule))
        .transpose()?;
    if let Some(constraint) = &constraint {
        info!(
            "Holding dihedral {} at {:.2} degrees ({})",
            constraint.spec().label(),
            normalize_degrees(constraint.target_degrees()),
            constraint.source()
        );
    }

    reporter.report(Progress::PhaseStart { name: "Optimize" });
    info!(
        "Optimizing {} atoms with {} (charge {}, spin {})",
        molecule.len(),
        calculator.name(),
        state.charge,
        state.spin
    );
    let outcome = optimizer::optimize(
        molecule,
        state,
        constraint.as_ref(),
        config,
        calculator,
        reporter,
    )?;
    reporter.report(Progress::PhaseFinish);

    let dihedral = match &constraint {
        Some(constraint) => {
            let actual = constraint
                .current(&outcome.molecule.positions())
                .ok_or_else(|| ConstraintError::Degenerate(constraint.spec().label()))?;
            Some(DihedralReport {
                spec: *constraint.spec(),
                actual_angle: normalize_degrees(actual.to_degrees()),
                source: constraint.source(),
            })
        }
        None => None,
    };

    info!(
        "Optimization {} after {} steps: E = {:.6} eV",
        if outcome.converged { "converged" } else { "stopped" },
        outcome.steps,
        outcome.energy
    );

    let mut result = OptimizeResult {
        molecule: outcome.molecule,
        energy: outcome.energy,
        state: *state,
        dihedral,
        steps: outcome.steps,
        converged: outcome.converged,
        fmax: outcome.fmax,
    };
    result.annotate();
    Ok(result)
}
