use thiserror::Error;

use super::config::ConfigError;
use crate::core::calculator::error::CalculatorError;
use crate::core::constraints::ConstraintError;
use crate::core::crest::CrestError;
use crate::core::io::error::Error as FileError;
use crate::core::models::molecule::MoleculeError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Energy/force evaluation failed: {source}")]
    Calculator {
        #[from]
        source: CalculatorError,
    },

    #[error("Dihedral constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("Clustering failed: {0}")]
    Crest(#[from] CrestError),

    #[error("Structure file error: {0}")]
    File(#[from] FileError),

    #[error("Inconsistent structure: {0}")]
    Molecule(#[from] MoleculeError),

    #[error("No structures found in input")]
    EmptyInput,

    #[error("All {count} conformers failed to optimize")]
    AllConformersFailed { count: usize },

    #[error("Could not start a calculator worker: {0}")]
    WorkerUnavailable(String),

    #[error("Failed to write report: {0}")]
    Report(#[from] csv::Error),

    #[error("Optimizer produced a non-finite step at step {step}")]
    NonFiniteStep { step: usize },
}
