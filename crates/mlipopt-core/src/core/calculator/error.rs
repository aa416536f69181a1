use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalculatorError {
    #[error("Failed to launch calculator '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Calculator worker I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Calculator worker exited unexpectedly (status: {status})")]
    WorkerExited { status: String },

    #[error("Malformed calculator response: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("Calculator reported an error: {0}")]
    Remote(String),

    #[error("Calculator returned {actual} force vectors for {expected} atoms")]
    ForceCountMismatch { expected: usize, actual: usize },

    #[error("Calculator returned a non-finite {0}")]
    NonFinite(&'static str),
}

impl CalculatorError {
    pub(crate) fn exited(status: Option<ExitStatus>) -> Self {
        CalculatorError::WorkerExited {
            status: status.map_or_else(|| "still running".to_string(), |s| s.to_string()),
        }
    }
}
