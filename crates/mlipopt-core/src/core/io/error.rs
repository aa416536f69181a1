use super::Format;
use crate::core::models::molecule::MoleculeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse {format} data: {details} (at line {line})")]
    Parse {
        format: Format,
        line: usize,
        details: String,
    },

    #[error("no structures found in {0} data")]
    Empty(Format),

    #[error("cannot infer a structure format from '{0}' (expected .xyz or .sdf)")]
    UnsupportedExtension(String),

    #[error("cannot write {format} data: {details}")]
    Unwritable {
        format: Format,
        details: String,
    },

    #[error("inconsistent structure: {0}")]
    Molecule(#[from] MoleculeError),
}

impl Error {
    pub fn parse(format: Format, line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            line,
            details: details.into(),
        }
    }
}
