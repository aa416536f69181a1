//! Provides input/output functionality for molecular file formats.
//!
//! Readers return every structure in a file (xyz frames, sdf records), so the same entry
//! points serve single-structure optimization and conformer ensembles. The output format is
//! chosen from the file extension.

pub mod error;
pub mod sdf;
pub mod traits;
pub mod xyz;

use crate::core::models::molecule::Molecule;
use error::Error;
use sdf::SdfFile;
use std::fmt;
use std::path::Path;
use traits::MolecularFile;
use xyz::XyzFile;

/// Supported structure file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Xyz,
    Sdf,
}

impl Format {
    /// Infers the format from a path's extension, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedExtension`] for missing or unknown extensions.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xyz" => Ok(Format::Xyz),
            "sdf" | "sd" | "mol" => Ok(Format::Sdf),
            _ => Err(Error::UnsupportedExtension(path.display().to_string())),
        }
    }
}

impl Format {
    /// Format used when writing to `path`: as inferred from the extension, xyz otherwise.
    pub fn for_output(path: &Path) -> Self {
        Self::from_path(path).unwrap_or(Format::Xyz)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Xyz => f.write_str("xyz"),
            Format::Sdf => f.write_str("sdf"),
        }
    }
}

/// Reads every structure stored in `path`, dispatching on its extension.
pub fn read_molecules(path: &Path) -> Result<Vec<Molecule>, Error> {
    match Format::from_path(path)? {
        Format::Xyz => XyzFile::read_from_path(path),
        Format::Sdf => SdfFile::read_from_path(path),
    }
}

/// Writes `molecules` to `path` in the format implied by its extension.
///
/// Paths without a recognized extension are written as xyz.
pub fn write_molecules(path: &Path, molecules: &[Molecule]) -> Result<(), Error> {
    match Format::for_output(path) {
        Format::Xyz => XyzFile::write_to_path(molecules, path),
        Format::Sdf => SdfFile::write_to_path(molecules, path),
    }
}
