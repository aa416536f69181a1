use crate::core::models::molecule::Molecule;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing molecular file formats.
///
/// Every format handled here can hold more than one structure, so reading yields all of
/// them in file order and writing accepts a slice.
pub trait MolecularFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads all structures from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails, the data holds no structure, or reading fails.
    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Molecule>, Self::Error>;

    /// Writes structures to a writer in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if a structure cannot be represented or writing fails.
    fn write_to(molecules: &[Molecule], writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads all structures from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Molecule>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes structures to a file path, replacing any existing file.
    fn write_to_path<P: AsRef<Path>>(molecules: &[Molecule], path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(molecules, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
