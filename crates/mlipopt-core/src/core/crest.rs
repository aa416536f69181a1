//! Runs CREST's CREGEN sorting on an optimized conformer ensemble.
//!
//! The ensemble is written to a scratch directory as multi-frame xyz with energies in
//! Hartree on the comment lines, CREST is invoked there, and the surviving conformers are
//! read back with their energies converted to eV.

use super::io::error::Error as FileError;
use super::io::traits::MolecularFile;
use super::io::xyz::XyzFile;
use super::models::molecule::Molecule;
use super::models::state::ElectronicState;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

pub const HARTREE_TO_EV: f64 = 27.211386245988;
pub const EV_TO_KCAL_PER_MOL: f64 = 23.060547830619;

pub const DEFAULT_CREST_COMMAND: &str = "crest";
pub const DEFAULT_ENERGY_WINDOW: f64 = 6.0;
pub const DEFAULT_RMSD_THRESHOLD: f64 = 0.125;
pub const DEFAULT_ENERGY_THRESHOLD: f64 = 0.05;

const ENSEMBLE_FILE: &str = "ensemble.xyz";
const OUTPUT_FILE: &str = "crest_ensemble.xyz";
const LOG_FILE: &str = "crest.log";
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Error)]
pub enum CrestError {
    #[error("Failed to launch CREST '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CREST exited with {status}:\n{output}")]
    Failed { status: String, output: String },

    #[error("CREST work directory I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CREST ensemble file error: {0}")]
    File(#[from] FileError),

    #[error("CREST produced no output ensemble in {0}")]
    MissingOutput(PathBuf),

    #[error("CREST output frame {frame} has no energy on its comment line")]
    MissingEnergy { frame: usize },

    #[error("No conformers to cluster")]
    EmptyEnsemble,
}

/// How CREST is invoked and which thresholds CREGEN applies.
#[derive(Debug, Clone, PartialEq)]
pub struct CrestConfig {
    pub command: String,
    /// Energy window above the lowest conformer, kcal/mol.
    pub energy_window: f64,
    /// RMSD below which two conformers are duplicates, Å.
    pub rmsd_threshold: f64,
    /// Energy difference below which two conformers are duplicates, kcal/mol.
    pub energy_threshold: f64,
    pub keep_workdir: bool,
}

impl Default for CrestConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_CREST_COMMAND.to_string(),
            energy_window: DEFAULT_ENERGY_WINDOW,
            rmsd_threshold: DEFAULT_RMSD_THRESHOLD,
            energy_threshold: DEFAULT_ENERGY_THRESHOLD,
            keep_workdir: false,
        }
    }
}

impl CrestConfig {
    /// Command-line arguments for sorting `ensemble` in the current directory.
    pub fn arguments(&self, ensemble: &str, state: &ElectronicState) -> Vec<String> {
        let mut args = vec![
            ensemble.to_string(),
            "--cregen".to_string(),
            ensemble.to_string(),
            "--ewin".to_string(),
            self.energy_window.to_string(),
            "--rthr".to_string(),
            self.rmsd_threshold.to_string(),
            "--ethr".to_string(),
            self.energy_threshold.to_string(),
            "--chrg".to_string(),
            state.integer_charge().to_string(),
        ];
        let unpaired = state.unpaired_electrons();
        if unpaired > 0 {
            args.push("--uhf".to_string());
            args.push(unpaired.to_string());
        }
        args
    }
}

/// A conformer kept by CREGEN.
#[derive(Debug, Clone, PartialEq)]
pub struct CrestSurvivor {
    pub molecule: Molecule,
    /// Energy in eV, as reported back by CREST.
    pub energy: f64,
}

/// Sorts and deduplicates `conformers` (paired with their energies in eV) with CREGEN.
///
/// Survivors are returned lowest energy first.
pub fn cregen(
    conformers: &[(&Molecule, f64)],
    state: &ElectronicState,
    config: &CrestConfig,
) -> Result<Vec<CrestSurvivor>, CrestError> {
    if conformers.is_empty() {
        return Err(CrestError::EmptyEnsemble);
    }

    let workdir = tempfile::Builder::new().prefix("mlipopt-crest-").tempdir()?;
    let frames: Vec<Molecule> = conformers
        .iter()
        .map(|(molecule, energy)| {
            let mut frame = molecule.stripped();
            frame.title = format!("{:.10}", energy / HARTREE_TO_EV);
            frame
        })
        .collect();
    XyzFile::write_to_path(&frames, workdir.path().join(ENSEMBLE_FILE))?;

    let result = run_in(workdir.path(), state, config);

    if config.keep_workdir {
        let kept = workdir.keep();
        info!("Keeping CREST work directory at {}", kept.display());
    }
    result
}

fn run_in(
    workdir: &Path,
    state: &ElectronicState,
    config: &CrestConfig,
) -> Result<Vec<CrestSurvivor>, CrestError> {
    let args = config.arguments(ENSEMBLE_FILE, state);
    info!("Running {} {}", config.command, args.join(" "));

    let output = Command::new(&config.command)
        .args(&args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| CrestError::Spawn {
            command: config.command.clone(),
            source,
        })?;
    std::fs::write(workdir.join(LOG_FILE), &output.stdout)?;

    if !output.status.success() {
        let stream = if output.stderr.is_empty() {
            &output.stdout
        } else {
            &output.stderr
        };
        return Err(CrestError::Failed {
            status: output.status.to_string(),
            output: tail(&String::from_utf8_lossy(stream), STDERR_TAIL_LINES),
        });
    }

    let path = output_path(workdir)?;
    debug!("Reading CREST survivors from {}", path.display());
    parse_survivors(XyzFile::read_from_path(&path)?)
}

fn output_path(workdir: &Path) -> Result<PathBuf, CrestError> {
    let primary = workdir.join(OUTPUT_FILE);
    if primary.is_file() {
        return Ok(primary);
    }
    let sorted = workdir.join(format!("{ENSEMBLE_FILE}.sorted"));
    if sorted.is_file() {
        return Ok(sorted);
    }
    Err(CrestError::MissingOutput(workdir.to_path_buf()))
}

fn parse_survivors(frames: Vec<Molecule>) -> Result<Vec<CrestSurvivor>, CrestError> {
    let mut survivors = frames
        .into_iter()
        .enumerate()
        .map(|(i, molecule)| {
            let hartree = molecule
                .title
                .split_whitespace()
                .next()
                .and_then(|token| token.parse::<f64>().ok())
                .ok_or(CrestError::MissingEnergy { frame: i + 1 })?;
            Ok(CrestSurvivor {
                molecule,
                energy: hartree * HARTREE_TO_EV,
            })
        })
        .collect::<Result<Vec<_>, CrestError>>()?;
    survivors.sort_by(|a, b| a.energy.total_cmp(&b.energy));
    Ok(survivors)
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
