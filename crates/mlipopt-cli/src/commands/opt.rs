use crate::cli::OptArgs;
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use mlipopt::{
    core::calculator::external::ExternalCalculator,
    core::constraints::DihedralSpec,
    core::io,
    core::models::molecule::Molecule,
    core::models::state::ElectronicState,
    engine::error::EngineError,
    engine::progress::ProgressReporter,
    workflows,
};
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: OptArgs, config: AppConfig, quiet: bool) -> Result<()> {
    let dihedral = dihedral_spec(&args)?;
    let state = ElectronicState::new(args.charge, args.spin);

    let molecule = load_structure(&args.input_file)?;
    if io::Format::from_path(&args.output_file).is_err() {
        warn!(
            "Unrecognized output extension on {:?}; writing xyz",
            &args.output_file
        );
    }

    let mut calculator = ExternalCalculator::spawn(config.calculator).map_err(EngineError::from)?;

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Optimizing {} atoms...", molecule.len());
    let result = workflows::optimize::run(
        &molecule,
        &state,
        dihedral,
        &config.optimizer,
        &mut calculator,
        &reporter,
    )?;

    if !result.converged {
        println!(
            "Warning: optimization stopped after {} steps without reaching fmax {} eV/Å (fmax = {:.4}).",
            result.steps, config.optimizer.fmax, result.fmax
        );
    }
    if let Some(report) = &result.dihedral {
        println!(
            "Dihedral {} held at {:.2} degrees ({}).",
            report.spec.label(),
            report.actual_angle,
            report.source
        );
    }

    io::write_molecules(&args.output_file, std::slice::from_ref(&result.molecule)).map_err(
        |e| CliError::FileParsing {
            path: args.output_file.clone(),
            source: e.into(),
        },
    )?;
    println!(
        "✓ Optimized structure (Energy: {:.6} eV, {} steps) written to: {}",
        result.energy,
        result.steps,
        args.output_file.display()
    );
    Ok(())
}

/// Reads `path` and returns its last structure, the final frame of a trajectory.
fn load_structure(path: &Path) -> Result<Molecule> {
    info!("Loading input structure from {:?}", path);
    let mut molecules = io::read_molecules(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    if molecules.len() > 1 {
        warn!(
            "{} structures found in {:?}; only the last is optimized",
            molecules.len(),
            path
        );
    }
    Ok(molecules.pop().ok_or(EngineError::EmptyInput)?)
}

fn dihedral_spec(args: &OptArgs) -> Result<Option<DihedralSpec>> {
    match (&args.dihedral_indices, args.dihedral_angle) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(CliError::Argument(
            "--dihedral-angle requires --dihedral-indices".to_string(),
        )),
        (Some(_), angle) => {
            let indices = args.dihedral_indices().ok_or_else(|| {
                CliError::Argument("--dihedral-indices takes exactly four atom indices".to_string())
            })?;
            Ok(Some(DihedralSpec::new(indices, angle)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn opt_args(extra: &[&str]) -> OptArgs {
        let args = ["mlipopt", "opt", "-i", "in.xyz", "-o", "out.xyz"]
            .into_iter()
            .chain(extra.iter().copied());
        match Cli::parse_from(args).command {
            Commands::Opt(args) => args,
            _ => panic!("expected opt"),
        }
    }

    #[test]
    fn no_dihedral_flags_means_unconstrained() {
        assert_eq!(dihedral_spec(&opt_args(&[])).unwrap(), None);
    }

    #[test]
    fn indices_alone_freeze_the_current_angle() {
        let spec = dihedral_spec(&opt_args(&["--dihedral-indices", "1", "2", "3", "4"]))
            .unwrap()
            .unwrap();
        assert_eq!(spec.indices, [1, 2, 3, 4]);
        assert_eq!(spec.target_degrees, None);
    }

    #[test]
    fn indices_and_angle_set_a_target() {
        let spec = dihedral_spec(&opt_args(&[
            "--dihedral-indices",
            "4",
            "3",
            "2",
            "1",
            "--dihedral-angle",
            "120",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(spec.target_degrees, Some(120.0));
    }

    #[test]
    fn angle_without_indices_is_rejected() {
        let mut args = opt_args(&[]);
        args.dihedral_angle = Some(30.0);
        assert!(matches!(dihedral_spec(&args), Err(CliError::Argument(_))));
    }

    #[test]
    fn multi_frame_input_yields_the_last_frame() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("traj.xyz");
        std::fs::write(
            &input,
            "2\nframe 1\nH 0 0 0\nH 0 0 1.00\n2\nframe 2\nH 0 0 0\nH 0 0 0.74\n",
        )
        .unwrap();

        let molecule = load_structure(&input).unwrap();
        assert_eq!(molecule.title, "frame 2");
        assert!((molecule.positions()[1].z - 0.74).abs() < 1e-12);
    }

    #[test]
    fn unreadable_input_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.xyz");
        let mut args = opt_args(&[]);
        args.input_file = input.clone();
        let config = crate::config::build_config(None, &[], &Default::default()).unwrap();
        match run(args, config, true) {
            Err(CliError::FileParsing { path, .. }) => assert_eq!(path, input),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
