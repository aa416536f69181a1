use crate::cli::ClusterArgs;
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::utils::paths;
use crate::utils::progress::CliProgressHandler;
use mlipopt::{
    core::io, core::models::state::ElectronicState, engine::progress::ProgressReporter,
    workflows,
};
use std::path::PathBuf;
use tracing::{info, warn};

pub fn run(args: ClusterArgs, config: AppConfig, quiet: bool) -> Result<()> {
    let state = ElectronicState::new(args.charge, args.spin);
    let (output, summary) = output_paths(&args);

    info!("Loading conformers from {:?}", &args.input);
    let conformers = io::read_molecules(&args.input).map_err(|e| CliError::FileParsing {
        path: args.input.clone(),
        source: e.into(),
    })?;
    if let Some(first) = conformers.first() {
        if let Some(index) = conformers.iter().position(|c| c.len() != first.len()) {
            return Err(CliError::Argument(format!(
                "Conformer {} has {} atoms but conformer 1 has {}",
                index + 1,
                conformers[index].len(),
                first.len()
            )));
        }
    }
    if io::Format::from_path(&output).is_err() {
        warn!("Unrecognized output extension on {:?}; writing xyz", &output);
    }

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Optimizing {} conformers...", conformers.len());
    let result = workflows::cluster::run(
        &conformers,
        &state,
        &config.optimizer,
        &config.crest,
        &config.calculator,
        &reporter,
    )?;

    if result.failed() > 0 {
        println!(
            "Warning: {} conformer(s) failed to optimize; see {} for details.",
            result.failed(),
            summary.display()
        );
    }

    io::write_molecules(&output, &result.survivors).map_err(|e| CliError::FileParsing {
        path: output.clone(),
        source: e.into(),
    })?;
    workflows::cluster::write_summary(&summary, &result.summaries)?;

    println!(
        "✓ {} unique conformer(s) written to: {}",
        result.survivors.len(),
        output.display()
    );
    println!("  Per-conformer summary written to: {}", summary.display());
    Ok(())
}

fn output_paths(args: &ClusterArgs) -> (PathBuf, PathBuf) {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| paths::clustered_output(&args.input));
    let summary = args
        .summary
        .clone()
        .unwrap_or_else(|| paths::summary_output(&output));
    (output, summary)
}
