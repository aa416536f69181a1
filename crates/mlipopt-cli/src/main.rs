mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::config::builder::CliOverrides;
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("🚀 mlipopt v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!(
            "Setting Rayon global thread pool to {} threads.",
            num_threads
        );
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e))
            })?;
    }

    let command_result = match cli.command {
        Commands::Opt(args) => {
            info!("Dispatching to 'opt' command.");
            let overrides = CliOverrides {
                model: args.overrides.clone(),
                ..CliOverrides::default()
            };
            let app_config =
                config::build_config(cli.config.as_deref(), &cli.set_values, &overrides)?;
            commands::opt::run(args, app_config, cli.quiet)
        }
        Commands::Cluster(args) => {
            info!("Dispatching to 'cluster' command.");
            let overrides = CliOverrides {
                model: args.overrides.clone(),
                energy_window: args.ewin,
                rmsd_threshold: args.rthr,
                keep_workdir: args.keep_workdir,
            };
            let app_config =
                config::build_config(cli.config.as_deref(), &cli.set_values, &overrides)?;
            commands::cluster::run(args, app_config, cli.quiet)
        }
    };

    match &command_result {
        Ok(_) => info!("✅ Command completed successfully."),
        Err(e) => error!("❌ Command failed: {}", e),
    }
    command_result
}
