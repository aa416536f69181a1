use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "mlipopt - geometry optimization and conformer clustering with pretrained machine-learning interatomic potentials (Orb-v3).",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used to optimize conformers in parallel.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S optimizer.fmax=0.01
    #[arg(short = 'S', long = "set", global = true, value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Optimize one structure, optionally holding a dihedral angle fixed.
    Opt(OptArgs),
    /// Optimize every conformer in a file, then deduplicate them with CREST.
    Cluster(ClusterArgs),
}

/// Settings shared by both subcommands that override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Pretrained model name passed to the calculator worker.
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Device the model runs on (e.g., cpu, cuda).
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Force convergence threshold in eV/Å.
    #[arg(long, value_name = "FLOAT")]
    pub fmax: Option<f64>,

    /// Maximum number of optimizer steps.
    #[arg(long, value_name = "INT")]
    pub max_steps: Option<usize>,
}

/// Arguments for the `opt` subcommand.
#[derive(Args, Debug)]
pub struct OptArgs {
    /// Input structure file (.xyz or .sdf).
    #[arg(short, long, alias = "input_file", value_name = "PATH")]
    pub input_file: PathBuf,

    /// Output structure file; the format follows the extension.
    #[arg(short, long, alias = "output_file", value_name = "PATH")]
    pub output_file: PathBuf,

    /// Net molecular charge.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub charge: f64,

    /// Spin multiplicity (2S+1).
    #[arg(long, default_value_t = 1.0)]
    pub spin: f64,

    /// Four 1-based atom indices defining the dihedral to hold.
    #[arg(
        long,
        alias = "dihedral_indices",
        num_args = 4,
        value_names = ["A", "B", "C", "D"]
    )]
    pub dihedral_indices: Option<Vec<usize>>,

    /// Target dihedral angle in degrees. Without it the current angle is frozen.
    #[arg(
        long,
        alias = "dihedral_angle",
        value_name = "DEGREES",
        requires = "dihedral_indices",
        allow_negative_numbers = true
    )]
    pub dihedral_angle: Option<f64>,

    #[command(flatten)]
    pub overrides: ModelArgs,
}

/// Arguments for the `cluster` subcommand.
#[derive(Args, Debug)]
pub struct ClusterArgs {
    /// Multi-conformer structure file (.xyz or .sdf).
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Net molecular charge.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub charge: f64,

    /// Spin multiplicity (2S+1).
    #[arg(long, default_value_t = 1.0)]
    pub spin: f64,

    /// Output ensemble file. Defaults to `<input stem>_clustered.xyz` beside the input.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Per-conformer CSV report. Defaults to `<output stem>_summary.csv`.
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,

    /// CREST energy window in kcal/mol.
    #[arg(long, value_name = "FLOAT")]
    pub ewin: Option<f64>,

    /// CREST RMSD threshold in Å.
    #[arg(long, value_name = "FLOAT")]
    pub rthr: Option<f64>,

    /// Keep the CREST work directory for inspection.
    #[arg(long)]
    pub keep_workdir: bool,

    #[command(flatten)]
    pub overrides: ModelArgs,
}

impl OptArgs {
    /// The dihedral indices as a fixed-size array, if given.
    pub fn dihedral_indices(&self) -> Option<[usize; 4]> {
        self.dihedral_indices
            .as_deref()
            .and_then(|indices| indices.try_into().ok())
    }
}
