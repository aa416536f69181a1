use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::ModelArgs;
use crate::error::{CliError, Result};
use mlipopt::engine::config as core_config;
use std::path::Path;

/// Flags that override individual settings for the current subcommand.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model: ModelArgs,
    pub energy_window: Option<f64>,
    pub rmsd_threshold: Option<f64>,
    pub keep_workdir: bool,
}

pub fn build_config(
    config_path: Option<&Path>,
    set_values: &[String],
    overrides: &CliOverrides,
) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(path) = config_path {
        FileConfig::from_file(path)?
    } else {
        FileConfig::default()
    };
    let mut file_config = apply_set_values(file_config, set_values)?;

    let calc_file = file_config.calculator.take().unwrap_or_default();
    let calculator = core_config::CalculatorConfigBuilder::new()
        .command(calc_file.command.unwrap_or(defaults.worker_command))
        .args(calc_file.args.unwrap_or_default())
        .model(
            overrides
                .model
                .model
                .clone()
                .or(calc_file.model)
                .unwrap_or(defaults.model),
        )
        .device(
            overrides
                .model
                .device
                .clone()
                .or(calc_file.device)
                .unwrap_or(defaults.device),
        )
        .precision(calc_file.precision.unwrap_or(defaults.precision))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let opt_file = file_config.optimizer.take().unwrap_or_default();
    let optimizer = core_config::OptimizerConfigBuilder::new()
        .fmax(
            overrides
                .model
                .fmax
                .or(opt_file.fmax)
                .unwrap_or(defaults.fmax),
        )
        .max_steps(
            overrides
                .model
                .max_steps
                .or(opt_file.max_steps)
                .unwrap_or(defaults.max_steps),
        )
        .max_step(opt_file.max_step.unwrap_or(defaults.max_step))
        .initial_hessian(opt_file.initial_hessian.unwrap_or(defaults.initial_hessian))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let crest_file = file_config.crest.take().unwrap_or_default();
    let crest = core_config::CrestConfigBuilder::new()
        .command(crest_file.command.unwrap_or(defaults.crest_command))
        .energy_window(
            overrides
                .energy_window
                .or(crest_file.energy_window)
                .unwrap_or(defaults.energy_window),
        )
        .rmsd_threshold(
            overrides
                .rmsd_threshold
                .or(crest_file.rmsd_threshold)
                .unwrap_or(defaults.rmsd_threshold),
        )
        .energy_threshold(
            crest_file
                .energy_threshold
                .unwrap_or(defaults.energy_threshold),
        )
        .keep_workdir(overrides.keep_workdir || crest_file.keep_workdir.unwrap_or(false))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        calculator,
        optimizer,
        crest,
    })
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "calculator.command" => {
                config
                    .calculator
                    .get_or_insert_with(Default::default)
                    .command = Some(value_str.to_string());
            }
            "calculator.model" => {
                config.calculator.get_or_insert_with(Default::default).model =
                    Some(value_str.to_string());
            }
            "calculator.device" => {
                config.calculator.get_or_insert_with(Default::default).device =
                    Some(value_str.to_string());
            }
            "calculator.precision" => {
                config
                    .calculator
                    .get_or_insert_with(Default::default)
                    .precision = Some(value_str.to_string());
            }
            "optimizer.fmax" => {
                config.optimizer.get_or_insert_with(Default::default).fmax =
                    Some(parse_value(key, value_str, "float")?);
            }
            "optimizer.max-steps" => {
                config
                    .optimizer
                    .get_or_insert_with(Default::default)
                    .max_steps = Some(parse_value(key, value_str, "integer")?);
            }
            "optimizer.max-step" => {
                config.optimizer.get_or_insert_with(Default::default).max_step =
                    Some(parse_value(key, value_str, "float")?);
            }
            "optimizer.initial-hessian" => {
                config
                    .optimizer
                    .get_or_insert_with(Default::default)
                    .initial_hessian = Some(parse_value(key, value_str, "float")?);
            }
            "crest.command" => {
                config.crest.get_or_insert_with(Default::default).command =
                    Some(value_str.to_string());
            }
            "crest.energy-window" => {
                config
                    .crest
                    .get_or_insert_with(Default::default)
                    .energy_window = Some(parse_value(key, value_str, "float")?);
            }
            "crest.rmsd-threshold" => {
                config
                    .crest
                    .get_or_insert_with(Default::default)
                    .rmsd_threshold = Some(parse_value(key, value_str, "float")?);
            }
            "crest.energy-threshold" => {
                config
                    .crest
                    .get_or_insert_with(Default::default)
                    .energy_threshold = Some(parse_value(key, value_str, "float")?);
            }
            "crest.keep-workdir" => {
                config
                    .crest
                    .get_or_insert_with(Default::default)
                    .keep_workdir = Some(parse_value(key, value_str, "boolean")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
