use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileCalculatorConfig {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub model: Option<String>,
    pub device: Option<String>,
    pub precision: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOptimizerConfig {
    pub fmax: Option<f64>,
    pub max_steps: Option<usize>,
    pub max_step: Option<f64>,
    pub initial_hessian: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileCrestConfig {
    pub command: Option<String>,
    pub energy_window: Option<f64>,
    pub rmsd_threshold: Option<f64>,
    pub energy_threshold: Option<f64>,
    pub keep_workdir: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub calculator: Option<FileCalculatorConfig>,
    pub optimizer: Option<FileOptimizerConfig>,
    pub crest: Option<FileCrestConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_file_is_parsed() {
        let config = FileConfig::from_toml(
            r#"
            [calculator]
            command = "python"
            args = ["-m", "orb_worker"]
            model = "orb-v3-direct-20-omat"
            device = "cuda"

            [optimizer]
            fmax = 0.01
            max-steps = 500

            [crest]
            energy-window = 3.0
            keep-workdir = true
            "#,
        )
        .unwrap();

        let calculator = config.calculator.unwrap();
        assert_eq!(calculator.command.as_deref(), Some("python"));
        assert_eq!(calculator.args.unwrap(), ["-m", "orb_worker"]);
        assert!(calculator.precision.is_none());
        let optimizer = config.optimizer.unwrap();
        assert_eq!(optimizer.fmax, Some(0.01));
        assert_eq!(optimizer.max_steps, Some(500));
        let crest = config.crest.unwrap();
        assert_eq!(crest.energy_window, Some(3.0));
        assert_eq!(crest.keep_workdir, Some(true));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = FileConfig::from_toml("").unwrap();
        assert!(config.calculator.is_none());
        assert!(config.optimizer.is_none());
        assert!(config.crest.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::from_toml("[optimizer]\nfmx = 0.1\n").is_err());
        assert!(FileConfig::from_toml("[solver]\nfmax = 0.1\n").is_err());
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        match FileConfig::from_file(&path) {
            Err(CliError::FileParsing { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
