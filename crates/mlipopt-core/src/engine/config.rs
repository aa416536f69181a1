use thiserror::Error;

pub use crate::core::calculator::external::ExternalCalculatorConfig as CalculatorConfig;
pub use crate::core::crest::CrestConfig;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("expected a positive number, got {value}"),
        })
    }
}

fn non_empty(name: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::InvalidParameter {
            name,
            reason: "must not be empty".to_string(),
        })
    } else {
        Ok(value)
    }
}

/// Convergence and step control for the BFGS optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Converged when every atom's force norm is below this, eV/Å.
    pub fmax: f64,
    pub max_steps: usize,
    /// Largest displacement of any atom in one step, Å.
    pub max_step: f64,
    /// Diagonal of the starting Hessian, eV/Å².
    pub initial_hessian: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            fmax: 0.05,
            max_steps: 1000,
            max_step: 0.2,
            initial_hessian: 70.0,
        }
    }
}

#[derive(Default)]
pub struct OptimizerConfigBuilder {
    fmax: Option<f64>,
    max_steps: Option<usize>,
    max_step: Option<f64>,
    initial_hessian: Option<f64>,
}

impl OptimizerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fmax(mut self, fmax: f64) -> Self {
        self.fmax = Some(fmax);
        self
    }
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }
    pub fn max_step(mut self, length: f64) -> Self {
        self.max_step = Some(length);
        self
    }
    pub fn initial_hessian(mut self, value: f64) -> Self {
        self.initial_hessian = Some(value);
        self
    }

    pub fn build(self) -> Result<OptimizerConfig, ConfigError> {
        let fmax = self.fmax.ok_or(ConfigError::MissingParameter("fmax"))?;
        let max_steps = self
            .max_steps
            .ok_or(ConfigError::MissingParameter("max_steps"))?;
        let max_step = self
            .max_step
            .ok_or(ConfigError::MissingParameter("max_step"))?;
        let initial_hessian = self
            .initial_hessian
            .ok_or(ConfigError::MissingParameter("initial_hessian"))?;

        if max_steps == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_steps",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(OptimizerConfig {
            fmax: positive("fmax", fmax)?,
            max_steps,
            max_step: positive("max_step", max_step)?,
            initial_hessian: positive("initial_hessian", initial_hessian)?,
        })
    }
}

#[derive(Default)]
pub struct CalculatorConfigBuilder {
    command: Option<String>,
    args: Vec<String>,
    model: Option<String>,
    device: Option<String>,
    precision: Option<String>,
}

impl CalculatorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }
    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }
    pub fn precision(mut self, precision: impl Into<String>) -> Self {
        self.precision = Some(precision.into());
        self
    }

    pub fn build(self) -> Result<CalculatorConfig, ConfigError> {
        Ok(CalculatorConfig {
            command: non_empty(
                "command",
                self.command.ok_or(ConfigError::MissingParameter("command"))?,
            )?,
            args: self.args,
            model: non_empty(
                "model",
                self.model.ok_or(ConfigError::MissingParameter("model"))?,
            )?,
            device: non_empty(
                "device",
                self.device.ok_or(ConfigError::MissingParameter("device"))?,
            )?,
            precision: non_empty(
                "precision",
                self.precision
                    .ok_or(ConfigError::MissingParameter("precision"))?,
            )?,
        })
    }
}

#[derive(Default)]
pub struct CrestConfigBuilder {
    command: Option<String>,
    energy_window: Option<f64>,
    rmsd_threshold: Option<f64>,
    energy_threshold: Option<f64>,
    keep_workdir: bool,
}

impl CrestConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }
    pub fn energy_window(mut self, kcal_mol: f64) -> Self {
        self.energy_window = Some(kcal_mol);
        self
    }
    pub fn rmsd_threshold(mut self, angstrom: f64) -> Self {
        self.rmsd_threshold = Some(angstrom);
        self
    }
    pub fn energy_threshold(mut self, kcal_mol: f64) -> Self {
        self.energy_threshold = Some(kcal_mol);
        self
    }
    pub fn keep_workdir(mut self, keep: bool) -> Self {
        self.keep_workdir = keep;
        self
    }

    pub fn build(self) -> Result<CrestConfig, ConfigError> {
        Ok(CrestConfig {
            command: non_empty(
                "command",
                self.command.ok_or(ConfigError::MissingParameter("command"))?,
            )?,
            energy_window: positive(
                "energy_window",
                self.energy_window
                    .ok_or(ConfigError::MissingParameter("energy_window"))?,
            )?,
            rmsd_threshold: positive(
                "rmsd_threshold",
                self.rmsd_threshold
                    .ok_or(ConfigError::MissingParameter("rmsd_threshold"))?,
            )?,
            energy_threshold: positive(
                "energy_threshold",
                self.energy_threshold
                    .ok_or(ConfigError::MissingParameter("energy_threshold"))?,
            )?,
            keep_workdir: self.keep_workdir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimizer_builder_produces_config() {
        let config = OptimizerConfigBuilder::new()
            .fmax(0.01)
            .max_steps(200)
            .max_step(0.1)
            .initial_hessian(70.0)
            .build()
            .unwrap();
        assert_eq!(config.fmax, 0.01);
        assert_eq!(config.max_steps, 200);
        assert_eq!(config.max_step, 0.1);
    }

    #[test]
    fn optimizer_builder_reports_missing_parameter() {
        let result = OptimizerConfigBuilder::new()
            .fmax(0.05)
            .max_steps(10)
            .max_step(0.2)
            .build();
        assert_eq!(
            result,
            Err(ConfigError::MissingParameter("initial_hessian"))
        );
    }

    #[test]
    fn optimizer_builder_rejects_non_positive_values() {
        let result = OptimizerConfigBuilder::new()
            .fmax(-0.05)
            .max_steps(10)
            .max_step(0.2)
            .initial_hessian(70.0)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "fmax", .. })
        ));

        let result = OptimizerConfigBuilder::new()
            .fmax(0.05)
            .max_steps(0)
            .max_step(0.2)
            .initial_hessian(70.0)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "max_steps",
                ..
            })
        ));
    }

    #[test]
    fn calculator_builder_requires_model_fields() {
        let config = CalculatorConfigBuilder::new()
            .command("orb-calculator")
            .model("orb-v3-direct-20-omat")
            .device("cuda")
            .precision("float64")
            .build()
            .unwrap();
        assert_eq!(config.device, "cuda");
        assert!(config.args.is_empty());

        let missing = CalculatorConfigBuilder::new().command("x").build();
        assert_eq!(missing, Err(ConfigError::MissingParameter("model")));

        let blank = CalculatorConfigBuilder::new()
            .command(" ")
            .model("m")
            .device("cpu")
            .precision("float32-high")
            .build();
        assert!(matches!(
            blank,
            Err(ConfigError::InvalidParameter {
                name: "command",
                ..
            })
        ));
    }

    #[test]
    fn crest_builder_validates_thresholds() {
        let config = CrestConfigBuilder::new()
            .command("crest")
            .energy_window(6.0)
            .rmsd_threshold(0.125)
            .energy_threshold(0.05)
            .build()
            .unwrap();
        assert_eq!(config, CrestConfig::default());

        let bad = CrestConfigBuilder::new()
            .command("crest")
            .energy_window(6.0)
            .rmsd_threshold(0.0)
            .energy_threshold(0.05)
            .build();
        assert!(matches!(
            bad,
            Err(ConfigError::InvalidParameter {
                name: "rmsd_threshold",
                ..
            })
        ));
    }
}
