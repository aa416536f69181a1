use super::error::CalculatorError;
use super::protocol::{Request, Response, force_vectors};
use super::traits::{Calculator, CalculatorFactory, Evaluation};
use crate::core::models::molecule::Molecule;
use crate::core::models::state::ElectronicState;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

pub const DEFAULT_WORKER_COMMAND: &str = "orb-calculator";
pub const DEFAULT_MODEL: &str = "orb-v3-conservative-inf-omat";
pub const DEFAULT_DEVICE: &str = "cpu";
pub const DEFAULT_PRECISION: &str = "float32-high";

/// How to launch a pretrained-potential worker.
///
/// The worker is started as `command args... --model M --device D --precision P` and must
/// answer each JSON request line on stdin with one JSON response line on stdout. The default
/// command is the bundled `worker/orb_calculator.py` once installed as `orb-calculator`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalCalculatorConfig {
    pub command: String,
    pub args: Vec<String>,
    pub model: String,
    pub device: String,
    pub precision: String,
}

impl Default for ExternalCalculatorConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_WORKER_COMMAND.to_string(),
            args: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            device: DEFAULT_DEVICE.to_string(),
            precision: DEFAULT_PRECISION.to_string(),
        }
    }
}

impl ExternalCalculatorConfig {
    /// Full argument list passed to the worker command.
    pub fn worker_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend([
            "--model".to_string(),
            self.model.clone(),
            "--device".to_string(),
            self.device.clone(),
            "--precision".to_string(),
            self.precision.clone(),
        ]);
        args
    }
}

impl CalculatorFactory for ExternalCalculatorConfig {
    fn create(&self) -> Result<Box<dyn Calculator>, CalculatorError> {
        Ok(Box::new(ExternalCalculator::spawn(self.clone())?))
    }
}

/// A calculator backed by a long-lived worker process.
///
/// The worker is killed and reaped when the calculator is dropped.
pub struct ExternalCalculator {
    config: ExternalCalculatorConfig,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    evaluations: usize,
}

impl ExternalCalculator {
    /// Launches the worker process described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CalculatorError::Spawn`] if the command cannot be started.
    pub fn spawn(config: ExternalCalculatorConfig) -> Result<Self, CalculatorError> {
        let args = config.worker_args();
        info!(
            "Launching calculator worker: {} {}",
            config.command,
            args.join(" ")
        );
        let mut child = Command::new(&config.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| CalculatorError::Spawn {
                command: config.command.clone(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CalculatorError::Io(std::io::Error::other(
                "calculator worker pipes were not captured",
            )));
        };

        Ok(Self {
            config,
            child,
            stdin,
            stdout: BufReader::new(stdout),
            evaluations: 0,
        })
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    fn exchange(&mut self, line: &str) -> Result<String, CalculatorError> {
        if let Err(e) = writeln!(self.stdin, "{}", line).and_then(|_| self.stdin.flush()) {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(CalculatorError::exited(Some(status)));
            }
            return Err(e.into());
        }

        let mut response = String::new();
        let read = self.stdout.read_line(&mut response)?;
        if read == 0 {
            let status = self.child.wait().ok();
            return Err(CalculatorError::exited(status));
        }
        Ok(response)
    }
}

impl Calculator for ExternalCalculator {
    fn name(&self) -> &str {
        &self.config.model
    }

    fn calculate(
        &mut self,
        molecule: &Molecule,
        state: &ElectronicState,
    ) -> Result<Evaluation, CalculatorError> {
        let request = serde_json::to_string(&Request::new(molecule, state))?;
        let raw = self.exchange(&request)?;
        self.evaluations += 1;

        match serde_json::from_str::<Response>(raw.trim())? {
            Response::Success { energy, forces } => {
                let evaluation = Evaluation {
                    energy,
                    forces: force_vectors(&forces),
                };
                evaluation.validate(molecule.len())?;
                debug!(
                    "Evaluation #{} from {}: E = {:.6} eV",
                    self.evaluations, self.config.model, energy
                );
                Ok(evaluation)
            }
            Response::Failure { error } => Err(CalculatorError::Remote(error)),
        }
    }
}

impl Drop for ExternalCalculator {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            if let Err(e) = self.child.kill() {
                warn!("Failed to stop calculator worker: {}", e);
            }
        }
        let _ = self.child.wait();
    }
}
