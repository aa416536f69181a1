use mlipopt::core::calculator::external::{
    DEFAULT_DEVICE, DEFAULT_MODEL, DEFAULT_PRECISION, DEFAULT_WORKER_COMMAND,
};
use mlipopt::core::crest::{
    DEFAULT_CREST_COMMAND, DEFAULT_ENERGY_THRESHOLD, DEFAULT_ENERGY_WINDOW, DEFAULT_RMSD_THRESHOLD,
};
use mlipopt::engine::config::OptimizerConfig;

pub struct DefaultsConfig {
    pub worker_command: String,
    pub model: String,
    pub device: String,
    pub precision: String,
    pub fmax: f64,
    pub max_steps: usize,
    pub max_step: f64,
    pub initial_hessian: f64,
    pub crest_command: String,
    pub energy_window: f64,
    pub rmsd_threshold: f64,
    pub energy_threshold: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let optimizer = OptimizerConfig::default();
        Self {
            worker_command: DEFAULT_WORKER_COMMAND.to_string(),
            model: DEFAULT_MODEL.to_string(),
            device: DEFAULT_DEVICE.to_string(),
            precision: DEFAULT_PRECISION.to_string(),
            fmax: optimizer.fmax,
            max_steps: optimizer.max_steps,
            max_step: optimizer.max_step,
            initial_hessian: optimizer.initial_hessian,
            crest_command: DEFAULT_CREST_COMMAND.to_string(),
            energy_window: DEFAULT_ENERGY_WINDOW,
            rmsd_threshold: DEFAULT_RMSD_THRESHOLD,
            energy_threshold: DEFAULT_ENERGY_THRESHOLD,
        }
    }
}
