use mlipopt::engine::config as core_config;

/// Fully merged settings for one invocation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub calculator: core_config::CalculatorConfig,
    pub optimizer: core_config::OptimizerConfig,
    pub crest: core_config::CrestConfig,
}
