// Config validation
// Runs at startup, before the submission is touched, and fails fast with
// actionable errors.

use crate::config::types::{RunnerConfig, RunnerError, Result};
use crate::utils::env_hygiene::validate_environment_safety;

/// Validation result with detailed errors
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate config at startup. Errors are fatal; warnings are returned to the
/// caller for logging.
pub fn validate_config(config: &RunnerConfig) -> Result<ValidationResult> {
    let mut result = ValidationResult::new();

    validate_limits(config, &mut result);
    validate_deadline(config, &mut result);
    validate_interpreter(config, &mut result);
    validate_environment(config, &mut result);

    if !result.is_valid() {
        return Err(RunnerError::Config(format!(
            "Config validation failed:\n{}",
            result.errors.join("\n")
        )));
    }

    Ok(result)
}

fn validate_limits(config: &RunnerConfig, result: &mut ValidationResult) {
    let limits = &config.limits;

    if limits.address_space_bytes == 0 {
        result.add_error("limits.address_space_bytes cannot be zero".to_string());
    } else if limits.address_space_bytes < 32 * 1024 * 1024 {
        result.add_warning(format!(
            "limits.address_space_bytes {} is very low (< 32MB), the interpreter may fail to start",
            limits.address_space_bytes
        ));
    }

    if limits.cpu_time_secs == 0 {
        result.add_error("limits.cpu_time_secs cannot be zero".to_string());
    }

    if limits.file_size_bytes == 0 {
        result.add_error("limits.file_size_bytes cannot be zero".to_string());
    }
}

fn validate_deadline(config: &RunnerConfig, result: &mut ValidationResult) {
    if config.deadline_secs == 0 {
        result.add_error("deadline_secs cannot be zero".to_string());
        return;
    }

    // The CPU ceiling can only be reached first by code that burns CPU faster
    // than wall-clock time passes, which a single-threaded payload cannot do.
    if u64::from(config.deadline_secs) < config.limits.cpu_time_secs {
        result.add_warning(format!(
            "deadline_secs ({}) is shorter than limits.cpu_time_secs ({}); CPU-bound code will hit the deadline first",
            config.deadline_secs, config.limits.cpu_time_secs
        ));
    }
}

fn validate_interpreter(config: &RunnerConfig, result: &mut ValidationResult) {
    if config.interpreter.program.trim().is_empty() {
        result.add_error("interpreter.program cannot be empty".to_string());
    }
    if config
        .interpreter
        .args
        .iter()
        .any(|arg| arg.contains('\0'))
    {
        result.add_error("interpreter.args cannot contain NUL bytes".to_string());
    }
}

fn validate_environment(config: &RunnerConfig, result: &mut ValidationResult) {
    for (key, value) in &config.environment {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            result.add_error(format!("invalid environment key: {:?}", key));
        }
        if value.contains('\0') {
            result.add_error(format!("environment value for {} contains NUL byte", key));
        }
    }
    if !config.environment.iter().any(|(key, _)| key == "PATH") {
        result.add_warning(
            "environment has no PATH; the interpreter must be an absolute path".to_string(),
        );
    }
    for warning in validate_environment_safety(&config.environment) {
        result.add_warning(warning);
    }
}
