//! Discovery-time validation of resolved configurations.
//!
//! Fatal problems reject the test before any sample runs; advisory findings
//! are carried as `ValidationWarning` records so the report can surface
//! them without breaking the run.

use crate::config::resolver::ResolvedConfig;
use crate::error::PunitError;

/// A non-fatal configuration finding carried into the report.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a resolved configuration.
///
/// # Errors
/// `InvalidConfiguration` naming the failing field.
pub fn validate(config: &ResolvedConfig) -> Result<(), PunitError> {
    if config.samples == 0 {
        return Err(PunitError::InvalidConfiguration(
            "samples must be at least 1".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.min_pass_rate) {
        return Err(PunitError::InvalidConfiguration(format!(
            "min_pass_rate {} must lie in [0, 1]",
            config.min_pass_rate
        )));
    }
    if !(config.threshold_confidence > 0.0 && config.threshold_confidence < 1.0) {
        return Err(PunitError::InvalidConfiguration(format!(
            "threshold_confidence {} must lie strictly between 0 and 1",
            config.threshold_confidence
        )));
    }
    if config.token_budget > 0 && config.token_charge > config.token_budget {
        return Err(PunitError::InvalidConfiguration(format!(
            "token_charge {} exceeds token_budget {}",
            config.token_charge, config.token_budget
        )));
    }
    Ok(())
}
