//! Crate-wide error taxonomy.
//!
//! Discovery-time errors (`InvalidConfiguration`, the `Specification*`
//! family, `SampleSizeMismatch`) short-circuit a test before any sample
//! runs. Kernel precondition errors (`InvalidProbability`,
//! `InvalidSampleSize`) are fatal to the containing operation. Sample-level
//! faults never appear here; they are mediated by the `on_exception` policy
//! inside the scheduler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PunitError {
    /// Validation failure at test discovery; names the offending source
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Specification not found: {use_case_id} v{version}")]
    SpecificationNotFound {
        use_case_id: String,
        version: String,
    },

    /// Spec exists but lacks approval metadata
    #[error("Specification not approved: {0}")]
    SpecificationNotApproved(String),

    #[error("Specification malformed: {0}")]
    SpecificationMalformed(String),

    /// Derivation policy requires the test sample count to match the basis
    #[error(
        "Sample size mismatch: test runs {n_test} samples but the experimental basis used {n_exp}"
    )]
    SampleSizeMismatch { n_test: u32, n_exp: u64 },

    #[error("Invalid probability {0} - must lie in [0, 1]")]
    InvalidProbability(f64),

    #[error("Invalid sample size {0} - at least 1 sample is required")]
    InvalidSampleSize(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Failure returned by a sample body.
///
/// `Assertion` counts as a plain sample FAIL. `Fault` is the non-assertion
/// case routed through the configured `ExceptionPolicy`.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("sample fault: {0}")]
    Fault(String),
}

impl SampleError {
    /// Convenience constructor for assertion-kind failures
    pub fn assertion(msg: impl Into<String>) -> Self {
        SampleError::Assertion(msg.into())
    }

    /// Convenience constructor for non-assertion faults
    pub fn fault(msg: impl Into<String>) -> Self {
        SampleError::Fault(msg.into())
    }
}

/// Result type for a single sample invocation
pub type SampleResult = Result<(), SampleError>;
