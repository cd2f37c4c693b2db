//! Approved specifications and threshold derivation
//!
//! An approved specification is the immutable, reviewed artifact that ties a
//! use case to an experimental baseline and a required pass rate. The
//! registry loads specs by `(use_case_id, version)` and caches them; the
//! threshold deriver turns a spec's experimental basis into the effective
//! `min_pass_rate` for a test run at its own sample count.

pub mod registry;
pub mod threshold;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PunitError;

// ============================================================================
// Spec Data Model
// ============================================================================

/// The empirical basis behind a spec's threshold: the experiment that
/// observed the subject's success rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExperimentalBasis {
    /// Samples executed in the baseline experiment
    pub samples: u64,
    /// Successes observed in the baseline experiment
    pub successes: u64,
    /// Observed success rate, successes / samples
    pub observed_rate: f64,
    /// Standard error of the observed rate
    pub standard_error: f64,
}

impl ExperimentalBasis {
    /// Rate recomputed from the counters; the stored `observed_rate` is
    /// advisory and may carry rounding from the serializer.
    pub fn rate(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.successes as f64 / self.samples as f64
        }
    }
}

/// Normative requirements carried by a spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirements {
    pub min_pass_rate: f64,
    /// Pluggable success-criteria expression, opaque to the core
    #[serde(default)]
    pub success_criteria: Option<String>,
}

/// Test-configuration block recorded alongside a stored derivation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoredTestConfiguration {
    pub samples: u32,
    pub confidence_level: f64,
}

/// Derivation metadata recorded by the experiment tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDerivation {
    pub method: String,
    pub z_score: f64,
    pub test_standard_error: f64,
}

/// The regression-threshold block of a spec file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRegressionThreshold {
    pub experimental_basis: ExperimentalBasis,
    #[serde(default)]
    pub test_configuration: Option<StoredTestConfiguration>,
    #[serde(default)]
    pub derived_min_pass_rate: Option<f64>,
    #[serde(default)]
    pub derivation: Option<StoredDerivation>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// An approved, immutable specification for a use case version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedSpec {
    pub spec_id: String,
    pub use_case_id: String,
    pub version: String,
    /// Approval timestamp; required for a spec to be usable
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    /// Approver identity; required for a spec to be usable
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub approval_notes: Option<String>,
    /// References to the experiment summaries this spec was cut from
    #[serde(default)]
    pub source_baselines: Vec<String>,
    /// Environment the baseline was measured in (model ids, temperatures, ...)
    #[serde(default)]
    pub execution_context: Option<serde_json::Value>,
    pub requirements: Requirements,
    #[serde(default)]
    pub regression_threshold: Option<StoredRegressionThreshold>,
    #[serde(default)]
    pub cost_envelope: Option<serde_json::Value>,
}

impl ApprovedSpec {
    /// Load-time validation: approval metadata present and the experimental
    /// basis well-formed.
    ///
    /// # Errors
    /// `SpecificationNotApproved` for missing approval metadata;
    /// `SpecificationMalformed` for inconsistent numbers.
    pub fn validate(&self) -> Result<(), PunitError> {
        if self.approved_at.is_none() {
            return Err(PunitError::SpecificationNotApproved(format!(
                "{}: approved_at missing",
                self.spec_id
            )));
        }
        match &self.approved_by {
            None => {
                return Err(PunitError::SpecificationNotApproved(format!(
                    "{}: approved_by missing",
                    self.spec_id
                )));
            }
            Some(by) if by.trim().is_empty() => {
                return Err(PunitError::SpecificationNotApproved(format!(
                    "{}: approved_by is empty",
                    self.spec_id
                )));
            }
            Some(_) => {}
        }
        if !(0.0..=1.0).contains(&self.requirements.min_pass_rate) {
            return Err(PunitError::SpecificationMalformed(format!(
                "{}: requirements.min_pass_rate {} outside [0, 1]",
                self.spec_id, self.requirements.min_pass_rate
            )));
        }
        if let Some(threshold) = &self.regression_threshold {
            let basis = &threshold.experimental_basis;
            if basis.samples == 0 {
                return Err(PunitError::SpecificationMalformed(format!(
                    "{}: experimental basis has zero samples",
                    self.spec_id
                )));
            }
            if basis.successes > basis.samples {
                return Err(PunitError::SpecificationMalformed(format!(
                    "{}: experimental basis records {} successes in {} samples",
                    self.spec_id, basis.successes, basis.samples
                )));
            }
        }
        Ok(())
    }

    /// The experimental basis, if this spec carries one.
    pub fn basis(&self) -> Option<&ExperimentalBasis> {
        self.regression_threshold
            .as_ref()
            .map(|t| &t.experimental_basis)
    }
}
