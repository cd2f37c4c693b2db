//! Per-test declaration
//!
//! The values a test author attaches to a probabilistic test. Serde-derived
//! with per-field defaults so hosts can embed declarations in TOML or JSON
//! alongside their own test metadata.

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::types::{
    BudgetExhaustedPolicy, ExceptionPolicy, PacingSpec, SpecRef, TestIntent, ThresholdOrigin,
};

/// Declaration-level configuration for one probabilistic test.
///
/// All fields are optional in serialized form; missing values fall back to
/// framework defaults during resolution (after flags and environment are
/// consulted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDeclaration {
    /// Name used in reports and explanations
    pub test_name: String,

    /// Number of replications of the test body
    #[serde(default = "default_samples")]
    pub samples: u32,

    /// Required pass rate in [0, 1]
    #[serde(default = "default_min_pass_rate")]
    pub min_pass_rate: f64,

    /// Approved specification supplying the threshold basis, if any
    #[serde(default)]
    pub spec_ref: Option<SpecRef>,

    /// Confidence level for derivation and reported intervals, in (0, 1)
    #[serde(default = "default_confidence")]
    pub threshold_confidence: f64,

    /// Declared source of the required rate
    #[serde(default)]
    pub threshold_origin: ThresholdOrigin,

    /// Free-text contract or ticket reference for provenance
    #[serde(default)]
    pub contract_ref: Option<String>,

    /// Declared purpose of the test
    #[serde(default)]
    pub intent: TestIntent,

    /// Method-scope wall-clock budget in ms; 0 = unlimited
    #[serde(default)]
    pub time_budget_ms: u64,

    /// Static per-sample token charge; 0 = none
    #[serde(default)]
    pub token_charge: u64,

    /// Method-scope token budget; 0 = unlimited
    #[serde(default)]
    pub token_budget: u64,

    /// Verdict policy when a budget exhausts mid-run
    #[serde(default)]
    pub on_budget_exhausted: BudgetExhaustedPolicy,

    /// Disposition of non-assertion faults in the sample body
    #[serde(default)]
    pub on_exception: ExceptionPolicy,

    /// Captured example-failure messages kept for the report
    #[serde(default = "default_max_example_failures")]
    pub max_example_failures: usize,

    /// Declared rate limits for sample pacing
    #[serde(default)]
    pub pacing: Option<PacingSpec>,
}

fn default_samples() -> u32 {
    defaults::DEFAULT_SAMPLES
}

fn default_min_pass_rate() -> f64 {
    defaults::DEFAULT_MIN_PASS_RATE
}

fn default_confidence() -> f64 {
    defaults::DEFAULT_THRESHOLD_CONFIDENCE
}

fn default_max_example_failures() -> usize {
    defaults::DEFAULT_MAX_EXAMPLE_FAILURES
}

impl TestDeclaration {
    /// A declaration with framework defaults for everything but the name.
    pub fn named(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            samples: defaults::DEFAULT_SAMPLES,
            min_pass_rate: defaults::DEFAULT_MIN_PASS_RATE,
            spec_ref: None,
            threshold_confidence: defaults::DEFAULT_THRESHOLD_CONFIDENCE,
            threshold_origin: ThresholdOrigin::default(),
            contract_ref: None,
            intent: TestIntent::default(),
            time_budget_ms: 0,
            token_charge: 0,
            token_budget: 0,
            on_budget_exhausted: BudgetExhaustedPolicy::default(),
            on_exception: ExceptionPolicy::default(),
            max_example_failures: defaults::DEFAULT_MAX_EXAMPLE_FAILURES,
            pacing: None,
        }
    }

    /// Builder-style sample count
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Builder-style pass-rate threshold
    pub fn with_min_pass_rate(mut self, rate: f64) -> Self {
        self.min_pass_rate = rate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_declaration_carries_framework_defaults() {
        let decl = TestDeclaration::named("extract_totals");
        assert_eq!(decl.samples, 1);
        assert!((decl.min_pass_rate - 1.0).abs() < f64::EPSILON);
        assert!((decl.threshold_confidence - 0.95).abs() < f64::EPSILON);
        assert_eq!(decl.on_budget_exhausted, BudgetExhaustedPolicy::Fail);
        assert_eq!(decl.on_exception, ExceptionPolicy::FailSample);
        assert_eq!(decl.max_example_failures, 5);
    }

    #[test]
    fn deserializes_from_sparse_toml() {
        let decl: TestDeclaration = toml::from_str(
            r#"
test_name = "summarize_call"
samples = 20
min_pass_rate = 0.9

[pacing]
max_per_minute = 30.0
"#,
        )
        .unwrap();
        assert_eq!(decl.samples, 20);
        assert!((decl.min_pass_rate - 0.9).abs() < f64::EPSILON);
        assert_eq!(decl.pacing.unwrap().max_per_minute, Some(30.0));
        assert_eq!(decl.intent, TestIntent::Verification);
    }

    #[test]
    fn builder_helpers_override_defaults() {
        let decl = TestDeclaration::named("t").with_samples(100).with_min_pass_rate(0.95);
        assert_eq!(decl.samples, 100);
        assert!((decl.min_pass_rate - 0.95).abs() < f64::EPSILON);
    }
}
