//! Statistical explanation of a probabilistic verdict
//!
//! The machine-readable counterpart of the console report: a nested record
//! with every numeric value pre-computed by the builder. Renderers are pure
//! formatters over this record and perform no arithmetic.

pub mod builder;
pub mod render;

use serde::{Deserialize, Serialize};

pub use builder::{build, BaselineData, ExplanationInputs};
pub use render::{render, SymbolSet};

/// The hypothesis pair the run evaluates, framed per threshold origin and
/// test intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypothesisStatement {
    /// Null hypothesis text
    pub null: String,
    /// Alternative hypothesis text
    pub alternative: String,
    /// Description of the statistical test applied
    pub test_type: String,
}

/// The counts actually observed by the run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObservedData {
    pub samples: u32,
    pub successes: u32,
    pub observed_rate: f64,
}

/// The experimental baseline a derived threshold traces back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineReference {
    /// Where the baseline came from (spec id, experiment summary, ...)
    pub source: String,
    #[serde(default)]
    pub generated_at: Option<String>,
    pub samples: u64,
    pub successes: u64,
    pub observed_rate: f64,
    /// One-sentence account of how the threshold was derived
    pub derivation: String,
    pub threshold: f64,
}

/// Pre-computed inference values for the observed data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatisticalInference {
    pub standard_error: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub confidence_level: f64,
    /// One-sided z against the required rate; absent for degenerate nulls
    #[serde(default)]
    pub z_statistic: Option<f64>,
    /// Lower-tail p-value under the null; absent with the z-statistic
    #[serde(default)]
    pub p_value: Option<f64>,
}

/// The verdict in technical and plain language, with ordered caveats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictInterpretation {
    pub passed: bool,
    pub technical: String,
    pub plain_english: String,
    pub caveats: Vec<String>,
}

/// Where the required rate came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub threshold_origin: String,
    #[serde(default)]
    pub contract_ref: Option<String>,
}

/// A covariate that differed between the baseline experiment and this run.
/// Advisory only; misalignments never change the verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovariateMisalignment {
    pub key: String,
    pub baseline: String,
    pub test: String,
}

/// The full structured explanation for one probabilistic test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticalExplanation {
    pub test_name: String,
    pub hypothesis: HypothesisStatement,
    pub observed: ObservedData,
    #[serde(default)]
    pub baseline: Option<BaselineReference>,
    pub inference: StatisticalInference,
    pub verdict: VerdictInterpretation,
    pub provenance: Provenance,
}
