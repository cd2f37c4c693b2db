//! Shared data structures for the probabilistic test engine
//!
//! This module defines the core types flowing through the sampling pipeline:
//! - Sample outcomes recorded by the scheduler
//! - Termination reasons emitted by the early-termination evaluator
//! - The final `Verdict` produced by the verdict decider
//! - Declaration-level enums (threshold origin, intent, budget policies)

use serde::{Deserialize, Serialize};

// ============================================================================
// Sample Outcomes
// ============================================================================

/// Status of a single sample invocation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SampleStatus {
    /// Sample body completed without failure
    Pass,
    /// Assertion-kind failure (including panics captured from the body)
    Fail,
    /// Non-assertion fault, mediated by the `on_exception` policy
    Exception,
}

impl std::fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleStatus::Pass => write!(f, "PASS"),
            SampleStatus::Fail => write!(f, "FAIL"),
            SampleStatus::Exception => write!(f, "EXCEPTION"),
        }
    }
}

/// Record of one sample invocation. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleOutcome {
    /// 1-based sample index
    pub index: u32,
    pub status: SampleStatus,
    /// Failure or fault message, if the sample did not pass
    pub failure_message: Option<String>,
    /// Tokens attributed to this sample (static charge or dynamic recording)
    pub tokens_consumed: u64,
    /// Wall-clock duration of the sample body
    pub duration_ms: u64,
}

// ============================================================================
// Termination Reasons
// ============================================================================

/// Why sampling stopped.
///
/// Exactly one reason is attached to every verdict. Statistical
/// short-circuits (`SuccessGuaranteed`, `Impossibility`) take priority over
/// budget exhaustion; budget scopes are checked outermost-first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TerminationReason {
    /// All configured samples executed
    Completed,
    /// Remaining samples cannot reach the required success count
    Impossibility,
    /// Required success count already reached
    SuccessGuaranteed,
    MethodTimeBudget,
    MethodTokenBudget,
    ClassTimeBudget,
    ClassTokenBudget,
    SuiteTimeBudget,
    SuiteTokenBudget,
    /// A non-assertion fault with `on_exception = AbortTest`
    AbortedByException,
    /// The threshold cannot be evidenced at this sample size
    InfeasibleThreshold,
}

impl TerminationReason {
    /// Whether this reason is a budget exhaustion (any scope, either axis)
    pub fn is_budget(&self) -> bool {
        matches!(
            self,
            TerminationReason::MethodTimeBudget
                | TerminationReason::MethodTokenBudget
                | TerminationReason::ClassTimeBudget
                | TerminationReason::ClassTokenBudget
                | TerminationReason::SuiteTimeBudget
                | TerminationReason::SuiteTokenBudget
        )
    }

    /// The budget scope for budget reasons, `None` otherwise
    pub fn budget_scope(&self) -> Option<BudgetScope> {
        match self {
            TerminationReason::MethodTimeBudget | TerminationReason::MethodTokenBudget => {
                Some(BudgetScope::Method)
            }
            TerminationReason::ClassTimeBudget | TerminationReason::ClassTokenBudget => {
                Some(BudgetScope::Class)
            }
            TerminationReason::SuiteTimeBudget | TerminationReason::SuiteTokenBudget => {
                Some(BudgetScope::Suite)
            }
            _ => None,
        }
    }

    /// Stable uppercase code for the report stream
    pub fn code(&self) -> &'static str {
        match self {
            TerminationReason::Completed => "COMPLETED",
            TerminationReason::Impossibility => "IMPOSSIBILITY",
            TerminationReason::SuccessGuaranteed => "SUCCESS_GUARANTEED",
            TerminationReason::MethodTimeBudget => "METHOD_TIME_BUDGET",
            TerminationReason::MethodTokenBudget => "METHOD_TOKEN_BUDGET",
            TerminationReason::ClassTimeBudget => "CLASS_TIME_BUDGET",
            TerminationReason::ClassTokenBudget => "CLASS_TOKEN_BUDGET",
            TerminationReason::SuiteTimeBudget => "SUITE_TIME_BUDGET",
            TerminationReason::SuiteTokenBudget => "SUITE_TOKEN_BUDGET",
            TerminationReason::AbortedByException => "ABORTED_BY_EXCEPTION",
            TerminationReason::InfeasibleThreshold => "INFEASIBLE_THRESHOLD",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Budget Scopes & Policies
// ============================================================================

/// Nesting level of a budget monitor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BudgetScope {
    Method,
    Class,
    Suite,
}

impl BudgetScope {
    pub fn code(&self) -> &'static str {
        match self {
            BudgetScope::Method => "METHOD",
            BudgetScope::Class => "CLASS",
            BudgetScope::Suite => "SUITE",
        }
    }

    /// Termination reason for time exhaustion at this scope
    pub fn time_budget_reason(&self) -> TerminationReason {
        match self {
            BudgetScope::Method => TerminationReason::MethodTimeBudget,
            BudgetScope::Class => TerminationReason::ClassTimeBudget,
            BudgetScope::Suite => TerminationReason::SuiteTimeBudget,
        }
    }

    /// Termination reason for token exhaustion at this scope
    pub fn token_budget_reason(&self) -> TerminationReason {
        match self {
            BudgetScope::Method => TerminationReason::MethodTokenBudget,
            BudgetScope::Class => TerminationReason::ClassTokenBudget,
            BudgetScope::Suite => TerminationReason::SuiteTokenBudget,
        }
    }
}

impl std::fmt::Display for BudgetScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// What to do when a budget exhausts mid-test
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BudgetExhaustedPolicy {
    /// Budget exhaustion fails the test regardless of observed rate
    #[default]
    Fail,
    /// Evaluate the observed rate over the samples actually completed
    EvaluatePartial,
}

/// What to do when the sample body faults (non-assertion error)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ExceptionPolicy {
    /// Record the fault as a sample failure and continue
    #[default]
    FailSample,
    /// Stop sampling immediately and fail the test
    AbortTest,
}

/// How tokens were attributed during the run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TokenMode {
    /// Fixed per-sample charge from the configuration
    Static,
    /// The sample body recorded consumption itself
    Dynamic,
    /// No token accounting in effect
    #[default]
    None,
}

impl TokenMode {
    pub fn code(&self) -> &'static str {
        match self {
            TokenMode::Static => "STATIC",
            TokenMode::Dynamic => "DYNAMIC",
            TokenMode::None => "NONE",
        }
    }
}

impl std::fmt::Display for TokenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Threshold Provenance
// ============================================================================

/// Declared source of the required pass rate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ThresholdOrigin {
    /// Contractual service-level agreement
    Sla,
    /// Internal service-level objective
    Slo,
    /// Organizational policy requirement
    Policy,
    /// Derived from an observed experimental baseline
    Empirical,
    #[default]
    Unspecified,
}

impl ThresholdOrigin {
    /// Normative origins carry compliance weight in hypothesis framing
    pub fn is_normative(&self) -> bool {
        matches!(
            self,
            ThresholdOrigin::Sla | ThresholdOrigin::Slo | ThresholdOrigin::Policy
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            ThresholdOrigin::Sla => "SLA",
            ThresholdOrigin::Slo => "SLO",
            ThresholdOrigin::Policy => "POLICY",
            ThresholdOrigin::Empirical => "EMPIRICAL",
            ThresholdOrigin::Unspecified => "UNSPECIFIED",
        }
    }

    /// Parse from string (for flags/config)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sla" => Some(ThresholdOrigin::Sla),
            "slo" => Some(ThresholdOrigin::Slo),
            "policy" => Some(ThresholdOrigin::Policy),
            "empirical" => Some(ThresholdOrigin::Empirical),
            "unspecified" => Some(ThresholdOrigin::Unspecified),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThresholdOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Declared purpose of a probabilistic test
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TestIntent {
    /// The PASS/FAIL is evidential - the run is sized to support the claim
    #[default]
    Verification,
    /// Sentinel check with softened, non-compliance language
    Smoke,
}

impl TestIntent {
    pub fn code(&self) -> &'static str {
        match self {
            TestIntent::Verification => "VERIFICATION",
            TestIntent::Smoke => "SMOKE",
        }
    }
}

impl std::fmt::Display for TestIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Spec Reference & Pacing
// ============================================================================

/// Reference to an approved specification by use case and version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SpecRef {
    pub use_case_id: String,
    pub version: String,
}

impl SpecRef {
    pub fn new(use_case_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            use_case_id: use_case_id.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for SpecRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{}", self.use_case_id, self.version)
    }
}

/// Declared rate limits for sample pacing.
///
/// The effective inter-sample delay is the maximum of the delays implied by
/// each active rate and `min_ms_per_sample`. `max_concurrent` is carried for
/// forward compatibility; sampling is sequential, so it has no effect.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PacingSpec {
    pub max_per_second: Option<f64>,
    pub max_per_minute: Option<f64>,
    pub max_per_hour: Option<f64>,
    pub max_concurrent: Option<u32>,
    pub min_ms_per_sample: Option<u64>,
}

impl PacingSpec {
    /// Whether any pacing constraint is active
    pub fn is_active(&self) -> bool {
        self.max_per_second.is_some()
            || self.max_per_minute.is_some()
            || self.max_per_hour.is_some()
            || self.min_ms_per_sample.is_some()
    }
}

// ============================================================================
// Verdict
// ============================================================================

/// Final decision for one probabilistic test invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    /// successes / samples_executed (0.0 when nothing executed)
    pub observed_rate: f64,
    /// Effective threshold after spec derivation, in [0, 1]
    pub required_rate: f64,
    pub termination_reason: TerminationReason,
    pub samples_executed: u32,
    pub elapsed_ms: u64,
    pub tokens_consumed: u64,
    /// Present when the threshold was found infeasible at this sample size
    pub feasibility_note: Option<String>,
}

impl Verdict {
    pub fn outcome_word(&self) -> &'static str {
        if self.passed {
            "PASS"
        } else {
            "FAIL"
        }
    }
}
