//! Probabilistic test engine
//!
//! The self-contained entry point a host integration wraps:
//! [`run_probabilistic_test`] resolves configuration, settles the effective
//! threshold (inline or spec-derived), gates infeasible verification runs,
//! drives the sample loop, and returns the verdict with its explanation and
//! report.
//!
//! ## Pipeline
//!
//! resolver -> (scheduler <-> aggregator <-> evaluator <-> monitors <->
//! recorder) -> verdict decider -> explanation builder -> report

pub mod aggregator;
pub mod evaluator;
pub mod pacing;
pub mod scheduler;
pub mod verdict;

use std::sync::Arc;

use tracing::{info, warn};

use crate::budget::monitor::{BudgetLimits, ScopeChain, SharedMonitor};
use crate::config::resolver::{self, ResolvedConfig};
use crate::config::{RuntimeFlags, TestDeclaration, ValidationWarning};
use crate::engine::aggregator::SampleAggregator;
use crate::error::{PunitError, SampleResult};
use crate::explain::{self, BaselineData, CovariateMisalignment, StatisticalExplanation};
use crate::report::ReportEntries;
use crate::spec::registry::SpecRegistry;
use crate::spec::threshold::{self, DerivationPolicy};
use crate::stats;
use crate::types::{TerminationReason, TestIntent, ThresholdOrigin, TokenMode, Verdict};

pub use scheduler::{run_samples, SampleContext, SchedulerOutcome};

// ============================================================================
// Engine Context
// ============================================================================

/// Collaborators and shared scopes injected by the host integration.
#[derive(Debug, Default)]
pub struct EngineContext<'a> {
    /// Registry for resolving spec references; tests without a spec
    /// reference never touch it
    pub registry: Option<&'a SpecRegistry>,
    /// Shared class-scope monitor, when the host groups tests into classes
    pub class_monitor: Option<Arc<SharedMonitor>>,
    /// Shared suite-scope monitor; see `budget::process_suite_monitor`
    pub suite_monitor: Option<Arc<SharedMonitor>>,
    /// How spec-derived thresholds are computed
    pub derivation_policy: DerivationPolicy,
    /// Covariates known to differ from the baseline experiment (advisory)
    pub misalignments: Vec<CovariateMisalignment>,
}

/// Everything a finished test hands back to the host.
#[derive(Debug)]
pub struct TestOutcome {
    pub verdict: Verdict,
    pub explanation: StatisticalExplanation,
    pub report: ReportEntries,
    /// Console rendering of the explanation; present unless
    /// `punit.stats.transparent` is off
    pub rendered: Option<String>,
    /// Composed failure message (with example failures) when the verdict is
    /// FAIL; the host surfaces this as its assertion error
    pub failure: Option<String>,
    /// Non-fatal configuration findings
    pub warnings: Vec<ValidationWarning>,
}

/// The effective threshold after spec resolution.
struct EffectiveThreshold {
    min_pass_rate: f64,
    origin: ThresholdOrigin,
    baseline: Option<BaselineData>,
}

// ============================================================================
// Entry Point
// ============================================================================

/// Run one probabilistic test: resolve, derive, sample, decide, explain.
///
/// # Errors
/// Discovery-time failures (`InvalidConfiguration`, spec resolution errors,
/// `SampleSizeMismatch`) surface here before any sample runs. A failing
/// verdict is not an error; it is reported through `TestOutcome`.
pub fn run_probabilistic_test<F>(
    declaration: &TestDeclaration,
    flags: &RuntimeFlags,
    context: &EngineContext<'_>,
    body: F,
) -> Result<TestOutcome, PunitError>
where
    F: FnMut(&mut SampleContext<'_>) -> SampleResult,
{
    let resolution = resolver::resolve(declaration, flags)?;
    run_resolved(resolution.config, resolution.warnings, context, body)
}

/// Like [`run_probabilistic_test`] but for a pre-resolved configuration.
pub fn run_resolved<F>(
    config: ResolvedConfig,
    warnings: Vec<ValidationWarning>,
    context: &EngineContext<'_>,
    body: F,
) -> Result<TestOutcome, PunitError>
where
    F: FnMut(&mut SampleContext<'_>) -> SampleResult,
{
    let effective = settle_threshold(&config, context)?;

    // A verification run against a normative target must be big enough for
    // a flawless result to mean something; otherwise fail fast
    if config.intent == TestIntent::Verification && effective.origin.is_normative() {
        let sizing = stats::evaluate_feasibility(
            u64::from(config.samples),
            effective.min_pass_rate,
            config.threshold_confidence,
        )?;
        if !sizing.feasible {
            let note = match sizing.minimum_samples {
                Some(minimum) => format!(
                    "Required rate {:.4} cannot be evidenced by {} samples at {:.0}% confidence; need at least {minimum}.",
                    effective.min_pass_rate,
                    config.samples,
                    config.threshold_confidence * 100.0
                ),
                None => format!(
                    "Required rate {:.4} cannot be evidenced at any finite sample count.",
                    effective.min_pass_rate
                ),
            };
            warn!(test = %config.test_name, %note, "infeasible verification threshold");
            return Ok(infeasible_outcome(&config, &effective, context, note, warnings));
        }
    }

    let mut scopes = ScopeChain::new(
        BudgetLimits::new(config.time_budget_ms, config.token_budget),
        context.class_monitor.clone(),
        context.suite_monitor.clone(),
    );

    info!(
        test = %config.test_name,
        samples = config.samples,
        required_rate = %format!("{:.4}", effective.min_pass_rate),
        origin = %effective.origin,
        "starting probabilistic test"
    );

    let outcome = run_samples(&config, effective.min_pass_rate, &mut scopes, body);
    let verdict = verdict::decide(
        &config,
        effective.min_pass_rate,
        &outcome.aggregator,
        outcome.reason,
        outcome.elapsed_ms,
        outcome.tokens_consumed,
        None,
    );

    Ok(compose_outcome(
        &config,
        &effective,
        context,
        verdict,
        &outcome.aggregator,
        outcome.token_mode,
        outcome.token_mode_conflict,
        warnings,
    ))
}

// ============================================================================
// Threshold Settlement
// ============================================================================

/// Resolve the effective threshold: spec-derived when a reference is
/// declared, inline otherwise.
fn settle_threshold(
    config: &ResolvedConfig,
    context: &EngineContext<'_>,
) -> Result<EffectiveThreshold, PunitError> {
    let Some(spec_ref) = &config.spec_ref else {
        return Ok(EffectiveThreshold {
            min_pass_rate: config.min_pass_rate,
            origin: config.threshold_origin,
            baseline: None,
        });
    };

    let registry = context.registry.ok_or_else(|| {
        PunitError::InvalidConfiguration(format!(
            "test references spec {spec_ref} but no spec registry is configured"
        ))
    })?;
    let spec = registry.load(spec_ref)?;

    // A spec-backed threshold with no declared origin is empirical by nature
    let origin = if config.threshold_origin == ThresholdOrigin::Unspecified {
        ThresholdOrigin::Empirical
    } else {
        config.threshold_origin
    };

    match spec.basis() {
        Some(basis) => {
            let derived = threshold::derive(
                basis,
                spec.requirements.min_pass_rate,
                config.samples,
                config.threshold_confidence,
                context.derivation_policy,
            )?;
            Ok(EffectiveThreshold {
                min_pass_rate: derived.min_pass_rate,
                origin,
                baseline: Some(BaselineData {
                    source: format!("spec {spec_ref}"),
                    generated_at: spec.approved_at.map(|t| t.to_rfc3339()),
                    samples: basis.samples,
                    successes: basis.successes,
                    derivation: threshold::derivation_text(&derived),
                }),
            })
        }
        None => Ok(EffectiveThreshold {
            min_pass_rate: spec.requirements.min_pass_rate,
            origin,
            baseline: Some(BaselineData {
                source: format!("spec {spec_ref}"),
                generated_at: spec.approved_at.map(|t| t.to_rfc3339()),
                samples: 0,
                successes: 0,
                derivation: "requirements.min_pass_rate used verbatim (no experimental basis)"
                    .to_string(),
            }),
        }),
    }
}

// ============================================================================
// Outcome Composition
// ============================================================================

fn infeasible_outcome(
    config: &ResolvedConfig,
    effective: &EffectiveThreshold,
    context: &EngineContext<'_>,
    note: String,
    warnings: Vec<ValidationWarning>,
) -> TestOutcome {
    let aggregator = SampleAggregator::new(config.max_example_failures);
    let verdict = verdict::decide(
        config,
        effective.min_pass_rate,
        &aggregator,
        TerminationReason::InfeasibleThreshold,
        0,
        0,
        Some(note),
    );
    compose_outcome(
        config,
        effective,
        context,
        verdict,
        &aggregator,
        TokenMode::None,
        false,
        warnings,
    )
}

#[allow(clippy::too_many_arguments)]
fn compose_outcome(
    config: &ResolvedConfig,
    effective: &EffectiveThreshold,
    context: &EngineContext<'_>,
    verdict: Verdict,
    aggregator: &SampleAggregator,
    token_mode: TokenMode,
    token_mode_conflict: bool,
    mut warnings: Vec<ValidationWarning>,
) -> TestOutcome {
    if token_mode_conflict {
        warnings.push(ValidationWarning::new(
            "token_charge",
            "sample body records tokens dynamically; the configured static charge was ignored",
        ));
    }

    let explanation = explain::build(&explain::ExplanationInputs {
        test_name: &config.test_name,
        samples_executed: verdict.samples_executed,
        successes: aggregator.successes(),
        threshold: effective.min_pass_rate,
        passed: verdict.passed,
        confidence_level: config.threshold_confidence,
        origin: effective.origin,
        intent: config.intent,
        contract_ref: config.contract_ref.as_deref(),
        baseline: effective.baseline.clone(),
        misalignments: &context.misalignments,
        feasibility_note: verdict.feasibility_note.as_deref(),
    });

    let report = ReportEntries::assemble(
        config,
        &verdict,
        &explanation,
        token_mode,
        aggregator.failures(),
    );
    report.emit();

    let failure = (!verdict.passed)
        .then(|| verdict::failure_message(&verdict, aggregator, &config.test_name));
    let rendered = config
        .stats_transparent
        .then(|| explain::render(&explanation, explain::SymbolSet::detect()));

    TestOutcome {
        verdict,
        explanation,
        report,
        rendered,
        failure,
        warnings,
    }
}
