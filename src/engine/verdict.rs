//! Verdict decision
//!
//! Folds the aggregated counters, the effective threshold, and the
//! termination reason into the final PASS/FAIL. Budget exhaustion defers to
//! the configured policy; statistical short-circuits decide directly.

use tracing::info;

use crate::config::resolver::ResolvedConfig;
use crate::engine::aggregator::SampleAggregator;
use crate::types::{BudgetExhaustedPolicy, TerminationReason, Verdict};

/// Decide the verdict for a completed (or short-circuited) run.
pub fn decide(
    config: &ResolvedConfig,
    effective_min_pass_rate: f64,
    aggregator: &SampleAggregator,
    reason: TerminationReason,
    elapsed_ms: u64,
    tokens_consumed: u64,
    feasibility_note: Option<String>,
) -> Verdict {
    let observed_rate = aggregator.observed_rate();
    let meets_threshold = observed_rate >= effective_min_pass_rate;

    let passed = match reason {
        TerminationReason::SuccessGuaranteed => true,
        TerminationReason::Impossibility
        | TerminationReason::AbortedByException
        | TerminationReason::InfeasibleThreshold => false,
        TerminationReason::Completed => meets_threshold,
        _ if reason.is_budget() => match config.on_budget_exhausted {
            BudgetExhaustedPolicy::Fail => false,
            // Partial evaluation rates the samples that did run; with zero
            // executed samples the observed rate is 0.0 and the test fails
            // whenever the threshold is positive
            BudgetExhaustedPolicy::EvaluatePartial => meets_threshold,
        },
        _ => meets_threshold,
    };

    let verdict = Verdict {
        passed,
        observed_rate,
        required_rate: effective_min_pass_rate,
        termination_reason: reason,
        samples_executed: aggregator.samples_executed(),
        elapsed_ms,
        tokens_consumed,
        feasibility_note,
    };

    info!(
        test = %config.test_name,
        verdict = verdict.outcome_word(),
        observed_rate = %format!("{observed_rate:.4}"),
        required_rate = %format!("{effective_min_pass_rate:.4}"),
        reason = %reason,
        samples_executed = verdict.samples_executed,
        "probabilistic verdict"
    );

    verdict
}

/// Compose the failure message surfaced to the host, with captured example
/// failures appended.
pub fn failure_message(verdict: &Verdict, aggregator: &SampleAggregator, test_name: &str) -> String {
    let mut message = format!(
        "{test_name}: observed pass rate {:.4} over {} samples did not satisfy required rate {:.4} ({})",
        verdict.observed_rate,
        verdict.samples_executed,
        verdict.required_rate,
        verdict.termination_reason
    );
    if let Some(note) = &verdict.feasibility_note {
        message.push_str("\n  ");
        message.push_str(note);
    }
    for (i, example) in aggregator.example_failures().enumerate() {
        message.push_str(&format!("\n  example failure {}: {example}", i + 1));
    }
    message
}
