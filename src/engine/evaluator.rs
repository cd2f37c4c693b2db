//! Early-termination evaluation
//!
//! After each sample the scheduler asks whether the run can stop early.
//! Checks run in fixed order: success guarantee first (so a run that locks
//! in a PASS reports the informative positive reason), mathematical
//! impossibility second, budgets last (statistical short-circuits beat
//! resource short-circuits). Budget scopes are consulted outermost-first
//! inside `ScopeChain::first_exhausted`.

use crate::budget::monitor::ScopeChain;
use crate::engine::aggregator::SampleAggregator;
use crate::types::TerminationReason;

/// Decision returned to the scheduler after each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerDecision {
    Continue,
    Terminate(TerminationReason),
}

/// Successes required to meet `min_pass_rate` over `samples` replications.
///
/// `ceil(samples × rate)`, guarded against floating-point drift so exact
/// products (e.g. 0.1 × 100) don't round up an extra success.
pub fn required_successes(samples: u32, min_pass_rate: f64) -> u32 {
    let exact = f64::from(samples) * min_pass_rate;
    let required = (exact - 1e-9).ceil().max(0.0);
    (required as u32).min(samples)
}

/// Evaluate the run state after a completed sample.
///
/// `projected_tokens` carries the static per-sample charge for the
/// pre-next-sample token projection; dynamic mode passes 0.
pub fn evaluate_after_sample(
    aggregator: &SampleAggregator,
    total_samples: u32,
    min_pass_rate: f64,
    scopes: &ScopeChain,
    projected_tokens: u64,
) -> SchedulerDecision {
    let required = required_successes(total_samples, min_pass_rate);
    let executed = aggregator.samples_executed();
    let successes = aggregator.successes();

    if successes >= required {
        return SchedulerDecision::Terminate(TerminationReason::SuccessGuaranteed);
    }

    let remaining = total_samples.saturating_sub(executed);
    let max_possible = successes.saturating_add(remaining);
    if max_possible < required {
        return SchedulerDecision::Terminate(TerminationReason::Impossibility);
    }

    if let Some(reason) = scopes.first_exhausted(projected_tokens) {
        return SchedulerDecision::Terminate(reason);
    }

    SchedulerDecision::Continue
}
