//! Sample scheduler
//!
//! Drives the sequential replication loop: pace, pre-check static token
//! projection, invoke the body, attribute tokens, refresh elapsed, record
//! the outcome, and consult the early-termination evaluator. Panics from the
//! body are captured and treated as assertion-kind sample failures; explicit
//! faults are mediated by the `on_exception` policy.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, warn};

use crate::budget::monitor::ScopeChain;
use crate::budget::recorder::TokenRecorder;
use crate::config::resolver::ResolvedConfig;
use crate::engine::aggregator::{ExceptionDisposition, SampleAggregator};
use crate::engine::evaluator::{evaluate_after_sample, SchedulerDecision};
use crate::engine::pacing::PacingController;
use crate::error::{SampleError, SampleResult};
use crate::types::{SampleOutcome, SampleStatus, TerminationReason, TokenMode};

// ============================================================================
// Sample Context
// ============================================================================

/// Handle passed to the sample body for each invocation.
///
/// Exposes the sample's position and the token-recording capability. A body
/// that records tokens puts the run into dynamic mode.
#[derive(Debug)]
pub struct SampleContext<'a> {
    index: u32,
    samples: u32,
    recorder: &'a mut TokenRecorder,
}

impl SampleContext<'_> {
    /// 1-based index of the executing sample
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Total configured replications
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Report tokens consumed by this sample; may be called repeatedly.
    pub fn record_tokens(&mut self, delta: u64) {
        self.recorder.record(delta);
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Everything the scheduler learned from one run.
#[derive(Debug)]
pub struct SchedulerOutcome {
    pub reason: TerminationReason,
    pub aggregator: SampleAggregator,
    pub token_mode: TokenMode,
    /// Dynamic recording overrode a configured static charge
    pub token_mode_conflict: bool,
    pub elapsed_ms: u64,
    pub tokens_consumed: u64,
}

/// Execute up to `config.samples` replications of `body` under the effective
/// threshold, consulting the evaluator after each sample.
pub fn run_samples<F>(
    config: &ResolvedConfig,
    effective_min_pass_rate: f64,
    scopes: &mut ScopeChain,
    mut body: F,
) -> SchedulerOutcome
where
    F: FnMut(&mut SampleContext<'_>) -> SampleResult,
{
    let total = config.samples;
    let mut aggregator = SampleAggregator::new(config.max_example_failures);
    let mut recorder = TokenRecorder::new();
    let mut pacing = PacingController::new(config.pacing.as_ref());
    let mut reason = TerminationReason::Completed;

    for index in 1..=total {
        if let Err(budget_reason) = pacing.wait_for_slot(scopes) {
            reason = budget_reason;
            break;
        }

        // Static mode projects the fixed charge before the sample runs;
        // dynamic mode settles up afterwards and may overshoot on the last
        // sample (documented contract)
        let projected = if recorder.was_used() {
            0
        } else {
            config.token_charge
        };
        if let Some(budget_reason) = scopes.first_exhausted(projected) {
            reason = budget_reason;
            break;
        }

        recorder.reset_for_next_sample();
        let sample_start = Instant::now();
        let invocation = {
            let mut ctx = SampleContext {
                index,
                samples: total,
                recorder: &mut recorder,
            };
            catch_unwind(AssertUnwindSafe(|| body(&mut ctx)))
        };
        let duration_ms = sample_start.elapsed().as_millis() as u64;

        let tokens = if recorder.was_used() {
            recorder.current_sample_tokens()
        } else {
            config.token_charge
        };
        scopes.add_tokens(tokens);
        scopes.refresh_elapsed();

        let outcome = classify(invocation, index, tokens, duration_ms);
        debug!(
            test = %config.test_name,
            sample = outcome.index,
            status = %outcome.status,
            tokens = outcome.tokens_consumed,
            duration_ms = outcome.duration_ms,
            "sample complete"
        );

        match outcome.status {
            SampleStatus::Pass => aggregator.record_pass(),
            SampleStatus::Fail => {
                aggregator.record_failure(outcome.failure_message.unwrap_or_default());
            }
            SampleStatus::Exception => {
                let message = outcome.failure_message.unwrap_or_default();
                warn!(test = %config.test_name, sample = index, %message, "sample fault");
                let disposition = aggregator.record_exception(message, config.on_exception);
                if disposition == ExceptionDisposition::Abort {
                    reason = TerminationReason::AbortedByException;
                    break;
                }
            }
        }

        // Early termination only; a run that reaches its final sample
        // reports COMPLETED and lets the verdict compare rates
        if index < total {
            let next_projected = if recorder.was_used() {
                0
            } else {
                config.token_charge
            };
            match evaluate_after_sample(
                &aggregator,
                total,
                effective_min_pass_rate,
                scopes,
                next_projected,
            ) {
                SchedulerDecision::Continue => {}
                SchedulerDecision::Terminate(term) => {
                    reason = term;
                    break;
                }
            }
        }
    }

    scopes.refresh_elapsed();
    let (token_mode, token_mode_conflict) = recorder.resolve_mode(config.token_charge);

    SchedulerOutcome {
        reason,
        aggregator,
        token_mode,
        token_mode_conflict,
        elapsed_ms: scopes.method.elapsed_ms(),
        tokens_consumed: scopes.method.tokens_consumed(),
    }
}

/// Map an invocation result (including a captured panic) to a sample outcome.
fn classify(
    invocation: Result<SampleResult, Box<dyn std::any::Any + Send>>,
    index: u32,
    tokens_consumed: u64,
    duration_ms: u64,
) -> SampleOutcome {
    let (status, failure_message) = match invocation {
        Ok(Ok(())) => (SampleStatus::Pass, None),
        Ok(Err(SampleError::Assertion(message))) => (SampleStatus::Fail, Some(message)),
        Ok(Err(SampleError::Fault(message))) => (SampleStatus::Exception, Some(message)),
        Err(payload) => (SampleStatus::Fail, Some(panic_message(payload.as_ref()))),
    };
    SampleOutcome {
        index,
        status,
        failure_message,
        tokens_consumed,
        duration_ms,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "sample panicked".to_string()
    }
}
