//! Sample pacing
//!
//! Converts declared rate limits into a schedule of earliest start times.
//! The effective inter-sample delay is the strictest of the active
//! constraints; waits are sliced so a time budget expiring mid-sleep exits
//! with the budget reason instead of oversleeping.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::budget::monitor::ScopeChain;
use crate::types::{PacingSpec, TerminationReason};

/// Maximum single sleep slice; budgets are re-checked between slices.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Converts rate limits into earliest-start times for successive samples.
#[derive(Debug)]
pub struct PacingController {
    delay: Duration,
    last_start: Option<Instant>,
}

impl PacingController {
    pub fn new(spec: Option<&PacingSpec>) -> Self {
        let delay_ms = spec.map_or(0, effective_delay_ms);
        if delay_ms > 0 {
            debug!(delay_ms, "sample pacing active");
        }
        Self {
            delay: Duration::from_millis(delay_ms),
            last_start: None,
        }
    }

    pub fn effective_delay(&self) -> Duration {
        self.delay
    }

    /// Block until the next sample may start, then stamp its start time.
    ///
    /// # Errors
    /// The first exhausted time budget, when one expires during the wait.
    pub fn wait_for_slot(&mut self, scopes: &mut ScopeChain) -> Result<(), TerminationReason> {
        if let (Some(last), false) = (self.last_start, self.delay.is_zero()) {
            let earliest = last + self.delay;
            loop {
                scopes.refresh_elapsed();
                if let Some(reason) = scopes.first_time_exhausted() {
                    return Err(reason);
                }
                let now = Instant::now();
                if now >= earliest {
                    break;
                }
                std::thread::sleep((earliest - now).min(SLEEP_SLICE));
            }
        }
        self.last_start = Some(Instant::now());
        Ok(())
    }
}

/// The strictest delay implied by the declared limits, in milliseconds.
///
/// `max(1000/per_second, 60000/per_minute, 3600000/per_hour,
/// min_ms_per_sample)`; inactive constraints contribute nothing.
pub fn effective_delay_ms(spec: &PacingSpec) -> u64 {
    let mut delay = 0.0f64;
    if let Some(rps) = spec.max_per_second {
        delay = delay.max(1000.0 / rps);
    }
    if let Some(rpm) = spec.max_per_minute {
        delay = delay.max(60_000.0 / rpm);
    }
    if let Some(rph) = spec.max_per_hour {
        delay = delay.max(3_600_000.0 / rph);
    }
    let from_rates = delay.ceil() as u64;
    from_rates.max(spec.min_ms_per_sample.unwrap_or(0))
}
