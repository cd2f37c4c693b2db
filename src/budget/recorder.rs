//! Per-sample token recorder
//!
//! The scheduler hands the sample body a recording handle; any deltas the
//! body reports are summed within the sample and pushed into the active
//! monitors at the sample boundary. A body that records at least once puts
//! the whole run into dynamic mode, which beats a configured static charge
//! (with a warning surfaced in the report).

use tracing::warn;

use crate::types::TokenMode;

/// Accumulates token consumption for the sample currently executing.
#[derive(Debug, Default)]
pub struct TokenRecorder {
    current_sample: u64,
    total: u64,
    used: bool,
}

impl TokenRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record consumed tokens; summable within one sample.
    pub fn record(&mut self, delta: u64) {
        self.current_sample = self.current_sample.saturating_add(delta);
        self.total = self.total.saturating_add(delta);
        self.used = true;
    }

    /// Tokens recorded by the sample currently executing
    pub fn current_sample_tokens(&self) -> u64 {
        self.current_sample
    }

    /// Tokens recorded across the whole run so far
    pub fn total_tokens(&self) -> u64 {
        self.total
    }

    /// Whether the body has recorded at least once this run
    pub fn was_used(&self) -> bool {
        self.used
    }

    /// Clear the per-sample accumulator at the sample boundary.
    pub fn reset_for_next_sample(&mut self) {
        self.current_sample = 0;
    }

    /// Resolve the effective token mode for the run.
    ///
    /// Dynamic recording wins over a configured static charge; the conflict
    /// is logged once and reported to the caller so it can reach the test
    /// report.
    pub fn resolve_mode(&self, static_charge: u64) -> (TokenMode, bool) {
        match (self.used, static_charge > 0) {
            (true, true) => {
                warn!(
                    static_charge,
                    "sample body records tokens dynamically; ignoring configured static charge"
                );
                (TokenMode::Dynamic, true)
            }
            (true, false) => (TokenMode::Dynamic, false),
            (false, true) => (TokenMode::Static, false),
            (false, false) => (TokenMode::None, false),
        }
    }
}
