//! Framework default values for probabilistic test configuration.
//!
//! Centralises the defaults applied when neither flag, environment, nor
//! declaration supplies a value.

/// Replications of the test body when none are declared.
pub const DEFAULT_SAMPLES: u32 = 1;

/// Required pass rate when none is declared. Every sample must pass.
pub const DEFAULT_MIN_PASS_RATE: f64 = 1.0;

/// Confidence level for threshold derivation and reported intervals.
pub const DEFAULT_THRESHOLD_CONFIDENCE: f64 = 0.95;

/// Process-level sample-count multiplier.
pub const DEFAULT_SAMPLES_MULTIPLIER: f64 = 1.0;

/// Captured example-failure messages kept per test.
pub const DEFAULT_MAX_EXAMPLE_FAILURES: usize = 5;

/// Whether the full statistical explanation is rendered with the report.
pub const DEFAULT_STATS_TRANSPARENT: bool = true;
