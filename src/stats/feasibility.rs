//! Verification feasibility sizing
//!
//! A PASS only constitutes statistical evidence of meeting a target rate if
//! the flawless run's Wilson lower bound clears the target. At `k = n` the
//! bound reduces to `n / (n + z²)`, which grows monotonically in `n`, so the
//! minimum adequate sample count is found by doubling out an upper bracket
//! and binary-searching down.

use crate::error::PunitError;
use crate::stats::kernel::{wilson_lower_bound, z_score};

/// Hard cap on the feasibility search. A target needing more than this many
/// samples has no practical sizing.
const SEARCH_CEILING: u64 = 1 << 40;

/// Outcome of a feasibility evaluation
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Feasibility {
    /// Whether the configured sample count can evidence the target
    pub feasible: bool,
    /// Minimum samples at which a flawless run clears the target;
    /// `None` when no finite sample count can (target at or above 1.0)
    pub minimum_samples: Option<u64>,
}

/// Evaluate whether `n` samples can evidence `target_rate` at the given
/// confidence level.
///
/// # Errors
/// `InvalidProbability` for a target outside [0, 1] or a confidence level
/// outside (0, 1).
pub fn evaluate(n: u64, target_rate: f64, confidence_level: f64) -> Result<Feasibility, PunitError> {
    if !(0.0..=1.0).contains(&target_rate) {
        return Err(PunitError::InvalidProbability(target_rate));
    }
    let z = z_score(confidence_level)?;

    // The flawless-run bound approaches but never reaches 1.0
    if target_rate >= 1.0 {
        return Ok(Feasibility {
            feasible: false,
            minimum_samples: None,
        });
    }
    if target_rate <= 0.0 {
        return Ok(Feasibility {
            feasible: n >= 1,
            minimum_samples: Some(1),
        });
    }

    let clears = |candidate: u64| wilson_lower_bound(1.0, candidate, z) >= target_rate;

    // Bracket: double until the bound clears the target
    let mut hi = 1u64;
    while !clears(hi) {
        if hi >= SEARCH_CEILING {
            return Ok(Feasibility {
                feasible: false,
                minimum_samples: None,
            });
        }
        hi = hi.saturating_mul(2);
    }

    // Binary search the smallest clearing n in (hi/2, hi]
    let mut lo = hi / 2 + 1;
    if hi == 1 {
        lo = 1;
    }
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if clears(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    Ok(Feasibility {
        feasible: n >= lo,
        minimum_samples: Some(lo),
    })
}
