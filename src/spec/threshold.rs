//! Regression-threshold derivation
//!
//! Turns a spec's experimental basis into the effective `min_pass_rate` for
//! a test run at its own sample count. The derived threshold answers: given
//! that the baseline experiment observed rate p̂ over n_exp samples, how low
//! could an honest test of n_test samples plausibly score without signalling
//! degradation? That is the one-sided lower confidence bound of p̂ evaluated
//! at the test's sample size, with the interval method chosen by the kernel
//! selector.

use serde::Serialize;
use tracing::debug;

use crate::error::PunitError;
use crate::spec::ExperimentalBasis;
use crate::stats::kernel::{selected_lower_bound, standard_error, z_score, BoundMethod};

/// How the deriver treats the spec's basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivationPolicy {
    /// Derive a lower-bound threshold at the test's sample count
    #[default]
    Derive,
    /// Use the spec's `requirements.min_pass_rate` verbatim
    Raw,
    /// Derive, but reject sample counts that stray from the basis
    RequireMatchingSamples,
}

/// A derived threshold with its full derivation record.
#[derive(Debug, Clone, Serialize)]
pub struct RegressionThreshold {
    pub basis: ExperimentalBasis,
    pub test_samples: u32,
    pub confidence_level: f64,
    /// The effective required pass rate, clamped to [0, 1]
    pub min_pass_rate: f64,
    pub method: BoundMethod,
    pub z_score: f64,
    pub test_standard_error: f64,
}

/// Tolerated deviation for `RequireMatchingSamples`: a tenth of the basis,
/// but never tighter than one sample.
fn matching_tolerance(n_exp: u64) -> u64 {
    (n_exp / 10).max(1)
}

/// Derive the effective threshold for a test of `n_test` samples.
///
/// # Errors
/// `SampleSizeMismatch` under `RequireMatchingSamples` when `n_test` strays
/// beyond the tolerance; kernel errors for degenerate confidence levels.
pub fn derive(
    basis: &ExperimentalBasis,
    raw_min_pass_rate: f64,
    n_test: u32,
    confidence_level: f64,
    policy: DerivationPolicy,
) -> Result<RegressionThreshold, PunitError> {
    let z = z_score(confidence_level)?;
    let p_hat = basis.rate();
    let se_test = standard_error(p_hat, u64::from(n_test));

    if policy == DerivationPolicy::RequireMatchingSamples {
        let tolerance = matching_tolerance(basis.samples);
        let deviation = u64::from(n_test).abs_diff(basis.samples);
        if deviation > tolerance {
            return Err(PunitError::SampleSizeMismatch {
                n_test,
                n_exp: basis.samples,
            });
        }
    }

    let (min_pass_rate, method) = match policy {
        DerivationPolicy::Raw => (
            raw_min_pass_rate.clamp(0.0, 1.0),
            // No bound computed; record the method the selector would use
            crate::stats::kernel::select_method(p_hat, u64::from(n_test)),
        ),
        DerivationPolicy::Derive | DerivationPolicy::RequireMatchingSamples => {
            let (lower, method) = selected_lower_bound(p_hat, u64::from(n_test), z);
            (lower, method)
        }
    };

    debug!(
        p_hat,
        n_exp = basis.samples,
        n_test,
        min_pass_rate,
        method = %method,
        "derived regression threshold"
    );

    Ok(RegressionThreshold {
        basis: *basis,
        test_samples: n_test,
        confidence_level,
        min_pass_rate,
        method,
        z_score: z,
        test_standard_error: se_test,
    })
}

/// One-sentence derivation summary for explanations and reports.
pub fn derivation_text(threshold: &RegressionThreshold) -> String {
    format!(
        "{} one-sided lower bound of {:.4} ({} / {} baseline successes) at {:.0}% confidence for n = {}",
        threshold.method,
        threshold.basis.rate(),
        threshold.basis.successes,
        threshold.basis.samples,
        threshold.confidence_level * 100.0,
        threshold.test_samples
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong_baseline() -> ExperimentalBasis {
        ExperimentalBasis {
            samples: 1000,
            successes: 951,
            observed_rate: 0.951,
            standard_error: 0.0068,
        }
    }

    #[test]
    fn derives_a_wilson_threshold_below_the_baseline_rate() {
        let threshold = derive(&strong_baseline(), 0.9, 100, 0.95, DerivationPolicy::Derive)
            .unwrap();
        // p̂ > 0.9 routes through Wilson; the bound gives the test run slack
        // for its own sampling noise
        assert_eq!(threshold.method, BoundMethod::Wilson);
        assert!(
            threshold.min_pass_rate < 0.951,
            "threshold {} should sit below the baseline rate",
            threshold.min_pass_rate
        );
        assert!(
            (0.88..0.93).contains(&threshold.min_pass_rate),
            "expected a bound near 0.90, got {}",
            threshold.min_pass_rate
        );
        assert!((threshold.z_score - 1.6449).abs() < 1e-9);
    }

    #[test]
    fn central_rates_at_large_n_use_the_normal_approximation() {
        let basis = ExperimentalBasis {
            samples: 2000,
            successes: 1400,
            observed_rate: 0.7,
            standard_error: 0.0102,
        };
        let threshold = derive(&basis, 0.6, 400, 0.95, DerivationPolicy::Derive).unwrap();
        assert_eq!(threshold.method, BoundMethod::Normal);
        // 0.7 − 1.6449·√(0.7·0.3/400) ≈ 0.662
        assert!(
            (0.65..0.68).contains(&threshold.min_pass_rate),
            "got {}",
            threshold.min_pass_rate
        );
    }

    #[test]
    fn smaller_test_runs_get_more_slack() {
        let basis = strong_baseline();
        let at_50 = derive(&basis, 0.9, 50, 0.95, DerivationPolicy::Derive).unwrap();
        let at_500 = derive(&basis, 0.9, 500, 0.95, DerivationPolicy::Derive).unwrap();
        assert!(
            at_50.min_pass_rate < at_500.min_pass_rate,
            "50-sample threshold {} should be looser than 500-sample {}",
            at_50.min_pass_rate,
            at_500.min_pass_rate
        );
    }

    #[test]
    fn raw_policy_passes_the_requirement_through() {
        let threshold = derive(&strong_baseline(), 0.9, 100, 0.95, DerivationPolicy::Raw).unwrap();
        assert!((threshold.min_pass_rate - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn matching_policy_rejects_strays_and_accepts_near_misses() {
        let basis = strong_baseline();
        let err = derive(&basis, 0.9, 100, 0.95, DerivationPolicy::RequireMatchingSamples)
            .unwrap_err();
        assert!(matches!(err, PunitError::SampleSizeMismatch { .. }));

        // Within a tenth of the basis (±100 of 1000)
        let ok = derive(&basis, 0.9, 950, 0.95, DerivationPolicy::RequireMatchingSamples);
        assert!(ok.is_ok());
    }

    #[test]
    fn derivation_text_names_method_and_basis() {
        let threshold = derive(&strong_baseline(), 0.9, 100, 0.95, DerivationPolicy::Derive)
            .unwrap();
        let text = derivation_text(&threshold);
        assert!(text.contains("WILSON"));
        assert!(text.contains("951"));
        assert!(text.contains("95%"));
    }
}
