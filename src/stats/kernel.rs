//! Binomial proportion kernel
//!
//! Wilson score bounds, normal-approximation bounds, standard error, the
//! one-sided z-test, and the interval-method selector. Uses the statrs
//! standard normal for CDF and inverse-CDF work; the common one-sided
//! confidence levels (0.90 / 0.95 / 0.99) resolve through an exact table.
//!
//! The Wilson lower bound is the workhorse: it stays honest for small n and
//! for observed rates near 0 or 1, where the plain normal approximation
//! collapses to degenerate intervals.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::PunitError;

/// Interval method chosen for a given `(p_hat, n)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BoundMethod {
    Wilson,
    Normal,
    /// Reserved for exact (Clopper-Pearson) derivations recorded in spec files
    Exact,
}

impl BoundMethod {
    pub fn code(&self) -> &'static str {
        match self {
            BoundMethod::Wilson => "WILSON",
            BoundMethod::Normal => "NORMAL",
            BoundMethod::Exact => "EXACT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "WILSON" => Some(BoundMethod::Wilson),
            "NORMAL" => Some(BoundMethod::Normal),
            "EXACT" => Some(BoundMethod::Exact),
            _ => None,
        }
    }
}

impl std::fmt::Display for BoundMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Wilson score lower bound for a binomial proportion.
///
/// `(p̂ + z²/2n − z·√(p̂(1−p̂)/n + z²/4n²)) / (1 + z²/n)`, clamped to [0, 1].
/// Returns 0.0 when `n == 0`.
pub fn wilson_lower_bound(p_hat: f64, n: u64, z: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let z2 = z * z;
    let center = p_hat + z2 / (2.0 * n);
    let spread = z * (p_hat * (1.0 - p_hat) / n + z2 / (4.0 * n * n)).sqrt();
    clamp01((center - spread) / (1.0 + z2 / n))
}

/// Wilson score upper bound; the mirror of [`wilson_lower_bound`].
///
/// Satisfies `upper(k, n) = 1 − lower(n−k, n)`. Returns 1.0 when `n == 0`.
pub fn wilson_upper_bound(p_hat: f64, n: u64, z: f64) -> f64 {
    if n == 0 {
        return 1.0;
    }
    let n = n as f64;
    let z2 = z * z;
    let center = p_hat + z2 / (2.0 * n);
    let spread = z * (p_hat * (1.0 - p_hat) / n + z2 / (4.0 * n * n)).sqrt();
    clamp01((center + spread) / (1.0 + z2 / n))
}

/// Two-sided Wilson interval for `k` successes in `n` trials.
///
/// # Errors
/// `InvalidSampleSize` when `n == 0`; `InvalidProbability` when `k > n` or
/// the confidence level falls outside the open interval (0, 1).
pub fn wilson_interval(k: u64, n: u64, confidence_level: f64) -> Result<(f64, f64), PunitError> {
    if n == 0 {
        return Err(PunitError::InvalidSampleSize(n));
    }
    if k > n {
        return Err(PunitError::InvalidProbability(k as f64 / n as f64));
    }
    let z = z_score(confidence_level)?;
    let p_hat = k as f64 / n as f64;
    Ok((
        wilson_lower_bound(p_hat, n, z),
        wilson_upper_bound(p_hat, n, z),
    ))
}

/// Normal-approximation lower bound `p̂ − z·√(p̂(1−p̂)/n)`, clamped to [0, 1].
pub fn normal_lower_bound(p_hat: f64, n: u64, z: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    clamp01(p_hat - z * standard_error(p_hat, n))
}

/// Standard error of a binomial proportion, `√(p̂(1−p̂)/n)`; 0.0 when `n == 0`.
pub fn standard_error(p_hat: f64, n: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (p_hat * (1.0 - p_hat) / n as f64).sqrt()
}

/// One-sided z-statistic for H₀: π = π₀ against H₁: π < π₀ (or >).
///
/// `(p̂ − π₀) / √(π₀(1−π₀)/n)`. Undefined (returns `None`) when the null
/// proportion is degenerate (`π₀ ∈ {0, 1}`) or `n == 0`.
pub fn z_statistic(p_hat: f64, pi0: f64, n: u64) -> Option<f64> {
    if n == 0 || pi0 <= 0.0 || pi0 >= 1.0 {
        return None;
    }
    let se0 = (pi0 * (1.0 - pi0) / n as f64).sqrt();
    Some((p_hat - pi0) / se0)
}

/// One-sided upper-tail p-value, `1 − Φ(z)`.
pub fn one_sided_p_value_upper(z: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(std_normal) => 1.0 - std_normal.cdf(z),
        Err(_) => 1.0, // unreachable for unit parameters
    }
}

/// One-sided critical z for a confidence level in (0, 1).
///
/// The three levels used throughout regression thresholds resolve through an
/// exact table; anything else goes through the inverse normal CDF.
///
/// # Errors
/// `InvalidProbability` when the level is outside the open interval (0, 1).
pub fn z_score(confidence_level: f64) -> Result<f64, PunitError> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(PunitError::InvalidProbability(confidence_level));
    }
    let tabled = match confidence_level {
        c if (c - 0.90).abs() < 1e-9 => Some(1.2816),
        c if (c - 0.95).abs() < 1e-9 => Some(1.6449),
        c if (c - 0.99).abs() < 1e-9 => Some(2.3263),
        _ => None,
    };
    if let Some(z) = tabled {
        return Ok(z);
    }
    match Normal::new(0.0, 1.0) {
        Ok(std_normal) => Ok(std_normal.inverse_cdf(confidence_level)),
        Err(_) => Err(PunitError::InvalidProbability(confidence_level)),
    }
}

/// Select Wilson vs. normal approximation for `(p̂, n)`.
///
/// Wilson wins for small n (`n < 20`), for moderately small n with an extreme
/// rate (`n < 40` and p̂ outside [0.1, 0.9]), and for extreme rates at any n.
/// Ties break toward Wilson; the normal approximation is only trusted in the
/// well-populated central regime.
pub fn select_method(p_hat: f64, n: u64) -> BoundMethod {
    if n < 20 {
        return BoundMethod::Wilson;
    }
    let extreme = p_hat < 0.1 || p_hat > 0.9;
    if n < 40 && extreme {
        return BoundMethod::Wilson;
    }
    if extreme {
        return BoundMethod::Wilson;
    }
    BoundMethod::Normal
}

/// Lower confidence bound using whichever method [`select_method`] picks.
pub fn selected_lower_bound(p_hat: f64, n: u64, z: f64) -> (f64, BoundMethod) {
    match select_method(p_hat, n) {
        BoundMethod::Normal => (normal_lower_bound(p_hat, n, z), BoundMethod::Normal),
        _ => (wilson_lower_bound(p_hat, n, z), BoundMethod::Wilson),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Z95: f64 = 1.6449;

    #[test]
    fn wilson_bounds_bracket_the_observed_rate() {
        for &(k, n) in &[(0u64, 10u64), (5, 10), (10, 10), (951, 1000), (1, 100)] {
            let p_hat = k as f64 / n as f64;
            let lower = wilson_lower_bound(p_hat, n, Z95);
            let upper = wilson_upper_bound(p_hat, n, Z95);
            assert!(
                (0.0..=p_hat + 1e-12).contains(&lower),
                "lower {lower} should not exceed p_hat {p_hat} (k={k}, n={n})"
            );
            assert!(
                (p_hat - 1e-12..=1.0).contains(&upper),
                "upper {upper} should not undercut p_hat {p_hat} (k={k}, n={n})"
            );
        }
    }

    #[test]
    fn wilson_upper_is_complement_of_lower() {
        let n = 200u64;
        for k in [0u64, 1, 37, 100, 163, 199, 200] {
            let p = k as f64 / n as f64;
            let q = (n - k) as f64 / n as f64;
            let upper = wilson_upper_bound(p, n, Z95);
            let mirrored = 1.0 - wilson_lower_bound(q, n, Z95);
            assert!(
                (upper - mirrored).abs() < 1e-12,
                "symmetry violated at k={k}: upper={upper}, mirrored={mirrored}"
            );
        }
    }

    #[test]
    fn wilson_lower_decreases_as_confidence_increases() {
        let p_hat = 0.95;
        let n = 100;
        let z90 = z_score(0.90).unwrap();
        let z95 = z_score(0.95).unwrap();
        let z99 = z_score(0.99).unwrap();
        let l90 = wilson_lower_bound(p_hat, n, z90);
        let l95 = wilson_lower_bound(p_hat, n, z95);
        let l99 = wilson_lower_bound(p_hat, n, z99);
        assert!(l90 > l95, "l90={l90} should exceed l95={l95}");
        assert!(l95 > l99, "l95={l95} should exceed l99={l99}");
    }

    #[test]
    fn perfect_rate_lower_bound_grows_with_n() {
        // At k = n the Wilson lower bound reduces to n / (n + z²); this
        // monotonicity is what feasibility sizing relies on.
        let mut previous = 0.0;
        for n in [1u64, 5, 10, 50, 100, 1000, 10_000] {
            let lower = wilson_lower_bound(1.0, n, Z95);
            assert!(
                lower > previous,
                "lower bound at k=n should grow with n: n={n}, lower={lower}"
            );
            previous = lower;
        }
    }

    #[test]
    fn zero_trials_yield_zeroed_outputs() {
        assert_eq!(standard_error(0.5, 0), 0.0);
        assert_eq!(wilson_lower_bound(0.5, 0, Z95), 0.0);
        assert_eq!(wilson_upper_bound(0.5, 0, Z95), 1.0);
        assert_eq!(normal_lower_bound(0.5, 0, Z95), 0.0);
        assert!(z_statistic(0.5, 0.9, 0).is_none());
    }

    #[test]
    fn wilson_interval_rejects_bad_inputs() {
        assert!(matches!(
            wilson_interval(1, 0, 0.95),
            Err(PunitError::InvalidSampleSize(0))
        ));
        assert!(matches!(
            wilson_interval(11, 10, 0.95),
            Err(PunitError::InvalidProbability(_))
        ));
        assert!(matches!(
            wilson_interval(5, 10, 1.0),
            Err(PunitError::InvalidProbability(_))
        ));
    }

    #[test]
    fn known_wilson_value_for_strong_baseline() {
        // 951/1000 at 95% one-sided: the lower bound lands a little above 0.938
        let (lower, upper) = wilson_interval(951, 1000, 0.95).unwrap();
        assert!(
            (0.93..0.95).contains(&lower),
            "expected lower near 0.939, got {lower}"
        );
        assert!(upper > 0.951 && upper <= 1.0);
    }

    #[test]
    fn z_table_matches_one_sided_critical_values() {
        assert!((z_score(0.90).unwrap() - 1.2816).abs() < 1e-9);
        assert!((z_score(0.95).unwrap() - 1.6449).abs() < 1e-9);
        assert!((z_score(0.99).unwrap() - 2.3263).abs() < 1e-9);
    }

    #[test]
    fn z_interpolates_off_table_levels() {
        // 97.5% one-sided is the classic 1.96
        let z = z_score(0.975).unwrap();
        assert!((z - 1.96).abs() < 0.001, "got {z}");
        assert!(z_score(0.0).is_err());
        assert!(z_score(1.0).is_err());
    }

    #[test]
    fn p_value_matches_known_points() {
        // Φ(0) = 0.5
        assert!((one_sided_p_value_upper(0.0) - 0.5).abs() < 1e-9);
        // 1 − Φ(1.6449) ≈ 0.05
        assert!((one_sided_p_value_upper(1.6449) - 0.05).abs() < 0.001);
        // Large z drives the upper tail to zero
        assert!(one_sided_p_value_upper(6.0) < 1e-8);
    }

    #[test]
    fn z_statistic_known_value() {
        // p̂ = 0.9, π₀ = 0.95, n = 100 → z = −0.05 / √(0.95·0.05/100) ≈ −2.294
        let z = z_statistic(0.9, 0.95, 100).unwrap();
        assert!((z + 2.294).abs() < 0.01, "got {z}");
    }

    #[test]
    fn z_statistic_undefined_for_degenerate_null() {
        assert!(z_statistic(0.5, 0.0, 100).is_none());
        assert!(z_statistic(0.5, 1.0, 100).is_none());
    }

    #[test]
    fn method_selection_prefers_wilson_at_the_edges() {
        assert_eq!(select_method(0.5, 10), BoundMethod::Wilson); // small n
        assert_eq!(select_method(0.95, 30), BoundMethod::Wilson); // n < 40, extreme
        assert_eq!(select_method(0.05, 1000), BoundMethod::Wilson); // extreme rate
        assert_eq!(select_method(0.5, 100), BoundMethod::Normal); // central regime
    }

    #[test]
    fn perfect_rate_always_selects_wilson() {
        for n in [1u64, 10, 100, 1000, 100_000] {
            assert_eq!(select_method(1.0, n), BoundMethod::Wilson, "n={n}");
        }
    }
}
