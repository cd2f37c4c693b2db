//! Explanation builder
//!
//! Assembles every section of the `StatisticalExplanation` and pre-computes
//! every numeric value (standard error, interval bounds, z, p) so renderers
//! stay arithmetic-free. Hypothesis and verdict language is framed by the
//! threshold origin and test intent; SMOKE intent never uses compliance
//! language.

use crate::explain::{
    BaselineReference, CovariateMisalignment, HypothesisStatement, ObservedData, Provenance,
    StatisticalExplanation, StatisticalInference, VerdictInterpretation,
};
use crate::stats::{self, kernel};
use crate::types::{TestIntent, ThresholdOrigin};

/// Sample sizes below this draw the strong small-sample caveat.
const SMALL_SAMPLE_N: u32 = 30;

/// Sample sizes below this draw the moderate small-sample caveat.
const MODERATE_SAMPLE_N: u32 = 100;

/// A pass margin slimmer than this draws the closeness caveat.
const CLOSE_MARGIN: f64 = 0.05;

/// Baseline facts behind a derived threshold, as the builder consumes them.
#[derive(Debug, Clone)]
pub struct BaselineData {
    pub source: String,
    pub generated_at: Option<String>,
    pub samples: u64,
    pub successes: u64,
    pub derivation: String,
}

/// Everything the builder needs for one explanation.
#[derive(Debug)]
pub struct ExplanationInputs<'a> {
    pub test_name: &'a str,
    pub samples_executed: u32,
    pub successes: u32,
    pub threshold: f64,
    pub passed: bool,
    pub confidence_level: f64,
    pub origin: ThresholdOrigin,
    pub intent: TestIntent,
    pub contract_ref: Option<&'a str>,
    pub baseline: Option<BaselineData>,
    pub misalignments: &'a [CovariateMisalignment],
    /// Feasibility note carried by an infeasible-threshold verdict
    pub feasibility_note: Option<&'a str>,
}

/// Build the full explanation record.
pub fn build(inputs: &ExplanationInputs<'_>) -> StatisticalExplanation {
    let n = inputs.samples_executed;
    let k = inputs.successes;
    let p_hat = if n == 0 { 0.0 } else { f64::from(k) / f64::from(n) };

    let observed = ObservedData {
        samples: n,
        successes: k,
        observed_rate: p_hat,
    };

    let inference = compute_inference(p_hat, k, n, inputs.threshold, inputs.confidence_level);
    let hypothesis = frame_hypothesis(inputs.origin, inputs.intent, inputs.threshold);
    let verdict = frame_verdict(inputs, p_hat, &inference);
    let baseline = inputs.baseline.as_ref().map(|b| BaselineReference {
        source: b.source.clone(),
        generated_at: b.generated_at.clone(),
        samples: b.samples,
        successes: b.successes,
        observed_rate: if b.samples == 0 {
            0.0
        } else {
            b.successes as f64 / b.samples as f64
        },
        derivation: b.derivation.clone(),
        threshold: inputs.threshold,
    });

    StatisticalExplanation {
        test_name: inputs.test_name.to_string(),
        hypothesis,
        observed,
        baseline,
        inference,
        verdict,
        provenance: Provenance {
            threshold_origin: inputs.origin.code().to_string(),
            contract_ref: inputs.contract_ref.map(str::to_string),
        },
    }
}

fn compute_inference(
    p_hat: f64,
    k: u32,
    n: u32,
    threshold: f64,
    confidence_level: f64,
) -> StatisticalInference {
    let (ci_lower, ci_upper) = kernel::wilson_interval(u64::from(k), u64::from(n), confidence_level)
        .unwrap_or((0.0, if n == 0 { 1.0 } else { 0.0 }));
    let z_statistic = kernel::z_statistic(p_hat, threshold, u64::from(n));
    // Lower-tail p-value: chance of a rate at most this extreme under H0
    let p_value = z_statistic.map(|z| kernel::one_sided_p_value_upper(-z));
    StatisticalInference {
        standard_error: kernel::standard_error(p_hat, u64::from(n)),
        ci_lower,
        ci_upper,
        confidence_level,
        z_statistic,
        p_value,
    }
}

// ============================================================================
// Hypothesis & Verdict Framing
// ============================================================================

fn frame_hypothesis(
    origin: ThresholdOrigin,
    intent: TestIntent,
    threshold: f64,
) -> HypothesisStatement {
    let target = format!("{threshold:.4}");
    let (null, alternative) = match (origin, intent) {
        // SMOKE never speaks compliance language, whatever the origin
        (o, TestIntent::Smoke) if o.is_normative() => (
            format!("the observed success rate is consistent with the target ({target})"),
            "the observed success rate is inconsistent with the target".to_string(),
        ),
        (ThresholdOrigin::Sla, TestIntent::Verification) => (
            format!("the system meets the SLA requirement (rate >= {target})"),
            format!("the system violates the SLA (rate < {target})"),
        ),
        (ThresholdOrigin::Slo, TestIntent::Verification) => (
            format!("the system meets the SLO target (rate >= {target})"),
            format!("the system falls short of the SLO (rate < {target})"),
        ),
        (ThresholdOrigin::Policy, TestIntent::Verification) => (
            format!("the system meets the policy requirement (rate >= {target})"),
            format!("the system violates the policy (rate < {target})"),
        ),
        (ThresholdOrigin::Empirical, _) => (
            format!("no degradation from the baseline (rate >= {target})"),
            format!("degradation from the baseline (rate < {target})"),
        ),
        _ => (
            format!("the success rate meets the threshold ({target})"),
            format!("the success rate falls below the threshold ({target})"),
        ),
    };
    HypothesisStatement {
        null,
        alternative,
        test_type: "one-sided binomial proportion test against the required rate".to_string(),
    }
}

fn frame_verdict(
    inputs: &ExplanationInputs<'_>,
    p_hat: f64,
    inference: &StatisticalInference,
) -> VerdictInterpretation {
    let outcome = if inputs.passed { "PASS" } else { "FAIL" };
    let relation = if p_hat >= inputs.threshold { ">=" } else { "<" };
    let technical = format!(
        "{outcome}: observed rate {:.4} {relation} required rate {:.4} over {} samples",
        p_hat, inputs.threshold, inputs.samples_executed
    );

    let plain_english = match (inputs.origin, inputs.intent, inputs.passed) {
        (o, TestIntent::Smoke, true) if o.is_normative() => {
            "The observed success rate is consistent with the declared target.".to_string()
        }
        (o, TestIntent::Smoke, false) if o.is_normative() => {
            "The observed success rate is inconsistent with the declared target.".to_string()
        }
        (ThresholdOrigin::Sla, _, true) => {
            "No evidence of an SLA violation at this sample size.".to_string()
        }
        (ThresholdOrigin::Sla, _, false) => {
            "The observed rate is evidence the system violates its SLA.".to_string()
        }
        (ThresholdOrigin::Slo, _, true) => {
            "The observed rate is consistent with meeting the SLO target.".to_string()
        }
        (ThresholdOrigin::Slo, _, false) => {
            "The observed rate falls short of the SLO target.".to_string()
        }
        (ThresholdOrigin::Policy, _, true) => {
            "No evidence of a policy violation at this sample size.".to_string()
        }
        (ThresholdOrigin::Policy, _, false) => {
            "The observed rate is evidence the system violates the policy.".to_string()
        }
        (ThresholdOrigin::Empirical, _, true) => {
            "No degradation detected relative to the experimental baseline.".to_string()
        }
        (ThresholdOrigin::Empirical, _, false) => {
            "The observed rate indicates degradation from the experimental baseline.".to_string()
        }
        (_, _, true) => "The observed success rate meets the declared threshold.".to_string(),
        (_, _, false) => {
            "The observed success rate falls below the declared threshold.".to_string()
        }
    };

    VerdictInterpretation {
        passed: inputs.passed,
        technical,
        plain_english,
        caveats: collect_caveats(inputs, p_hat, inference),
    }
}

// ============================================================================
// Caveats
// ============================================================================

/// Caveats in fixed order: covariate misalignment, sample size, slim margin,
/// edge rates, inline-threshold disclaimer, compliance sizing, smoke sizing.
fn collect_caveats(
    inputs: &ExplanationInputs<'_>,
    p_hat: f64,
    inference: &StatisticalInference,
) -> Vec<String> {
    let mut caveats = Vec::new();
    let n = inputs.samples_executed;

    for m in inputs.misalignments {
        caveats.push(format!(
            "Covariate '{}' differs from the baseline: baseline '{}', this run '{}'.",
            m.key, m.baseline, m.test
        ));
    }

    if n < SMALL_SAMPLE_N {
        caveats.push(format!(
            "Small sample (n = {n} < {SMALL_SAMPLE_N}): the interval is wide and this verdict is weak evidence."
        ));
    } else if n < MODERATE_SAMPLE_N {
        caveats.push(format!(
            "Moderate sample (n = {n} < {MODERATE_SAMPLE_N}): treat the verdict as provisional."
        ));
    }

    let margin = p_hat - inputs.threshold;
    if margin > 0.0 && margin < CLOSE_MARGIN {
        caveats.push(format!(
            "Slim margin: the observed rate exceeds the required rate by only {margin:.4}."
        ));
    }

    if n > 0 && p_hat <= 0.0 {
        caveats.push("Every sample failed; check for a systematic fault before reading the rate statistically.".to_string());
    } else if p_hat >= 1.0 && n > 0 {
        caveats.push(format!(
            "Every sample passed; the true rate still has an interval lower bound of {:.4}.",
            inference.ci_lower
        ));
    }

    if inputs.baseline.is_none() && !inputs.origin.is_normative() {
        caveats.push(
            "Threshold declared inline without an experimental baseline; it encodes expectation, not evidence."
                .to_string(),
        );
    }

    if let Some(note) = inputs.feasibility_note {
        caveats.push(note.to_string());
    }

    if inputs.origin.is_normative() {
        let sizing = stats::evaluate_feasibility(
            u64::from(n.max(1)),
            inputs.threshold,
            inputs.confidence_level,
        )
        .ok();
        match inputs.intent {
            TestIntent::Verification => {
                if let Some(sizing) = sizing {
                    if !sizing.feasible && inputs.feasibility_note.is_none() {
                        caveats.push(match sizing.minimum_samples {
                            Some(minimum) => format!(
                                "Undersized for compliance evidence: n = {n} cannot evidence {:.4}; need n >= {minimum}.",
                                inputs.threshold
                            ),
                            None => format!(
                                "No finite sample count can evidence a required rate of {:.4}.",
                                inputs.threshold
                            ),
                        });
                    }
                }
            }
            TestIntent::Smoke => {
                if let Some(sizing) = sizing {
                    caveats.push(if sizing.feasible {
                        "Run is sized for verification; consider declaring VERIFICATION intent."
                            .to_string()
                    } else {
                        match sizing.minimum_samples {
                            Some(minimum) => format!(
                                "Smoke check only - not sized for verification (need n >= {minimum})."
                            ),
                            None => "Smoke check only - this target cannot be verified at any finite n."
                                .to_string(),
                        }
                    });
                }
            }
        }
    }

    caveats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs<'a>(
        origin: ThresholdOrigin,
        intent: TestIntent,
        n: u32,
        k: u32,
        threshold: f64,
        passed: bool,
    ) -> ExplanationInputs<'a> {
        ExplanationInputs {
            test_name: "builder_test",
            samples_executed: n,
            successes: k,
            threshold,
            passed,
            confidence_level: 0.95,
            origin,
            intent,
            contract_ref: None,
            baseline: None,
            misalignments: &[],
            feasibility_note: None,
        }
    }

    #[test]
    fn precomputes_inference_values() {
        let explanation = build(&inputs(
            ThresholdOrigin::Empirical,
            TestIntent::Verification,
            100,
            92,
            0.9,
            true,
        ));
        let inference = explanation.inference;
        assert!((explanation.observed.observed_rate - 0.92).abs() < 1e-12);
        assert!(inference.standard_error > 0.02 && inference.standard_error < 0.03);
        assert!(inference.ci_lower < 0.92 && 0.92 < inference.ci_upper);
        let z = inference.z_statistic.unwrap();
        assert!((z - 0.6667).abs() < 0.01, "got z = {z}");
        let p = inference.p_value.unwrap();
        assert!(p > 0.5, "a rate above the null should not look extreme, p = {p}");
    }

    #[test]
    fn z_and_p_absent_for_degenerate_threshold() {
        let explanation = build(&inputs(
            ThresholdOrigin::Unspecified,
            TestIntent::Verification,
            10,
            10,
            1.0,
            true,
        ));
        assert!(explanation.inference.z_statistic.is_none());
        assert!(explanation.inference.p_value.is_none());
    }

    #[test]
    fn sla_verification_uses_compliance_language() {
        let explanation = build(&inputs(
            ThresholdOrigin::Sla,
            TestIntent::Verification,
            200,
            199,
            0.95,
            true,
        ));
        assert!(explanation.hypothesis.null.contains("SLA"));
        assert!(explanation.hypothesis.alternative.contains("violates"));
    }

    #[test]
    fn smoke_intent_never_uses_compliance_language() {
        let explanation = build(&inputs(
            ThresholdOrigin::Sla,
            TestIntent::Smoke,
            20,
            19,
            0.95,
            true,
        ));
        assert!(!explanation.hypothesis.null.contains("SLA"));
        assert!(!explanation.hypothesis.alternative.contains("violates"));
        assert!(explanation.hypothesis.null.contains("consistent"));
        assert!(explanation.verdict.plain_english.contains("consistent"));
    }

    #[test]
    fn empirical_origin_speaks_of_degradation() {
        let explanation = build(&inputs(
            ThresholdOrigin::Empirical,
            TestIntent::Verification,
            100,
            80,
            0.9,
            false,
        ));
        assert!(explanation.hypothesis.null.contains("degradation"));
        assert!(explanation.verdict.plain_english.contains("degradation"));
    }

    #[test]
    fn caveat_order_is_stable() {
        let misalignments = vec![CovariateMisalignment {
            key: "model".into(),
            baseline: "m-large-2026-01".into(),
            test: "m-large-2026-06".into(),
        }];
        let mut input = inputs(
            ThresholdOrigin::Unspecified,
            TestIntent::Verification,
            20,
            20,
            0.97,
            true,
        );
        input.misalignments = &misalignments;
        let caveats = build(&input).verdict.caveats;
        // misalignment, small-n, slim margin, all-passed edge, inline disclaimer
        assert!(caveats[0].contains("Covariate 'model'"));
        assert!(caveats[1].contains("n = 20 < 30"));
        assert!(caveats[2].contains("Slim margin"));
        assert!(caveats[3].contains("Every sample passed"));
        assert!(caveats[4].contains("inline"));
        assert_eq!(caveats.len(), 5);
    }

    #[test]
    fn moderate_sample_caveat_between_30_and_100() {
        let caveats = build(&inputs(
            ThresholdOrigin::Unspecified,
            TestIntent::Verification,
            50,
            40,
            0.7,
            true,
        ))
        .verdict
        .caveats;
        assert!(caveats.iter().any(|c| c.contains("n = 50 < 100")));
        assert!(!caveats.iter().any(|c| c.contains("< 30")));
    }

    #[test]
    fn zero_rate_draws_the_systematic_fault_caveat() {
        let caveats = build(&inputs(
            ThresholdOrigin::Unspecified,
            TestIntent::Verification,
            40,
            0,
            0.9,
            false,
        ))
        .verdict
        .caveats;
        assert!(caveats.iter().any(|c| c.contains("Every sample failed")));
    }

    #[test]
    fn undersized_normative_run_draws_the_compliance_caveat() {
        let caveats = build(&inputs(
            ThresholdOrigin::Sla,
            TestIntent::Verification,
            100,
            100,
            0.9999,
            true,
        ))
        .verdict
        .caveats;
        assert!(
            caveats
                .iter()
                .any(|c| c.contains("Undersized for compliance evidence")),
            "caveats were: {caveats:?}"
        );
    }

    #[test]
    fn smoke_with_normative_origin_reports_sizing_either_way() {
        let undersized = build(&inputs(
            ThresholdOrigin::Slo,
            TestIntent::Smoke,
            10,
            10,
            0.99,
            true,
        ))
        .verdict
        .caveats;
        assert!(undersized.iter().any(|c| c.contains("not sized for verification")));

        let sized = build(&inputs(
            ThresholdOrigin::Slo,
            TestIntent::Smoke,
            1000,
            998,
            0.9,
            true,
        ))
        .verdict
        .caveats;
        assert!(sized
            .iter()
            .any(|c| c.contains("consider declaring VERIFICATION intent")));
    }

    #[test]
    fn baseline_reference_recomputes_its_rate() {
        let mut input = inputs(
            ThresholdOrigin::Empirical,
            TestIntent::Verification,
            100,
            95,
            0.9,
            true,
        );
        input.baseline = Some(BaselineData {
            source: "spec summarize v1.2".into(),
            generated_at: Some("2026-05-14T09:30:00Z".into()),
            samples: 500,
            successes: 470,
            derivation: "WILSON one-sided lower bound".into(),
        });
        let baseline = build(&input).baseline.unwrap();
        assert!((baseline.observed_rate - 0.94).abs() < 1e-12);
        assert_eq!(baseline.threshold, 0.9);
    }
}
