//! Structured report stream
//!
//! Ordered `punit.*` key/value entries emitted once per test: the run's
//! counters, verdict, budget state, threshold provenance, and headline
//! statistics. The entries double as structured tracing output so log
//! pipelines see the same facts as the console.

use tracing::info;

use crate::config::resolver::ResolvedConfig;
use crate::explain::StatisticalExplanation;
use crate::types::{BudgetScope, TokenMode, Verdict};

/// One test's report entries, in emission order.
#[derive(Debug, Clone, Default)]
pub struct ReportEntries {
    entries: Vec<(String, String)>,
}

impl ReportEntries {
    /// Assemble the full entry list for a completed test.
    pub fn assemble(
        config: &ResolvedConfig,
        verdict: &Verdict,
        explanation: &StatisticalExplanation,
        token_mode: TokenMode,
        failures: u32,
    ) -> Self {
        let mut report = Self::default();

        report.push("punit.samples", config.samples);
        report.push("punit.samplesExecuted", verdict.samples_executed);
        report.push("punit.successes", explanation.observed.successes);
        report.push("punit.failures", failures);
        report.push("punit.minPassRate", format!("{:.4}", verdict.required_rate));
        report.push(
            "punit.observedPassRate",
            format!("{:.4}", verdict.observed_rate),
        );
        report.push("punit.verdict", verdict.outcome_word());
        report.push("punit.terminationReason", verdict.termination_reason);
        report.push("punit.elapsedMs", verdict.elapsed_ms);
        report.push("punit.tokenMode", token_mode);
        report.push("punit.tokensConsumed", verdict.tokens_consumed);
        report.push("punit.tokenBudget", config.token_budget);
        let budget_scope = verdict
            .termination_reason
            .budget_scope()
            .unwrap_or(BudgetScope::Method);
        report.push("punit.tokenBudgetScope", budget_scope);
        report.push(
            "punit.thresholdOrigin",
            explanation.provenance.threshold_origin.clone(),
        );
        report.push(
            "punit.contractRef",
            config.contract_ref.clone().unwrap_or_default(),
        );

        if let Some(spec_ref) = &config.spec_ref {
            report.push("punit.specId", spec_ref.use_case_id.clone());
            report.push("punit.specVersion", spec_ref.version.clone());
        }
        if let Some(baseline) = &explanation.baseline {
            report.push("punit.baselineSource", baseline.source.clone());
        }

        report.push(
            "punit.stats.confidenceInterval",
            format!(
                "[{:.4}, {:.4}]",
                explanation.inference.ci_lower, explanation.inference.ci_upper
            ),
        );
        if let Some(z) = explanation.inference.z_statistic {
            report.push("punit.stats.zStatistic", format!("{z:.4}"));
        }
        if let Some(p) = explanation.inference.p_value {
            report.push("punit.stats.pValue", format!("{p:.4}"));
        }

        report
    }

    fn push(&mut self, key: &str, value: impl ToString) {
        self.entries.push((key.to_string(), value.to_string()));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Emit every entry through tracing at info level.
    pub fn emit(&self) {
        for (key, value) in &self.entries {
            info!(target: "punit::report", key = %key, value = %value);
        }
    }
}

impl std::fmt::Display for ReportEntries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, RuntimeFlags, TestDeclaration};
    use crate::explain::{build, BaselineData, ExplanationInputs};
    use crate::types::{TerminationReason, TestIntent, ThresholdOrigin};

    fn fixture() -> (ResolvedConfig, Verdict, StatisticalExplanation) {
        let mut decl = TestDeclaration::named("report_test").with_samples(100);
        decl.min_pass_rate = 0.9;
        decl.spec_ref = Some(crate::types::SpecRef::new("summarize", "1.2"));
        decl.contract_ref = Some("SLO-billing-7".into());
        let config = resolve(&decl, &RuntimeFlags::new()).unwrap().config;

        let verdict = Verdict {
            passed: true,
            observed_rate: 0.95,
            required_rate: 0.9,
            termination_reason: TerminationReason::Completed,
            samples_executed: 100,
            elapsed_ms: 840,
            tokens_consumed: 12_000,
            feasibility_note: None,
        };

        let explanation = build(&ExplanationInputs {
            test_name: "report_test",
            samples_executed: 100,
            successes: 95,
            threshold: 0.9,
            passed: true,
            confidence_level: 0.95,
            origin: ThresholdOrigin::Empirical,
            intent: TestIntent::Verification,
            contract_ref: Some("SLO-billing-7"),
            baseline: Some(BaselineData {
                source: "spec summarize v1.2".into(),
                generated_at: None,
                samples: 500,
                successes: 470,
                derivation: "WILSON lower bound".into(),
            }),
            misalignments: &[],
            feasibility_note: None,
        });
        (config, verdict, explanation)
    }

    #[test]
    fn core_entries_are_present_and_ordered() {
        let (config, verdict, explanation) = fixture();
        let report =
            ReportEntries::assemble(&config, &verdict, &explanation, TokenMode::Dynamic, 5);
        let keys: Vec<_> = report.entries().iter().map(|(k, _)| k.as_str()).collect();
        let expected_prefix = [
            "punit.samples",
            "punit.samplesExecuted",
            "punit.successes",
            "punit.failures",
            "punit.minPassRate",
            "punit.observedPassRate",
            "punit.verdict",
            "punit.terminationReason",
            "punit.elapsedMs",
            "punit.tokenMode",
            "punit.tokensConsumed",
            "punit.tokenBudget",
            "punit.tokenBudgetScope",
            "punit.thresholdOrigin",
            "punit.contractRef",
        ];
        assert_eq!(&keys[..expected_prefix.len()], &expected_prefix);
        assert_eq!(report.get("punit.verdict"), Some("PASS"));
        assert_eq!(report.get("punit.tokenMode"), Some("DYNAMIC"));
        assert_eq!(report.get("punit.terminationReason"), Some("COMPLETED"));
    }

    #[test]
    fn spec_and_baseline_entries_follow_the_reference() {
        let (config, verdict, explanation) = fixture();
        let report = ReportEntries::assemble(&config, &verdict, &explanation, TokenMode::None, 5);
        assert_eq!(report.get("punit.specId"), Some("summarize"));
        assert_eq!(report.get("punit.specVersion"), Some("1.2"));
        assert_eq!(report.get("punit.baselineSource"), Some("spec summarize v1.2"));
    }

    #[test]
    fn budget_scope_follows_the_termination_reason() {
        let (config, mut verdict, explanation) = fixture();
        verdict.termination_reason = TerminationReason::SuiteTokenBudget;
        let report = ReportEntries::assemble(&config, &verdict, &explanation, TokenMode::Static, 0);
        assert_eq!(report.get("punit.tokenBudgetScope"), Some("SUITE"));
    }

    #[test]
    fn interval_and_test_statistics_render_numerically() {
        let (config, verdict, explanation) = fixture();
        let report = ReportEntries::assemble(&config, &verdict, &explanation, TokenMode::None, 5);
        let ci = report.get("punit.stats.confidenceInterval").unwrap();
        assert!(ci.starts_with('[') && ci.ends_with(']'));
        assert!(report.get("punit.stats.zStatistic").is_some());
        assert!(report.get("punit.stats.pValue").is_some());
    }

    #[test]
    fn display_is_key_equals_value_lines() {
        let (config, verdict, explanation) = fixture();
        let report = ReportEntries::assemble(&config, &verdict, &explanation, TokenMode::None, 5);
        let text = report.to_string();
        assert!(text.contains("punit.verdict=PASS"));
        assert!(text.lines().all(|l| l.contains('=')));
    }
}
