//! Console rendering of statistical explanations
//!
//! A pure formatter over the pre-computed `StatisticalExplanation`: labelled
//! sections wrapped at 78 columns, with mathematical symbols in Unicode when
//! the terminal takes UTF-8 and ASCII fallbacks otherwise. No arithmetic
//! happens here.

use crate::explain::StatisticalExplanation;

/// Maximum rendered line width.
const WIDTH: usize = 78;

/// Symbol table for mathematical notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSet {
    Unicode,
    Ascii,
}

impl SymbolSet {
    /// Pick a symbol set from the environment: `PUNIT_ASCII=true` forces
    /// ASCII; otherwise UTF-8 locales get Unicode.
    pub fn detect() -> Self {
        if std::env::var("PUNIT_ASCII")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
        {
            return SymbolSet::Ascii;
        }
        let locale = std::env::var("LC_ALL")
            .or_else(|_| std::env::var("LC_CTYPE"))
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_default();
        if locale.to_ascii_uppercase().contains("UTF-8")
            || locale.to_ascii_uppercase().contains("UTF8")
        {
            SymbolSet::Unicode
        } else {
            SymbolSet::Ascii
        }
    }

    fn p_hat(&self) -> &'static str {
        match self {
            SymbolSet::Unicode => "p\u{302}",
            SymbolSet::Ascii => "p-hat",
        }
    }

    fn pi0(&self) -> &'static str {
        match self {
            SymbolSet::Unicode => "\u{3c0}\u{2080}",
            SymbolSet::Ascii => "pi0",
        }
    }

    fn h0(&self) -> &'static str {
        match self {
            SymbolSet::Unicode => "H\u{2080}",
            SymbolSet::Ascii => "H0",
        }
    }

    fn h1(&self) -> &'static str {
        match self {
            SymbolSet::Unicode => "H\u{2081}",
            SymbolSet::Ascii => "H1",
        }
    }

}

/// Render the explanation as a labelled text block.
pub fn render(explanation: &StatisticalExplanation, symbols: SymbolSet) -> String {
    let mut out = String::new();
    let title = format!("Probabilistic verdict: {}", explanation.test_name);
    out.push_str(&title);
    out.push('\n');
    out.push_str(&"=".repeat(title.len().min(WIDTH)));
    out.push('\n');

    section(&mut out, "HYPOTHESES");
    wrapped(
        &mut out,
        &format!("{}: {}", symbols.h0(), explanation.hypothesis.null),
    );
    wrapped(
        &mut out,
        &format!("{}: {}", symbols.h1(), explanation.hypothesis.alternative),
    );
    wrapped(&mut out, &format!("Test: {}", explanation.hypothesis.test_type));

    section(&mut out, "OBSERVED");
    wrapped(
        &mut out,
        &format!(
            "n = {}, k = {}, {} = {:.4}",
            explanation.observed.samples,
            explanation.observed.successes,
            symbols.p_hat(),
            explanation.observed.observed_rate
        ),
    );

    if let Some(baseline) = &explanation.baseline {
        section(&mut out, "BASELINE");
        let mut source = format!("Source: {}", baseline.source);
        if let Some(at) = &baseline.generated_at {
            source.push_str(&format!(" (generated {at})"));
        }
        wrapped(&mut out, &source);
        wrapped(
            &mut out,
            &format!(
                "Basis: {} successes in {} samples (rate {:.4})",
                baseline.successes, baseline.samples, baseline.observed_rate
            ),
        );
        wrapped(&mut out, &format!("Derivation: {}", baseline.derivation));
        wrapped(
            &mut out,
            &format!("Required rate {}: {:.4}", symbols.pi0(), baseline.threshold),
        );
    }

    section(&mut out, "INFERENCE");
    wrapped(
        &mut out,
        &format!(
            "SE = {:.4}, {:.0}% CI [{:.4}, {:.4}]",
            explanation.inference.standard_error,
            explanation.inference.confidence_level * 100.0,
            explanation.inference.ci_lower,
            explanation.inference.ci_upper
        ),
    );
    match (
        explanation.inference.z_statistic,
        explanation.inference.p_value,
    ) {
        (Some(z), Some(p)) => {
            wrapped(&mut out, &format!("z = {z:.3}, one-sided p = {p:.4}"));
        }
        _ => {
            wrapped(
                &mut out,
                &format!(
                    "z undefined for a degenerate required rate ({} at 0 or 1)",
                    symbols.pi0()
                ),
            );
        }
    }

    section(&mut out, "VERDICT");
    wrapped(&mut out, &explanation.verdict.technical);
    wrapped(&mut out, &explanation.verdict.plain_english);

    if !explanation.verdict.caveats.is_empty() {
        section(&mut out, "CAVEATS");
        for (i, caveat) in explanation.verdict.caveats.iter().enumerate() {
            wrapped(&mut out, &format!("{}. {caveat}", i + 1));
        }
    }

    section(&mut out, "PROVENANCE");
    wrapped(
        &mut out,
        &format!("Threshold origin: {}", explanation.provenance.threshold_origin),
    );
    if let Some(contract) = &explanation.provenance.contract_ref {
        wrapped(&mut out, &format!("Contract: {contract}"));
    }

    out
}

fn section(out: &mut String, label: &str) {
    out.push('\n');
    out.push_str(label);
    out.push('\n');
}

/// Append `text` indented two spaces, wrapped to the column budget.
fn wrapped(out: &mut String, text: &str) {
    const INDENT: &str = "  ";
    let budget = WIDTH - INDENT.len();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > budget {
            out.push_str(INDENT);
            out.push_str(&line);
            out.push('\n');
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        out.push_str(INDENT);
        out.push_str(&line);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::{
        HypothesisStatement, ObservedData, Provenance, StatisticalInference,
        VerdictInterpretation,
    };

    fn explanation() -> StatisticalExplanation {
        StatisticalExplanation {
            test_name: "extract_invoice_totals".into(),
            hypothesis: HypothesisStatement {
                null: "the system meets the SLA requirement (rate >= 0.9500)".into(),
                alternative: "the system violates the SLA (rate < 0.9500)".into(),
                test_type: "one-sided binomial proportion test against the required rate".into(),
            },
            observed: ObservedData {
                samples: 100,
                successes: 97,
                observed_rate: 0.97,
            },
            baseline: None,
            inference: StatisticalInference {
                standard_error: 0.0171,
                ci_lower: 0.9153,
                ci_upper: 0.9906,
                confidence_level: 0.95,
                z_statistic: Some(0.918),
                p_value: Some(0.8206),
            },
            verdict: VerdictInterpretation {
                passed: true,
                technical: "PASS: observed rate 0.9700 >= required rate 0.9500 over 100 samples"
                    .into(),
                plain_english: "No evidence of an SLA violation at this sample size.".into(),
                caveats: vec![
                    "Slim margin: the observed rate exceeds the required rate by only 0.0200."
                        .into(),
                ],
            },
            provenance: Provenance {
                threshold_origin: "SLA".into(),
                contract_ref: Some("MSA-2026-114 section 4.2".into()),
            },
        }
    }

    #[test]
    fn all_lines_fit_the_column_budget() {
        let text = render(&explanation(), SymbolSet::Ascii);
        for line in text.lines() {
            assert!(
                line.chars().count() <= WIDTH,
                "line exceeds {WIDTH} columns: '{line}'"
            );
        }
    }

    #[test]
    fn sections_appear_in_order() {
        let text = render(&explanation(), SymbolSet::Ascii);
        let positions: Vec<_> = ["HYPOTHESES", "OBSERVED", "INFERENCE", "VERDICT", "CAVEATS", "PROVENANCE"]
            .iter()
            .map(|s| text.find(s).unwrap_or_else(|| panic!("missing section {s}")))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted, "sections out of order");
    }

    #[test]
    fn ascii_mode_uses_plain_symbols() {
        let text = render(&explanation(), SymbolSet::Ascii);
        assert!(text.contains("H0:"));
        assert!(text.contains("p-hat = 0.9700"));
        assert!(text.is_ascii());
    }

    #[test]
    fn unicode_mode_uses_math_symbols() {
        let text = render(&explanation(), SymbolSet::Unicode);
        assert!(text.contains("H\u{2080}:"));
        assert!(text.contains("p\u{302} = 0.9700"));
    }

    #[test]
    fn caveats_are_numbered() {
        let text = render(&explanation(), SymbolSet::Ascii);
        assert!(text.contains("1. Slim margin"));
    }

    #[test]
    fn degenerate_z_renders_a_note_instead_of_numbers() {
        let mut e = explanation();
        e.inference.z_statistic = None;
        e.inference.p_value = None;
        let text = render(&e, SymbolSet::Ascii);
        assert!(text.contains("z undefined"));
    }
}
