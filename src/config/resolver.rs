//! Multi-source configuration resolution
//!
//! Merges runtime flags, environment variables, the test declaration, and
//! framework defaults in fixed precedence, applies the process-level
//! samples multiplier, validates the result, and freezes it into a
//! `ResolvedConfig` owned by the test invocation.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::declaration::TestDeclaration;
use crate::config::defaults;
use crate::config::flags::RuntimeFlags;
use crate::config::validation::{self, ValidationWarning};
use crate::error::PunitError;
use crate::types::{
    BudgetExhaustedPolicy, ExceptionPolicy, PacingSpec, SpecRef, TestIntent, ThresholdOrigin,
};

/// Immutable per-invocation configuration, produced once at test start.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub test_name: String,
    /// Effective sample count, after the samples multiplier
    pub samples: u32,
    pub min_pass_rate: f64,
    pub spec_ref: Option<SpecRef>,
    pub threshold_confidence: f64,
    pub threshold_origin: ThresholdOrigin,
    pub contract_ref: Option<String>,
    pub intent: TestIntent,
    pub time_budget_ms: u64,
    pub token_charge: u64,
    pub token_budget: u64,
    pub on_budget_exhausted: BudgetExhaustedPolicy,
    pub on_exception: ExceptionPolicy,
    pub max_example_failures: usize,
    pub pacing: Option<PacingSpec>,
    /// Whether the rendered statistical explanation accompanies the report
    pub stats_transparent: bool,
}

/// Resolver output: the frozen config plus non-fatal warnings for the report.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: ResolvedConfig,
    pub warnings: Vec<ValidationWarning>,
}

// ============================================================================
// Source readers
// ============================================================================

/// One configuration key's flag and environment spellings.
struct Key {
    flag: &'static str,
    env: &'static str,
}

impl Key {
    const fn new(flag: &'static str, env: &'static str) -> Self {
        Self { flag, env }
    }

    /// Highest-precedence raw value and the name of the source it came from.
    fn lookup<'a>(&self, flags: &'a RuntimeFlags) -> Option<(String, String)> {
        if let Some(v) = flags.get(self.flag) {
            return Some((v.to_string(), format!("flag {}", self.flag)));
        }
        if let Ok(v) = std::env::var(self.env) {
            return Some((v, format!("env {}", self.env)));
        }
        None
    }

    fn parse<T: std::str::FromStr>(
        &self,
        flags: &RuntimeFlags,
        type_name: &str,
    ) -> Result<Option<T>, PunitError> {
        match self.lookup(flags) {
            None => Ok(None),
            Some((raw, source)) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                PunitError::InvalidConfiguration(format!(
                    "{source}: '{raw}' is not a valid {type_name}"
                ))
            }),
        }
    }
}

const KEY_SAMPLES: Key = Key::new("punit.samples", "PUNIT_SAMPLES");
const KEY_MIN_PASS_RATE: Key = Key::new("punit.minPassRate", "PUNIT_MIN_PASS_RATE");
const KEY_SAMPLES_MULTIPLIER: Key = Key::new("punit.samplesMultiplier", "PUNIT_SAMPLES_MULTIPLIER");
const KEY_TIME_BUDGET_MS: Key = Key::new("punit.timeBudgetMs", "PUNIT_TIME_BUDGET_MS");
const KEY_TOKEN_CHARGE: Key = Key::new("punit.tokenCharge", "PUNIT_TOKEN_CHARGE");
const KEY_TOKEN_BUDGET: Key = Key::new("punit.tokenBudget", "PUNIT_TOKEN_BUDGET");
const KEY_PACING_MAX_RPS: Key = Key::new("punit.pacing.maxRps", "PUNIT_PACING_MAX_RPS");
const KEY_PACING_MAX_RPM: Key = Key::new("punit.pacing.maxRpm", "PUNIT_PACING_MAX_RPM");
const KEY_PACING_MAX_RPH: Key = Key::new("punit.pacing.maxRph", "PUNIT_PACING_MAX_RPH");
const KEY_PACING_MIN_MS: Key = Key::new(
    "punit.pacing.minMsPerSample",
    "PUNIT_PACING_MIN_MS_PER_SAMPLE",
);
const KEY_STATS_TRANSPARENT: Key = Key::new("punit.stats.transparent", "PUNIT_STATS_TRANSPARENT");

/// Unsigned integer resolution that still rejects negative inputs by name.
fn resolve_unsigned(key: &Key, flags: &RuntimeFlags, fallback: u64) -> Result<u64, PunitError> {
    match key.lookup(flags) {
        None => Ok(fallback),
        Some((raw, source)) => {
            let value: i64 = raw.trim().parse().map_err(|_| {
                PunitError::InvalidConfiguration(format!(
                    "{source}: '{raw}' is not a valid integer"
                ))
            })?;
            if value < 0 {
                return Err(PunitError::InvalidConfiguration(format!(
                    "{source}: {value} is negative"
                )));
            }
            Ok(value as u64)
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve a declaration against runtime flags, the environment, and
/// framework defaults.
///
/// # Errors
/// `InvalidConfiguration` for unparsable or out-of-range values, with the
/// offending source named in the message.
pub fn resolve(decl: &TestDeclaration, flags: &RuntimeFlags) -> Result<Resolution, PunitError> {
    let mut warnings = Vec::new();

    let declared_samples = resolve_unsigned(&KEY_SAMPLES, flags, u64::from(decl.samples))?;
    let min_pass_rate = KEY_MIN_PASS_RATE
        .parse::<f64>(flags, "number")?
        .unwrap_or(decl.min_pass_rate);
    let multiplier = KEY_SAMPLES_MULTIPLIER
        .parse::<f64>(flags, "number")?
        .unwrap_or(defaults::DEFAULT_SAMPLES_MULTIPLIER);
    let time_budget_ms = resolve_unsigned(&KEY_TIME_BUDGET_MS, flags, decl.time_budget_ms)?;
    let token_charge = resolve_unsigned(&KEY_TOKEN_CHARGE, flags, decl.token_charge)?;
    let token_budget = resolve_unsigned(&KEY_TOKEN_BUDGET, flags, decl.token_budget)?;
    let stats_transparent = KEY_STATS_TRANSPARENT
        .parse::<bool>(flags, "boolean")?
        .unwrap_or(defaults::DEFAULT_STATS_TRANSPARENT);

    if multiplier <= 0.0 || !multiplier.is_finite() {
        return Err(PunitError::InvalidConfiguration(format!(
            "samples multiplier must be a positive finite number, got {multiplier}"
        )));
    }

    // Effective sample count: ceil(samples × multiplier), minimum 1 when the
    // declared count was positive
    let samples = scaled_samples(declared_samples, multiplier)?;

    let pacing = resolve_pacing(decl.pacing.as_ref(), flags)?;

    // An inline threshold alongside a spec reference is advisory only; the
    // spec-derived value wins downstream
    if decl.spec_ref.is_some()
        && (decl.min_pass_rate - defaults::DEFAULT_MIN_PASS_RATE).abs() > f64::EPSILON
    {
        let warning = ValidationWarning::new(
            "min_pass_rate",
            format!(
                "inline min_pass_rate {:.4} is superseded by spec reference {}",
                decl.min_pass_rate,
                decl.spec_ref.as_ref().map(ToString::to_string).unwrap_or_default()
            ),
        );
        warn!(field = %warning.field, "{}", warning.message);
        warnings.push(warning);
    }

    let config = ResolvedConfig {
        test_name: decl.test_name.clone(),
        samples,
        min_pass_rate,
        spec_ref: decl.spec_ref.clone(),
        threshold_confidence: decl.threshold_confidence,
        threshold_origin: decl.threshold_origin,
        contract_ref: decl.contract_ref.clone(),
        intent: decl.intent,
        time_budget_ms,
        token_charge,
        token_budget,
        on_budget_exhausted: decl.on_budget_exhausted,
        on_exception: decl.on_exception,
        max_example_failures: decl.max_example_failures,
        pacing,
        stats_transparent,
    };

    validation::validate(&config)?;
    debug!(
        test = %config.test_name,
        samples = config.samples,
        min_pass_rate = config.min_pass_rate,
        "resolved probabilistic test configuration"
    );

    Ok(Resolution { config, warnings })
}

fn scaled_samples(declared: u64, multiplier: f64) -> Result<u32, PunitError> {
    if declared == 0 {
        return Err(PunitError::InvalidConfiguration(
            "samples must be at least 1".to_string(),
        ));
    }
    let scaled = (declared as f64 * multiplier).ceil().max(1.0);
    if scaled > f64::from(u32::MAX) {
        return Err(PunitError::InvalidConfiguration(format!(
            "scaled sample count {scaled} exceeds the supported maximum"
        )));
    }
    Ok(scaled as u32)
}

fn resolve_pacing(
    declared: Option<&PacingSpec>,
    flags: &RuntimeFlags,
) -> Result<Option<PacingSpec>, PunitError> {
    let mut pacing = declared.cloned().unwrap_or_default();

    if let Some(rps) = KEY_PACING_MAX_RPS.parse::<f64>(flags, "number")? {
        pacing.max_per_second = Some(rps);
    }
    if let Some(rpm) = KEY_PACING_MAX_RPM.parse::<f64>(flags, "number")? {
        pacing.max_per_minute = Some(rpm);
    }
    if let Some(rph) = KEY_PACING_MAX_RPH.parse::<f64>(flags, "number")? {
        pacing.max_per_hour = Some(rph);
    }
    if let Some(min_ms) = KEY_PACING_MIN_MS.parse::<u64>(flags, "integer")? {
        pacing.min_ms_per_sample = Some(min_ms);
    }

    for (name, rate) in [
        ("max_per_second", pacing.max_per_second),
        ("max_per_minute", pacing.max_per_minute),
        ("max_per_hour", pacing.max_per_hour),
    ] {
        if let Some(r) = rate {
            if r <= 0.0 || !r.is_finite() {
                return Err(PunitError::InvalidConfiguration(format!(
                    "pacing {name} must be a positive finite rate, got {r}"
                )));
            }
        }
    }

    Ok((pacing.is_active() || pacing.max_concurrent.is_some()).then_some(pacing))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_declaration() -> TestDeclaration {
        TestDeclaration::named("resolver_test")
            .with_samples(10)
            .with_min_pass_rate(0.8)
    }

    #[test]
    fn declaration_values_survive_when_no_overrides() {
        let resolution = resolve(&base_declaration(), &RuntimeFlags::new()).unwrap();
        assert_eq!(resolution.config.samples, 10);
        assert!((resolution.config.min_pass_rate - 0.8).abs() < f64::EPSILON);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn flag_beats_declaration() {
        let mut flags = RuntimeFlags::new();
        flags.set("punit.samples", "25");
        flags.set("punit.minPassRate", "0.6");
        let resolution = resolve(&base_declaration(), &flags).unwrap();
        assert_eq!(resolution.config.samples, 25);
        assert!((resolution.config.min_pass_rate - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn multiplier_scales_and_rounds_up() {
        let mut flags = RuntimeFlags::new();
        flags.set("punit.samplesMultiplier", "2.5");
        let resolution = resolve(&base_declaration(), &flags).unwrap();
        assert_eq!(resolution.config.samples, 25);

        let mut flags = RuntimeFlags::new();
        flags.set("punit.samplesMultiplier", "0.01");
        let resolution = resolve(&base_declaration(), &flags).unwrap();
        // 10 × 0.01 = 0.1 → ceil → 1
        assert_eq!(resolution.config.samples, 1);
    }

    #[test]
    fn unparsable_flag_names_the_source() {
        let mut flags = RuntimeFlags::new();
        flags.set("punit.samples", "lots");
        let err = resolve(&base_declaration(), &flags).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("punit.samples"), "message was: {msg}");
        assert!(msg.contains("lots"), "message was: {msg}");
    }

    #[test]
    fn negative_budget_flag_is_rejected() {
        let mut flags = RuntimeFlags::new();
        flags.set("punit.tokenBudget", "-5");
        let err = resolve(&base_declaration(), &flags).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn charge_exceeding_budget_is_rejected() {
        let mut decl = base_declaration();
        decl.token_charge = 600;
        decl.token_budget = 500;
        let err = resolve(&decl, &RuntimeFlags::new()).unwrap_err();
        assert!(err.to_string().contains("token_charge"));
    }

    #[test]
    fn out_of_range_rate_is_rejected() {
        let mut decl = base_declaration();
        decl.min_pass_rate = 1.2;
        assert!(resolve(&decl, &RuntimeFlags::new()).is_err());
        decl.min_pass_rate = -0.1;
        assert!(resolve(&decl, &RuntimeFlags::new()).is_err());
    }

    #[test]
    fn degenerate_confidence_is_rejected() {
        let mut decl = base_declaration();
        decl.threshold_confidence = 1.0;
        assert!(resolve(&decl, &RuntimeFlags::new()).is_err());
        decl.threshold_confidence = 0.0;
        assert!(resolve(&decl, &RuntimeFlags::new()).is_err());
    }

    #[test]
    fn spec_ref_with_inline_rate_warns_once() {
        let mut decl = base_declaration();
        decl.spec_ref = Some(SpecRef::new("extraction", "1.0"));
        let resolution = resolve(&decl, &RuntimeFlags::new()).unwrap();
        assert_eq!(resolution.warnings.len(), 1);
        assert!(resolution.warnings[0].message.contains("superseded"));
    }

    #[test]
    fn pacing_flags_create_pacing_when_undeclared() {
        let mut flags = RuntimeFlags::new();
        flags.set("punit.pacing.maxRpm", "30");
        let resolution = resolve(&base_declaration(), &flags).unwrap();
        let pacing = resolution.config.pacing.unwrap();
        assert_eq!(pacing.max_per_minute, Some(30.0));
    }

    #[test]
    fn zero_rate_pacing_is_rejected() {
        let mut flags = RuntimeFlags::new();
        flags.set("punit.pacing.maxRps", "0");
        assert!(resolve(&base_declaration(), &flags).is_err());
    }
}
