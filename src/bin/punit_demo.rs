//! PUnit Demo
//!
//! Runs a simulated non-deterministic subject through the probabilistic
//! engine and prints the rendered statistical explanation plus the report
//! stream. Useful for exercising thresholds, budgets, and pacing without a
//! real model behind the test.
//!
//! # Usage
//! ```bash
//! ./punit-demo --samples 50 --min-pass-rate 0.9 --failure-probability 0.08
//! ./punit-demo --samples 100 --token-charge 150 --token-budget 5000
//! ```

use anyhow::Result;
use clap::Parser;
use rand::prelude::*;
use rand::rngs::StdRng;

use punit::{
    run_probabilistic_test, BudgetExhaustedPolicy, EngineContext, RuntimeFlags, SampleError,
    SymbolSet, TestDeclaration, TestIntent, ThresholdOrigin,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "punit-demo")]
#[command(about = "Probabilistic test engine demo against a simulated flaky subject")]
#[command(version = "0.1")]
struct Args {
    /// Replications of the simulated subject
    #[arg(short, long, default_value = "50")]
    samples: u32,

    /// Required pass rate in [0, 1]
    #[arg(short, long, default_value = "0.9")]
    min_pass_rate: f64,

    /// Probability that one invocation of the subject fails
    #[arg(short, long, default_value = "0.05")]
    failure_probability: f64,

    /// Probability that one invocation faults (non-assertion error)
    #[arg(long, default_value = "0.0")]
    fault_probability: f64,

    /// Tokens each invocation reports to the recorder (0 = none)
    #[arg(long, default_value = "0")]
    tokens_per_sample: u64,

    /// Static per-sample token charge (0 = none)
    #[arg(long, default_value = "0")]
    token_charge: u64,

    /// Method token budget (0 = unlimited)
    #[arg(long, default_value = "0")]
    token_budget: u64,

    /// Method time budget in ms (0 = unlimited)
    #[arg(long, default_value = "0")]
    time_budget_ms: u64,

    /// Evaluate the partial run instead of failing on budget exhaustion
    #[arg(long)]
    evaluate_partial: bool,

    /// Minimum milliseconds between samples
    #[arg(long, default_value = "0")]
    min_ms_per_sample: u64,

    /// Threshold origin: sla, slo, policy, empirical, unspecified
    #[arg(long, default_value = "unspecified")]
    origin: String,

    /// Declare smoke intent (softened, non-compliance language)
    #[arg(long)]
    smoke: bool,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Force ASCII symbols in the rendered explanation
    #[arg(long)]
    ascii: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let origin = ThresholdOrigin::parse(&args.origin)
        .ok_or_else(|| anyhow::anyhow!("unknown threshold origin '{}'", args.origin))?;

    let mut declaration = TestDeclaration::named("simulated_flaky_subject")
        .with_samples(args.samples)
        .with_min_pass_rate(args.min_pass_rate);
    declaration.threshold_origin = origin;
    declaration.intent = if args.smoke {
        TestIntent::Smoke
    } else {
        TestIntent::Verification
    };
    declaration.token_charge = args.token_charge;
    declaration.token_budget = args.token_budget;
    declaration.time_budget_ms = args.time_budget_ms;
    if args.evaluate_partial {
        declaration.on_budget_exhausted = BudgetExhaustedPolicy::EvaluatePartial;
    }
    if args.min_ms_per_sample > 0 {
        declaration.pacing = Some(punit::PacingSpec {
            min_ms_per_sample: Some(args.min_ms_per_sample),
            ..punit::PacingSpec::default()
        });
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let outcome = run_probabilistic_test(
        &declaration,
        &RuntimeFlags::new(),
        &EngineContext::default(),
        |ctx| {
            if args.tokens_per_sample > 0 {
                ctx.record_tokens(args.tokens_per_sample);
            }
            let roll: f64 = rng.gen();
            if roll < args.fault_probability {
                Err(SampleError::fault("simulated upstream outage"))
            } else if roll < args.fault_probability + args.failure_probability {
                Err(SampleError::assertion(format!(
                    "simulated wrong answer on sample {}",
                    ctx.index()
                )))
            } else {
                Ok(())
            }
        },
    )?;

    let rendered = if args.ascii {
        punit::render(&outcome.explanation, SymbolSet::Ascii)
    } else {
        outcome
            .rendered
            .clone()
            .unwrap_or_else(|| punit::render(&outcome.explanation, SymbolSet::detect()))
    };
    println!("{rendered}");
    println!("REPORT");
    print!("{}", outcome.report);

    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    if let Some(failure) = &outcome.failure {
        eprintln!("\n{failure}");
        std::process::exit(1);
    }
    Ok(())
}
