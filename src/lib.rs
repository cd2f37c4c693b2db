//! PUnit: Probabilistic Unit Testing Core
//!
//! Replicated execution with statistically qualified verdicts for
//! non-deterministic subjects (LLMs, ML models, randomized algorithms,
//! networked services).
//!
//! ## Architecture
//!
//! - **Statistics kernel**: Wilson/normal proportion bounds, one-sided
//!   z-test, feasibility sizing
//! - **Budget monitors**: time and token limits at method, class, and suite
//!   scope
//! - **Sample scheduler**: sequential replication with pacing and early
//!   termination (success guarantee, impossibility, budget exhaustion)
//! - **Threshold pipeline**: inline thresholds, or Wilson-derived ones from
//!   approved specification baselines
//! - **Explanation**: structured statistical record plus a 78-column console
//!   rendering
//!
//! ## Usage
//!
//! ```ignore
//! use punit::{run_probabilistic_test, EngineContext, RuntimeFlags, TestDeclaration};
//!
//! let declaration = TestDeclaration::named("summarize_call")
//!     .with_samples(20)
//!     .with_min_pass_rate(0.9);
//! let outcome = run_probabilistic_test(
//!     &declaration,
//!     &RuntimeFlags::new(),
//!     &EngineContext::default(),
//!     |ctx| {
//!         ctx.record_tokens(1200);
//!         run_subject_once()
//!     },
//! )?;
//! assert!(outcome.verdict.passed, "{}", outcome.failure.unwrap_or_default());
//! ```

pub mod budget;
pub mod config;
pub mod engine;
pub mod error;
pub mod explain;
pub mod report;
pub mod spec;
pub mod stats;
pub mod types;

// Re-export the entry point and its collaborators
pub use engine::{run_probabilistic_test, EngineContext, SampleContext, TestOutcome};

// Re-export commonly used types
pub use types::{
    BudgetExhaustedPolicy, BudgetScope, ExceptionPolicy, PacingSpec, SampleOutcome, SampleStatus,
    SpecRef, TerminationReason, TestIntent, ThresholdOrigin, TokenMode, Verdict,
};

// Re-export configuration surface
pub use config::{RuntimeFlags, TestDeclaration};

// Re-export error taxonomy
pub use error::{PunitError, SampleError, SampleResult};

// Re-export explanation records and rendering
pub use explain::{render, StatisticalExplanation, SymbolSet};

// Re-export spec registry
pub use spec::registry::SpecRegistry;
pub use spec::threshold::DerivationPolicy;
