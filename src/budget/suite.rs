//! Process-wide suite budget monitor
//!
//! The suite monitor spans every probabilistic test in the process. It is
//! created lazily on first use with limits resolved from runtime flags and
//! environment variables, and lives until process exit. Tests receive it
//! through their `ScopeChain` rather than reading the global directly, so
//! alternative monitors can be injected in tests.

use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::budget::monitor::{BudgetLimits, SharedMonitor};
use crate::config::flags::RuntimeFlags;

static SUITE_MONITOR: OnceLock<Arc<SharedMonitor>> = OnceLock::new();

/// Resolve suite-scope limits from flags and environment.
///
/// Precedence per axis: `punit.suite.timeBudgetMs` / `punit.suite.tokenBudget`
/// runtime flag, then `PUNIT_SUITE_TIME_BUDGET_MS` / `PUNIT_SUITE_TOKEN_BUDGET`
/// environment variable, then unlimited.
pub fn suite_limits_from(flags: &RuntimeFlags) -> BudgetLimits {
    let time_budget_ms = flags
        .get_parsed::<u64>("punit.suite.timeBudgetMs")
        .or_else(|| env_parsed("PUNIT_SUITE_TIME_BUDGET_MS"))
        .unwrap_or(0);
    let token_budget = flags
        .get_parsed::<u64>("punit.suite.tokenBudget")
        .or_else(|| env_parsed("PUNIT_SUITE_TOKEN_BUDGET"))
        .unwrap_or(0);
    BudgetLimits::new(time_budget_ms, token_budget)
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// The process-wide suite monitor, created on first call.
///
/// Limits are fixed at first resolution; later calls return the same monitor
/// regardless of the flags passed.
pub fn process_suite_monitor(flags: &RuntimeFlags) -> Arc<SharedMonitor> {
    Arc::clone(SUITE_MONITOR.get_or_init(|| {
        let limits = suite_limits_from(flags);
        if !limits.is_unlimited() {
            info!(
                time_budget_ms = limits.time_budget_ms,
                token_budget = limits.token_budget,
                "suite budget monitor initialized"
            );
        }
        Arc::new(SharedMonitor::new(limits))
    }))
}
