//! Budget monitors for the method, class, and suite scopes
//!
//! A monitor tracks wall-clock elapsed and token consumption against limits
//! (zero means unlimited on that axis). The method monitor has a single
//! owner and needs no synchronization; class and suite monitors are shared
//! between concurrently running test methods, so their counters are atomic
//! and strictly additive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::types::{BudgetScope, TerminationReason};

/// Time and token limits for one scope. Zero disables the axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudgetLimits {
    pub time_budget_ms: u64,
    pub token_budget: u64,
}

impl BudgetLimits {
    pub fn new(time_budget_ms: u64, token_budget: u64) -> Self {
        Self {
            time_budget_ms,
            token_budget,
        }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn is_unlimited(&self) -> bool {
        self.time_budget_ms == 0 && self.token_budget == 0
    }
}

/// Token exhaustion test shared by both monitor flavors.
///
/// With a positive projection (static pre-sample check) the budget is
/// exhausted when the projected total would exceed the limit. With a zero
/// projection (dynamic post-sample check) reaching the limit suffices.
fn tokens_exhausted_at(consumed: u64, projected_extra: u64, limit: u64) -> bool {
    if limit == 0 {
        return false;
    }
    if projected_extra > 0 {
        consumed.saturating_add(projected_extra) > limit
    } else {
        consumed >= limit
    }
}

fn time_exhausted_at(elapsed_ms: u64, limit_ms: u64) -> bool {
    limit_ms > 0 && elapsed_ms >= limit_ms
}

// ============================================================================
// Method Monitor (single owner)
// ============================================================================

/// Budget monitor owned by one test invocation.
///
/// Elapsed time is anchored to the invocation's start `Instant` and refreshed
/// via [`MethodMonitor::update_elapsed`]; token consumption is pushed in by
/// the scheduler at sample boundaries.
#[derive(Debug)]
pub struct MethodMonitor {
    limits: BudgetLimits,
    started: Instant,
    elapsed_ms: u64,
    tokens_consumed: u64,
}

impl MethodMonitor {
    pub fn new(limits: BudgetLimits) -> Self {
        Self {
            limits,
            started: Instant::now(),
            elapsed_ms: 0,
            tokens_consumed: 0,
        }
    }

    pub fn add_tokens(&mut self, delta: u64) {
        self.tokens_consumed = self.tokens_consumed.saturating_add(delta);
    }

    /// Refresh the elapsed counter from the wall clock; returns the delta
    /// since the previous refresh, for propagation to enclosing scopes.
    pub fn update_elapsed(&mut self) -> u64 {
        let now_ms = self.started.elapsed().as_millis() as u64;
        let delta = now_ms.saturating_sub(self.elapsed_ms);
        self.elapsed_ms = now_ms;
        delta
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn tokens_consumed(&self) -> u64 {
        self.tokens_consumed
    }

    pub fn time_exhausted(&self) -> bool {
        time_exhausted_at(self.elapsed_ms, self.limits.time_budget_ms)
    }

    pub fn tokens_exhausted(&self, projected_extra: u64) -> bool {
        tokens_exhausted_at(
            self.tokens_consumed,
            projected_extra,
            self.limits.token_budget,
        )
    }

    /// Remaining tokens, `None` when the axis is unlimited
    pub fn remaining_tokens(&self) -> Option<u64> {
        (self.limits.token_budget > 0)
            .then(|| self.limits.token_budget.saturating_sub(self.tokens_consumed))
    }

    /// Remaining time in ms, `None` when the axis is unlimited
    pub fn remaining_time_ms(&self) -> Option<u64> {
        (self.limits.time_budget_ms > 0)
            .then(|| self.limits.time_budget_ms.saturating_sub(self.elapsed_ms))
    }

    pub fn limits(&self) -> BudgetLimits {
        self.limits
    }
}

// ============================================================================
// Shared Monitor (class / suite)
// ============================================================================

/// Budget monitor shared between concurrently running test methods.
///
/// Counters only ever grow, so exhaustion checks are plain reads after
/// `fetch_add` publication; no compare-and-swap loop is needed.
#[derive(Debug)]
pub struct SharedMonitor {
    limits: BudgetLimits,
    elapsed_ms: AtomicU64,
    tokens_consumed: AtomicU64,
}

impl SharedMonitor {
    pub fn new(limits: BudgetLimits) -> Self {
        Self {
            limits,
            elapsed_ms: AtomicU64::new(0),
            tokens_consumed: AtomicU64::new(0),
        }
    }

    pub fn add_tokens(&self, delta: u64) {
        self.tokens_consumed.fetch_add(delta, Ordering::AcqRel);
    }

    pub fn add_elapsed_ms(&self, delta: u64) {
        self.elapsed_ms.fetch_add(delta, Ordering::AcqRel);
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms.load(Ordering::Acquire)
    }

    pub fn tokens_consumed(&self) -> u64 {
        self.tokens_consumed.load(Ordering::Acquire)
    }

    pub fn time_exhausted(&self) -> bool {
        time_exhausted_at(self.elapsed_ms(), self.limits.time_budget_ms)
    }

    pub fn tokens_exhausted(&self, projected_extra: u64) -> bool {
        tokens_exhausted_at(
            self.tokens_consumed(),
            projected_extra,
            self.limits.token_budget,
        )
    }

    pub fn remaining_tokens(&self) -> Option<u64> {
        (self.limits.token_budget > 0)
            .then(|| self.limits.token_budget.saturating_sub(self.tokens_consumed()))
    }

    pub fn remaining_time_ms(&self) -> Option<u64> {
        (self.limits.time_budget_ms > 0)
            .then(|| self.limits.time_budget_ms.saturating_sub(self.elapsed_ms()))
    }

    pub fn limits(&self) -> BudgetLimits {
        self.limits
    }
}

// ============================================================================
// Scope Chain
// ============================================================================

/// The monitors active for one test invocation: an owned method monitor and
/// optional shared class / suite monitors.
///
/// Exhaustion precedence is fixed: suite time, suite tokens, class time,
/// class tokens, method time, method tokens. The first exhausted axis
/// determines the termination reason.
#[derive(Debug)]
pub struct ScopeChain {
    pub method: MethodMonitor,
    pub class: Option<Arc<SharedMonitor>>,
    pub suite: Option<Arc<SharedMonitor>>,
}

impl ScopeChain {
    /// A chain with only the method scope active
    pub fn method_only(limits: BudgetLimits) -> Self {
        Self {
            method: MethodMonitor::new(limits),
            class: None,
            suite: None,
        }
    }

    pub fn new(
        method_limits: BudgetLimits,
        class: Option<Arc<SharedMonitor>>,
        suite: Option<Arc<SharedMonitor>>,
    ) -> Self {
        Self {
            method: MethodMonitor::new(method_limits),
            class,
            suite,
        }
    }

    /// Add token consumption to the method scope and every active enclosing
    /// scope. Never rolled back.
    pub fn add_tokens(&mut self, delta: u64) {
        if delta == 0 {
            return;
        }
        self.method.add_tokens(delta);
        if let Some(class) = &self.class {
            class.add_tokens(delta);
        }
        if let Some(suite) = &self.suite {
            suite.add_tokens(delta);
        }
    }

    /// Refresh method elapsed from the wall clock and propagate the delta to
    /// the enclosing scopes.
    pub fn refresh_elapsed(&mut self) {
        let delta = self.method.update_elapsed();
        if delta == 0 {
            return;
        }
        if let Some(class) = &self.class {
            class.add_elapsed_ms(delta);
        }
        if let Some(suite) = &self.suite {
            suite.add_elapsed_ms(delta);
        }
    }

    /// First exhausted axis in precedence order, if any.
    ///
    /// `projected_tokens` is the static pre-sample charge; pass 0 for the
    /// dynamic post-sample check.
    pub fn first_exhausted(&self, projected_tokens: u64) -> Option<TerminationReason> {
        if let Some(suite) = &self.suite {
            if suite.time_exhausted() {
                return Some(BudgetScope::Suite.time_budget_reason());
            }
            if suite.tokens_exhausted(projected_tokens) {
                return Some(BudgetScope::Suite.token_budget_reason());
            }
        }
        if let Some(class) = &self.class {
            if class.time_exhausted() {
                return Some(BudgetScope::Class.time_budget_reason());
            }
            if class.tokens_exhausted(projected_tokens) {
                return Some(BudgetScope::Class.token_budget_reason());
            }
        }
        if self.method.time_exhausted() {
            return Some(BudgetScope::Method.time_budget_reason());
        }
        if self.method.tokens_exhausted(projected_tokens) {
            return Some(BudgetScope::Method.token_budget_reason());
        }
        None
    }

    /// First exhausted *time* axis only; used during pacing sleeps, where
    /// token consumption cannot change.
    pub fn first_time_exhausted(&self) -> Option<TerminationReason> {
        if let Some(suite) = &self.suite {
            if suite.time_exhausted() {
                return Some(BudgetScope::Suite.time_budget_reason());
            }
        }
        if let Some(class) = &self.class {
            if class.time_exhausted() {
                return Some(BudgetScope::Class.time_budget_reason());
            }
        }
        if self.method.time_exhausted() {
            return Some(BudgetScope::Method.time_budget_reason());
        }
        None
    }
}
