//! Budget tracking across the three nested scopes
//!
//! - `monitor`: per-invocation `MethodMonitor` and `Arc`-shared
//!   `SharedMonitor` (class / suite) with additive, never-rolled-back
//!   counters, plus the `ScopeChain` that enforces exhaustion precedence
//! - `suite`: lazy process-wide suite monitor
//! - `recorder`: per-sample token accumulator feeding the monitors at
//!   sample boundaries
//!
//! Consumption reflects resource use, not success: tokens burned by a
//! failing sample still count against every active scope.

pub mod monitor;
pub mod recorder;
pub mod suite;

pub use monitor::{BudgetLimits, MethodMonitor, ScopeChain, SharedMonitor};
pub use recorder::TokenRecorder;
pub use suite::{process_suite_monitor, suite_limits_from};
