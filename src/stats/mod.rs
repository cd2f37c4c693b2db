//! Statistics module for binomial proportion inference
//!
//! Pure numerical routines over `(k successes in n trials)` at a declared
//! confidence level. Two halves:
//! - `kernel`: Wilson score and normal-approximation bounds, standard error,
//!   one-sided z-test, z lookup, and interval-method selection
//! - `feasibility`: minimum-sample sizing for high-reliability targets
//!
//! All routines are deterministic, allocate nothing beyond scalars, and clamp
//! proportion outputs to `[0, 1]`. Degenerate inputs produce zeroed values
//! rather than NaN.

pub mod feasibility;
pub mod kernel;

pub use feasibility::{evaluate as evaluate_feasibility, Feasibility};
pub use kernel::{
    normal_lower_bound, one_sided_p_value_upper, select_method, standard_error, wilson_interval,
    wilson_lower_bound, wilson_upper_bound, z_score, z_statistic, BoundMethod,
};
