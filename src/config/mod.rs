//! Test configuration module
//!
//! A probabilistic test starts from a `TestDeclaration` (the values the test
//! author wrote), which the resolver merges with runtime flags and
//! environment variables into an immutable `ResolvedConfig`.
//!
//! ## Precedence (highest first)
//!
//! 1. Runtime flag (`punit.samples`, `punit.minPassRate`, ...)
//! 2. Environment variable (`PUNIT_SAMPLES`, `PUNIT_MIN_PASS_RATE`, ...)
//! 3. Declaration value
//! 4. Framework default
//!
//! A process-level `samples_multiplier` (flag/env only) scales the sample
//! count after merging. Validation runs at resolve time and rejects bad
//! configurations with `InvalidConfiguration`, naming the offending source.

pub mod declaration;
pub mod defaults;
pub mod flags;
pub mod resolver;
pub mod validation;

pub use declaration::TestDeclaration;
pub use flags::RuntimeFlags;
pub use resolver::{resolve, ResolvedConfig, Resolution};
pub use validation::ValidationWarning;
