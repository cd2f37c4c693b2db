//! Runtime flags - the highest-precedence configuration source
//!
//! The host process collects `punit.*` properties (from its own CLI, build
//! tool, or launcher) into a `RuntimeFlags` map. Values are strings with
//! standard numeric semantics; booleans accept `true`/`false`.

use std::collections::HashMap;

/// Process-level `punit.*` flag values keyed by dotted flag name.
#[derive(Debug, Clone, Default)]
pub struct RuntimeFlags {
    values: HashMap<String, String>,
}

impl RuntimeFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an iterator of `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Parse a flag value, silently treating unparsable values as absent.
    /// The resolver performs the strict parse that reports errors; this
    /// lenient accessor is for optional lookups (suite limits, pacing).
    pub fn get_parsed<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|s| s.trim().parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_round_trip() {
        let mut flags = RuntimeFlags::new();
        flags.set("punit.samples", "50");
        assert_eq!(flags.get("punit.samples"), Some("50"));
        assert_eq!(flags.get_parsed::<u32>("punit.samples"), Some(50));
        assert_eq!(flags.get("punit.minPassRate"), None);
    }

    #[test]
    fn unparsable_values_read_as_absent() {
        let flags = RuntimeFlags::from_pairs([("punit.samples", "many")]);
        assert_eq!(flags.get_parsed::<u32>("punit.samples"), None);
    }

    #[test]
    fn whitespace_is_tolerated() {
        let flags = RuntimeFlags::from_pairs([("punit.tokenBudget", " 500 ")]);
        assert_eq!(flags.get_parsed::<u64>("punit.tokenBudget"), Some(500));
    }
}
