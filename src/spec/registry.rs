//! Spec registry - a concurrent cache of approved specifications
//!
//! Specs live as TOML (or JSON) files in a registry directory, one file per
//! use-case version, with the version embedded in the filename:
//! `{use_case_id}_v{version}.toml`. Entries are validated at load time and
//! published immutably behind `Arc`, so concurrent readers share them
//! without further locking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::error::PunitError;
use crate::spec::ApprovedSpec;
use crate::types::SpecRef;

/// Loads and caches approved specifications by `(use_case_id, version)`.
#[derive(Debug)]
pub struct SpecRegistry {
    root: PathBuf,
    cache: RwLock<HashMap<(String, String), Arc<ApprovedSpec>>>,
}

impl SpecRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load a spec, from cache when possible.
    ///
    /// # Errors
    /// `SpecificationNotFound` when no file exists for the reference;
    /// `SpecificationNotApproved` / `SpecificationMalformed` per load-time
    /// validation; parse and IO errors pass through.
    pub fn load(&self, spec_ref: &SpecRef) -> Result<Arc<ApprovedSpec>, PunitError> {
        let key = (spec_ref.use_case_id.clone(), spec_ref.version.clone());

        if let Ok(cache) = self.cache.read() {
            if let Some(spec) = cache.get(&key) {
                debug!(spec = %spec_ref, "spec served from cache");
                return Ok(Arc::clone(spec));
            }
        }

        let spec = Arc::new(self.load_from_disk(spec_ref)?);
        if let Ok(mut cache) = self.cache.write() {
            // A racing loader may have published first; keep the existing
            // entry so all readers share one instance
            let entry = cache.entry(key).or_insert_with(|| Arc::clone(&spec));
            return Ok(Arc::clone(entry));
        }
        Ok(spec)
    }

    fn load_from_disk(&self, spec_ref: &SpecRef) -> Result<ApprovedSpec, PunitError> {
        let stem = format!("{}_v{}", spec_ref.use_case_id, spec_ref.version);
        let toml_path = self.root.join(format!("{stem}.toml"));
        let json_path = self.root.join(format!("{stem}.json"));

        let spec: ApprovedSpec = if toml_path.exists() {
            let contents = std::fs::read_to_string(&toml_path)?;
            toml::from_str(&contents)?
        } else if json_path.exists() {
            let contents = std::fs::read_to_string(&json_path)?;
            serde_json::from_str(&contents)?
        } else {
            return Err(PunitError::SpecificationNotFound {
                use_case_id: spec_ref.use_case_id.clone(),
                version: spec_ref.version.clone(),
            });
        };

        if spec.use_case_id != spec_ref.use_case_id || spec.version != spec_ref.version {
            return Err(PunitError::SpecificationMalformed(format!(
                "file {stem} declares {} v{}, expected {}",
                spec.use_case_id, spec.version, spec_ref
            )));
        }
        spec.validate()?;

        info!(
            spec = %spec_ref,
            approved_by = spec.approved_by.as_deref().unwrap_or(""),
            "loaded approved specification"
        );
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC_TOML: &str = r#"
spec_id = "summarize-1.2"
use_case_id = "summarize"
version = "1.2"
approved_at = "2026-05-14T09:30:00Z"
approved_by = "qa-lead"

[requirements]
min_pass_rate = 0.92

[regression_threshold.experimental_basis]
samples = 500
successes = 470
observed_rate = 0.94
standard_error = 0.0106
"#;

    fn registry_with_spec() -> (tempfile::TempDir, SpecRegistry) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("summarize_v1.2.toml"), SPEC_TOML).unwrap();
        let registry = SpecRegistry::new(dir.path());
        (dir, registry)
    }

    #[test]
    fn loads_and_caches_a_toml_spec() {
        let (_dir, registry) = registry_with_spec();
        let spec_ref = SpecRef::new("summarize", "1.2");
        let first = registry.load(&spec_ref).unwrap();
        assert_eq!(first.requirements.min_pass_rate, 0.92);
        let second = registry.load(&spec_ref).unwrap();
        assert!(
            Arc::ptr_eq(&first, &second),
            "second load should come from the cache"
        );
    }

    #[test]
    fn missing_spec_reports_not_found() {
        let (_dir, registry) = registry_with_spec();
        let err = registry.load(&SpecRef::new("summarize", "9.9")).unwrap_err();
        assert!(matches!(err, PunitError::SpecificationNotFound { .. }));
    }

    #[test]
    fn unapproved_spec_is_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let unapproved = SPEC_TOML.replace("approved_by = \"qa-lead\"\n", "");
        std::fs::write(dir.path().join("summarize_v1.2.toml"), unapproved).unwrap();
        let registry = SpecRegistry::new(dir.path());
        let err = registry.load(&SpecRef::new("summarize", "1.2")).unwrap_err();
        assert!(matches!(err, PunitError::SpecificationNotApproved(_)));
    }

    #[test]
    fn mismatched_identity_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        // File named for v2.0 but declaring v1.2
        std::fs::write(dir.path().join("summarize_v2.0.toml"), SPEC_TOML).unwrap();
        let registry = SpecRegistry::new(dir.path());
        let err = registry.load(&SpecRef::new("summarize", "2.0")).unwrap_err();
        assert!(matches!(err, PunitError::SpecificationMalformed(_)));
    }

    #[test]
    fn json_fallback_is_supported() {
        let dir = tempfile::tempdir().unwrap();
        let json = serde_json::json!({
            "spec_id": "classify-2.0",
            "use_case_id": "classify",
            "version": "2.0",
            "approved_at": "2026-04-01T12:00:00Z",
            "approved_by": "qa-lead",
            "requirements": { "min_pass_rate": 0.85 }
        });
        std::fs::write(
            dir.path().join("classify_v2.0.json"),
            serde_json::to_string_pretty(&json).unwrap(),
        )
        .unwrap();
        let registry = SpecRegistry::new(dir.path());
        let spec = registry.load(&SpecRef::new("classify", "2.0")).unwrap();
        assert_eq!(spec.requirements.min_pass_rate, 0.85);
        assert!(spec.basis().is_none());
    }
}
