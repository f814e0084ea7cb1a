//! Enriched component context supplied once per workflow.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::errors::{DomainError, DomainResult};

/// An example of a completed migration used to steer the generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleMigration {
    pub before: String,
    pub after: String,
}

/// Read-only context about the component under test.
///
/// Produced by context enrichment outside this crate and never mutated by
/// the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedContext {
    pub component_name: String,
    #[serde(default)]
    pub component_source: String,
    /// Related files (usually relative imports) keyed by path.
    #[serde(default)]
    pub related_files: BTreeMap<String, String>,
    #[serde(default)]
    pub examples: Vec<ExampleMigration>,
    #[serde(default)]
    pub user_notes: Option<String>,
}

impl EnrichedContext {
    /// Minimal context naming only the component.
    pub fn named(component_name: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
            ..Default::default()
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        if notes.is_some() {
            self.user_notes = notes;
        }
        self
    }

    /// Load a context document. `.json` files are parsed as JSON, anything
    /// else as YAML.
    pub fn from_file(path: &Path) -> DomainResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| DomainError::WorkspaceIo {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&raw)?)
        } else {
            serde_yaml::from_str(&raw).map_err(|e| DomainError::SerializationError(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_yaml_context() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "component_name: Button\ncomponent_source: export const Button = () => null;\nrelated_files:\n  ./theme.ts: export default {{}};\nuser_notes: prefer screen queries"
        )
        .unwrap();

        let ctx = EnrichedContext::from_file(file.path()).unwrap();
        assert_eq!(ctx.component_name, "Button");
        assert_eq!(ctx.related_files.len(), 1);
        assert_eq!(ctx.user_notes.as_deref(), Some("prefer screen queries"));
        assert!(ctx.examples.is_empty());
    }

    #[test]
    fn loads_json_context() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"component_name": "Card"}}"#).unwrap();

        let ctx = EnrichedContext::from_file(file.path()).unwrap();
        assert_eq!(ctx.component_name, "Card");
    }

    #[test]
    fn notes_override_only_when_present() {
        let ctx = EnrichedContext::named("A").with_notes(Some("x".into()));
        assert_eq!(ctx.user_notes.as_deref(), Some("x"));
        let ctx = ctx.with_notes(None);
        assert_eq!(ctx.user_notes.as_deref(), Some("x"));
    }
}
