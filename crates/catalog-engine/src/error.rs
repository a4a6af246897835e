// error.rs — Error types for the catalog engine.

use thiserror::Error;

use crate::decision::Verb;
use crate::namespace::Namespace;

/// Errors that can occur while building, evaluating or linting rulebooks.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A namespace string or segment is not a valid qualified name.
    #[error("invalid namespace '{namespace}': {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    /// Two writers produced decisions under the identical namespace path.
    #[error("namespace collision at '{path}': decisions written more than once")]
    NamespaceCollision { path: Namespace },

    /// A policy wrote decisions outside its rulebook's namespace prefix.
    #[error("namespace '{path}' is outside rulebook scope '{scope}'")]
    NamespaceEscape { path: Namespace, scope: Namespace },

    /// A command matcher token could not be compiled into an anchored pattern.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A policy evaluator aborted instead of producing output.
    #[error("policy '{namespace}' failed: {reason}")]
    PolicyFailed { namespace: Namespace, reason: String },

    /// A rulebook manifest is missing or lacks the fields the engine needs.
    #[error("manifest error: {reason}")]
    Manifest { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CatalogError {
    /// Whether this error invalidates the whole evaluation request.
    ///
    /// Fatal errors must never produce a permissive outcome; the host
    /// resolves them to a fail-closed halt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CatalogError::NamespaceCollision { .. }
                | CatalogError::NamespaceEscape { .. }
                | CatalogError::InvalidPattern { .. }
                | CatalogError::PolicyFailed { .. }
        )
    }
}

/// A decision found during aggregation that is missing a required field
/// or pairs its fields inconsistently with its verb.
///
/// Malformed decisions are reported next to the well-formed results; they
/// never abort aggregation of the rest of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[error("malformed {verb} decision #{index} at '{path}': {reason}")]
pub struct MalformedDecision {
    /// Namespace of the policy that emitted the decision (verb key excluded).
    pub path: Namespace,
    /// The verb key the decision was found under.
    pub verb: Verb,
    /// Position inside that policy's decision set.
    pub index: usize,
    /// What is wrong with it.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collisions_and_patterns_are_fatal() {
        let path = Namespace::parse("cupcake.catalog.a.policies.x").unwrap();
        assert!(CatalogError::NamespaceCollision { path: path.clone() }.is_fatal());
        assert!(CatalogError::NamespaceEscape {
            path: path.clone(),
            scope: Namespace::parse("cupcake.catalog.b").unwrap(),
        }
        .is_fatal());
        assert!(CatalogError::InvalidPattern {
            pattern: "x".into(),
            reason: "y".into(),
        }
        .is_fatal());
        assert!(!CatalogError::Manifest {
            reason: "missing".into()
        }
        .is_fatal());
    }

    #[test]
    fn malformed_decision_display_names_the_path() {
        let err = MalformedDecision {
            path: Namespace::parse("cupcake.catalog.a.policies.x").unwrap(),
            verb: Verb::Ask,
            index: 2,
            reason: "missing question".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("cupcake.catalog.a.policies.x"));
        assert!(msg.contains("ask"));
        assert!(msg.contains("#2"));
    }
}
