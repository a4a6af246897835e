// rulebooks/mod.rs — Rulebooks: named bundles of policies under one scope.
//
// A rulebook owns exactly one namespace subtree. Policies are checked
// against it when added, so a mis-declared namespace fails at load time
// instead of at the first evaluation.

pub mod security;

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::evaluator::{Evaluation, Evaluator, Policy};
use crate::namespace::{Namespace, RulebookScope};

/// A named, scoped set of policies for one harness.
pub struct Rulebook {
    name: String,
    harness: String,
    scope: RulebookScope,
    policies: Vec<Box<dyn Policy>>,
    namespaces: BTreeSet<Namespace>,
}

impl Rulebook {
    pub fn new(name: &str, harness: &str, scope: RulebookScope) -> Self {
        Self {
            name: name.to_string(),
            harness: harness.to_string(),
            scope,
            policies: Vec::new(),
            namespaces: BTreeSet::new(),
        }
    }

    /// Add a policy. It must live under this rulebook's scope and must not
    /// share a namespace with a policy already added.
    pub fn add_policy(&mut self, policy: Box<dyn Policy>) -> Result<(), CatalogError> {
        let ns = policy.namespace().clone();
        if !self.scope.contains(&ns) {
            return Err(CatalogError::NamespaceEscape {
                path: ns,
                scope: self.scope.prefix().clone(),
            });
        }
        if !self.namespaces.insert(ns.clone()) {
            return Err(CatalogError::NamespaceCollision { path: ns });
        }
        self.policies.push(policy);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn harness(&self) -> &str {
        &self.harness
    }

    pub fn scope(&self) -> &RulebookScope {
        &self.scope
    }

    pub fn policies(&self) -> impl Iterator<Item = &dyn Policy> {
        self.policies.iter().map(|p| p.as_ref())
    }

    /// Policies whose routing metadata accepts this event/tool pair.
    pub fn select(&self, event: &str, tool: Option<&str>) -> Vec<&dyn Policy> {
        self.policies()
            .filter(|p| p.routing().matches(event, tool))
            .collect()
    }

    /// Route `input` by its hook event fields and evaluate the selected
    /// policies inside this rulebook's scope.
    pub fn evaluate(&self, evaluator: &Evaluator, input: &Value) -> Result<Evaluation, CatalogError> {
        let event = event_name(input).unwrap_or_default();
        let selected = self.select(event, tool_name(input));
        tracing::debug!(
            "rulebook {}: {} of {} policies routed for {}",
            self.name,
            selected.len(),
            self.policies.len(),
            if event.is_empty() { "<no event>" } else { event }
        );
        evaluator.evaluate(Some(&self.scope), &selected, input)
    }
}

impl fmt::Debug for Rulebook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rulebook")
            .field("name", &self.name)
            .field("harness", &self.harness)
            .field("scope", &self.scope.prefix().to_string())
            .field("policies", &self.namespaces)
            .finish()
    }
}

/// Every rulebook compiled into the engine.
pub fn builtin(config: &CatalogConfig) -> Result<Vec<Rulebook>, CatalogError> {
    Ok(vec![security::rulebook(config)?])
}

/// `hook_event_name` of a hook input event.
pub fn event_name(input: &Value) -> Option<&str> {
    input.get("hook_event_name").and_then(Value::as_str)
}

/// `tool_name` of a hook input event.
pub fn tool_name(input: &Value) -> Option<&str> {
    input.get("tool_name").and_then(Value::as_str)
}

/// The shell command of a Bash tool event, lowercased for matching.
pub fn shell_command(input: &Value) -> Option<String> {
    input
        .get("tool_input")
        .and_then(|t| t.get("command"))
        .and_then(Value::as_str)
        .map(str::to_lowercase)
}
