// resolver.rs — Collapses an EvaluationOutcome into one enforcement action.
//
// Priority, highest first:
//
// 1. halt            → Halt, causes = every halt decision
// 2. deny ∪ block    → Deny, causes = every deny then every block decision
// 3. ask             → Ask, causes = every ask, questions = every question
// 4. allow_override  → Allow (explicit)
// 5. nothing fired   → DefaultAllow
//
// The whole winning tier is reported, never just its first decision.
// add_context decisions never pick the action; they are carried as context
// regardless of which tier wins.

use serde::{Deserialize, Serialize};

use crate::aggregator::{EvaluationOutcome, FiredDecision};
use crate::error::CatalogError;

/// The single enforcement action returned to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Halt,
    Deny,
    Ask,
    /// At least one allow_override fired and nothing outranked it.
    Allow,
    /// No enforcement decision fired at all.
    DefaultAllow,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Halt => "halt",
            Action::Deny => "deny",
            Action::Ask => "ask",
            Action::Allow => "allow",
            Action::DefaultAllow => "default_allow",
        }
    }

    /// Whether the host must stop the action (halt or deny).
    pub fn is_blocking(self) -> bool {
        matches!(self, Action::Halt | Action::Deny)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The collapsed outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub action: Action,
    /// Every decision of the winning tier.
    pub causes: Vec<FiredDecision>,
    /// Every question of the winning ask tier, in cause order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<String>,
    /// Every add_context decision, regardless of action.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<FiredDecision>,
    /// Set when the resolution was forced by an internal fault rather than
    /// by a policy decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl Resolution {
    /// The conservative resolution for a request that could not be trusted.
    pub fn fail_closed(error: &CatalogError) -> Self {
        tracing::warn!("failing closed: {}", error);
        Self {
            action: Action::Halt,
            causes: Vec::new(),
            questions: Vec::new(),
            context: Vec::new(),
            fault: Some(error.to_string()),
        }
    }

    /// Rule ids of every cause, for display.
    pub fn rule_ids(&self) -> Vec<&str> {
        self.causes
            .iter()
            .map(|c| c.decision.rule_id.as_str())
            .collect()
    }
}

/// Resolve an outcome to one action plus context.
pub fn resolve(outcome: &EvaluationOutcome) -> Resolution {
    let (action, causes) = if !outcome.halts.is_empty() {
        (Action::Halt, outcome.halts.clone())
    } else if !outcome.denials.is_empty() || !outcome.blocks.is_empty() {
        // deny and block are alternate spellings of the same tier.
        let causes = outcome
            .denials
            .iter()
            .chain(outcome.blocks.iter())
            .cloned()
            .collect();
        (Action::Deny, causes)
    } else if !outcome.asks.is_empty() {
        (Action::Ask, outcome.asks.clone())
    } else if !outcome.allow_overrides.is_empty() {
        (Action::Allow, outcome.allow_overrides.clone())
    } else {
        (Action::DefaultAllow, Vec::new())
    };

    let questions = if action == Action::Ask {
        causes
            .iter()
            .filter_map(|c| c.decision.question.clone())
            .collect()
    } else {
        Vec::new()
    };

    let resolution = Resolution {
        action,
        causes,
        questions,
        context: outcome.add_context.clone(),
        fault: None,
    };

    tracing::info!(
        "resolved to {} ({} cause(s), {} context)",
        resolution.action,
        resolution.causes.len(),
        resolution.context.len()
    );
    resolution
}
