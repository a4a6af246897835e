// aggregator.rs — Collects verb-tagged decisions out of a decision tree.
//
// `collect(tree, verb)` walks the whole tree depth-first and gathers every
// decision set whose final key is `verb`, at any depth. Each decision keeps
// the namespace of the policy that emitted it so the host can attribute it,
// and decisions inside one set stay in emission order.
//
// Malformed entries (missing fields, `ask` without `question`, a verb key
// holding something other than an array) are reported next to the results
// instead of being dropped or aborting the walk.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decision::{Decision, Verb};
use crate::error::MalformedDecision;
use crate::namespace::Namespace;
use crate::tree::DecisionTree;

/// A validated decision together with the policy namespace that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiredDecision {
    /// Namespace of the emitting policy (the verb key is not included).
    pub namespace: Namespace,
    #[serde(flatten)]
    pub decision: Decision,
}

/// The result of collecting one verb.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    pub decisions: Vec<FiredDecision>,
    pub malformed: Vec<MalformedDecision>,
}

/// Collect every decision filed under `verb`, anywhere in `tree`.
///
/// Never fails: no match yields an empty collection.
pub fn collect(tree: &DecisionTree, verb: Verb) -> Collection {
    let key = verb.as_str();
    let mut collection = Collection::default();

    tree.walk(&mut |path, items| {
        let Some((last, parent)) = path.split_last() else {
            return;
        };
        if last != key {
            return;
        }

        if parent.is_empty() {
            // A verb key at the tree root has no policy to attribute it to.
            for index in 0..items.len() {
                collection.malformed.push(MalformedDecision {
                    path: Namespace::from_trusted(vec![key.to_string()]),
                    verb,
                    index,
                    reason: "decision set has no policy namespace".to_string(),
                });
            }
            return;
        }

        let namespace = Namespace::from_trusted(parent.to_vec());
        for (index, raw) in items.iter().enumerate() {
            match Decision::from_value(verb, raw) {
                Ok(decision) => collection.decisions.push(FiredDecision {
                    namespace: namespace.clone(),
                    decision,
                }),
                Err(reason) => {
                    tracing::warn!(
                        "malformed {} decision #{} at '{}': {}",
                        verb,
                        index,
                        namespace,
                        reason
                    );
                    collection.malformed.push(MalformedDecision {
                        path: namespace.clone(),
                        verb,
                        index,
                        reason,
                    });
                }
            }
        }
    });

    tree.walk_malformed(&mut |path, value| {
        let Some((last, parent)) = path.split_last() else {
            return;
        };
        if last != key {
            return;
        }
        let namespace = if parent.is_empty() {
            Namespace::from_trusted(vec![key.to_string()])
        } else {
            Namespace::from_trusted(parent.to_vec())
        };
        let reason = format!("decision set must be an array, found {}", json_kind(value));
        tracing::warn!("malformed {} decision set at '{}': {}", verb, namespace, reason);
        collection.malformed.push(MalformedDecision {
            path: namespace,
            verb,
            index: 0,
            reason,
        });
    });

    collection
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The aggregator's public result: one ordered sequence per verb.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    #[serde(default)]
    pub halts: Vec<FiredDecision>,
    #[serde(default)]
    pub denials: Vec<FiredDecision>,
    #[serde(default)]
    pub blocks: Vec<FiredDecision>,
    #[serde(default)]
    pub asks: Vec<FiredDecision>,
    #[serde(default)]
    pub allow_overrides: Vec<FiredDecision>,
    #[serde(default)]
    pub add_context: Vec<FiredDecision>,
}

impl EvaluationOutcome {
    /// Decisions filed under `verb`; empty when none fired.
    pub fn get(&self, verb: Verb) -> &[FiredDecision] {
        match verb {
            Verb::Halt => &self.halts,
            Verb::Deny => &self.denials,
            Verb::Block => &self.blocks,
            Verb::Ask => &self.asks,
            Verb::AllowOverride => &self.allow_overrides,
            Verb::AddContext => &self.add_context,
        }
    }

    fn slot_mut(&mut self, verb: Verb) -> &mut Vec<FiredDecision> {
        match verb {
            Verb::Halt => &mut self.halts,
            Verb::Deny => &mut self.denials,
            Verb::Block => &mut self.blocks,
            Verb::Ask => &mut self.asks,
            Verb::AllowOverride => &mut self.allow_overrides,
            Verb::AddContext => &mut self.add_context,
        }
    }

    /// Total number of fired decisions across all verbs.
    pub fn decision_count(&self) -> usize {
        Verb::ALL.iter().map(|v| self.get(*v).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.decision_count() == 0
    }
}

/// An outcome plus every malformed decision met while building it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub outcome: EvaluationOutcome,
    pub malformed: Vec<MalformedDecision>,
}

/// Collect all six verbs from `tree`.
pub fn aggregate(tree: &DecisionTree) -> Aggregation {
    let mut aggregation = Aggregation::default();
    for verb in Verb::ALL {
        let collection = collect(tree, verb);
        *aggregation.outcome.slot_mut(verb) = collection.decisions;
        aggregation.malformed.extend(collection.malformed);
    }

    tracing::debug!(
        "aggregated {} decision(s): halt={} deny={} block={} ask={} allow_override={} add_context={}, {} malformed",
        aggregation.outcome.decision_count(),
        aggregation.outcome.halts.len(),
        aggregation.outcome.denials.len(),
        aggregation.outcome.blocks.len(),
        aggregation.outcome.asks.len(),
        aggregation.outcome.allow_overrides.len(),
        aggregation.outcome.add_context.len(),
        aggregation.malformed.len()
    );
    aggregation
}
