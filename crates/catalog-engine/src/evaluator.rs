// evaluator.rs — One evaluation request, end to end.
//
// input event → selected policies → per-policy output slots → decision tree
//             → aggregation → resolution
//
// Each policy writes only into its own `PolicyOutput`, created here with the
// policy's declared namespace, so policies can run on parallel threads with
// no shared mutable state. Outputs are recorded in policy order and the tree
// walk is key-ordered, so the result does not depend on which thread
// finished first.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use serde_json::Value;

use crate::aggregator::{aggregate, EvaluationOutcome};
use crate::config::EvaluationConfig;
use crate::error::{CatalogError, MalformedDecision};
use crate::namespace::{Namespace, RulebookScope};
use crate::resolver::{resolve, Resolution};
use crate::routing::RoutingMetadata;
use crate::tree::{DecisionTree, PolicyOutput, TreeBuilder};

/// A single policy, already compiled and ready to run against an event.
///
/// This is the seam to the rule-evaluation substrate: anything that can
/// turn an input event into verb-tagged decisions implements it.
pub trait Policy: Send + Sync {
    /// Where this policy's decisions live in the tree.
    fn namespace(&self) -> &Namespace;

    /// Events and tools this policy needs to see.
    fn routing(&self) -> &RoutingMetadata;

    /// Evaluate against `input`, emitting decisions into `out`.
    fn evaluate(&self, input: &Value, out: &mut PolicyOutput);
}

/// Everything the host receives for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub resolution: Resolution,
    pub outcome: EvaluationOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub malformed: Vec<MalformedDecision>,
}

impl Evaluation {
    /// Aggregate and resolve an already-built tree.
    pub fn from_tree(tree: &DecisionTree) -> Self {
        let aggregation = aggregate(tree);
        let resolution = resolve(&aggregation.outcome);
        Self {
            resolution,
            outcome: aggregation.outcome,
            malformed: aggregation.malformed,
        }
    }

    /// The evaluation reported for a request that hit a fatal error.
    pub fn fail_closed(error: &CatalogError) -> Self {
        Self {
            resolution: Resolution::fail_closed(error),
            outcome: EvaluationOutcome::default(),
            malformed: Vec::new(),
        }
    }
}

/// Runs policies for one request at a time. Holds no per-request state.
#[derive(Debug, Clone)]
pub struct Evaluator {
    parallel: bool,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(&EvaluationConfig::default())
    }
}

impl Evaluator {
    pub fn new(config: &EvaluationConfig) -> Self {
        Self {
            parallel: config.parallel,
        }
    }

    /// Run `policies` against `input` and resolve the result.
    ///
    /// With a `scope`, every policy must live inside that rulebook's
    /// subtree. Collisions, scope escapes and policy failures (including a
    /// panicking policy) are fatal and returned as errors; malformed
    /// decisions are not.
    pub fn evaluate(
        &self,
        scope: Option<&RulebookScope>,
        policies: &[&dyn Policy],
        input: &Value,
    ) -> Result<Evaluation, CatalogError> {
        let outputs = self.run_policies(policies, input)?;

        let mut builder = match scope {
            Some(scope) => TreeBuilder::scoped(scope.clone()),
            None => TreeBuilder::new(),
        };
        for output in outputs {
            if let Err(e) = builder.record(output) {
                tracing::warn!("refusing evaluation: {}", e);
                return Err(e);
            }
        }

        Ok(Evaluation::from_tree(&builder.build()))
    }

    /// Like `evaluate`, but a fatal error becomes a fail-closed halt.
    pub fn evaluate_or_halt(
        &self,
        scope: Option<&RulebookScope>,
        policies: &[&dyn Policy],
        input: &Value,
    ) -> Evaluation {
        self.evaluate(scope, policies, input)
            .unwrap_or_else(|e| Evaluation::fail_closed(&e))
    }

    fn run_policies(
        &self,
        policies: &[&dyn Policy],
        input: &Value,
    ) -> Result<Vec<PolicyOutput>, CatalogError> {
        tracing::debug!(
            "evaluating {} polic{} ({})",
            policies.len(),
            if policies.len() == 1 { "y" } else { "ies" },
            if self.parallel { "parallel" } else { "sequential" }
        );

        if !self.parallel || policies.len() < 2 {
            return policies.iter().map(|p| run_policy(*p, input)).collect();
        }

        std::thread::scope(|s| {
            let handles: Vec<_> = policies
                .iter()
                .map(|p| {
                    let policy: &dyn Policy = *p;
                    (policy, s.spawn(move || run_policy(policy, input)))
                })
                .collect();

            handles
                .into_iter()
                .map(|(policy, handle)| {
                    handle.join().unwrap_or_else(|payload| {
                        Err(CatalogError::PolicyFailed {
                            namespace: policy.namespace().clone(),
                            reason: panic_reason(payload.as_ref()),
                        })
                    })
                })
                .collect()
        })
    }
}

// A panic inside a policy becomes `PolicyFailed` on both paths.
fn run_policy(policy: &dyn Policy, input: &Value) -> Result<PolicyOutput, CatalogError> {
    let out = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut out = PolicyOutput::new(policy.namespace().clone());
        policy.evaluate(input, &mut out);
        out
    }))
    .map_err(|payload| CatalogError::PolicyFailed {
        namespace: policy.namespace().clone(),
        reason: panic_reason(payload.as_ref()),
    })?;

    if !out.is_empty() {
        tracing::debug!(
            "policy {} emitted {} decision(s)",
            policy.namespace(),
            out.decision_count()
        );
    }
    Ok(out)
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match message {
        Some(message) => format!("evaluator panicked: {}", message),
        None => "evaluator panicked".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Decision, Severity, Verb};
    use crate::resolver::Action;
    use serde_json::json;

    /// Fires one decision whenever the input's `command` contains its token.
    struct TokenPolicy {
        namespace: Namespace,
        routing: RoutingMetadata,
        token: &'static str,
        verb: Verb,
        rule_id: &'static str,
    }

    impl TokenPolicy {
        fn new(ns: &str, token: &'static str, verb: Verb, rule_id: &'static str) -> Self {
            Self {
                namespace: Namespace::parse(ns).unwrap(),
                routing: RoutingMetadata::default(),
                token,
                verb,
                rule_id,
            }
        }
    }

    impl Policy for TokenPolicy {
        fn namespace(&self) -> &Namespace {
            &self.namespace
        }

        fn routing(&self) -> &RoutingMetadata {
            &self.routing
        }

        fn evaluate(&self, input: &Value, out: &mut PolicyOutput) {
            let command = input["command"].as_str().unwrap_or_default();
            if crate::command::has_verb(command, self.token) {
                let mut decision = Decision::new(self.rule_id, "token seen", Severity::High);
                if self.verb == Verb::Ask {
                    decision = decision.with_question("Proceed?");
                }
                out.emit(self.verb, decision);
            }
        }
    }

    struct PanickingPolicy(Namespace, RoutingMetadata);

    impl Policy for PanickingPolicy {
        fn namespace(&self) -> &Namespace {
            &self.0
        }

        fn routing(&self) -> &RoutingMetadata {
            &self.1
        }

        fn evaluate(&self, _input: &Value, _out: &mut PolicyOutput) {
            panic!("boom");
        }
    }

    fn parallel() -> Evaluator {
        Evaluator::new(&EvaluationConfig { parallel: true })
    }

    fn sequential() -> Evaluator {
        Evaluator::new(&EvaluationConfig { parallel: false })
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let a = TokenPolicy::new("c.rb.policies.a", "rm", Verb::Deny, "R-A");
        let b = TokenPolicy::new("c.rb.policies.b", "rm", Verb::Halt, "R-B");
        let c = TokenPolicy::new("c.rb.policies.c", "git", Verb::Ask, "R-C");
        let policies: Vec<&dyn Policy> = vec![&a, &b, &c];
        let input = json!({"command": "rm -rf build"});

        let p = parallel().evaluate(None, &policies, &input).unwrap();
        let s = sequential().evaluate(None, &policies, &input).unwrap();
        assert_eq!(p, s);
        assert_eq!(p.resolution.action, Action::Halt);
        assert_eq!(p.outcome.denials.len(), 1);
    }

    #[test]
    fn duplicate_policy_namespace_is_fatal() {
        let a = TokenPolicy::new("c.rb.policies.a", "rm", Verb::Deny, "R1");
        let b = TokenPolicy::new("c.rb.policies.a", "rm", Verb::Deny, "R2");
        let policies: Vec<&dyn Policy> = vec![&a, &b];
        let input = json!({"command": "rm x"});

        match sequential().evaluate(None, &policies, &input) {
            Err(CatalogError::NamespaceCollision { .. }) => {}
            other => panic!("expected NamespaceCollision, got {:?}", other),
        }
        let fallback = sequential().evaluate_or_halt(None, &policies, &input);
        assert_eq!(fallback.resolution.action, Action::Halt);
        assert!(fallback.resolution.fault.is_some());
    }

    #[test]
    fn policy_outside_scope_is_fatal() {
        let scope = RulebookScope::new(&Namespace::parse("c").unwrap(), "rb").unwrap();
        let rogue = TokenPolicy::new("c.other.policies.a", "rm", Verb::Deny, "R1");
        let policies: Vec<&dyn Policy> = vec![&rogue];

        match sequential().evaluate(Some(&scope), &policies, &json!({"command": "ls"})) {
            Err(CatalogError::NamespaceEscape { .. }) => {}
            other => panic!("expected NamespaceEscape, got {:?}", other),
        }
    }

    #[test]
    fn panicking_policy_fails_closed_in_parallel() {
        let ok = TokenPolicy::new("c.rb.policies.a", "rm", Verb::Deny, "R1");
        let bad = PanickingPolicy(
            Namespace::parse("c.rb.policies.bad").unwrap(),
            RoutingMetadata::default(),
        );
        let policies: Vec<&dyn Policy> = vec![&ok, &bad];

        let evaluation = parallel().evaluate_or_halt(None, &policies, &json!({"command": "ls"}));
        assert_eq!(evaluation.resolution.action, Action::Halt);
        assert!(evaluation
            .resolution
            .fault
            .unwrap()
            .contains("c.rb.policies.bad"));
    }

    #[test]
    fn single_panicking_policy_fails_closed() {
        let bad = PanickingPolicy(
            Namespace::parse("c.rb.policies.bad").unwrap(),
            RoutingMetadata::default(),
        );
        let policies: Vec<&dyn Policy> = vec![&bad];

        match parallel().evaluate(None, &policies, &json!({})) {
            Err(CatalogError::PolicyFailed { namespace, reason }) => {
                assert_eq!(namespace.to_string(), "c.rb.policies.bad");
                assert!(reason.contains("boom"));
            }
            other => panic!("expected PolicyFailed, got {:?}", other),
        }
        let evaluation = Evaluator::default().evaluate_or_halt(None, &policies, &json!({}));
        assert_eq!(evaluation.resolution.action, Action::Halt);
    }

    #[test]
    fn panicking_policy_fails_closed_when_sequential() {
        let ok = TokenPolicy::new("c.rb.policies.a", "rm", Verb::Deny, "R1");
        let bad = PanickingPolicy(
            Namespace::parse("c.rb.policies.bad").unwrap(),
            RoutingMetadata::default(),
        );
        let policies: Vec<&dyn Policy> = vec![&ok, &bad];

        let evaluation = sequential().evaluate_or_halt(None, &policies, &json!({"command": "rm x"}));
        assert_eq!(evaluation.resolution.action, Action::Halt);
        assert!(evaluation.outcome.is_empty());
        assert!(evaluation
            .resolution
            .fault
            .unwrap()
            .contains("c.rb.policies.bad"));
    }

    #[test]
    fn no_policies_is_default_allow() {
        let evaluation = parallel().evaluate(None, &[], &json!({})).unwrap();
        assert_eq!(evaluation.resolution.action, Action::DefaultAllow);
        assert!(evaluation.outcome.is_empty());
    }
}
