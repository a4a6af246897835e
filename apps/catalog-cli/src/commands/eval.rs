// eval.rs — Aggregate and resolve a decision tree built by an external evaluator.

use std::path::Path;

use serde_json::{Map, Value};

use catalog_engine::{CatalogConfig, DecisionTree, Evaluation};

pub fn execute(config: &CatalogConfig, tree: &Path, scope: Option<&str>) -> anyhow::Result<()> {
    let tree = super::read_tree(tree)?;
    let tree = match scope {
        Some(rulebook) => restrict(&tree, config, rulebook)?,
        None => tree,
    };

    // Malformed decisions are logged by the aggregator and listed in the output.
    super::print_json(&Evaluation::from_tree(&tree))
}

/// Keep only `rulebook`'s subtree, still at its full namespace path so
/// every decision stays attributed.
fn restrict(
    tree: &DecisionTree,
    config: &CatalogConfig,
    rulebook: &str,
) -> anyhow::Result<DecisionTree> {
    let scope = config.scope(rulebook)?;
    let prefix = scope.prefix();

    let Some(subtree) = tree.subtree(prefix) else {
        tracing::warn!("tree has nothing under {}", prefix);
        return Ok(DecisionTree::empty());
    };

    let nested = prefix
        .segments()
        .iter()
        .rev()
        .fold(subtree.to_json(), |inner, segment| {
            let mut map = Map::new();
            map.insert(segment.clone(), inner);
            Value::Object(map)
        });
    Ok(DecisionTree::from_json(&nested))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_engine::{Action, Verb};
    use serde_json::json;

    fn two_rulebooks() -> DecisionTree {
        DecisionTree::from_json(&json!({
            "cupcake": {"catalog": {
                "git_safety": {"policies": {"push": {
                    "ask": [{"rule_id": "G1", "reason": "r", "severity": "HIGH", "question": "ok?"}]
                }}},
                "other": {"policies": {"x": {
                    "halt": [{"rule_id": "O1", "reason": "r", "severity": "CRITICAL"}]
                }}}
            }}
        }))
    }

    #[test]
    fn restrict_keeps_full_path_of_selected_rulebook() {
        let tree = restrict(&two_rulebooks(), &CatalogConfig::default(), "git-safety").unwrap();
        let evaluation = Evaluation::from_tree(&tree);

        assert_eq!(evaluation.resolution.action, Action::Ask);
        assert!(evaluation.outcome.get(Verb::Halt).is_empty());
        assert_eq!(
            evaluation.resolution.causes[0].namespace.to_string(),
            "cupcake.catalog.git_safety.policies.push"
        );
    }

    #[test]
    fn restrict_to_absent_rulebook_is_empty() {
        let tree = restrict(&two_rulebooks(), &CatalogConfig::default(), "missing").unwrap();
        assert_eq!(tree, DecisionTree::empty());
    }

    #[test]
    fn read_tree_rejects_invalid_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(&path, r#"{"bad key": {"deny": []}}"#).unwrap();
        assert!(super::super::read_tree(&path).is_err());
    }
}
