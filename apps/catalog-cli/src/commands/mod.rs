pub mod check;
pub mod eval;
pub mod lint;

use std::path::Path;

use catalog_engine::DecisionTree;

/// Read a decision tree from a JSON file.
pub fn read_tree(path: &Path) -> anyhow::Result<DecisionTree> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    Ok(DecisionTree::from_json_str(&content)?)
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
