// check.rs — Run the built-in rulebooks against one hook event.

use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde_json::{json, Value};

use catalog_engine::rulebooks;
use catalog_engine::{CatalogConfig, Evaluation, Evaluator};

/// One rulebook's answer for the event.
#[derive(Serialize)]
struct RulebookResult<'a> {
    rulebook: &'a str,
    harness: &'a str,
    #[serde(flatten)]
    evaluation: Evaluation,
}

pub fn execute(
    config: &CatalogConfig,
    event: Option<&Path>,
    command: Option<&str>,
) -> anyhow::Result<()> {
    let input = read_event(event, command)?;
    let evaluator = Evaluator::new(&config.evaluation);
    let books = rulebooks::builtin(config)?;

    let results: Vec<RulebookResult<'_>> = books
        .iter()
        .map(|book| {
            let evaluation = book
                .evaluate(&evaluator, &input)
                .unwrap_or_else(|e| Evaluation::fail_closed(&e));
            RulebookResult {
                rulebook: book.name(),
                harness: book.harness(),
                evaluation,
            }
        })
        .collect();

    super::print_json(&results)
}

fn read_event(event: Option<&Path>, command: Option<&str>) -> anyhow::Result<Value> {
    if let Some(command) = command {
        return Ok(bash_event(command));
    }
    let content = match event {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(serde_json::from_str(&content)?)
}

fn bash_event(command: &str) -> Value {
    json!({
        "hook_event_name": "PreToolUse",
        "tool_name": "Bash",
        "tool_input": {"command": command}
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_flag_builds_bash_event() {
        let input = read_event(None, Some("git push --force")).unwrap();
        assert_eq!(rulebooks::event_name(&input), Some("PreToolUse"));
        assert_eq!(rulebooks::tool_name(&input), Some("Bash"));
        assert_eq!(
            rulebooks::shell_command(&input).as_deref(),
            Some("git push --force")
        );
    }

    #[test]
    fn event_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, bash_event("ls").to_string()).unwrap();
        let input = read_event(Some(&path), None).unwrap();
        assert_eq!(rulebooks::shell_command(&input).as_deref(), Some("ls"));
    }
}
