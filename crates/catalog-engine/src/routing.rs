// routing.rs — Routing metadata attached to each policy.
//
// Routing decides which policies are invoked for an event. The engine does
// not re-validate a host's routing; `matches` is only a convenience for
// hosts that route on exactly these two fields.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Events and tools a policy declares it needs to see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingMetadata {
    /// Event names (e.g. "PreToolUse"). Empty means any event.
    #[serde(default)]
    pub required_events: BTreeSet<String>,
    /// Tool names (e.g. "Bash"). Empty means any tool.
    #[serde(default)]
    pub required_tools: BTreeSet<String>,
}

impl RoutingMetadata {
    pub fn new<E, T>(events: E, tools: T) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            required_events: events.into_iter().map(Into::into).collect(),
            required_tools: tools.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether an event with the given name and (optional) tool is routed here.
    pub fn matches(&self, event: &str, tool: Option<&str>) -> bool {
        let event_ok = self.required_events.is_empty() || self.required_events.contains(event);
        let tool_ok = self.required_tools.is_empty()
            || tool.is_some_and(|t| self.required_tools.contains(t));
        event_ok && tool_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metadata_matches_everything() {
        let routing = RoutingMetadata::default();
        assert!(routing.matches("PreToolUse", Some("Bash")));
        assert!(routing.matches("UserPromptSubmit", None));
    }

    #[test]
    fn event_and_tool_both_required() {
        let routing = RoutingMetadata::new(["PreToolUse"], ["Bash"]);
        assert!(routing.matches("PreToolUse", Some("Bash")));
        assert!(!routing.matches("PostToolUse", Some("Bash")));
        assert!(!routing.matches("PreToolUse", Some("Edit")));
        assert!(!routing.matches("PreToolUse", None));
    }
}
