// decision.rs — Decision records and the verbs they are filed under.
//
// A policy fires by emitting a Decision under one of six verb keys. The
// verb determines the enforcement tier; the Decision says which rule fired
// and why. Decisions arrive from the rule-evaluation substrate as raw JSON
// objects, so `Decision::from_value` is where the field contract is checked:
// - rule_id and reason are non-empty strings
// - severity is one of CRITICAL, HIGH, MEDIUM, LOW, INFO
// - question is present (and non-empty) iff the verb is `ask`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Enforcement category of a decision.
///
/// Declaration order is the priority order, highest first. `Deny` and
/// `Block` share a tier; `AddContext` is never an enforcement action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Halt,
    Deny,
    Block,
    Ask,
    AllowOverride,
    AddContext,
}

impl Verb {
    /// Every verb, in priority order.
    pub const ALL: [Verb; 6] = [
        Verb::Halt,
        Verb::Deny,
        Verb::Block,
        Verb::Ask,
        Verb::AllowOverride,
        Verb::AddContext,
    ];

    /// The tree key this verb is filed under.
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Halt => "halt",
            Verb::Deny => "deny",
            Verb::Block => "block",
            Verb::Ask => "ask",
            Verb::AllowOverride => "allow_override",
            Verb::AddContext => "add_context",
        }
    }

    /// Look up a verb by its tree key. Unrecognized keys are not verbs.
    pub fn from_key(key: &str) -> Option<Verb> {
        Verb::ALL.into_iter().find(|v| v.as_str() == key)
    }

    /// Decisions under this verb must carry a `question`.
    pub fn requires_question(self) -> bool {
        self == Verb::Ask
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::from_key(s).ok_or_else(|| format!("unknown verb '{}'", s))
    }
}

/// How serious a fired rule is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRITICAL" => Ok(Severity::Critical),
            "HIGH" => Ok(Severity::High),
            "MEDIUM" => Ok(Severity::Medium),
            "LOW" => Ok(Severity::Low),
            "INFO" => Ok(Severity::Info),
            other => Err(format!(
                "invalid severity '{}' (expected CRITICAL, HIGH, MEDIUM, LOW or INFO)",
                other
            )),
        }
    }
}

/// A single structured record describing why a policy fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Stable identifier of the rule that fired (e.g. "CATALOG-SEC-001").
    pub rule_id: String,
    /// Human-readable explanation.
    pub reason: String,
    pub severity: Severity,
    /// The question put to the user. Present only on `ask` decisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

impl Decision {
    pub fn new(rule_id: impl Into<String>, reason: impl Into<String>, severity: Severity) -> Self {
        Self {
            rule_id: rule_id.into(),
            reason: reason.into(),
            severity,
            question: None,
        }
    }

    /// Attach the question an `ask` decision puts to the user.
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    /// Validate a raw decision object found under `verb`.
    ///
    /// Returns a human-readable reason on failure; the aggregator wraps it
    /// with the namespace path.
    pub fn from_value(verb: Verb, value: &Value) -> Result<Decision, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("expected an object, found {}", json_kind(value)))?;

        let rule_id = required_str(obj, "rule_id")?;
        let reason = required_str(obj, "reason")?;
        let severity: Severity = required_str(obj, "severity")?.parse()?;

        let question = match obj.get("question") {
            None | Some(Value::Null) => None,
            Some(Value::String(q)) if !q.trim().is_empty() => Some(q.clone()),
            Some(Value::String(_)) => return Err("field 'question' is empty".to_string()),
            Some(other) => {
                return Err(format!(
                    "field 'question' must be a string, found {}",
                    json_kind(other)
                ))
            }
        };

        match (verb.requires_question(), &question) {
            (true, None) => return Err("ask decision is missing 'question'".to_string()),
            (false, Some(_)) => {
                return Err(format!("'question' is only valid on ask, not {}", verb))
            }
            _ => {}
        }

        Ok(Decision {
            rule_id,
            reason,
            severity,
            question,
        })
    }

    /// The JSON object form emitted into a decision tree.
    pub fn to_value(&self) -> Value {
        // Serializing a struct of strings and a unit enum cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn required_str(obj: &serde_json::Map<String, Value>, field: &str) -> Result<String, String> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(format!("missing required field '{}'", field)),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(format!("field '{}' is empty", field))
        }
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!(
            "field '{}' must be a string, found {}",
            field,
            json_kind(other)
        )),
    }
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
