// tree.rs — The per-request Decision Tree.
//
// A tree maps namespace segments to further nodes or to decision sets.
// Decision sets sit under verb keys at the end of a policy's namespace:
//
//   cupcake ─ catalog ─ security_essentials ─ policies ─ claude ─ dangerous_commands ─ halt: [..]
//                                                              └─ git_safety ─ ask: [..]
//
// The tree is write-once: `TreeBuilder` records each policy's output exactly
// once and `build()` hands back an immutable `DecisionTree`. Writing the same
// namespace twice, or writing outside the builder's rulebook scope, is
// refused rather than silently merged.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::decision::{Decision, Verb};
use crate::error::CatalogError;
use crate::namespace::{Namespace, RulebookScope};

/// A node of the decision tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionTree {
    /// Interior node keyed by namespace segment (or verb key).
    Node(BTreeMap<String, DecisionTree>),
    /// A decision set, in the order the policy emitted it. Entries are raw
    /// objects; the aggregator validates them.
    Leaf(Vec<Value>),
    /// A verb key whose value is not an array. Kept so aggregation and lint
    /// can report it instead of losing it.
    Malformed(Value),
}

impl Default for DecisionTree {
    fn default() -> Self {
        DecisionTree::Node(BTreeMap::new())
    }
}

impl DecisionTree {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a tree produced by an external evaluator.
    ///
    /// Objects become nodes and arrays become decision sets. Any other value
    /// under a verb key becomes `Malformed`; scalars elsewhere are other data
    /// the evaluator may carry and are dropped. Keys are not validated here;
    /// see `validate_keys`.
    pub fn from_json(value: &Value) -> Self {
        Self::from_json_value(value).unwrap_or_default()
    }

    fn from_json_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(DecisionTree::Leaf(items.clone())),
            Value::Object(map) => Some(DecisionTree::Node(
                map.iter()
                    .filter_map(|(key, child)| {
                        let tree = if Verb::from_key(key).is_some() && !child.is_array() {
                            Some(DecisionTree::Malformed(child.clone()))
                        } else {
                            Self::from_json_value(child)
                        };
                        tree.map(|tree| (key.clone(), tree))
                    })
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Parse a JSON document into a tree, validating every key as a
    /// namespace segment.
    ///
    /// A key repeated inside one object is a `NamespaceCollision`: the
    /// document wrote the same path twice and neither write is trusted.
    pub fn from_json_str(s: &str) -> Result<Self, CatalogError> {
        let duplicate = RefCell::new(None);
        let mut de = serde_json::Deserializer::from_str(s);
        let parsed = StrictValue::root(&duplicate).deserialize(&mut de);
        let value = match parsed {
            Ok(value) => value,
            Err(e) => {
                return Err(match duplicate.borrow_mut().take() {
                    Some(path) => collision_at(path),
                    None => e.into(),
                })
            }
        };
        de.end()?;

        let tree = Self::from_json(&value);
        tree.validate_keys()?;
        Ok(tree)
    }

    /// Every key on the way to a decision set must be a valid segment.
    pub fn validate_keys(&self) -> Result<(), CatalogError> {
        let mut result = Ok(());
        let mut check = |path: &[String]| {
            if result.is_ok() {
                if let Err(e) = Namespace::from_segments(path.iter().cloned()) {
                    result = Err(e);
                }
            }
        };
        self.walk(&mut |path, _| check(path));
        self.walk_malformed(&mut |path, _| check(path));
        result
    }

    /// The JSON form of the tree (nodes as objects, sets as arrays).
    pub fn to_json(&self) -> Value {
        match self {
            DecisionTree::Leaf(items) => Value::Array(items.clone()),
            DecisionTree::Malformed(value) => value.clone(),
            DecisionTree::Node(children) => Value::Object(
                children
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// The subtree at `ns`, if present.
    pub fn subtree(&self, ns: &Namespace) -> Option<&DecisionTree> {
        ns.segments()
            .iter()
            .try_fold(self, |node, seg| match node {
                DecisionTree::Node(children) => children.get(seg),
                _ => None,
            })
    }

    /// Depth-first visit of every decision set with its full key path.
    ///
    /// Siblings are visited in key order, so repeated walks over the same
    /// tree see the same sequence.
    pub fn walk<F>(&self, visitor: &mut F)
    where
        F: FnMut(&[String], &[Value]),
    {
        let mut path = Vec::new();
        self.walk_at(&mut path, visitor);
    }

    fn walk_at<F>(&self, path: &mut Vec<String>, visitor: &mut F)
    where
        F: FnMut(&[String], &[Value]),
    {
        match self {
            DecisionTree::Leaf(items) => visitor(path, items),
            DecisionTree::Malformed(_) => {}
            DecisionTree::Node(children) => {
                for (key, child) in children {
                    path.push(key.clone());
                    child.walk_at(path, visitor);
                    path.pop();
                }
            }
        }
    }

    /// Visit every verb key whose value is not a decision set, in key order.
    pub fn walk_malformed<F>(&self, visitor: &mut F)
    where
        F: FnMut(&[String], &Value),
    {
        let mut path = Vec::new();
        self.walk_malformed_at(&mut path, visitor);
    }

    fn walk_malformed_at<F>(&self, path: &mut Vec<String>, visitor: &mut F)
    where
        F: FnMut(&[String], &Value),
    {
        match self {
            DecisionTree::Malformed(value) => visitor(path, value),
            DecisionTree::Leaf(_) => {}
            DecisionTree::Node(children) => {
                for (key, child) in children {
                    path.push(key.clone());
                    child.walk_malformed_at(path, visitor);
                    path.pop();
                }
            }
        }
    }

    /// Total number of raw entries across all decision sets.
    pub fn entry_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_, items| count += items.len());
        count
    }

    /// Merge independently built trees as siblings.
    ///
    /// Disjoint subtrees merge freely. A decision set present at the same
    /// path in two inputs is a collision; neither side is kept.
    pub fn union<I>(trees: I) -> Result<DecisionTree, CatalogError>
    where
        I: IntoIterator<Item = DecisionTree>,
    {
        let mut merged = DecisionTree::empty();
        for tree in trees {
            let mut path = Vec::new();
            merge_into(&mut merged, tree, &mut path)?;
        }
        Ok(merged)
    }
}

fn merge_into(
    target: &mut DecisionTree,
    source: DecisionTree,
    path: &mut Vec<String>,
) -> Result<(), CatalogError> {
    match (target, source) {
        (DecisionTree::Node(dst), DecisionTree::Node(src)) => {
            for (key, child) in src {
                path.push(key.clone());
                match dst.get_mut(&key) {
                    Some(existing) => merge_into(existing, child, path)?,
                    None => {
                        dst.insert(key, child);
                    }
                }
                path.pop();
            }
            Ok(())
        }
        _ => Err(CatalogError::NamespaceCollision {
            path: Namespace::from_trusted(path.clone()),
        }),
    }
}

impl Serialize for DecisionTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DecisionTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let duplicate = RefCell::new(None);
        let parsed = StrictValue::root(&duplicate).deserialize(deserializer);
        let value = match parsed {
            Ok(value) => value,
            Err(e) => {
                return Err(match duplicate.borrow_mut().take() {
                    Some(path) => de::Error::custom(collision_at(path)),
                    None => e,
                })
            }
        };
        let tree = DecisionTree::from_json(&value);
        tree.validate_keys().map_err(serde::de::Error::custom)?;
        Ok(tree)
    }
}

/// Everything one policy emitted during one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyOutput {
    namespace: Namespace,
    sets: BTreeMap<String, Vec<Value>>,
}

impl PolicyOutput {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            sets: BTreeMap::new(),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Emit a decision under `verb`.
    pub fn emit(&mut self, verb: Verb, decision: Decision) -> &mut Self {
        self.sets
            .entry(verb.as_str().to_string())
            .or_default()
            .push(decision.to_value());
        self
    }

    /// Emit a raw object under an arbitrary key, as an external evaluator
    /// would. The key need not be a verb.
    pub fn emit_raw(&mut self, key: &str, value: Value) -> Result<&mut Self, CatalogError> {
        // Validates the key as a segment.
        self.namespace.child(key)?;
        self.sets.entry(key.to_string()).or_default().push(value);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.sets.values().all(Vec::is_empty)
    }

    pub fn decision_count(&self) -> usize {
        self.sets.values().map(Vec::len).sum()
    }
}

/// Builds a decision tree from policy outputs, refusing overlapping writes.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    scope: Option<RulebookScope>,
    root: BTreeMap<String, DecisionTree>,
    written: BTreeSet<Namespace>,
}

impl TreeBuilder {
    /// A builder accepting any namespace (for host-level layering).
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder that only accepts writes inside one rulebook's subtree.
    pub fn scoped(scope: RulebookScope) -> Self {
        Self {
            scope: Some(scope),
            ..Self::default()
        }
    }

    /// Record one policy's output.
    ///
    /// Each namespace may be recorded once. A namespace outside the scope,
    /// or one whose decision sets would land on an existing node, fails
    /// with a fatal error and leaves the tree unchanged.
    pub fn record(&mut self, output: PolicyOutput) -> Result<(), CatalogError> {
        let ns = output.namespace;

        if let Some(scope) = &self.scope {
            if !scope.contains(&ns) {
                return Err(CatalogError::NamespaceEscape {
                    path: ns,
                    scope: scope.prefix().clone(),
                });
            }
        }
        if self.written.contains(&ns) {
            return Err(CatalogError::NamespaceCollision { path: ns });
        }

        let sets: Vec<(String, Vec<Value>)> = output
            .sets
            .into_iter()
            .filter(|(_, items)| !items.is_empty())
            .collect();

        if !sets.is_empty() {
            // Check before mutating so a failed record leaves no partial write.
            self.check_free(&ns, &sets)?;
            let node = node_at(&mut self.root, ns.segments());
            for (key, items) in sets {
                node.insert(key, DecisionTree::Leaf(items));
            }
        }

        self.written.insert(ns);
        Ok(())
    }

    fn check_free(&self, ns: &Namespace, sets: &[(String, Vec<Value>)]) -> Result<(), CatalogError> {
        let mut children = &self.root;
        for (depth, seg) in ns.segments().iter().enumerate() {
            match children.get(seg) {
                None => return Ok(()),
                Some(DecisionTree::Node(next)) => children = next,
                Some(_) => {
                    return Err(CatalogError::NamespaceCollision {
                        path: Namespace::from_trusted(ns.segments()[..=depth].to_vec()),
                    })
                }
            }
        }
        match sets.iter().find(|(key, _)| children.contains_key(key)) {
            Some((key, _)) => Err(CatalogError::NamespaceCollision {
                path: Namespace::from_trusted(
                    ns.segments().iter().cloned().chain([key.clone()]).collect(),
                ),
            }),
            None => Ok(()),
        }
    }

    /// Namespaces recorded so far.
    pub fn written(&self) -> impl Iterator<Item = &Namespace> {
        self.written.iter()
    }

    pub fn build(self) -> DecisionTree {
        DecisionTree::Node(self.root)
    }
}

// Walk to (creating as needed) the interior node at `segments`. Callers
// must have checked with `check_free` that no leaf lies on the way.
fn node_at<'a>(
    root: &'a mut BTreeMap<String, DecisionTree>,
    segments: &[String],
) -> &'a mut BTreeMap<String, DecisionTree> {
    let mut children = root;
    for seg in segments {
        let entry = children
            .entry(seg.clone())
            .or_insert_with(DecisionTree::empty);
        if !matches!(entry, DecisionTree::Node(_)) {
            *entry = DecisionTree::empty();
        }
        children = match entry {
            DecisionTree::Node(next) => next,
            _ => unreachable!("non-node replaced above"),
        };
    }
    children
}

fn collision_at(path: Vec<String>) -> CatalogError {
    match Namespace::from_segments(path) {
        Ok(path) => CatalogError::NamespaceCollision { path },
        Err(e) => e,
    }
}

// JSON reader that refuses repeated object keys. `serde_json::Value` keeps
// the last of two equal keys, which would silently pick one of two writes to
// the same path. Above decision sets a repeat is recorded in `duplicate` so
// the caller can report the colliding path; inside a set it is a plain
// parse error.
struct StrictValue<'a> {
    path: Vec<String>,
    in_set: bool,
    duplicate: &'a RefCell<Option<Vec<String>>>,
}

impl<'a> StrictValue<'a> {
    fn root(duplicate: &'a RefCell<Option<Vec<String>>>) -> Self {
        Self {
            path: Vec::new(),
            in_set: false,
            duplicate,
        }
    }
}

impl<'de, 'a> DeserializeSeed<'de> for StrictValue<'a> {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de, 'a> Visitor<'de> for StrictValue<'a> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value without repeated object keys")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        self.deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(StrictValue {
            path: self.path.clone(),
            in_set: true,
            duplicate: self.duplicate,
        })? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut object = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            let mut path = self.path.clone();
            path.push(key.clone());
            if object.contains_key(&key) {
                if !self.in_set {
                    *self.duplicate.borrow_mut() = Some(path.clone());
                }
                return Err(de::Error::custom(format!(
                    "key '{}' written twice at '{}'",
                    key,
                    path.join(".")
                )));
            }
            let value = map.next_value_seed(StrictValue {
                path,
                in_set: self.in_set,
                duplicate: self.duplicate,
            })?;
            object.insert(key, value);
        }
        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Severity;
    use serde_json::json;

    fn ns(s: &str) -> Namespace {
        Namespace::parse(s).unwrap()
    }

    fn output(namespace: &str, verb: Verb, rule_id: &str) -> PolicyOutput {
        let mut out = PolicyOutput::new(ns(namespace));
        out.emit(verb, Decision::new(rule_id, "test", Severity::High));
        out
    }

    #[test]
    fn builder_places_sets_under_verb_keys() {
        let mut builder = TreeBuilder::new();
        builder
            .record(output("c.a.policies.x", Verb::Deny, "R1"))
            .unwrap();
        let tree = builder.build();

        match tree.subtree(&ns("c.a.policies.x.deny")) {
            Some(DecisionTree::Leaf(items)) => assert_eq!(items[0]["rule_id"], "R1"),
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_namespace_is_collision() {
        let mut builder = TreeBuilder::new();
        builder.record(output("c.a.policies.x", Verb::Deny, "R1")).unwrap();
        match builder.record(output("c.a.policies.x", Verb::Halt, "R2")) {
            Err(CatalogError::NamespaceCollision { path }) => {
                assert_eq!(path, ns("c.a.policies.x"))
            }
            other => panic!("expected NamespaceCollision, got {:?}", other),
        }
    }

    #[test]
    fn empty_output_still_claims_its_namespace() {
        let mut builder = TreeBuilder::new();
        builder.record(PolicyOutput::new(ns("c.a.policies.x"))).unwrap();
        assert!(builder
            .record(output("c.a.policies.x", Verb::Deny, "R1"))
            .is_err());
    }

    #[test]
    fn raw_key_landing_on_policy_node_is_collision() {
        let mut builder = TreeBuilder::new();
        builder.record(output("c.a.policies.x.deny", Verb::Halt, "R1")).unwrap();
        // Parent policy writes a `deny` set where a node already exists.
        let err = builder
            .record(output("c.a.policies.x", Verb::Deny, "R2"))
            .unwrap_err();
        assert!(err.is_fatal());
        // The failed write left the first policy's decisions intact.
        let tree = builder.build();
        assert!(tree.subtree(&ns("c.a.policies.x.deny.halt")).is_some());
    }

    #[test]
    fn scoped_builder_rejects_escape() {
        let scope = RulebookScope::new(&ns("c"), "a").unwrap();
        let mut builder = TreeBuilder::scoped(scope);
        builder.record(output("c.a.policies.x", Verb::Deny, "R1")).unwrap();
        match builder.record(output("c.b.policies.x", Verb::Deny, "R1")) {
            Err(CatalogError::NamespaceEscape { scope, .. }) => assert_eq!(scope, ns("c.a")),
            other => panic!("expected NamespaceEscape, got {:?}", other),
        }
        assert_eq!(builder.written().count(), 1);
    }

    #[test]
    fn union_merges_disjoint_rulebooks() {
        let mut a = TreeBuilder::new();
        a.record(output("c.a.policies.dangerous_commands", Verb::Halt, "X")).unwrap();
        let mut b = TreeBuilder::new();
        b.record(output("c.b.policies.dangerous_commands", Verb::Halt, "X")).unwrap();

        let merged = DecisionTree::union([a.build(), b.build()]).unwrap();
        assert_eq!(merged.entry_count(), 2);
        assert!(merged.subtree(&ns("c.a.policies.dangerous_commands.halt")).is_some());
        assert!(merged.subtree(&ns("c.b.policies.dangerous_commands.halt")).is_some());
    }

    #[test]
    fn union_refuses_overlapping_sets() {
        let mut a = TreeBuilder::new();
        a.record(output("c.a.policies.x", Verb::Halt, "X")).unwrap();
        let mut b = TreeBuilder::new();
        b.record(output("c.a.policies.x", Verb::Halt, "Y")).unwrap();

        match DecisionTree::union([a.build(), b.build()]) {
            Err(CatalogError::NamespaceCollision { path }) => {
                assert_eq!(path, ns("c.a.policies.x.halt"))
            }
            other => panic!("expected NamespaceCollision, got {:?}", other),
        }
    }

    #[test]
    fn json_loading_keeps_order_and_drops_scalars() {
        let tree = DecisionTree::from_json_str(
            r#"{"c": {"a": {"policies": {"x": {
                "deny": [{"rule_id": "R1"}, {"rule_id": "R2"}],
                "enabled": true
            }}}}}"#,
        )
        .unwrap();
        match tree.subtree(&ns("c.a.policies.x.deny")) {
            Some(DecisionTree::Leaf(items)) => {
                assert_eq!(items[0]["rule_id"], "R1");
                assert_eq!(items[1]["rule_id"], "R2");
            }
            other => panic!("expected leaf, got {:?}", other),
        }
        assert!(tree.subtree(&ns("c.a.policies.x.enabled")).is_none());
    }

    #[test]
    fn json_loading_rejects_invalid_keys() {
        assert!(DecisionTree::from_json_str(r#"{"my-rulebook": {"deny": []}}"#).is_err());
        assert!(serde_json::from_value::<DecisionTree>(json!({"a b": {"deny": []}})).is_err());
    }

    #[test]
    fn non_array_under_verb_key_is_kept_as_malformed() {
        let tree = DecisionTree::from_json(&json!({"c": {"rb": {"policies": {"x": {
            "halt": {"rule_id": "R", "reason": "r", "severity": "CRITICAL"},
            "deny": null,
            "enabled": true
        }}}}}));

        match tree.subtree(&ns("c.rb.policies.x")) {
            Some(DecisionTree::Node(children)) => {
                assert!(matches!(children.get("halt"), Some(DecisionTree::Malformed(Value::Object(_)))));
                assert_eq!(children.get("deny"), Some(&DecisionTree::Malformed(Value::Null)));
                assert!(children.get("enabled").is_none());
            }
            other => panic!("expected node, got {:?}", other),
        }

        let mut seen = Vec::new();
        tree.walk_malformed(&mut |path, _| seen.push(path.join(".")));
        assert_eq!(seen, vec!["c.rb.policies.x.deny", "c.rb.policies.x.halt"]);
        assert_eq!(tree.entry_count(), 0);
    }

    #[test]
    fn repeated_key_in_document_is_collision() {
        let doc = r#"{"c": {"rb": {"policies": {"x": {
            "halt": [{"rule_id": "H", "reason": "r", "severity": "CRITICAL"}],
            "halt": []
        }}}}}"#;
        match DecisionTree::from_json_str(doc) {
            Err(CatalogError::NamespaceCollision { path }) => {
                assert_eq!(path, ns("c.rb.policies.x.halt"))
            }
            other => panic!("expected NamespaceCollision, got {:?}", other),
        }
        assert!(serde_json::from_str::<DecisionTree>(doc).is_err());

        let repeated_policy = r#"{"c": {"x": {"deny": []}, "x": {"halt": []}}}"#;
        match DecisionTree::from_json_str(repeated_policy) {
            Err(CatalogError::NamespaceCollision { path }) => assert_eq!(path, ns("c.x")),
            other => panic!("expected NamespaceCollision, got {:?}", other),
        }
    }

    #[test]
    fn repeated_field_inside_a_decision_is_a_parse_error() {
        let doc = r#"{"c": {"x": {"deny": [{"rule_id": "A", "rule_id": "B"}]}}}"#;
        match DecisionTree::from_json_str(doc) {
            Err(CatalogError::Json(_)) => {}
            other => panic!("expected Json error, got {:?}", other),
        }
    }

    #[test]
    fn strict_reader_keeps_plain_documents_intact() {
        let doc = r#"{"c": {"x": {"ask": [{"rule_id": "A", "n": -1, "f": 1.5, "q": null, "ok": true}]}}}"#;
        let tree = DecisionTree::from_json_str(doc).unwrap();
        let expected: Value = serde_json::from_str(doc).unwrap();
        assert_eq!(tree.to_json(), expected);
        assert!(DecisionTree::from_json_str(r#"{"c": {}} trailing"#).is_err());
    }

    #[test]
    fn walk_is_deterministic() {
        let mut builder = TreeBuilder::new();
        builder.record(output("c.a.policies.z", Verb::Deny, "Z")).unwrap();
        builder.record(output("c.a.policies.b", Verb::Deny, "B")).unwrap();
        let tree = builder.build();

        let mut first = Vec::new();
        tree.walk(&mut |path, _| first.push(path.join(".")));
        let mut second = Vec::new();
        tree.walk(&mut |path, _| second.push(path.join(".")));
        assert_eq!(first, second);
        assert_eq!(first, vec!["c.a.policies.b.deny", "c.a.policies.z.deny"]);
    }

    #[test]
    fn emit_raw_validates_key() {
        let mut out = PolicyOutput::new(ns("c.a.policies.x"));
        assert!(out.emit_raw("warn", json!({"rule_id": "R"})).is_ok());
        assert!(out.emit_raw("not-a-key", json!({})).is_err());
        assert_eq!(out.decision_count(), 1);
    }
}
