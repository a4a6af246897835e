// lint.rs — Authoring-time checks for decision trees and rulebook sources.
//
// None of these checks run on the evaluation path. They catch mistakes the
// aggregator would otherwise only report per request:
//
// 1. Decision sets filed under a key that is not one of the six verbs
// 2. Decision sets with no policy namespace above them
// 3. Verb keys holding something other than an array
// 4. Policy packages outside the rulebook's own namespace subtree
// 5. Policy packages that claim a host-reserved namespace

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::CatalogConfig;
use crate::decision::Verb;
use crate::error::CatalogError;
use crate::namespace::{validate_package, PackageViolation};
use crate::tree::DecisionTree;

// ── Data Model ──

/// What a finding is about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LintKind {
    /// A decision set under a key that is not a verb; aggregation ignores it.
    UnknownVerb,
    /// A verb key directly at the tree root.
    Unattributed,
    /// A verb key whose value is not an array of decisions.
    NotASet,
    /// A policy source with no `package` declaration.
    MissingPackage,
    /// A package under a host-reserved prefix.
    ReservedNamespace,
    /// A package outside the rulebook's policies/helpers/system subtrees.
    OutOfScope,
    /// A package name that is not a valid namespace.
    InvalidPackage,
    /// The rulebook has no policy sources at all.
    NoPolicies,
}

impl fmt::Display for LintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LintKind::UnknownVerb => "unknown-verb",
            LintKind::Unattributed => "unattributed",
            LintKind::NotASet => "not-a-set",
            LintKind::MissingPackage => "missing-package",
            LintKind::ReservedNamespace => "reserved-namespace",
            LintKind::OutOfScope => "out-of-scope",
            LintKind::InvalidPackage => "invalid-package",
            LintKind::NoPolicies => "no-policies",
        };
        write!(f, "{}", s)
    }
}

/// A single lint finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LintFinding {
    pub kind: LintKind,
    /// Tree path or file path (relative to the rulebook) the finding is about.
    pub location: String,
    pub message: String,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Result of checking one rulebook directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamespaceReport {
    /// `metadata.name` from the manifest, as written.
    pub rulebook: String,
    /// The namespace every package must live under.
    pub scope: String,
    pub files_checked: usize,
    pub findings: Vec<LintFinding>,
}

impl NamespaceReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

// ── Tree lint ──

/// Report decision sets the aggregator would skip or could not attribute.
pub fn lint_tree(tree: &DecisionTree) -> Vec<LintFinding> {
    let mut findings = Vec::new();
    tree.walk(&mut |path, items| {
        let Some(key) = path.last() else {
            findings.push(LintFinding {
                kind: LintKind::Unattributed,
                location: "<root>".to_string(),
                message: "the tree itself is a decision set".to_string(),
            });
            return;
        };
        let location = path.join(".");

        match Verb::from_key(key) {
            None => findings.push(LintFinding {
                kind: LintKind::UnknownVerb,
                location,
                message: format!(
                    "'{}' is not a decision verb; {} entr{} will never be aggregated",
                    key,
                    items.len(),
                    if items.len() == 1 { "y" } else { "ies" }
                ),
            }),
            Some(verb) if path.len() == 1 => findings.push(LintFinding {
                kind: LintKind::Unattributed,
                location,
                message: format!("'{}' decisions have no policy namespace", verb),
            }),
            Some(_) => {}
        }
    });

    tree.walk_malformed(&mut |path, value| {
        let found = if value.is_object() { "a single object" } else { "not an array" };
        findings.push(LintFinding {
            kind: LintKind::NotASet,
            location: path.join("."),
            message: format!("decision sets must be arrays; this one is {}", found),
        });
    });

    for finding in &findings {
        tracing::warn!("tree lint: {}", finding);
    }
    findings
}

// ── Namespace lint ──

const PACKAGE_PATTERN: &str = r"(?m)^\s*package\s+([\w.]+)";

#[derive(Debug, Deserialize)]
struct ManifestHeader {
    metadata: Option<ManifestMetadata>,
}

#[derive(Debug, Deserialize)]
struct ManifestMetadata {
    name: Option<String>,
}

/// Read `metadata.name` from `<dir>/manifest.yaml`.
pub fn rulebook_name(dir: &Path) -> Result<String, CatalogError> {
    let path = dir.join("manifest.yaml");
    if !path.exists() {
        return Err(CatalogError::Manifest {
            reason: format!("no manifest.yaml in {}", dir.display()),
        });
    }
    let content = std::fs::read_to_string(&path)?;
    let header: ManifestHeader = serde_yaml::from_str(&content)?;
    header
        .metadata
        .and_then(|m| m.name)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| CatalogError::Manifest {
            reason: format!("{} has no metadata.name", path.display()),
        })
}

/// Check every policy source under `dir` against the catalog namespace rule.
///
/// The rulebook's own scope comes from its manifest name under the
/// configured root. Findings are returned in file order; only a missing or
/// unreadable manifest, or an I/O failure, is an error.
pub fn lint_rulebook_namespaces(
    dir: &Path,
    config: &CatalogConfig,
) -> Result<NamespaceReport, CatalogError> {
    let name = rulebook_name(dir)?;
    let scope = config.scope(&name)?;
    let reserved = config.reserved()?;
    let package_re = Regex::new(PACKAGE_PATTERN).map_err(|e| CatalogError::InvalidPattern {
        pattern: PACKAGE_PATTERN.to_string(),
        reason: e.to_string(),
    })?;

    let sources = policy_sources(dir)?;
    let mut report = NamespaceReport {
        rulebook: name,
        scope: scope.prefix().to_string(),
        files_checked: sources.len(),
        findings: Vec::new(),
    };

    if sources.is_empty() {
        report.findings.push(LintFinding {
            kind: LintKind::NoPolicies,
            location: dir.display().to_string(),
            message: "no .rego files found".to_string(),
        });
    }

    for path in &sources {
        let location = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .display()
            .to_string();
        let content = std::fs::read_to_string(path)?;

        let Some(package) = package_re.captures(&content).and_then(|c| c.get(1)) else {
            report.findings.push(LintFinding {
                kind: LintKind::MissingPackage,
                location,
                message: "no package declaration found".to_string(),
            });
            continue;
        };

        if let Err(violation) = validate_package(&scope, package.as_str(), &reserved) {
            let kind = match violation {
                PackageViolation::Reserved { .. } => LintKind::ReservedNamespace,
                PackageViolation::OutOfScope { .. } => LintKind::OutOfScope,
                PackageViolation::Invalid { .. } => LintKind::InvalidPackage,
            };
            report.findings.push(LintFinding {
                kind,
                location,
                message: violation.to_string(),
            });
        }
    }

    tracing::info!(
        "namespace lint {}: {} file(s), {} finding(s)",
        report.rulebook,
        report.files_checked,
        report.findings.len()
    );
    Ok(report)
}

fn policy_sources(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let base = glob::Pattern::escape(&dir.display().to_string());
    let pattern = format!("{}/**/*.rego", base);
    let entries = glob::glob(&pattern).map_err(|e| CatalogError::InvalidPattern {
        pattern: pattern.clone(),
        reason: e.to_string(),
    })?;

    let mut sources = Vec::new();
    for entry in entries {
        sources.push(entry.map_err(|e| CatalogError::Io(e.into()))?);
    }
    sources.sort();
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn rulebook(name: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "manifest.yaml",
            &format!("apiVersion: cupcake.dev/v1\nkind: Rulebook\nmetadata:\n  name: {}\n  version: 1.0.0\n", name),
        );
        dir
    }

    #[test]
    fn tree_lint_flags_unknown_and_unattributed_keys() {
        let tree = DecisionTree::from_json(&json!({
            "deny": [{"rule_id": "R", "reason": "r", "severity": "HIGH"}],
            "cupcake": {"catalog": {"rb": {"policies": {"p": {
                "denied": [{"rule_id": "R", "reason": "r", "severity": "HIGH"}],
                "halt": []
            }}}}}
        }));

        let findings = lint_tree(&tree);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].kind, LintKind::UnknownVerb);
        assert_eq!(findings[0].location, "cupcake.catalog.rb.policies.p.denied");
        assert_eq!(findings[1].kind, LintKind::Unattributed);
        assert_eq!(findings[1].location, "deny");
    }

    #[test]
    fn tree_lint_flags_verb_keys_without_arrays() {
        let tree = DecisionTree::from_json(&json!({"c": {"rb": {"policies": {"x": {
            "halt": {"rule_id": "R", "reason": "r", "severity": "CRITICAL"},
            "ask": "maybe"
        }}}}}));

        let findings = lint_tree(&tree);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.kind == LintKind::NotASet));
        assert_eq!(findings[0].location, "c.rb.policies.x.ask");
        assert_eq!(findings[1].location, "c.rb.policies.x.halt");
        assert!(findings[1].message.contains("single object"));
    }

    #[test]
    fn tree_lint_accepts_well_formed_tree() {
        let tree = DecisionTree::from_json(&json!({
            "a": {"policies": {"x": {"ask": [], "add_context": []}}}
        }));
        assert!(lint_tree(&tree).is_empty());
    }

    #[test]
    fn valid_rulebook_is_clean() {
        let dir = rulebook("git-safety");
        write(
            dir.path(),
            "policies/claude/push.rego",
            "# METADATA\npackage cupcake.catalog.git_safety.policies.claude.push\n\nimport rego.v1\n",
        );
        write(
            dir.path(),
            "system/evaluate.rego",
            "package cupcake.catalog.git_safety.system\n",
        );
        write(
            dir.path(),
            "policies/helpers/commands.rego",
            "package cupcake.catalog.git_safety.helpers.commands\n",
        );

        let report = lint_rulebook_namespaces(dir.path(), &CatalogConfig::default()).unwrap();
        assert_eq!(report.scope, "cupcake.catalog.git_safety");
        assert_eq!(report.files_checked, 3);
        assert!(report.is_clean(), "{:?}", report.findings);
    }

    #[test]
    fn violations_are_reported_per_file() {
        let dir = rulebook("git-safety");
        write(dir.path(), "policies/claude/a.rego", "package cupcake.policies.push\n");
        write(dir.path(), "policies/claude/b.rego", "package cupcake.catalog.other.policies.x\n");
        write(dir.path(), "policies/claude/c.rego", "# no package here\n");

        let report = lint_rulebook_namespaces(dir.path(), &CatalogConfig::default()).unwrap();
        let kinds: Vec<LintKind> = report.findings.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![LintKind::ReservedNamespace, LintKind::OutOfScope, LintKind::MissingPackage]
        );
        assert!(report.findings[0].location.ends_with("a.rego"));
        assert!(!report.findings[0].location.starts_with('/'));
    }

    #[test]
    fn empty_rulebook_has_no_policies_finding() {
        let dir = rulebook("empty");
        let report = lint_rulebook_namespaces(dir.path(), &CatalogConfig::default()).unwrap();
        assert_eq!(report.files_checked, 0);
        assert_eq!(report.findings[0].kind, LintKind::NoPolicies);
    }

    #[test]
    fn manifest_is_required() {
        let dir = tempfile::tempdir().unwrap();
        match lint_rulebook_namespaces(dir.path(), &CatalogConfig::default()) {
            Err(CatalogError::Manifest { .. }) => {}
            other => panic!("expected Manifest error, got {:?}", other),
        }

        write(dir.path(), "manifest.yaml", "metadata:\n  version: 1.0.0\n");
        match rulebook_name(dir.path()) {
            Err(CatalogError::Manifest { reason }) => assert!(reason.contains("metadata.name")),
            other => panic!("expected Manifest error, got {:?}", other),
        }
    }

    #[test]
    fn custom_root_changes_expected_scope() {
        let dir = rulebook("rb");
        write(dir.path(), "policies/x.rego", "package cupcake.catalog.rb.policies.x\n");
        let config = CatalogConfig::parse("[namespace]\nroot = \"acme.rules\"\n").unwrap();

        let report = lint_rulebook_namespaces(dir.path(), &config).unwrap();
        assert_eq!(report.scope, "acme.rules.rb");
        assert_eq!(report.findings[0].kind, LintKind::OutOfScope);
    }
}
