// namespace.rs — Hierarchical namespaces and rulebook scoping.
//
// Every decision lives at a qualified path such as
// `cupcake.catalog.security_essentials.policies.claude.dangerous_commands`.
// Paths are kept as ordered segment lists and compared structurally, so the
// isolation rule ("a rulebook writes only under its own prefix") is a plain
// prefix check instead of string slicing.
//
// Layout of one rulebook under the catalog root:
//   <root>.<rulebook>.policies.<harness>.<policy>...
//   <root>.<rulebook>.helpers.<path>...
//   <root>.<rulebook>.system

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CatalogError;

/// A qualified name: a non-empty ordered list of identifier segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace {
    segments: Vec<String>,
}

impl Namespace {
    /// Parse a dotted namespace string.
    pub fn parse(s: &str) -> Result<Self, CatalogError> {
        Self::from_segments(s.split('.'))
    }

    /// Build a namespace from individual segments, validating each one.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let display = segments.join(".");
        if segments.is_empty() {
            return Err(CatalogError::InvalidNamespace {
                namespace: display,
                reason: "namespace has no segments".to_string(),
            });
        }
        for segment in &segments {
            validate_segment(segment).map_err(|reason| CatalogError::InvalidNamespace {
                namespace: display.clone(),
                reason,
            })?;
        }
        Ok(Self { segments })
    }

    /// Internal constructor for segment lists already known to be valid.
    pub(crate) fn from_trusted(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a namespace has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment.
    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Append one segment.
    pub fn child(&self, segment: &str) -> Result<Self, CatalogError> {
        validate_segment(segment).map_err(|reason| CatalogError::InvalidNamespace {
            namespace: format!("{}.{}", self, segment),
            reason,
        })?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// Append every segment of `path`.
    pub fn join(&self, path: &[&str]) -> Result<Self, CatalogError> {
        path.iter().try_fold(self.clone(), |ns, seg| ns.child(seg))
    }

    /// Segment-wise prefix test. `a.b` is a prefix of `a.b.c` but not of `a.bc`.
    pub fn starts_with(&self, prefix: &Namespace) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// The segments after `prefix`, if `prefix` is a prefix of `self`.
    pub fn strip_prefix(&self, prefix: &Namespace) -> Option<&[String]> {
        if self.starts_with(prefix) {
            Some(&self.segments[prefix.segments.len()..])
        } else {
            None
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for Namespace {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::parse(s)
    }
}

impl Serialize for Namespace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Namespace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Namespace::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn validate_segment(segment: &str) -> Result<(), String> {
    if segment.is_empty() {
        return Err("empty segment".to_string());
    }
    if let Some(bad) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(format!("segment '{}' contains invalid character '{}'", segment, bad));
    }
    Ok(())
}

/// Convert a rulebook name to its namespace segment.
///
/// Hyphens become underscores; nothing else is substituted.
pub fn normalize_rulebook_name(name: &str) -> String {
    name.replace('-', "_")
}

/// The namespace subtree owned by one rulebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulebookScope {
    prefix: Namespace,
}

impl RulebookScope {
    /// Scope for `rulebook` (hyphenated or not) under the catalog `root`.
    pub fn new(root: &Namespace, rulebook: &str) -> Result<Self, CatalogError> {
        let segment = normalize_rulebook_name(rulebook);
        Ok(Self {
            prefix: root.child(&segment)?,
        })
    }

    /// `<root>.<rulebook>`
    pub fn prefix(&self) -> &Namespace {
        &self.prefix
    }

    /// The normalized rulebook segment.
    pub fn rulebook(&self) -> &str {
        self.prefix.last()
    }

    /// `<root>.<rulebook>.policies`
    pub fn policies(&self) -> Namespace {
        self.fixed_child("policies")
    }

    /// `<root>.<rulebook>.policies.<harness>`
    pub fn harness(&self, harness: &str) -> Result<Namespace, CatalogError> {
        self.policies().child(harness)
    }

    /// `<root>.<rulebook>.policies.<harness>.<policy>`
    pub fn policy(&self, harness: &str, policy: &str) -> Result<Namespace, CatalogError> {
        self.harness(harness)?.child(policy)
    }

    /// `<root>.<rulebook>.helpers`
    pub fn helpers(&self) -> Namespace {
        self.fixed_child("helpers")
    }

    /// `<root>.<rulebook>.system`
    pub fn system(&self) -> Namespace {
        self.fixed_child("system")
    }

    /// Whether `ns` lies inside this rulebook's subtree.
    pub fn contains(&self, ns: &Namespace) -> bool {
        ns.starts_with(&self.prefix)
    }

    fn fixed_child(&self, segment: &str) -> Namespace {
        let mut segments = self.prefix.segments().to_vec();
        segments.push(segment.to_string());
        Namespace::from_trusted(segments)
    }
}

/// Why a policy package declaration is not acceptable for a catalog rulebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageViolation {
    /// The package sits under a namespace reserved for the host.
    Reserved { package: String, prefix: String },
    /// The package is outside the rulebook's policies/helpers/system subtrees.
    OutOfScope { package: String, expected: String },
    /// The package is not a valid namespace at all.
    Invalid { package: String, reason: String },
}

impl fmt::Display for PackageViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageViolation::Reserved { package, prefix } => write!(
                f,
                "package '{}' uses reserved namespace '{}'",
                package, prefix
            ),
            PackageViolation::OutOfScope { package, expected } => write!(
                f,
                "package '{}' must start with '{}.policies', '{}.helpers' or '{}.system'",
                package, expected, expected, expected
            ),
            PackageViolation::Invalid { package, reason } => {
                write!(f, "package '{}' is not a valid namespace: {}", package, reason)
            }
        }
    }
}

/// Check a policy package name against the catalog namespace convention.
pub fn validate_package(
    scope: &RulebookScope,
    package: &str,
    reserved: &[Namespace],
) -> Result<Namespace, PackageViolation> {
    let ns = Namespace::parse(package).map_err(|e| PackageViolation::Invalid {
        package: package.to_string(),
        reason: match e {
            CatalogError::InvalidNamespace { reason, .. } => reason,
            other => other.to_string(),
        },
    })?;

    if let Some(prefix) = reserved.iter().find(|r| ns.starts_with(r)) {
        return Err(PackageViolation::Reserved {
            package: package.to_string(),
            prefix: prefix.to_string(),
        });
    }

    let allowed = [scope.policies(), scope.helpers(), scope.system()];
    if allowed.iter().any(|p| ns.starts_with(p)) {
        Ok(ns)
    } else {
        Err(PackageViolation::OutOfScope {
            package: package.to_string(),
            expected: scope.prefix().to_string(),
        })
    }
}
