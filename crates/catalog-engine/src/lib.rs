//! # catalog-engine
//!
//! Decision aggregation and command-safety engine for policy rulebooks.
//!
//! Every rulebook writes verb-tagged decision sets (`halt`, `deny`, `block`,
//! `ask`, `allow_override`, `add_context`) into its own subtree of a
//! per-request [`DecisionTree`]. The [`aggregator`] collects each verb at any
//! depth, and the [`resolver`] turns the collected [`EvaluationOutcome`] into
//! exactly one [`Action`] by strict priority.
//!
//! ## Key invariants
//!
//! - **Namespace isolation**: a rulebook can only write under
//!   `<root>.<rulebook>`; identical paths are a collision, never a merge.
//! - **Strict priority**: Halt > Deny/Block > Ask > Allow override > default
//!   allow. `add_context` never changes the action.
//! - **Fail closed**: a fatal error becomes a HALT, not an allow.
//! - **Word-boundary matching**: [`command`] predicates never test substrings,
//!   so `rm` does not match `rmdir` or `format`.

pub mod aggregator;
pub mod command;
pub mod config;
pub mod decision;
pub mod error;
pub mod evaluator;
pub mod lint;
pub mod namespace;
pub mod resolver;
pub mod routing;
pub mod rulebooks;
pub mod tree;

pub use aggregator::{aggregate, collect, Aggregation, Collection, EvaluationOutcome, FiredDecision};
pub use command::{CommandMatcher, CommandPattern};
pub use config::CatalogConfig;
pub use decision::{Decision, Severity, Verb};
pub use error::{CatalogError, MalformedDecision};
pub use evaluator::{Evaluation, Evaluator, Policy};
pub use lint::{lint_rulebook_namespaces, lint_tree, LintFinding, LintKind, NamespaceReport};
pub use namespace::{Namespace, RulebookScope};
pub use resolver::{resolve, Action, Resolution};
pub use routing::RoutingMetadata;
pub use rulebooks::Rulebook;
pub use tree::{DecisionTree, PolicyOutput, TreeBuilder};
