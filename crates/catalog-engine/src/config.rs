//! Catalog engine configuration (`catalog.toml`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::namespace::{Namespace, RulebookScope};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Namespace layout
    #[serde(default)]
    pub namespace: NamespaceConfig,

    /// Evaluation behaviour
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// Where catalog rulebooks live and which prefixes belong to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Root under which every catalog rulebook gets its own segment
    #[serde(default = "default_root")]
    pub root: String,

    /// Host-owned prefixes a catalog package may never use
    #[serde(default = "default_reserved_prefixes")]
    pub reserved_prefixes: Vec<String>,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            reserved_prefixes: default_reserved_prefixes(),
        }
    }
}

/// Evaluation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Evaluate the policies of one request on parallel threads
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
        }
    }
}

// Serde default functions
fn default_root() -> String {
    "cupcake.catalog".to_string()
}

fn default_reserved_prefixes() -> Vec<String> {
    ["cupcake.policies", "cupcake.global", "cupcake.system", "cupcake.helpers"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_parallel() -> bool {
    true
}

impl CatalogConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load if the file exists, otherwise use defaults. A file that exists
    /// but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, CatalogError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self, CatalogError> {
        let config: Self = toml::from_str(content)?;
        // Surface namespace typos at load time.
        config.root()?;
        config.reserved()?;
        Ok(config)
    }

    pub fn root(&self) -> Result<Namespace, CatalogError> {
        Namespace::parse(&self.namespace.root)
    }

    pub fn reserved(&self) -> Result<Vec<Namespace>, CatalogError> {
        self.namespace
            .reserved_prefixes
            .iter()
            .map(|p| Namespace::parse(p))
            .collect()
    }

    /// Scope of `rulebook` under the configured root.
    pub fn scope(&self, rulebook: &str) -> Result<RulebookScope, CatalogError> {
        RulebookScope::new(&self.root()?, rulebook)
    }
}
