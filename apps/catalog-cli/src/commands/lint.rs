// lint.rs — Lint subcommands: tree, namespace.

use std::path::PathBuf;

use clap::Subcommand;

use catalog_engine::{aggregate, lint_rulebook_namespaces, lint_tree, CatalogConfig};

#[derive(Subcommand)]
pub enum LintCommands {
    /// Check a decision tree for unknown verb keys and malformed decisions.
    Tree {
        /// JSON file holding the tree.
        file: PathBuf,
    },
    /// Check every policy package in a rulebook directory.
    Namespace {
        /// Rulebook directory (holds manifest.yaml).
        dir: PathBuf,
    },
}

pub fn execute(cmd: &LintCommands, config: &CatalogConfig) -> anyhow::Result<()> {
    match cmd {
        LintCommands::Tree { file } => {
            let tree = super::read_tree(file)?;
            let findings = lint_tree(&tree);
            let malformed = aggregate(&tree).malformed;

            for f in &findings {
                println!("{}", f);
            }
            for m in &malformed {
                println!("[malformed] {}", m);
            }

            let problems = findings.len() + malformed.len();
            if problems > 0 {
                anyhow::bail!("{}: {} problem(s)", file.display(), problems);
            }
            println!("{}: ok ({} decision entries)", file.display(), tree.entry_count());
        }

        LintCommands::Namespace { dir } => {
            let report = lint_rulebook_namespaces(dir, config)?;
            println!(
                "Validating namespaces: {} (scope {})",
                report.rulebook, report.scope
            );
            for f in &report.findings {
                println!("  {}", f);
            }
            if !report.is_clean() {
                anyhow::bail!(
                    "{} namespace violation(s) in {}",
                    report.findings.len(),
                    dir.display()
                );
            }
            println!("  {} file(s) ok", report.files_checked);
        }
    }
    Ok(())
}
