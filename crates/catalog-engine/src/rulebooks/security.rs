// security.rs — The `security-essentials` rulebook.
//
// Shell-command guards for the `claude` harness. Every policy reads the Bash
// command from `tool_input.command`, lowercases it, and matches with the
// anchored predicates from `crate::command` only.
//
// | policy             | fires on                                   | verb        | rule            |
// |--------------------|--------------------------------------------|-------------|-----------------|
// | dangerous_commands | recursive `rm` of `/`                      | halt        | CATALOG-SEC-001 |
// | dangerous_commands | mkfs / fdisk / wipefs                      | halt        | CATALOG-SEC-004 |
// | git_safety         | `git push` with a force flag               | ask         | CATALOG-SEC-002 |
// | git_safety         | `git commit --no-verify`                   | deny        | CATALOG-SEC-003 |
// | privilege          | `sudo`                                     | add_context | CATALOG-SEC-005 |

use serde_json::Value;

use crate::command::{targets_root, uses_sudo, CommandMatcher, CommandPattern};
use crate::config::CatalogConfig;
use crate::decision::{Decision, Severity, Verb};
use crate::error::CatalogError;
use crate::evaluator::Policy;
use crate::namespace::{Namespace, RulebookScope};
use crate::routing::RoutingMetadata;
use crate::tree::PolicyOutput;

use super::{shell_command, Rulebook};

pub const NAME: &str = "security-essentials";
pub const HARNESS: &str = "claude";

/// Build the rulebook under the configured namespace root.
pub fn rulebook(config: &CatalogConfig) -> Result<Rulebook, CatalogError> {
    let scope = config.scope(NAME)?;
    let mut rulebook = Rulebook::new(NAME, HARNESS, scope.clone());
    rulebook.add_policy(Box::new(DangerousCommands::new(&scope)?))?;
    rulebook.add_policy(Box::new(GitSafety::new(&scope)?))?;
    rulebook.add_policy(Box::new(Privilege::new(&scope)?))?;
    Ok(rulebook)
}

fn bash_routing() -> RoutingMetadata {
    RoutingMetadata::new(["PreToolUse"], ["Bash"])
}

/// Blocks commands that destroy the filesystem or a disk.
pub struct DangerousCommands {
    namespace: Namespace,
    routing: RoutingMetadata,
    rm: CommandPattern,
    recursive: CommandMatcher,
    disk_tools: CommandMatcher,
}

impl DangerousCommands {
    pub fn new(scope: &RulebookScope) -> Result<Self, CatalogError> {
        Ok(Self {
            namespace: scope.policy(HARNESS, "dangerous_commands")?,
            routing: bash_routing(),
            rm: CommandPattern::verb("rm")?,
            // Commands are lowercased first, so -R and -Rf land here too.
            recursive: CommandMatcher::flags([
                "-r",
                "-rf",
                "-fr",
                "-rfv",
                "-vrf",
                "-frv",
                "-rvf",
                "--recursive",
            ])?,
            disk_tools: CommandMatcher::verbs([
                "mkfs",
                "mkfs.ext2",
                "mkfs.ext3",
                "mkfs.ext4",
                "mkfs.xfs",
                "mkfs.btrfs",
                "mkfs.vfat",
                "fdisk",
                "wipefs",
            ])?,
        })
    }
}

impl Policy for DangerousCommands {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn routing(&self) -> &RoutingMetadata {
        &self.routing
    }

    fn evaluate(&self, input: &Value, out: &mut PolicyOutput) {
        let Some(command) = shell_command(input) else {
            return;
        };

        if self.rm.is_match(&command) && self.recursive.is_match(&command) && targets_root(&command)
        {
            out.emit(
                Verb::Halt,
                Decision::new(
                    "CATALOG-SEC-001",
                    "Recursive deletion of the filesystem root is never allowed",
                    Severity::Critical,
                ),
            );
        }

        if let Some(tool) = self.disk_tools.first_match(&command) {
            out.emit(
                Verb::Halt,
                Decision::new(
                    "CATALOG-SEC-004",
                    format!("'{}' can destroy a disk or partition table", tool.token()),
                    Severity::Critical,
                ),
            );
        }
    }
}

/// Guards git history: force pushes need confirmation, skipped hooks are denied.
pub struct GitSafety {
    namespace: Namespace,
    routing: RoutingMetadata,
    git: CommandPattern,
    push: CommandPattern,
    commit: CommandPattern,
    force: CommandMatcher,
    no_verify: CommandPattern,
}

impl GitSafety {
    pub fn new(scope: &RulebookScope) -> Result<Self, CatalogError> {
        Ok(Self {
            namespace: scope.policy(HARNESS, "git_safety")?,
            routing: bash_routing(),
            git: CommandPattern::verb("git")?,
            push: CommandPattern::verb("push")?,
            commit: CommandPattern::verb("commit")?,
            force: CommandMatcher::flags(["--force", "-f", "--force-with-lease"])?,
            no_verify: CommandPattern::flag("--no-verify")?,
        })
    }
}

impl Policy for GitSafety {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn routing(&self) -> &RoutingMetadata {
        &self.routing
    }

    fn evaluate(&self, input: &Value, out: &mut PolicyOutput) {
        let Some(command) = shell_command(input) else {
            return;
        };
        if !self.git.is_match(&command) {
            return;
        }

        if self.push.is_match(&command) {
            if let Some(flag) = self.force.first_match(&command) {
                out.emit(
                    Verb::Ask,
                    Decision::new(
                        "CATALOG-SEC-002",
                        format!("Force push ({}) rewrites remote history", flag.token()),
                        Severity::High,
                    )
                    .with_question("This force push can overwrite commits on the remote. Continue?"),
                );
            }
        }

        if self.commit.is_match(&command) && self.no_verify.is_match(&command) {
            out.emit(
                Verb::Deny,
                Decision::new(
                    "CATALOG-SEC-003",
                    "Committing with --no-verify skips the repository's hooks",
                    Severity::High,
                ),
            );
        }
    }
}

/// Adds context when a command escalates privileges.
pub struct Privilege {
    namespace: Namespace,
    routing: RoutingMetadata,
}

impl Privilege {
    pub fn new(scope: &RulebookScope) -> Result<Self, CatalogError> {
        Ok(Self {
            namespace: scope.policy(HARNESS, "privilege")?,
            routing: bash_routing(),
        })
    }
}

impl Policy for Privilege {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn routing(&self) -> &RoutingMetadata {
        &self.routing
    }

    fn evaluate(&self, input: &Value, out: &mut PolicyOutput) {
        let Some(command) = shell_command(input) else {
            return;
        };
        if uses_sudo(&command) {
            out.emit(
                Verb::AddContext,
                Decision::new(
                    "CATALOG-SEC-005",
                    "Command runs with elevated privileges via sudo",
                    Severity::Info,
                ),
            );
        }
    }
}
