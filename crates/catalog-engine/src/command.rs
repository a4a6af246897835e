// command.rs — Word-boundary-safe predicates over raw shell command strings.
//
// Policies never test commands with substring containment: "rm" must not
// match inside "format" or "rmdir", and extra whitespace around "rm" must
// not hide it. Every predicate here anchors its token between
// start-of-string-or-whitespace and whitespace-or-end-of-string, with the
// token regex-escaped before the pattern is built.
//
// Two ways to use it:
// - `CommandPattern` / `CommandMatcher` compile once, at policy load time,
//   and surface `CatalogError::InvalidPattern` immediately.
// - The free functions (`has_verb`, `has_flag`, ...) are the ad-hoc form
//   for lint tooling and one-off checks; compiled patterns are cached.
//
// No predicate normalizes case. Callers lowercase the command first.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use regex::Regex;

use crate::error::CatalogError;

/// Whether a pattern matches a standalone word or a command-line flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Terminated by whitespace or end of string.
    Verb,
    /// Also terminated by `=`, so `--flag=value` matches `--flag`.
    Flag,
}

/// One anchored token pattern.
#[derive(Debug, Clone)]
pub struct CommandPattern {
    token: String,
    kind: TokenKind,
    regex: Regex,
}

impl CommandPattern {
    /// Pattern matching `token` as a whole word.
    pub fn verb(token: &str) -> Result<Self, CatalogError> {
        Self::compile(token, TokenKind::Verb)
    }

    /// Pattern matching `flag`, optionally followed by `=value`.
    pub fn flag(flag: &str) -> Result<Self, CatalogError> {
        Self::compile(flag, TokenKind::Flag)
    }

    fn compile(token: &str, kind: TokenKind) -> Result<Self, CatalogError> {
        let regex = build_regex(token, kind)?;
        Ok(Self {
            token: token.to_string(),
            kind,
            regex,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn is_match(&self, command: &str) -> bool {
        self.regex.is_match(command)
    }
}

/// A disjunction of anchored patterns: matches if any member matches.
#[derive(Debug, Clone, Default)]
pub struct CommandMatcher {
    patterns: Vec<CommandPattern>,
}

impl CommandMatcher {
    /// Matcher over a set of whole-word tokens.
    pub fn verbs<I, S>(tokens: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_tokens(tokens, TokenKind::Verb)
    }

    /// Matcher over a set of flags.
    pub fn flags<I, S>(flags: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_tokens(flags, TokenKind::Flag)
    }

    fn from_tokens<I, S>(tokens: I, kind: TokenKind) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = tokens
            .into_iter()
            .map(|t| CommandPattern::compile(t.as_ref(), kind))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Short-circuits on the first matching pattern.
    pub fn is_match(&self, command: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(command))
    }

    /// The first pattern that matches, for reporting which token fired.
    pub fn first_match(&self, command: &str) -> Option<&CommandPattern> {
        self.patterns.iter().find(|p| p.is_match(command))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// True iff `token` occurs in `command` as a whole word.
pub fn has_verb(command: &str, token: &str) -> bool {
    cached_match(command, token, TokenKind::Verb)
}

/// True iff any token in `tokens` occurs in `command` as a whole word.
pub fn has_any_verb<S: AsRef<str>>(command: &str, tokens: &[S]) -> bool {
    tokens.iter().any(|t| has_verb(command, t.as_ref()))
}

/// True iff `flag` occurs in `command` as a whole word or as `flag=value`.
pub fn has_flag(command: &str, flag: &str) -> bool {
    cached_match(command, flag, TokenKind::Flag)
}

/// True iff any flag in `flags` occurs in `command`.
pub fn has_any_flag<S: AsRef<str>>(command: &str, flags: &[S]) -> bool {
    flags.iter().any(|f| has_flag(command, f.as_ref()))
}

/// True iff the command redirects output (`>`, `>>`, `|`) or pipes into `tee`.
pub fn has_output_redirect(command: &str) -> bool {
    static REDIRECT: OnceLock<Regex> = OnceLock::new();
    let re = REDIRECT.get_or_init(|| fixed_regex(r"[>|]"));
    re.is_match(command) || has_verb(command, "tee")
}

/// True iff the command names the filesystem root as a standalone token
/// (`/` or `/*`), not merely a path containing `/`.
pub fn targets_root(command: &str) -> bool {
    static ROOT: OnceLock<Regex> = OnceLock::new();
    let re = ROOT.get_or_init(|| fixed_regex(r"(?:^|\s)/\*?(?:\s|$)"));
    re.is_match(command)
}

/// True iff the command invokes `sudo` as a whole word.
pub fn uses_sudo(command: &str) -> bool {
    has_verb(command, "sudo")
}

fn build_regex(token: &str, kind: TokenKind) -> Result<Regex, CatalogError> {
    if token.trim().is_empty() {
        return Err(CatalogError::InvalidPattern {
            pattern: token.to_string(),
            reason: "token is empty or whitespace".to_string(),
        });
    }
    let terminator = match kind {
        TokenKind::Verb => r"(?:\s|$)",
        TokenKind::Flag => r"(?:\s|=|$)",
    };
    let source = format!(r"(?:^|\s){}{}", regex::escape(token), terminator);
    Regex::new(&source).map_err(|e| CatalogError::InvalidPattern {
        pattern: token.to_string(),
        reason: e.to_string(),
    })
}

// Only used for the literal patterns above, which are known to compile.
fn fixed_regex(source: &str) -> Regex {
    match Regex::new(source) {
        Ok(re) => re,
        Err(e) => unreachable!("built-in pattern {:?} failed to compile: {}", source, e),
    }
}

const PATTERN_CACHE_MAX: usize = 1024;

type PatternCache = RwLock<HashMap<(TokenKind, String), Regex>>;

static PATTERN_CACHE: OnceLock<PatternCache> = OnceLock::new();

fn cached_match(command: &str, token: &str, kind: TokenKind) -> bool {
    match cached_regex(token, kind) {
        Some(re) => re.is_match(command),
        None => false,
    }
}

fn cached_regex(token: &str, kind: TokenKind) -> Option<Regex> {
    let cache = PATTERN_CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    let key = (kind, token.to_string());

    if let Ok(guard) = cache.read() {
        if let Some(re) = guard.get(&key) {
            return Some(re.clone());
        }
    }

    let compiled = match build_regex(token, kind) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!("command predicate never matches: {}", e);
            return None;
        }
    };

    if let Ok(mut guard) = cache.write() {
        if guard.len() >= PATTERN_CACHE_MAX {
            guard.clear();
        }
        guard.entry(key).or_insert_with(|| compiled.clone());
    }
    Some(compiled)
}
