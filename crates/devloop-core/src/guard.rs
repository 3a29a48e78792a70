//! The pre-write path guard.
//!
//! A check runs in four steps: non-mutating actions pass straight through,
//! the target is normalized (see [`crate::resolve`]), the normalized path is
//! matched against the protected fragments, and only on a protected match is
//! the whitelist read and consulted.
//!
//! Failures are asymmetric. An unparseable request fails open
//! ([`AllowReason::MalformedInput`]); an unreadable whitelist is treated as
//! empty so the protected match still blocks ([`Blocked::whitelist_error`]).

use crate::config::Config;
use crate::error::DevloopError;
use crate::patterns::ProtectedPatterns;
use crate::payload::{self, Action, GuardRequest};
use crate::paths;
use crate::resolve::{self, FsResolver, PathResolver};
use crate::whitelist::{FileWhitelist, Whitelist, WhitelistSource};
use serde::Serialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(AllowReason),
    Block(Blocked),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowReason {
    /// Reads and other non-mutating tools are never guarded.
    NotMutating,
    /// The normalized path matched no protected fragment.
    Unprotected,
    /// A protected match was overridden by a whitelist entry.
    Whitelisted { pattern: String, entry: String },
    /// The invocation could not be parsed; the guard fails open.
    MalformedInput { error: String },
    /// The guard is switched off in config.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocked {
    pub pattern: String,
    /// Root-relative when the target is inside the project, absolute otherwise.
    pub path: String,
    pub resolved: PathBuf,
    pub message: String,
    /// Set when the whitelist could not be read and was treated as empty.
    pub whitelist_error: Option<String>,
}

impl Decision {
    pub fn malformed(err: &DevloopError) -> Self {
        tracing::debug!(error = %err, "unparseable guard input, allowing");
        Decision::Allow(AllowReason::MalformedInput {
            error: err.to_string(),
        })
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Decision::Block(_))
    }

    pub fn summary(&self) -> DecisionSummary {
        match self {
            Decision::Allow(reason) => {
                let (reason, pattern, entry, error) = match reason {
                    AllowReason::NotMutating => ("not_mutating", None, None, None),
                    AllowReason::Unprotected => ("unprotected", None, None, None),
                    AllowReason::Whitelisted { pattern, entry } => {
                        ("whitelisted", Some(pattern.clone()), Some(entry.clone()), None)
                    }
                    AllowReason::MalformedInput { error } => {
                        ("malformed_input", None, None, Some(error.clone()))
                    }
                    AllowReason::Disabled => ("disabled", None, None, None),
                };
                DecisionSummary {
                    decision: "allow",
                    reason,
                    pattern,
                    entry,
                    path: None,
                    message: None,
                    error,
                }
            }
            Decision::Block(b) => DecisionSummary {
                decision: "block",
                reason: "protected",
                pattern: Some(b.pattern.clone()),
                entry: None,
                path: Some(b.path.clone()),
                message: Some(b.message.clone()),
                error: b.whitelist_error.clone(),
            },
        }
    }
}

/// Flat, serializable view of a [`Decision`].
#[derive(Debug, Clone, Serialize)]
pub struct DecisionSummary {
    pub decision: &'static str,
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// PathGuard
// ---------------------------------------------------------------------------

pub struct PathGuard<R = FsResolver, W = FileWhitelist> {
    root: PathBuf,
    patterns: ProtectedPatterns,
    resolver: R,
    whitelist: W,
    enabled: bool,
}

impl PathGuard {
    /// Guard for a project on the real filesystem, configured from
    /// `.devloop/config.yaml` (falling back to defaults if it is unreadable).
    /// A relative `root` is taken against the process working directory.
    pub fn for_project(root: &Path) -> Self {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(root))
                .unwrap_or_else(|_| root.to_path_buf())
        };
        let config = Config::load_or_default(&root);
        PathGuard::new(
            &root,
            config.guard.protected_patterns(),
            FsResolver,
            FileWhitelist::for_root(&root),
        )
        .with_enabled(config.guard.enabled)
    }
}

impl<R: PathResolver, W: WhitelistSource> PathGuard<R, W> {
    /// `root` should be absolute; it is only normalized and resolved through
    /// `resolver`, never joined onto the process working directory.
    pub fn new(root: &Path, patterns: ProtectedPatterns, resolver: R, whitelist: W) -> Self {
        let lexical_root = paths::lexical_normalize(root);
        let root = resolver.canonicalize(&lexical_root).unwrap_or(lexical_root);
        Self {
            root,
            patterns,
            resolver,
            whitelist,
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Normalized absolute form of `requested`, as used for matching.
    pub fn normalize(&self, requested: &Path) -> PathBuf {
        resolve::normalize(&self.resolver, &self.root, requested)
    }

    /// Parse a raw hook payload and check it. Parse failures allow.
    pub fn check_payload(&self, data: &str) -> Decision {
        match payload::parse(data) {
            Ok(req) => self.check(&req),
            Err(e) => Decision::malformed(&e),
        }
    }

    pub fn check(&self, req: &GuardRequest) -> Decision {
        if !req.action.is_mutating() {
            return Decision::Allow(AllowReason::NotMutating);
        }
        match &req.path {
            Some(path) => self.check_path(&req.action, path),
            None => Decision::malformed(&DevloopError::InvalidPayload(format!(
                "{} request has no target path",
                req.action
            ))),
        }
    }

    pub fn check_path(&self, action: &Action, requested: &Path) -> Decision {
        if !action.is_mutating() {
            return Decision::Allow(AllowReason::NotMutating);
        }
        if !self.enabled {
            return Decision::Allow(AllowReason::Disabled);
        }
        if requested.as_os_str().is_empty() {
            return Decision::malformed(&DevloopError::InvalidPayload(
                "empty target path".to_string(),
            ));
        }

        let resolved = self.normalize(requested);
        let candidate = paths::match_string(&resolved);

        let Some(pattern) = self.patterns.first_match(&candidate) else {
            tracing::debug!(path = %candidate, %action, "allow: unprotected");
            return Decision::Allow(AllowReason::Unprotected);
        };

        let (whitelist, whitelist_error) = match self.whitelist.read() {
            Ok(wl) => (wl, None),
            Err(e) => {
                tracing::warn!(error = %e, "whitelist unreadable, treating as empty");
                (Whitelist::default(), Some(e.to_string()))
            }
        };

        if let Some(entry) = whitelist.first_match(&candidate) {
            tracing::debug!(path = %candidate, pattern, entry, "allow: whitelisted");
            return Decision::Allow(AllowReason::Whitelisted {
                pattern: pattern.to_string(),
                entry: entry.to_string(),
            });
        }

        let display = paths::display_path(&self.root, &resolved);
        tracing::debug!(path = %candidate, pattern, %action, "block: protected");
        Decision::Block(Blocked {
            message: block_message(action, &display, pattern),
            pattern: pattern.to_string(),
            path: display,
            resolved,
            whitelist_error,
        })
    }
}

fn block_message(action: &Action, display: &str, pattern: &str) -> String {
    format!(
        "Blocked {action} on protected path '{display}' (matches protected pattern '{pattern}').\n\
         This file is managed by DevLoop tooling and should not be changed by the assistant.\n\
         Alternatives:\n  \
         - edit the file manually outside the assistant\n  \
         - ask the user to allow it with `devloop whitelist add {display}` \
         (stored in {})",
        paths::WHITELIST_FILE
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::resolve::LexicalResolver;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct BrokenWhitelist;

    impl WhitelistSource for BrokenWhitelist {
        fn read(&self) -> Result<Whitelist> {
            Whitelist::parse("{ this is not json")
        }
    }

    struct LinkResolver(HashMap<PathBuf, PathBuf>);

    impl PathResolver for LinkResolver {
        fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }
    }

    fn guard(whitelist: Whitelist) -> PathGuard<LexicalResolver, Whitelist> {
        PathGuard::new(
            Path::new("/proj"),
            ProtectedPatterns::default(),
            LexicalResolver,
            whitelist,
        )
    }

    fn write(path: &str) -> GuardRequest {
        GuardRequest::new(Action::Write, path)
    }

    #[test]
    fn agents_md_is_blocked() {
        let decision = guard(Whitelist::default()).check(&write("AGENTS.md"));
        let Decision::Block(b) = decision else {
            panic!("expected block, got {decision:?}");
        };
        assert_eq!(b.pattern, "AGENTS.md");
        assert_eq!(b.path, "AGENTS.md");
        assert!(b.message.contains("AGENTS.md"));
        assert!(b.message.contains("manually"));
        assert!(b.whitelist_error.is_none());
    }

    #[test]
    fn source_file_is_allowed() {
        assert_eq!(
            guard(Whitelist::default()).check(&write("src/test.py")),
            Decision::Allow(AllowReason::Unprotected)
        );
    }

    #[test]
    fn whitelisted_file_is_allowed() {
        let decision = guard(Whitelist::new([".beads/issues.jsonl"])).check(&write(".beads/issues.jsonl"));
        assert_eq!(
            decision,
            Decision::Allow(AllowReason::Whitelisted {
                pattern: ".beads/".to_string(),
                entry: ".beads/issues.jsonl".to_string(),
            })
        );
    }

    #[test]
    fn too_specific_whitelist_still_blocks_siblings() {
        let decision = guard(Whitelist::new([".beads/issues.jsonl"])).check(&write(".beads/custom.json"));
        assert!(decision.is_block());
    }

    #[test]
    fn read_bypasses_guard() {
        let req = GuardRequest::new(Action::Other("Read".to_string()), "AGENTS.md");
        assert_eq!(
            guard(Whitelist::default()).check(&req),
            Decision::Allow(AllowReason::NotMutating)
        );
    }

    #[test]
    fn relative_and_absolute_forms_agree() {
        let g = guard(Whitelist::default());
        for p in ["AGENTS.md", "./AGENTS.md", "/proj/AGENTS.md", "src/../AGENTS.md"] {
            assert!(g.check(&write(p)).is_block(), "expected block for {p}");
        }
    }

    #[test]
    fn whitelist_for_unprotected_path_is_noop() {
        let g = guard(Whitelist::new(["src/"]));
        assert_eq!(
            g.check(&write("src/lib.rs")),
            Decision::Allow(AllowReason::Unprotected)
        );
    }

    #[test]
    fn symlink_to_protected_target_is_blocked() {
        let resolver = LinkResolver(HashMap::from([
            (PathBuf::from("/proj"), PathBuf::from("/proj")),
            (PathBuf::from("/proj/docs/guide.md"), PathBuf::from("/proj/CLAUDE.md")),
        ]));
        let g = PathGuard::new(
            Path::new("/proj"),
            ProtectedPatterns::default(),
            resolver,
            Whitelist::default(),
        );
        let Decision::Block(b) = g.check(&write("docs/guide.md")) else {
            panic!("symlink target should be protected");
        };
        assert_eq!(b.pattern, "CLAUDE.md");
        assert_eq!(b.resolved, PathBuf::from("/proj/CLAUDE.md"));
    }

    #[test]
    fn broken_whitelist_keeps_block() {
        let g = PathGuard::new(
            Path::new("/proj"),
            ProtectedPatterns::default(),
            LexicalResolver,
            BrokenWhitelist,
        );
        let Decision::Block(b) = g.check(&write(".git/config")) else {
            panic!("protected match must stand when whitelist is unreadable");
        };
        assert_eq!(b.pattern, ".git/");
        assert!(b.whitelist_error.is_some());
    }

    #[test]
    fn malformed_payload_allows() {
        let g = guard(Whitelist::default());
        for bad in ["", "{", r#"{"tool_name":"Write"}"#] {
            assert!(
                matches!(
                    g.check_payload(bad),
                    Decision::Allow(AllowReason::MalformedInput { .. })
                ),
                "expected fail-open for {bad:?}"
            );
        }
    }

    #[test]
    fn payload_round_trip_blocks() {
        let g = guard(Whitelist::default());
        let d = g.check_payload(r#"{"tool_name":"Edit","tool_input":{"file_path":".claude/settings.json"}}"#);
        assert_eq!(d.summary().pattern.as_deref(), Some(".claude/"));
        assert_eq!(d.summary().decision, "block");
    }

    #[test]
    fn disabled_guard_allows_everything() {
        let g = guard(Whitelist::default()).with_enabled(false);
        assert_eq!(
            g.check(&write("AGENTS.md")),
            Decision::Allow(AllowReason::Disabled)
        );
    }

    #[test]
    fn for_project_reads_whitelist_on_every_check() {
        let dir = TempDir::new().unwrap();
        let g = PathGuard::for_project(dir.path());
        assert!(g.check(&write(".beads/issues.jsonl")).is_block());

        Whitelist::new([".beads/issues.jsonl"]).save(dir.path()).unwrap();
        assert!(g.check(&write(".beads/issues.jsonl")).is_allow());

        std::fs::write(dir.path().join(".devloop/protected-whitelist.json"), "garbage").unwrap();
        assert!(g.check(&write(".beads/issues.jsonl")).is_block());
    }

    #[test]
    fn new_does_not_consult_working_directory() {
        let g = PathGuard::new(
            Path::new("proj/./sub/.."),
            ProtectedPatterns::default(),
            LexicalResolver,
            Whitelist::default(),
        );
        let Decision::Block(b) = g.check(&write("AGENTS.md")) else {
            panic!("expected block");
        };
        assert_eq!(b.resolved, PathBuf::from("proj/AGENTS.md"));
        assert_eq!(b.path, "AGENTS.md");
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_to_protected_path_is_blocked() {
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink("AGENTS.md", dir.path().join("notes.md")).unwrap();
        std::os::unix::fs::symlink(".beads/new.json", dir.path().join("issue.json")).unwrap();

        let g = PathGuard::for_project(dir.path());
        let Decision::Block(b) = g.check(&write("notes.md")) else {
            panic!("write through a dangling link to AGENTS.md must block");
        };
        assert_eq!(b.pattern, "AGENTS.md");
        assert_eq!(b.path, "AGENTS.md");

        let Decision::Block(b) = g.check(&write("issue.json")) else {
            panic!("write through a dangling link into .beads/ must block");
        };
        assert_eq!(b.pattern, ".beads/");
    }

    #[test]
    fn for_project_applies_config() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.guard.extra_protected.push("migrations/".to_string());
        cfg.save(dir.path()).unwrap();

        let g = PathGuard::for_project(dir.path());
        let Decision::Block(b) = g.check(&write("db/migrations/001.sql")) else {
            panic!("extra pattern should block");
        };
        assert_eq!(b.path, "db/migrations/001.sql");
    }
}
