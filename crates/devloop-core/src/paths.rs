use std::path::{Component, Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = ".devloop/config.yaml";
pub const WHITELIST_FILE: &str = ".devloop/protected-whitelist.json";

pub const DEVLOOP_STATE_DIR: &str = ".devloop/";
pub const BEADS_DIR: &str = ".beads/";
pub const GIT_DIR: &str = ".git/";
pub const CLAUDE_DIR: &str = ".claude/";
pub const CLAUDE_HOOKS_DIR: &str = ".claude/hooks/";
pub const AGENTS_HOOKS_DIR: &str = ".agents/hooks/";

pub const AGENTS_MD: &str = "AGENTS.md";
pub const CLAUDE_MD: &str = "CLAUDE.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn whitelist_path(root: &Path) -> PathBuf {
    root.join(WHITELIST_FILE)
}

// ---------------------------------------------------------------------------
// Lexical normalization
// ---------------------------------------------------------------------------

/// Collapse `.` and `..` segments without touching the filesystem.
///
/// `..` never climbs above the root of an absolute path; on a relative path
/// leading `..` segments are kept.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Join `path` onto `root` unless it is already absolute, then normalize lexically.
pub fn absolutize(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        lexical_normalize(path)
    } else {
        lexical_normalize(&root.join(path))
    }
}

/// Render a path for substring matching: lossy UTF-8 with `/` separators.
pub fn match_string(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '\\' {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}

/// Shorten `path` to a root-relative form for messages when it sits under `root`.
pub fn display_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => match_string(rel),
        _ => match_string(path),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
