use crate::paths;
use serde::Serialize;

/// Fragments protected out of the box, checked in this order.
pub const DEFAULT_PROTECTED: &[&str] = &[
    paths::BEADS_DIR,
    paths::DEVLOOP_STATE_DIR,
    paths::GIT_DIR,
    paths::AGENTS_HOOKS_DIR,
    paths::CLAUDE_HOOKS_DIR,
    paths::CLAUDE_DIR,
    paths::AGENTS_MD,
    paths::CLAUDE_MD,
];

// ---------------------------------------------------------------------------
// ProtectedPatterns
// ---------------------------------------------------------------------------

/// Ordered, immutable list of path fragments that block writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProtectedPatterns {
    fragments: Vec<String>,
}

impl ProtectedPatterns {
    /// Build from arbitrary fragments. Blank fragments are dropped since they
    /// would match every path.
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = fragments
            .into_iter()
            .map(Into::into)
            .filter(|f| !f.trim().is_empty())
            .collect();
        Self { fragments }
    }

    /// Defaults followed by `extra`, skipping fragments already present.
    pub fn with_extra(extra: &[String]) -> Self {
        let mut all = Self::default();
        for fragment in extra {
            let fragment = fragment.trim();
            if fragment.is_empty() || all.fragments.iter().any(|f| f == fragment) {
                continue;
            }
            all.fragments.push(fragment.to_string());
        }
        all
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// First fragment contained in `candidate`, in list order.
    pub fn first_match(&self, candidate: &str) -> Option<&str> {
        self.fragments
            .iter()
            .find(|f| candidate.contains(f.as_str()))
            .map(String::as_str)
    }
}

impl Default for ProtectedPatterns {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED.iter().copied())
    }
}
