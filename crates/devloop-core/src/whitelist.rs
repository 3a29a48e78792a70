use crate::error::{DevloopError, Result};
use crate::{io, paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Whitelist
// ---------------------------------------------------------------------------

/// Override fragments that re-permit writes to protected paths.
///
/// Stored as JSON at `.devloop/protected-whitelist.json`:
///
/// ```json
/// { "allowed_patterns": [".beads/issues.jsonl"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist {
    #[serde(default)]
    allowed_patterns: Vec<String>,
}

impl Whitelist {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut wl = Self::default();
        for entry in entries {
            let entry: String = entry.into();
            // blank entries are dropped rather than rejected when building in bulk
            let _ = wl.add(&entry);
        }
        wl
    }

    pub fn entries(&self) -> &[String] {
        &self.allowed_patterns
    }

    pub fn is_empty(&self) -> bool {
        self.allowed_patterns.is_empty()
    }

    /// First entry contained in `candidate`, in file order.
    pub fn first_match(&self, candidate: &str) -> Option<&str> {
        self.allowed_patterns
            .iter()
            .find(|e| candidate.contains(e.as_str()))
            .map(String::as_str)
    }

    /// Add an entry. Returns `false` if it was already present.
    pub fn add(&mut self, entry: &str) -> Result<bool> {
        let entry = clean_entry(entry)?;
        if self.allowed_patterns.iter().any(|e| *e == entry) {
            return Ok(false);
        }
        self.allowed_patterns.push(entry);
        Ok(true)
    }

    /// Remove an entry. Returns `false` if it was not present.
    pub fn remove(&mut self, entry: &str) -> Result<bool> {
        let entry = clean_entry(entry)?;
        let before = self.allowed_patterns.len();
        self.allowed_patterns.retain(|e| *e != entry);
        Ok(self.allowed_patterns.len() != before)
    }

    /// Parse whitelist JSON. Blank entries are discarded.
    pub fn parse(data: &str) -> Result<Self> {
        let raw: Whitelist = serde_json::from_str(data)?;
        Ok(Self::new(raw.allowed_patterns))
    }

    /// Strict load: a missing file is an empty whitelist, a malformed one is an error.
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_from(&paths::whitelist_path(root))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match io::read_optional(path)? {
            Some(data) => Self::parse(&data),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::whitelist_path(root);
        let mut data = serde_json::to_string_pretty(self)?;
        data.push('\n');
        io::atomic_write(&path, data.as_bytes())
    }
}

/// Trim an entry and strip a leading `./`, which never appears in a normalized path.
fn clean_entry(entry: &str) -> Result<String> {
    let trimmed = entry.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(DevloopError::InvalidWhitelistEntry(
            "entry must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// WhitelistSource
// ---------------------------------------------------------------------------

/// Where the guard reads its whitelist from on each check.
pub trait WhitelistSource {
    fn read(&self) -> Result<Whitelist>;
}

/// Reads the whitelist file fresh on every call.
#[derive(Debug, Clone)]
pub struct FileWhitelist {
    path: PathBuf,
}

impl FileWhitelist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_root(root: &Path) -> Self {
        Self::new(paths::whitelist_path(root))
    }
}

impl WhitelistSource for FileWhitelist {
    fn read(&self) -> Result<Whitelist> {
        Whitelist::load_from(&self.path)
    }
}

impl WhitelistSource for Whitelist {
    fn read(&self) -> Result<Whitelist> {
        Ok(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
