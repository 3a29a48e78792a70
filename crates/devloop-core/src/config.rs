use crate::error::Result;
use crate::patterns::{ProtectedPatterns, DEFAULT_PROTECTED};
use crate::{io, paths};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GuardConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Fragments protected in addition to the built-in list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_protected: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            extra_protected: Vec::new(),
        }
    }
}

impl GuardConfig {
    pub fn protected_patterns(&self) -> ProtectedPatterns {
        ProtectedPatterns::with_extra(&self.extra_protected)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub guard: GuardConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            guard: GuardConfig::default(),
        }
    }
}

impl Config {
    /// Strict load. A missing file yields the defaults; a malformed file is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        match io::read_optional(&path)? {
            Some(data) if data.trim().is_empty() => Ok(Self::default()),
            Some(data) => Ok(serde_yaml::from_str(&data)?),
            None => Ok(Self::default()),
        }
    }

    /// Lenient load for hook checks: any failure is logged and the defaults are used.
    pub fn load_or_default(root: &Path) -> Self {
        match Self::load(root) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(
                    path = %paths::config_path(root).display(),
                    error = %e,
                    "ignoring unreadable config, using defaults"
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.version != 1 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("unknown config version {}", self.version),
            });
        }

        if !self.guard.enabled {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "guard is disabled; protected files can be edited freely".to_string(),
            });
        }

        let mut seen: Vec<&str> = Vec::new();
        for (i, fragment) in self.guard.extra_protected.iter().enumerate() {
            let trimmed = fragment.trim();
            if trimmed.is_empty() {
                // An empty fragment is a substring of every path.
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("guard.extra_protected[{i}] is empty and would match every path"),
                });
                continue;
            }
            if seen.contains(&trimmed) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("guard.extra_protected lists '{trimmed}' more than once"),
                });
                continue;
            }
            seen.push(trimmed);

            if let Some(default) = DEFAULT_PROTECTED.iter().find(|d| trimmed.contains(**d)) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "guard.extra_protected entry '{trimmed}' is already covered by built-in pattern '{default}'"
                    ),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
