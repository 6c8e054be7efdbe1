use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CodemodConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub tsserver: TsServerConfig,
    #[serde(default)]
    pub fix: FixConfig,
}

impl CodemodConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.discovery.extensions.is_empty() {
            issues.push(ValidationIssue::Empty {
                field: "discovery.extensions",
            });
        }
        for ext in &self.discovery.extensions {
            if ext.trim().is_empty() || ext.starts_with('.') {
                issues.push(ValidationIssue::InvalidValue {
                    field: "discovery.extensions",
                    message: format!("{ext:?} must be a bare extension like \"ts\""),
                });
            }
        }
        if self.discovery.markers.is_empty() {
            issues.push(ValidationIssue::Empty {
                field: "discovery.markers",
            });
        }
        if self.discovery.markers.iter().any(|m| m.trim().is_empty()) {
            issues.push(ValidationIssue::InvalidValue {
                field: "discovery.markers",
                message: "markers must not be blank".to_string(),
            });
        }
        if self.discovery.exclude.iter().any(|d| d.contains('/')) {
            issues.push(ValidationIssue::InvalidValue {
                field: "discovery.exclude",
                message: "entries are directory names, not paths".to_string(),
            });
        }
        if self.tsserver.command.trim().is_empty() {
            issues.push(ValidationIssue::Empty {
                field: "tsserver.command",
            });
        }
        if self.fix.cleanup_delay_ms > 10_000 {
            issues.push(ValidationIssue::InvalidValue {
                field: "fix.cleanup_delay_ms",
                message: format!("{} exceeds the 10000 ms limit", self.fix.cleanup_delay_ms),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Which files a run visits.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// File extensions to consider, without the dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Directory names pruned from the walk
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// A file qualifies if any line contains one of these
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude: default_exclude(),
            markers: default_markers(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["ts".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec!["node_modules".to_string()]
}

fn default_markers() -> Vec<String> {
    vec!["from 'coc.nvim'".to_string(), "from \"coc.nvim\"".to_string()]
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TsServerConfig {
    /// Executable name or path; bare names try `node_modules/.bin` first
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for TsServerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
        }
    }
}

fn default_command() -> String {
    "tsserver".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FixConfig {
    #[serde(default = "default_true")]
    pub organize_imports: bool,
    #[serde(default = "default_cleanup_delay_ms")]
    pub cleanup_delay_ms: u64,
}

impl FixConfig {
    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            organize_imports: true,
            cleanup_delay_ms: default_cleanup_delay_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cleanup_delay_ms() -> u64 {
    30
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    Empty {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::Empty { field } => write!(f, "'{field}' must not be empty"),
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid '{field}': {message}")
            }
        }
    }
}
