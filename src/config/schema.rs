use crate::patch::LineEnding;
use serde::Deserialize;
use std::fmt;

/// Default ceiling for files the engine reads: 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Engine settings, usually read from `.agent-patcher.toml`.
///
/// ```toml
/// max_file_size = 1048576
/// duplicate_paths = "last-write-wins"
/// line_ending = "detect"
/// default_line_ending = "lf"
/// statistics = "myers"
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest Update/Delete target the engine will read, in bytes
    pub max_file_size: u64,
    pub duplicate_paths: DuplicatePathPolicy,
    pub line_ending: LineEndingPolicy,
    /// Used when a file has no line terminator to detect from
    pub default_line_ending: LineEnding,
    pub statistics: StatisticsMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            duplicate_paths: DuplicatePathPolicy::default(),
            line_ending: LineEndingPolicy::default(),
            default_line_ending: LineEnding::Lf,
            statistics: StatisticsMode::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.max_file_size == 0 {
            issues.push(ValidationIssue::InvalidValue {
                field: "max_file_size",
                message: "must be greater than zero".to_string(),
            });
        }

        if self.line_ending != LineEndingPolicy::Detect
            && self.default_line_ending != LineEnding::Lf
        {
            issues.push(ValidationIssue::InvalidCombo {
                message: "default_line_ending only applies when line_ending = \"detect\""
                    .to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Line ending to reassemble `content` with under this policy.
    pub fn line_ending_for(&self, content: &str) -> LineEnding {
        match self.line_ending {
            LineEndingPolicy::Detect => LineEnding::detect_or(content, self.default_line_ending),
            LineEndingPolicy::Lf => LineEnding::Lf,
            LineEndingPolicy::CrLf => LineEnding::CrLf,
        }
    }
}

/// What to do when one patch names the same file more than once.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePathPolicy {
    /// Fail the whole patch
    #[default]
    Reject,
    /// Keep the later operation and surface a warning
    LastWriteWins,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineEndingPolicy {
    #[default]
    Detect,
    Lf,
    #[serde(rename = "crlf")]
    CrLf,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatisticsMode {
    /// Index-aligned comparison
    #[default]
    Positional,
    /// Minimal diff via Myers' algorithm
    Myers,
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
    InvalidValue {
        field: &'static str,
        message: String,
    },
    InvalidCombo {
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid value for '{field}': {message}")
            }
            ValidationIssue::InvalidCombo { message } => {
                write!(f, "invalid engine configuration: {message}")
            }
        }
    }
}
