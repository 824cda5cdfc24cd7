use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// User-facing configuration failures.
///
/// Everything except [`ConfigError::Schema`] is caused by user input and is
/// handled at the top level by logging it, printing usage and exiting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Argument(#[from] clap::Error),

    #[error("Invalid value '{value}' for '{switch}': {reason}")]
    InvalidArgument {
        switch: String,
        value: String,
        reason: String,
    },

    #[error("Invalid config file extension (must be one of {supported}) in file {path}")]
    UnsupportedExtension { path: PathBuf, supported: String },

    #[error("config_path {path} does not exist under config_dir {}", display_base(.base_dir))]
    FileNotFound {
        path: PathBuf,
        base_dir: Option<String>,
    },

    #[error("Failed to parse {path} (line {line}): {reason}")]
    ParseError {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in config file: {}", join_errors(.0))]
    UnknownKeys(Vec<ConfigError>),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Invalid configuration: {}", join_violations(.0))]
    Validation(Vec<Violation>),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ConfigError {
    /// Whether the top-level handler should follow the message with a usage line.
    pub fn is_usage_error(&self) -> bool {
        !matches!(self, ConfigError::Schema(_))
    }
}

/// Defects in the static field registry or shortcut table.
///
/// These are bugs in the tool, not bad input, and are reported with full detail.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Duplicate alias '{alias}' in section {section}: fields '{first}' and '{second}'")]
    DuplicateAlias {
        alias: String,
        section: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("Field '{field}' is declared more than once in section {section}")]
    DuplicateField {
        section: &'static str,
        field: &'static str,
    },

    #[error("Switch '{switch}' is claimed by both '{first}' and '{second}'")]
    SwitchConflict {
        switch: String,
        first: String,
        second: String,
    },

    #[error("Shortcut '{shortcut}' targets unknown field '{key}'")]
    UnknownShortcutField { shortcut: String, key: String },

    #[error("Shortcut '{shortcut}' sets '{key}' to an invalid value: {reason}")]
    InvalidShortcutValue {
        shortcut: String,
        key: String,
        reason: String,
    },
}

/// A single failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A required value is absent or empty.
    Missing { key: String, reason: String },
    /// A value is present but unusable.
    Malformed { key: String, reason: String },
}

impl Violation {
    pub fn key(&self) -> &str {
        match self {
            Violation::Missing { key, .. } | Violation::Malformed { key, .. } => key,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Missing { key, reason } => write!(f, "missing {key}: {reason}"),
            Violation::Malformed { key, reason } => write!(f, "malformed {key}: {reason}"),
        }
    }
}

fn display_base(base_dir: &Option<String>) -> &str {
    base_dir.as_deref().unwrap_or("<unset>")
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_formats_correctly() {
        let err = ConfigError::UnknownKey {
            key: "LogConfig.typo_key".into(),
            path: "/home/user/xmg/config.json".into(),
            line: 42,
        };
        let msg = err.to_string();
        assert!(msg.contains("typo_key"));
        assert!(msg.contains("config.json"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn file_not_found_names_path_and_base() {
        let err = ConfigError::FileNotFound {
            path: "/srv/xmg/missing.json".into(),
            base_dir: Some("/srv/xmg".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("/srv/xmg/missing.json"));
        assert!(msg.contains("under config_dir /srv/xmg"));
    }

    #[test]
    fn file_not_found_without_base() {
        let err = ConfigError::FileNotFound {
            path: "/missing.json".into(),
            base_dir: None,
        };
        assert!(err.to_string().contains("<unset>"));
    }

    #[test]
    fn validation_lists_every_violation() {
        let err = ConfigError::Validation(vec![
            Violation::Missing {
                key: "XeroApiConfig.consumer_key".into(),
                reason: "required".into(),
            },
            Violation::Malformed {
                key: "FilterConfig.states".into(),
                reason: "blank".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("missing XeroApiConfig.consumer_key"));
        assert!(msg.contains("malformed FilterConfig.states"));
    }

    #[test]
    fn schema_errors_skip_usage() {
        let err = ConfigError::from(SchemaError::UnknownShortcutField {
            shortcut: "debug".into(),
            key: "LogConfig.nope".into(),
        });
        assert!(!err.is_usage_error());
        assert!(
            ConfigError::InvalidValue {
                key: "k".into(),
                reason: "r".into()
            }
            .is_usage_error()
        );
    }
}
