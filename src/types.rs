//! Small shared vocabulary types: layer provenance and field kinds.

use std::fmt;

use toml::Value;

/// Where a [`Layer`](crate::merge::Layer) came from.
///
/// The declaration order is the normal merge order: later variants override
/// earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Provenance {
    /// Compiled-in defaults plus any caller-supplied initial config.
    Proto,
    /// The config file selected by `config_path`.
    File,
    /// Command-line switches and shortcuts.
    Cli,
}

impl Provenance {
    pub fn label(self) -> &'static str {
        match self {
            Provenance::Proto => "proto",
            Provenance::File => "file",
            Provenance::Cli => "cli",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Declared type of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    /// Comma-separated on the command line, an array in config files.
    List,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::List => "list",
        }
    }

    /// Parse a raw command-line string into a typed value.
    pub fn parse(self, raw: &str) -> Result<Value, String> {
        match self {
            FieldKind::String => Ok(Value::String(raw.to_string())),
            FieldKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format!("expected an integer, got '{raw}'")),
            FieldKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Boolean(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Boolean(false)),
                _ => Err(format!("expected a boolean, got '{raw}'")),
            },
            FieldKind::List => Ok(Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            )),
        }
    }

    /// Whether an already-typed value (e.g. from a config file) fits this kind.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldKind::String, Value::String(_))
                | (FieldKind::Integer, Value::Integer(_))
                | (FieldKind::Boolean, Value::Boolean(_))
                | (FieldKind::List, Value::Array(_))
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
