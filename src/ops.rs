//! Human-readable renderings of layers and resolved configs, used for the
//! diagnostic log output.

use std::fmt;

use toml::{Table, Value};

use crate::merge::ResolvedConfig;
use crate::overrides::leaves;
use crate::schema::Registry;
use crate::types::Provenance;

/// One line of a [`Listing`].
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub key: String,
    /// `None` when no layer set the key.
    pub value: Option<String>,
    pub provenance: Option<Provenance>,
}

/// Every registry field with its resolved value and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub entries: Vec<ListingEntry>,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match (&entry.value, entry.provenance) {
                (Some(value), Some(provenance)) => {
                    write!(f, "{} = {value}  # {provenance}", entry.key)?
                }
                (Some(value), None) => write!(f, "{} = {value}", entry.key)?,
                (None, _) => write!(f, "{} = <not set>", entry.key)?,
            }
        }
        Ok(())
    }
}

/// List all registry fields of `config` in declaration order.
pub fn list_values(config: &ResolvedConfig, registry: &Registry) -> Listing {
    let entries = registry
        .fields()
        .map(|(key, _)| ListingEntry {
            value: config.get(&key).map(format_value),
            provenance: config.provenance_of(&key),
            key,
        })
        .collect();
    Listing { entries }
}

/// One `key = value` line per leaf of `table`.
pub fn describe(table: &Table) -> String {
    let lines: Vec<String> = leaves(table)
        .into_iter()
        .map(|(key, value)| format!("{key} = {}", format_value(value)))
        .collect();
    if lines.is_empty() {
        "<empty>".to_string()
    } else {
        lines.join("\n")
    }
}

/// Format a TOML value for display.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Array(a) => {
            let items: Vec<String> = a.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Table(t) => toml::to_string(t).unwrap_or_else(|_| format!("{t:?}")),
        _ => format!("{value:?}"),
    }
}
