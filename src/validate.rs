//! Validation: unknown keys in config files and the final merged config.
//!
//! Unknown keys are found with `serde_ignored`. The file's table is walked by
//! a [`DeserializeSeed`] built from the [`Registry`]: declared sections and
//! fields are consumed, everything else is skipped as `IgnoredAny`, which
//! `serde_ignored` reports with its dotted path.
//!
//! The merged config is checked once every layer is in, collecting all
//! violations instead of stopping at the first.

use std::fmt;
use std::path::Path;

use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, Visitor};
use toml::{Table, Value};

use crate::error::{ConfigError, Violation};
use crate::merge::ResolvedConfig;
use crate::schema::{Registry, Section, XERO_API_SECTION};

pub const CREDENTIALS_KEY: &str = "XeroApiConfig";
pub const CREDENTIALS_MESSAGE: &str = "To connect to the Xero API, you must either specify a \
     Xero API consumer key or a config file containing such a key";

/// Dotted keys in `table` that no registry field declares.
///
/// An unknown section is reported once, by its section key.
pub fn unknown_keys(table: &Table, registry: &Registry) -> Result<Vec<String>, toml::de::Error> {
    let mut unknown = Vec::new();
    let mut callback = |ignored: serde_ignored::Path<'_>| unknown.push(ignored.to_string());
    let deserializer = serde_ignored::Deserializer::new(Value::Table(table.clone()), &mut callback);
    FileShape(registry).deserialize(deserializer)?;
    Ok(unknown)
}

/// Reject a file table containing keys unknown to `registry`.
///
/// Each unknown key is reported with the file path and a best-effort line
/// number found by searching `content`.
pub fn validate_unknown_keys(
    table: &Table,
    content: &str,
    path: &Path,
    registry: &Registry,
) -> Result<(), ConfigError> {
    let unknown = unknown_keys(table, registry).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        line: 0,
        reason: e.to_string(),
    })?;

    if unknown.is_empty() {
        return Ok(());
    }

    let errors: Vec<ConfigError> = unknown
        .into_iter()
        .map(|key| {
            let line = find_key_line(content, &key);
            ConfigError::UnknownKey {
                key,
                path: path.to_path_buf(),
                line,
            }
        })
        .collect();

    Err(ConfigError::UnknownKeys(errors))
}

/// Check the merged configuration.
///
/// - the API credentials are both present and non-empty,
/// - every present value matches its field's kind,
/// - every present value passes its field's validator.
pub fn validate(config: &ResolvedConfig, registry: &Registry) -> Result<(), ConfigError> {
    let mut violations = Vec::new();

    if registry.section(XERO_API_SECTION.key).is_some() && !has_credentials(config) {
        violations.push(Violation::Missing {
            key: CREDENTIALS_KEY.into(),
            reason: CREDENTIALS_MESSAGE.into(),
        });
    }

    for (key, field) in registry.fields() {
        let Some(value) = config.get(&key) else {
            continue;
        };
        if !field.kind.accepts(value) {
            violations.push(Violation::Malformed {
                reason: format!("expected {}, got {}", field.kind, value.type_str()),
                key,
            });
            continue;
        }
        if let Some(check) = field.validator
            && let Err(reason) = check(value)
        {
            violations.push(Violation::Malformed { key, reason });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(violations))
    }
}

fn has_credentials(config: &ResolvedConfig) -> bool {
    ["XeroApiConfig.rsa_key_path", "XeroApiConfig.consumer_key"]
        .iter()
        .all(|key| config.get_str(key).is_some_and(|v| !v.trim().is_empty()))
}

// -- Registry-driven shape ------------------------------------------------------

struct FileShape<'r>(&'r Registry);

impl<'de> DeserializeSeed<'de> for FileShape<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for FileShape<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a table of config sections")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            match self.0.section(&key) {
                Some(section) => map.next_value_seed(SectionShape(section))?,
                None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(())
    }
}

struct SectionShape(&'static Section);

impl<'de> DeserializeSeed<'de> for SectionShape {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for SectionShape {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a table of {} fields", self.0.key)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            if self.0.fields.iter().any(|f| f.name == key) {
                map.next_value::<Value>()?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

/// Find the 1-indexed line where a dotted key is set.
///
/// Understands the two file layouts: script assignments
/// (`c.Section.field = ...`) and JSON objects, where the leaf is matched as
/// `"field":` once the `"Section":` line has been seen.
///
/// Best effort: returns 0 if the key cannot be located.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let (section, leaf) = match dotted_key.split_once('.') {
        Some((section, leaf)) => (Some(section), leaf),
        None => (None, dotted_key),
    };
    let quoted_section = section.map(|s| format!("\"{s}\""));
    let quoted_leaf = format!("\"{leaf}\"");
    let mut in_section = section.is_none();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if let Some((target, _)) = trimmed.split_once('=')
            && script_target_matches(target.trim(), dotted_key)
        {
            return i + 1;
        }

        if let Some(quoted) = &quoted_section
            && json_key_at(trimmed, quoted)
        {
            in_section = true;
            continue;
        }

        if in_section && json_key_at(trimmed, &quoted_leaf) {
            return i + 1;
        }
    }
    0
}

fn script_target_matches(target: &str, dotted_key: &str) -> bool {
    target.ends_with(&format!(".{dotted_key}")) || target.contains(&format!(".{dotted_key}."))
}

fn json_key_at(line: &str, quoted: &str) -> bool {
    line.strip_prefix(quoted)
        .is_some_and(|rest| rest.trim_start().starts_with(':'))
}
