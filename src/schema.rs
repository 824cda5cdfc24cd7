//! Static field registry: every configurable value, declared once.
//!
//! Each [`Section`] is a named namespace of [`FieldSpec`]s. The [`Registry`]
//! built from the sections is the single source for three derived things:
//!
//! - the CLI aliases the argument binder turns into switches,
//! - the `proto` layer of compiled-in defaults,
//! - the field lookup used by file loading and validation.
//!
//! A field is addressed by its dotted key, `Section.field`
//! (e.g. `LogConfig.stream_log_level`). The section keys double as the
//! top-level keys of config files.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use toml::{Table, Value};

use crate::error::SchemaError;
use crate::logging::LogLevel;
use crate::overrides;
use crate::types::FieldKind;

/// Field names that never become CLI switches.
pub const RESERVED_NAMES: &[&str] = &["config", "parent"];

pub const DEFAULT_STREAM_LOG_LEVEL: &str = "WARNING";
pub const DEFAULT_FILE_LOG_LEVEL: &str = "DEBUG";
pub const DEFAULT_LOG_PATH: &str = "xero_map_gen.log";
pub const DEFAULT_DUMP_PATH: &str = "contacts.csv";

pub const CONFIG_PATH_KEY: &str = "BaseConfig.config_path";
pub const CONFIG_DIR_KEY: &str = "BaseConfig.config_dir";
pub const STREAM_LOG_LEVEL_KEY: &str = "LogConfig.stream_log_level";

/// Checks a single value that already matches the field's kind.
pub type Validator = fn(&Value) -> Result<(), String>;

/// Compiled-in default for a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Str(&'static str),
    Int(i64),
    Bool(bool),
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::Str(s) => Value::String(s.to_string()),
            FieldDefault::Int(i) => Value::Integer(i),
            FieldDefault::Bool(b) => Value::Boolean(b),
        }
    }

    /// Empty string defaults count as "no default", both for display and for
    /// the proto layer.
    fn is_empty(self) -> bool {
        matches!(self, FieldDefault::Str(""))
    }

    fn display(self) -> String {
        match self {
            FieldDefault::Str(s) => s.to_string(),
            FieldDefault::Int(i) => i.to_string(),
            FieldDefault::Bool(b) => b.to_string(),
        }
    }
}

/// Declaration of one configuration field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub default: Option<FieldDefault>,
    pub help: &'static str,
    /// Alias key override. Without it the alias is `name` with `_` → `-`.
    pub switch: Option<&'static str>,
    pub metavar: Option<&'static str>,
    /// Accepted on the command line but left out of `--help`.
    pub hidden: bool,
    pub validator: Option<Validator>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            default: None,
            help,
            switch: None,
            metavar: None,
            hidden: false,
            validator: None,
        }
    }

    pub const fn string(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FieldKind::String, help)
    }

    pub const fn integer(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FieldKind::Integer, help)
    }

    pub const fn default(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn switch(mut self, switch: &'static str) -> Self {
        self.switch = Some(switch);
        self
    }

    pub const fn metavar(mut self, metavar: &'static str) -> Self {
        self.metavar = Some(metavar);
        self
    }

    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub const fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// The CLI alias key for this field.
    pub fn alias_key(&self) -> String {
        match self.switch {
            Some(switch) => switch.to_string(),
            None => self.name.replace('_', "-"),
        }
    }

    /// The default as a value, or `None` when unset or empty.
    pub fn default_value(&self) -> Option<Value> {
        self.default
            .filter(|d| !d.is_empty())
            .map(FieldDefault::to_value)
    }
}

/// A named group of fields. Field names are unique within a section.
#[derive(Debug)]
pub struct Section {
    /// Key used in config files and dotted paths, e.g. `LogConfig`.
    pub key: &'static str,
    /// Human title, used as the `--help` heading.
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
}

/// A CLI alias bound to one field.
#[derive(Debug, Clone)]
pub struct Alias {
    pub key: String,
    pub section: &'static Section,
    pub field: &'static FieldSpec,
    /// Stringified non-empty default, shown in help only.
    pub default_display: Option<String>,
}

impl Alias {
    /// Fully qualified `Section.field` identity.
    pub fn dotted(&self) -> String {
        dotted(self.section, self.field)
    }

    /// Single-character keys become `-k`.
    pub fn short(&self) -> Option<char> {
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    /// Multi-character keys become `--key`.
    pub fn long(&self) -> Option<&str> {
        if self.short().is_some() {
            None
        } else {
            Some(&self.key)
        }
    }

    /// Help text with the default appended for display.
    pub fn help_text(&self) -> String {
        match &self.default_display {
            Some(default) => format!("{} [default: {default}]", self.field.help),
            None => self.field.help.to_string(),
        }
    }
}

fn dotted(section: &Section, field: &FieldSpec) -> String {
    format!("{}.{}", section.key, field.name)
}

/// The validated set of sections and the aliases derived from them.
#[derive(Debug)]
pub struct Registry {
    sections: Vec<&'static Section>,
    aliases: Vec<Alias>,
}

impl Registry {
    /// Build a registry, rejecting alias keys that collide.
    ///
    /// Collisions inside one section are [`SchemaError::DuplicateAlias`].
    /// Collisions across sections are [`SchemaError::SwitchConflict`] since all
    /// switches share one command line.
    pub fn new(sections: &[&'static Section]) -> Result<Self, SchemaError> {
        let mut aliases: Vec<Alias> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut paths: HashSet<(&str, &str)> = HashSet::new();

        for &section in sections {
            for field in section.fields {
                if !paths.insert((section.key, field.name)) {
                    return Err(SchemaError::DuplicateField {
                        section: section.key,
                        field: field.name,
                    });
                }
                if RESERVED_NAMES.contains(&field.name) {
                    continue;
                }
                let key = field.alias_key();
                if let Some(&idx) = seen.get(&key) {
                    let other = &aliases[idx];
                    if other.section.key == section.key {
                        return Err(SchemaError::DuplicateAlias {
                            alias: key,
                            section: section.key,
                            first: other.field.name,
                            second: field.name,
                        });
                    }
                    return Err(SchemaError::SwitchConflict {
                        switch: key,
                        first: other.dotted(),
                        second: dotted(section, field),
                    });
                }
                seen.insert(key.clone(), aliases.len());
                aliases.push(Alias {
                    key,
                    section,
                    field,
                    default_display: field
                        .default
                        .filter(|d| !d.is_empty())
                        .map(FieldDefault::display),
                });
            }
        }

        Ok(Self {
            sections: sections.to_vec(),
            aliases,
        })
    }

    /// The registry for the four built-in sections.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::new(BUILTIN_SECTIONS)
    }

    pub fn sections(&self) -> &[&'static Section] {
        &self.sections
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    pub fn alias(&self, key: &str) -> Option<&Alias> {
        self.aliases.iter().find(|a| a.key == key)
    }

    pub fn section(&self, key: &str) -> Option<&'static Section> {
        self.sections.iter().copied().find(|s| s.key == key)
    }

    /// Look up a field by dotted key.
    pub fn field(&self, dotted_key: &str) -> Option<&'static FieldSpec> {
        let (section, name) = dotted_key.split_once('.')?;
        self.section(section)?
            .fields
            .iter()
            .find(|f| f.name == name)
    }

    /// All fields as `(dotted key, spec)` pairs, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (String, &'static FieldSpec)> + '_ {
        self.sections
            .iter()
            .flat_map(|s| s.fields.iter().map(move |f| (dotted(s, f), f)))
    }

    /// Compiled-in defaults as a nested table. Fields without a non-empty
    /// default are absent.
    pub fn defaults(&self) -> Table {
        let entries: Vec<(String, Value)> = self
            .fields()
            .filter_map(|(key, field)| field.default_value().map(|v| (key, v)))
            .collect();
        overrides::overrides_to_table(&entries)
    }
}

// -- Validators -----------------------------------------------------------------

fn valid_log_level(value: &Value) -> Result<(), String> {
    let Some(level) = value.as_str() else {
        return Err("expected a log level name".into());
    };
    LogLevel::from_str(level).map(|_| ())
}

fn non_negative(value: &Value) -> Result<(), String> {
    match value.as_integer() {
        Some(i) if i < 0 => Err(format!("must not be negative, got {i}")),
        _ => Ok(()),
    }
}

fn not_blank(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(s) if s.trim().is_empty() => Err("set but blank".into()),
        _ => Ok(()),
    }
}

// -- Built-in sections ----------------------------------------------------------

pub static XERO_API_SECTION: Section = Section {
    key: "XeroApiConfig",
    title: "Xero API credentials",
    fields: &[
        FieldSpec::string("rsa_key_path", "The path to the Xero API RSA key file")
            .switch("xero-key-path")
            .metavar("PATH"),
        FieldSpec::string("consumer_key", "The Xero API Consumer Key")
            .switch("xero-consumer-key")
            .metavar("KEY"),
    ],
};

pub static LOG_SECTION: Section = Section {
    key: "LogConfig",
    title: "Logging",
    fields: &[
        FieldSpec::string("stream_log_level", "Set custom message output level")
            .default(FieldDefault::Str(DEFAULT_STREAM_LOG_LEVEL))
            .switch("verbosity")
            .metavar("LEVEL")
            .validator(valid_log_level),
        FieldSpec::string("file_log_level", "Message level written to the log file")
            .default(FieldDefault::Str(DEFAULT_FILE_LOG_LEVEL))
            .metavar("LEVEL")
            .hidden()
            .validator(valid_log_level),
        FieldSpec::string("log_dir", "Directory containing log files").metavar("PATH"),
        FieldSpec::string("log_path", "Log file, relative to log_dir if provided")
            .default(FieldDefault::Str(DEFAULT_LOG_PATH))
            .metavar("PATH")
            .hidden(),
    ],
};

pub static BASE_SECTION: Section = Section {
    key: "BaseConfig",
    title: "Base options",
    fields: &[
        FieldSpec::integer(
            "contact_limit",
            "Limit the number of contacts downloaded from the API",
        )
        .metavar("LIMIT")
        .validator(non_negative),
        FieldSpec::string("config_dir", "Directory containing config files").metavar("PATH"),
        FieldSpec::string(
            "config_path",
            "Load extra config from file relative to config_dir if provided",
        )
        .metavar("PATH"),
        FieldSpec::string("data_dir", "Directory to dump data").metavar("PATH"),
        FieldSpec::string(
            "dump_path",
            "Location where CSV data is dumped relative to data_dir if provided",
        )
        .default(FieldDefault::Str(DEFAULT_DUMP_PATH))
        .metavar("PATH"),
    ],
};

pub static FILTER_SECTION: Section = Section {
    key: "FilterConfig",
    title: "Filters",
    fields: &[
        FieldSpec::string(
            "contact_groups",
            "Filter by Xero contact group names separated by '|'",
        )
        .switch("filter-contact-groups")
        .metavar("\"GROUP1|GROUP2\"")
        .validator(not_blank),
        FieldSpec::string(
            "states",
            "Filter by main address state. Separate states with '|'",
        )
        .switch("filter-states")
        .metavar("\"STATE1|STATE2\"")
        .validator(not_blank),
        FieldSpec::string(
            "countries",
            "Filter by main address country. Separate countries with '|'",
        )
        .switch("filter-countries")
        .metavar("\"COUNTRY1|COUNTRY2\"")
        .validator(not_blank),
    ],
};

pub static BUILTIN_SECTIONS: &[&Section] = &[
    &XERO_API_SECTION,
    &LOG_SECTION,
    &BASE_SECTION,
    &FILTER_SECTION,
];
