//! Argument binder: CLI switches derived from the field registry.
//!
//! Switches are not known until the [`Registry`] exists, so the parser is
//! built with clap's builder API rather than its derive. Two kinds of
//! switches are registered:
//!
//! - **Aliases**, one per field, taking a value. Single-character keys get
//!   `-k`, longer keys `--key`. Repeating a switch is allowed; the last
//!   value wins.
//! - **Shortcuts** such as `--debug`, which take no value and apply a fixed
//!   partial configuration. They stack, and a later shortcut overrides an
//!   earlier one on the fields they share.
//!
//! If an alias key equals a shortcut name, the alias takes an optional value:
//! `--name VALUE` assigns the field, a bare `--name` applies the shortcut.
//!
//! Every switch occurrence is replayed in command-line order, so the rule is
//! the same across aliases and shortcuts: whatever comes last wins.

use std::collections::BTreeMap;
use std::ffi::OsString;

use clap::{Arg, ArgAction, ArgMatches, Command};
use toml::{Table, Value};

use crate::error::{ConfigError, SchemaError};
use crate::merge::{Layer, deep_merge};
use crate::overrides::{overrides_to_table, set_nested};
use crate::schema::{Alias, Registry};
use crate::types::Provenance;

pub const DESCRIPTION: &str = "Export contacts from the Xero API to a CSV file";

/// Stands in for "no inline value" on aliases that double as shortcuts.
/// Process arguments cannot contain NUL, so no real value collides with it.
const BARE_FLAG: &str = "\0";

const SHORTCUT_HEADING: &str = "Shortcuts";

/// Switches clap reserves for itself.
const RESERVED_SHORTS: &[char] = &['h', 'V'];
const RESERVED_LONGS: &[&str] = &["help", "version"];

/// A value-less switch that applies a fixed partial configuration.
#[derive(Debug, Clone, Copy)]
pub struct Shortcut {
    pub name: &'static str,
    pub short: Option<char>,
    pub help: &'static str,
    /// `(dotted key, raw value)` pairs, parsed with the target field's kind.
    pub sets: &'static [(&'static str, &'static str)],
}

pub static BUILTIN_SHORTCUTS: &[Shortcut] = &[
    Shortcut {
        name: "debug",
        short: Some('d'),
        help: "display debug messages",
        sets: &[("LogConfig.stream_log_level", "DEBUG")],
    },
    Shortcut {
        name: "verbose",
        short: Some('v'),
        help: "display extra information messages",
        sets: &[("LogConfig.stream_log_level", "INFO")],
    },
    Shortcut {
        name: "quiet",
        short: Some('q'),
        help: "suppress warning messages",
        sets: &[("LogConfig.stream_log_level", "ERROR")],
    },
];

/// A switch occurrence, ordered by its position on the command line.
enum Event<'a> {
    Assign(String, Value),
    Shortcut(&'a str),
}

/// Parses process arguments into a `cli` [`Layer`].
#[derive(Debug, Clone)]
pub struct ArgumentBinder {
    command: Command,
    aliases: Vec<Alias>,
    /// Partial configuration of every shortcut, keyed by flag name. Shared by
    /// standalone shortcut switches and aliases that double as shortcuts.
    flag_configs: BTreeMap<&'static str, Table>,
    /// Shortcuts that got a switch of their own.
    standalone: Vec<&'static str>,
}

impl ArgumentBinder {
    /// Build the parser for `registry` plus `shortcuts`.
    ///
    /// Fails if a shortcut targets an unknown field, sets an invalid value, or
    /// claims a switch that is already taken.
    pub fn new(registry: &Registry, shortcuts: &'static [Shortcut]) -> Result<Self, SchemaError> {
        let mut flag_configs = BTreeMap::new();
        for shortcut in shortcuts {
            flag_configs.insert(shortcut.name, shortcut_table(registry, shortcut)?);
        }

        let mut claims = SwitchClaims::default();
        let mut command = Command::new("xero-map-gen")
            .about(DESCRIPTION)
            .version(env!("CARGO_PKG_VERSION"))
            .no_binary_name(true);

        for alias in registry.aliases() {
            let shortcut = shortcuts.iter().find(|s| s.name == alias.key);
            let id = alias.dotted();
            let mut arg = Arg::new(id.clone())
                .help(alias.help_text())
                .value_name(metavar(alias))
                .help_heading(alias.section.title)
                .hide(alias.field.hidden)
                .action(ArgAction::Append);

            match alias.short() {
                Some(c) => {
                    claims.short(c, &id)?;
                    arg = arg.short(c);
                }
                None => {
                    claims.long(&alias.key, &id)?;
                    arg = arg.long(alias.key.clone());
                }
            }

            arg = match shortcut {
                Some(shortcut) => {
                    if let (Some(c), None) = (shortcut.short, alias.short()) {
                        claims.short(c, &id)?;
                        arg = arg.short(c);
                    }
                    arg.num_args(0..=1).default_missing_value(BARE_FLAG)
                }
                None => arg.num_args(1),
            };
            command = command.arg(arg);
        }

        let mut standalone = Vec::new();
        for shortcut in shortcuts {
            if registry.alias(shortcut.name).is_some() {
                continue;
            }
            claims.long(shortcut.name, shortcut.name)?;
            let mut arg = Arg::new(shortcut.name)
                .long(shortcut.name)
                .help(shortcut.help)
                .help_heading(SHORTCUT_HEADING)
                .action(ArgAction::Count);
            if let Some(c) = shortcut.short {
                claims.short(c, shortcut.name)?;
                arg = arg.short(c);
            }
            command = command.arg(arg);
            standalone.push(shortcut.name);
        }

        Ok(Self {
            command,
            aliases: registry.aliases().to_vec(),
            flag_configs,
            standalone,
        })
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// One-line usage summary, printed when arguments or config are rejected.
    pub fn usage(&self) -> String {
        self.command.clone().render_usage().to_string()
    }

    /// Parse `args` (without the program name) into a `cli` layer.
    pub fn parse<I, T>(&self, args: I) -> Result<Layer, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().try_get_matches_from(args)?;

        let mut events = self.alias_events(&matches)?;
        events.extend(self.shortcut_events(&matches));
        events.sort_by_key(|(index, _)| *index);

        let mut values = Table::new();
        for (_, event) in events {
            match event {
                Event::Assign(key, value) => set_nested(&mut values, &key, value),
                Event::Shortcut(name) => {
                    if let Some(partial) = self.flag_configs.get(name) {
                        values = deep_merge(values, partial.clone());
                    }
                }
            }
        }

        Ok(Layer::new(Provenance::Cli, values))
    }

    fn alias_events(&self, matches: &ArgMatches) -> Result<Vec<(usize, Event<'_>)>, ConfigError> {
        let mut events = Vec::new();
        for alias in &self.aliases {
            let id = alias.dotted();
            let (Some(raw_values), Some(indices)) =
                (matches.get_many::<String>(&id), matches.indices_of(&id))
            else {
                continue;
            };
            for (index, raw) in indices.zip(raw_values) {
                if raw == BARE_FLAG {
                    events.push((index, Event::Shortcut(alias.key.as_str())));
                    continue;
                }
                let value = alias
                    .field
                    .kind
                    .parse(raw)
                    .map_err(|reason| ConfigError::InvalidArgument {
                        switch: switch_display(alias),
                        value: raw.clone(),
                        reason,
                    })?;
                events.push((index, Event::Assign(id.clone(), value)));
            }
        }
        Ok(events)
    }

    fn shortcut_events(&self, matches: &ArgMatches) -> Vec<(usize, Event<'_>)> {
        // Repeats of one flag collapse to their last position, which is the
        // one that decides the outcome.
        self.standalone
            .iter()
            .filter(|name| matches.get_count(name) > 0)
            .filter_map(|name| {
                let index = matches.indices_of(name)?.last()?;
                Some((index, Event::Shortcut(*name)))
            })
            .collect()
    }
}

fn shortcut_table(registry: &Registry, shortcut: &Shortcut) -> Result<Table, SchemaError> {
    let mut entries = Vec::with_capacity(shortcut.sets.len());
    for (key, raw) in shortcut.sets {
        let field = registry
            .field(key)
            .ok_or_else(|| SchemaError::UnknownShortcutField {
                shortcut: shortcut.name.to_string(),
                key: key.to_string(),
            })?;
        let value = field
            .kind
            .parse(raw)
            .map_err(|reason| SchemaError::InvalidShortcutValue {
                shortcut: shortcut.name.to_string(),
                key: key.to_string(),
                reason,
            })?;
        entries.push((key.to_string(), value));
    }
    Ok(overrides_to_table(&entries))
}

fn metavar(alias: &Alias) -> String {
    match alias.field.metavar {
        Some(metavar) => metavar.to_string(),
        None => alias.key.to_uppercase().replace('-', "_"),
    }
}

fn switch_display(alias: &Alias) -> String {
    match alias.short() {
        Some(c) => format!("-{c}"),
        None => format!("--{}", alias.key),
    }
}

/// Tracks which switch spellings are taken, so collisions surface as schema
/// errors instead of clap panics.
#[derive(Default)]
struct SwitchClaims {
    shorts: BTreeMap<char, String>,
    longs: BTreeMap<String, String>,
}

impl SwitchClaims {
    fn short(&mut self, c: char, owner: &str) -> Result<(), SchemaError> {
        if RESERVED_SHORTS.contains(&c) {
            return Err(conflict(format!("-{c}"), "clap", owner));
        }
        match self.shorts.get(&c) {
            Some(first) if first != owner => Err(conflict(format!("-{c}"), first, owner)),
            _ => {
                self.shorts.insert(c, owner.to_string());
                Ok(())
            }
        }
    }

    fn long(&mut self, name: &str, owner: &str) -> Result<(), SchemaError> {
        if RESERVED_LONGS.contains(&name) {
            return Err(conflict(format!("--{name}"), "clap", owner));
        }
        match self.longs.get(name) {
            Some(first) if first != owner => Err(conflict(format!("--{name}"), first, owner)),
            _ => {
                self.longs.insert(name.to_string(), owner.to_string());
                Ok(())
            }
        }
    }
}

fn conflict(switch: String, first: &str, second: &str) -> SchemaError {
    SchemaError::SwitchConflict {
        switch,
        first: first.to_string(),
        second: second.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{FIXTURE_SECTION, FIXTURE_SHORTCUTS, SHADOWING_SHORTCUTS};

    fn binder() -> ArgumentBinder {
        let registry = Registry::builtin().unwrap();
        ArgumentBinder::new(&registry, BUILTIN_SHORTCUTS).unwrap()
    }

    fn fixture_binder() -> ArgumentBinder {
        let registry = Registry::new(&[&FIXTURE_SECTION]).unwrap();
        ArgumentBinder::new(&registry, FIXTURE_SHORTCUTS).unwrap()
    }

    fn stream_level(layer: &Layer) -> Option<&str> {
        layer
            .get("LogConfig.stream_log_level")
            .and_then(Value::as_str)
    }

    #[test]
    fn empty_args_give_empty_layer() {
        let layer = binder().parse(Vec::<String>::new()).unwrap();
        assert!(layer.is_empty());
        assert_eq!(layer.provenance(), Provenance::Cli);
    }

    #[test]
    fn long_switch_sets_field() {
        let layer = binder()
            .parse(["--xero-consumer-key", "ABC123", "--data-dir", "/tmp/out"])
            .unwrap();
        assert_eq!(
            layer.get("XeroApiConfig.consumer_key").and_then(Value::as_str),
            Some("ABC123")
        );
        assert_eq!(
            layer.get("BaseConfig.data_dir").and_then(Value::as_str),
            Some("/tmp/out")
        );
    }

    #[test]
    fn equals_syntax_is_accepted() {
        let layer = binder().parse(["--config-path=site.json"]).unwrap();
        assert_eq!(
            layer.get("BaseConfig.config_path").and_then(Value::as_str),
            Some("site.json")
        );
    }

    #[test]
    fn integer_switch_is_typed() {
        let layer = binder().parse(["--contact-limit", "25"]).unwrap();
        assert_eq!(
            layer.get("BaseConfig.contact_limit"),
            Some(&Value::Integer(25))
        );
    }

    #[test]
    fn malformed_integer_is_rejected() {
        let err = binder().parse(["--contact-limit", "lots"]).unwrap_err();
        match err {
            ConfigError::InvalidArgument { switch, value, .. } => {
                assert_eq!(switch, "--contact-limit");
                assert_eq!(value, "lots");
            }
            other => panic!("Expected InvalidArgument, got: {other:?}"),
        }
    }

    #[test]
    fn unknown_switch_is_an_argument_error() {
        let err = binder().parse(["--no-such-flag"]).unwrap_err();
        assert!(matches!(err, ConfigError::Argument(_)));
    }

    #[test]
    fn missing_value_is_an_argument_error() {
        let err = binder().parse(["--data-dir"]).unwrap_err();
        assert!(matches!(err, ConfigError::Argument(_)));
    }

    #[test]
    fn repeated_switch_last_one_wins() {
        let layer = binder()
            .parse(["--data-dir", "/a", "--data-dir", "/b", "--data-dir", "/c"])
            .unwrap();
        assert_eq!(
            layer.get("BaseConfig.data_dir").and_then(Value::as_str),
            Some("/c")
        );
    }

    #[test]
    fn shortcut_sets_log_level() {
        let layer = binder().parse(["--debug"]).unwrap();
        assert_eq!(stream_level(&layer), Some("DEBUG"));
        let layer = binder().parse(["-q"]).unwrap();
        assert_eq!(stream_level(&layer), Some("ERROR"));
    }

    #[test]
    fn verbose_then_quiet_is_quiet() {
        let layer = binder().parse(["--verbose", "--quiet"]).unwrap();
        assert_eq!(stream_level(&layer), Some("ERROR"));
    }

    #[test]
    fn quiet_then_verbose_is_verbose() {
        let layer = binder().parse(["--quiet", "--verbose"]).unwrap();
        assert_eq!(stream_level(&layer), Some("INFO"));
    }

    #[test]
    fn clustered_short_shortcuts_keep_order() {
        let layer = binder().parse(["-qv"]).unwrap();
        assert_eq!(stream_level(&layer), Some("INFO"));
        let layer = binder().parse(["-vq"]).unwrap();
        assert_eq!(stream_level(&layer), Some("ERROR"));
    }

    #[test]
    fn repeated_shortcut_counts_from_its_last_use() {
        let layer = binder().parse(["-v", "-q", "-v"]).unwrap();
        assert_eq!(stream_level(&layer), Some("INFO"));
    }

    #[test]
    fn shortcut_and_value_switch_interleave() {
        let layer = binder().parse(["--verbosity", "INFO", "--debug"]).unwrap();
        assert_eq!(stream_level(&layer), Some("DEBUG"));
        let layer = binder().parse(["--debug", "--verbosity", "INFO"]).unwrap();
        assert_eq!(stream_level(&layer), Some("INFO"));
    }

    #[test]
    fn hidden_fields_are_still_accepted() {
        let layer = binder().parse(["--file-log-level", "ERROR"]).unwrap();
        assert_eq!(
            layer.get("LogConfig.file_log_level").and_then(Value::as_str),
            Some("ERROR")
        );
        let help = binder().command().clone().render_help().to_string();
        assert!(!help.contains("--file-log-level"));
        assert!(help.contains("--verbosity"));
    }

    #[test]
    fn help_shows_sections_and_defaults() {
        let help = binder().command().clone().render_help().to_string();
        assert!(help.contains("Xero API credentials"));
        assert!(help.contains("Shortcuts"));
        assert!(help.contains("contacts.csv"));
        assert!(help.contains("--xero-key-path <PATH>"));
    }

    #[test]
    fn help_and_version_come_back_as_display_errors() {
        use clap::error::ErrorKind;
        for (arg, kind) in [
            ("--help", ErrorKind::DisplayHelp),
            ("-V", ErrorKind::DisplayVersion),
        ] {
            match binder().parse([arg]).unwrap_err() {
                ConfigError::Argument(err) => {
                    assert_eq!(err.kind(), kind);
                    assert_eq!(err.exit_code(), 0);
                }
                other => panic!("Expected Argument, got: {other:?}"),
            }
        }
    }

    #[test]
    fn usage_names_the_tool() {
        assert!(binder().usage().contains("xero-map-gen"));
    }

    #[test]
    fn single_character_alias_uses_single_dash() {
        let layer = fixture_binder().parse(["-o", "out.csv"]).unwrap();
        assert_eq!(
            layer.get("Out.o").and_then(Value::as_str),
            Some("out.csv")
        );
        assert!(fixture_binder().parse(["--o", "out.csv"]).is_err());
    }

    #[test]
    fn boolean_and_list_fields_parse() {
        let layer = fixture_binder()
            .parse(["--enabled", "yes", "--tags", "a,b"])
            .unwrap();
        assert_eq!(layer.get("Out.enabled"), Some(&Value::Boolean(true)));
        assert_eq!(
            layer.get("Out.tags"),
            Some(&Value::Array(vec![
                Value::String("a".into()),
                Value::String("b".into())
            ]))
        );
    }

    #[test]
    fn alias_shared_with_shortcut_takes_value() {
        let layer = fixture_binder().parse(["--debug", "trace.log"]).unwrap();
        assert_eq!(
            layer.get("Out.debug").and_then(Value::as_str),
            Some("trace.log")
        );
        assert_eq!(layer.get("Out.level"), None);
    }

    #[test]
    fn bare_alias_shared_with_shortcut_applies_shortcut() {
        let layer = fixture_binder().parse(["--debug"]).unwrap();
        assert_eq!(layer.get("Out.debug"), None);
        assert_eq!(
            layer.get("Out.level").and_then(Value::as_str),
            Some("DEBUG")
        );
    }

    #[test]
    fn shortcuts_stack_across_fields() {
        let layer = fixture_binder().parse(["--loud", "--debug"]).unwrap();
        assert_eq!(
            layer.get("Out.level").and_then(Value::as_str),
            Some("DEBUG")
        );
        assert_eq!(layer.get("Out.enabled"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn shortcut_with_unknown_field_is_schema_error() {
        let registry = Registry::new(&[&FIXTURE_SECTION]).unwrap();
        let err = ArgumentBinder::new(&registry, BUILTIN_SHORTCUTS).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownShortcutField { .. }));
    }

    #[test]
    fn shortcut_short_switch_clash_is_schema_error() {
        let registry = Registry::new(&[&FIXTURE_SECTION]).unwrap();
        let err = ArgumentBinder::new(&registry, SHADOWING_SHORTCUTS).unwrap_err();
        match err {
            SchemaError::SwitchConflict { switch, .. } => assert_eq!(switch, "-o"),
            other => panic!("Expected SwitchConflict, got: {other:?}"),
        }
    }
}
