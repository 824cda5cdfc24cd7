use std::ffi::OsString;

use toml::{Table, Value};

use crate::cli::{ArgumentBinder, BUILTIN_SHORTCUTS, Shortcut};
use crate::error::{ConfigError, SchemaError};
use crate::logging::LogHandle;
use crate::merge::ResolvedConfig;
use crate::overrides;
use crate::resolve::{self, ResolveInput};
use crate::schema::{BUILTIN_SECTIONS, Registry, Section};

/// A validated registry and argument binder, ready to resolve configs.
///
/// Built once per process. Schema problems surface from
/// [`ConfigLoaderBuilder::build`], before any user input is looked at.
#[derive(Debug)]
pub struct ConfigLoader {
    registry: Registry,
    binder: ArgumentBinder,
    proto: Table,
    strict: bool,
}

impl ConfigLoader {
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The usage line printed next to user errors.
    pub fn usage(&self) -> String {
        self.binder.usage()
    }

    /// Resolve proto, file and cli layers for `args` (without the program
    /// name), adjusting `logging` along the way.
    pub fn load<I, T>(&self, args: I, logging: &LogHandle) -> Result<ResolvedConfig, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        resolve::resolve(
            ResolveInput {
                registry: &self.registry,
                binder: &self.binder,
                proto: self.proto.clone(),
                args: args.into_iter().map(Into::into).collect(),
                strict: self.strict,
            },
            logging,
        )
    }
}

/// Builder for a [`ConfigLoader`].
pub struct ConfigLoaderBuilder {
    sections: Vec<&'static Section>,
    shortcuts: &'static [Shortcut],
    proto_overrides: Vec<(String, Value)>,
    strict: bool,
}

impl ConfigLoaderBuilder {
    fn new() -> Self {
        Self {
            sections: BUILTIN_SECTIONS.to_vec(),
            shortcuts: BUILTIN_SHORTCUTS,
            proto_overrides: Vec::new(),
            strict: true,
        }
    }

    /// Replace the built-in sections.
    pub fn sections(mut self, sections: &[&'static Section]) -> Self {
        self.sections = sections.to_vec();
        self
    }

    /// Replace the built-in `--debug`/`--verbose`/`--quiet` shortcuts.
    pub fn shortcuts(mut self, shortcuts: &'static [Shortcut]) -> Self {
        self.shortcuts = shortcuts;
        self
    }

    /// Override one default in the proto layer, by dotted key.
    ///
    /// Accepts anything convertible to `toml::Value`: strings, integers,
    /// booleans, etc. Later calls for the same key win.
    pub fn proto(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.proto_overrides.push((key.to_string(), value.into()));
        self
    }

    /// Enable or disable strict mode (default: enabled).
    ///
    /// Strict mode rejects config files with unknown keys. Lenient mode logs
    /// them and carries on.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn build(self) -> Result<ConfigLoader, SchemaError> {
        let registry = Registry::new(&self.sections)?;
        let binder = ArgumentBinder::new(&registry, self.shortcuts)?;
        Ok(ConfigLoader {
            registry,
            binder,
            proto: overrides::overrides_to_table(&self.proto_overrides),
            strict: self.strict,
        })
    }
}
