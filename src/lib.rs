//! Configuration front end for `xero-map-gen`, a tool that exports contacts
//! from the Xero accounting API into a CSV file.
//!
//! Before the exporter can talk to the API it needs credentials, filters,
//! output locations and logging options. This crate resolves them from three
//! layers and hands back one validated, typed [`Settings`] value:
//!
//! ```ignore
//! let logging = logging::init(LogLevel::Warning);
//! let loader = ConfigLoader::builder().build()?;
//! let config = loader.load(std::env::args_os().skip(1), &logging)?;
//! let settings = config.settings()?;
//! ```
//!
//! # Layer precedence
//!
//! ```text
//! proto    compiled-in defaults, plus ConfigLoaderBuilder::proto overrides
//!    ↑ overridden by
//! file     the single file named by BaseConfig.config_path (.json or .py)
//!    ↑ overridden by
//! cli      command-line switches, applied in command-line order
//! ```
//!
//! Every layer is sparse and merged section by section, so a file that sets
//! only `FilterConfig.states` leaves every other value where the lower layer
//! put it. The [`ResolvedConfig`] keeps each layer, so
//! [`provenance_of`](ResolvedConfig::provenance_of) can say which one won.
//!
//! # One registry, three uses
//!
//! Every configurable value is declared once, as a [`FieldSpec`] in a static
//! [`Section`]. From those declarations come:
//!
//! - the compiled-in defaults (the proto layer),
//! - the command-line switches: `--data-dir` for `BaseConfig.data_dir`, or
//!   an explicit switch name such as `--verbosity`,
//! - the allowed keys for config files and the checks run on the result.
//!
//! Section keys are the top-level keys of config files:
//!
//! ```json
//! {
//!     "XeroApiConfig": { "consumer_key": "ABC123", "rsa_key_path": "privatekey.pem" },
//!     "FilterConfig": { "states": "NSW|VIC" }
//! }
//! ```
//!
//! # Choosing the config file from the command line
//!
//! The cli layer is parsed first but merged last. Three of its values are
//! needed early: `--config-path` and `--config-dir` say which file to load,
//! and the stream log level decides how much of the loading is logged. These
//! are pulled forward before the file is read. Everything else waits, so the
//! file can never override an explicit switch.
//!
//! # Shortcuts
//!
//! `-d/--debug`, `-v/--verbose` and `-q/--quiet` set the stream log level to
//! DEBUG, INFO and ERROR. Shortcuts and ordinary switches are applied in the
//! order they appear, so `--verbose --quiet` ends at ERROR and
//! `--quiet --verbose` at INFO.
//!
//! # Strict mode
//!
//! By default, unknown keys in a config file are errors, reported with the
//! file path and line. `ConfigLoaderBuilder::strict(false)` turns them into
//! warnings.
//!
//! # Logging
//!
//! Messages go to stderr through `tracing`. [`logging::init`] installs the
//! subscriber with a provisional level, and the pipeline raises or lowers it
//! once the command line is known. `RUST_LOG`, when set, takes precedence.
//!
//! # Error handling
//!
//! All loading failures are [`ConfigError`]. Apart from
//! [`ConfigError::Schema`], which is a defect in the compiled-in tables,
//! they are caused by user input: report them, print [`ConfigLoader::usage`]
//! and exit non-zero.

pub mod error;
pub mod logging;
pub mod path;
pub mod schema;
pub mod settings;
pub mod types;

mod builder;
mod cli;
mod file;
pub(crate) mod merge;
mod ops;
mod overrides;
mod resolve;
mod script;
mod validate;

#[cfg(test)]
mod fixtures;

pub use builder::{ConfigLoader, ConfigLoaderBuilder};
pub use cli::{ArgumentBinder, BUILTIN_SHORTCUTS, DESCRIPTION, Shortcut};
pub use error::{ConfigError, SchemaError, Violation};
pub use file::{FileFormat, SUPPORTED_EXTENSIONS};
pub use logging::{LogHandle, LogLevel};
pub use merge::{Layer, ResolvedConfig};
pub use ops::{Listing, ListingEntry};
pub use schema::{FieldDefault, FieldSpec, Registry, Section};
pub use settings::Settings;
pub use types::{FieldKind, Provenance};
