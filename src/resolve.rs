//! Core resolution pipeline: proto, file and cli layers into one config.
//!
//! 1. Merge the proto layer (registry defaults, then caller overrides)
//! 2. Set the log level from it
//! 3. Parse the command line into the cli layer
//! 4. Pull the config location and stream log level forward from the cli
//!    layer, and set the log level again
//! 5. Load and merge the config file, if a config path is set
//! 6. Merge the cli layer (highest priority)
//! 7. Validate the merged result
//!
//! Steps 4 and 5 are why the cli layer is parsed first but merged last:
//! `--config-path` decides which file is read, but the file must not
//! override anything given on the command line.

use std::ffi::OsString;

use toml::Table;
use tracing::{debug, info};

use crate::cli::ArgumentBinder;
use crate::error::ConfigError;
use crate::file;
use crate::logging::{LogHandle, LogLevel};
use crate::merge::{Layer, ResolvedConfig, deep_merge};
use crate::ops;
use crate::schema::{CONFIG_DIR_KEY, CONFIG_PATH_KEY, Registry, STREAM_LOG_LEVEL_KEY};
use crate::types::Provenance;
use crate::validate;

/// Keys read from the cli layer before the file layer exists.
pub const PULL_FORWARD_KEYS: [&str; 3] = [CONFIG_PATH_KEY, CONFIG_DIR_KEY, STREAM_LOG_LEVEL_KEY];

/// Everything one resolution needs.
pub struct ResolveInput<'a> {
    pub registry: &'a Registry,
    pub binder: &'a ArgumentBinder,
    /// Caller overrides merged over the registry defaults.
    pub proto: Table,
    /// Process arguments without the program name.
    pub args: Vec<OsString>,
    /// Whether to reject unknown keys in the config file.
    pub strict: bool,
}

/// Run the pipeline, adjusting `logging` as verbosity becomes known.
pub fn resolve(input: ResolveInput<'_>, logging: &LogHandle) -> Result<ResolvedConfig, ConfigError> {
    let mut config = ResolvedConfig::new();

    let proto = deep_merge(input.registry.defaults(), input.proto);
    config.merge_source(Layer::new(Provenance::Proto, proto));
    apply_stream_level(&config, logging);

    let cli = input.binder.parse(input.args)?;
    config.pull_forward(&cli, &PULL_FORWARD_KEYS);
    apply_stream_level(&config, logging);
    info!("cli config is\n{}", ops::describe(cli.values()));

    if let Some(file_layer) = file::load_config_file(&config, input.registry, input.strict)? {
        config.merge_source(file_layer);
    }
    config.merge_source(cli);

    validate::validate(&config, input.registry)?;
    debug!("config is\n{}", ops::list_values(&config, input.registry));
    Ok(config)
}

/// Unparseable levels are left for validation to report.
fn apply_stream_level(config: &ResolvedConfig, logging: &LogHandle) {
    if let Some(level) = config
        .get_str(STREAM_LOG_LEVEL_KEY)
        .and_then(|s| s.parse::<LogLevel>().ok())
    {
        logging.set_level(level);
    }
}
