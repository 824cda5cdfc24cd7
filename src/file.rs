//! Locating and loading the config file.
//!
//! There is at most one config file, named by `BaseConfig.config_path` and
//! taken relative to `BaseConfig.config_dir` when that is set. Both values
//! are known before the file is read, since the pipeline pulls them forward
//! from the command line.
//!
//! The format follows the extension:
//!
//! - `.json`: a JSON object of sections. `null` values count as unset.
//! - `.py`: a config script, see [`script`](crate::script).
//!
//! Anything else is rejected before the file is opened.

use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::merge::{Layer, ResolvedConfig};
use crate::ops;
use crate::path::resolve_path;
use crate::schema::{CONFIG_DIR_KEY, CONFIG_PATH_KEY, Registry};
use crate::script::parse_script;
use crate::types::Provenance;
use crate::validate::{unknown_keys, validate_unknown_keys};

/// Extensions accepted for config files, in the order they are listed in errors.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".py", ".json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Script,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => Ok(FileFormat::Script),
            Some("json") => Ok(FileFormat::Json),
            _ => Err(ConfigError::UnsupportedExtension {
                path: path.to_path_buf(),
                supported: SUPPORTED_EXTENSIONS.join(", "),
            }),
        }
    }
}

/// Resolve `config_path` against `config_dir` and check the file exists.
pub fn locate_config_file(
    config_path: &str,
    config_dir: Option<&str>,
) -> Result<PathBuf, ConfigError> {
    let path = resolve_path(config_path, config_dir);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ConfigError::FileNotFound {
            path,
            base_dir: config_dir.map(str::to_string),
        })
    }
}

/// Read and parse one config file into a `file` layer.
///
/// In strict mode keys unknown to `registry` are an error. Otherwise they
/// are logged and left in the layer, where nothing reads them.
pub fn load_file(path: &Path, registry: &Registry, strict: bool) -> Result<Layer, ConfigError> {
    let format = FileFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
            path: path.to_path_buf(),
            base_dir: None,
        },
        _ => ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let values = match format {
        FileFormat::Json => parse_json(&content, path)?,
        FileFormat::Script => parse_script(&content, path)?,
    };

    if strict {
        validate_unknown_keys(&values, &content, path, registry)?;
    } else {
        let ignored = unknown_keys(&values, registry).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: 0,
            reason: e.to_string(),
        })?;
        for key in ignored {
            warn!("ignoring unknown key '{key}' in {}", path.display());
        }
    }

    Ok(Layer::new(Provenance::File, values))
}

/// Load the file named by the config path in `config`, if there is one.
pub fn load_config_file(
    config: &ResolvedConfig,
    registry: &Registry,
    strict: bool,
) -> Result<Option<Layer>, ConfigError> {
    let Some(config_path) = config.get_str(CONFIG_PATH_KEY).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    let path = locate_config_file(config_path, config.get_str(CONFIG_DIR_KEY))?;
    let layer = load_file(&path, registry, strict)?;
    info!(
        "file config from {} is\n{}",
        path.display(),
        ops::describe(layer.values())
    );
    Ok(Some(layer))
}

fn parse_json(content: &str, path: &Path) -> Result<Table, ConfigError> {
    let json: serde_json::Value =
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.line(),
            reason: e.to_string(),
        })?;
    match json_to_toml(json) {
        Some(Value::Table(table)) => Ok(table),
        // `null` at the top level is an empty config
        None => Ok(Table::new()),
        Some(other) => Err(ConfigError::ParseError {
            path: path.to_path_buf(),
            line: 1,
            reason: format!("expected an object of sections, got {}", other.type_str()),
        }),
    }
}

/// Convert JSON to TOML values. `null` has no TOML form and is dropped,
/// which leaves the key unset.
fn json_to_toml(value: serde_json::Value) -> Option<Value> {
    use serde_json::Value as Json;
    match value {
        Json::Null => None,
        Json::Bool(b) => Some(Value::Boolean(b)),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Integer(i)),
            None => n.as_f64().map(Value::Float),
        },
        Json::String(s) => Some(Value::String(s)),
        Json::Array(items) => Some(Value::Array(
            items.into_iter().filter_map(json_to_toml).collect(),
        )),
        Json::Object(map) => Some(Value::Table(
            map.into_iter()
                .filter_map(|(k, v)| json_to_toml(v).map(|v| (k, v)))
                .collect(),
        )),
    }
}
