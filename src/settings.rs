//! Typed, read-only view of a resolved configuration.
//!
//! This is the contract handed to the API client, CSV writer and logging
//! collaborators. Section and field names match the config file keys.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::logging::LogLevel;
use crate::path::resolve_path;
use crate::schema::{
    DEFAULT_DUMP_PATH, DEFAULT_FILE_LOG_LEVEL, DEFAULT_LOG_PATH, DEFAULT_STREAM_LOG_LEVEL,
};

/// Separator used inside filter values.
pub const FILTER_SEPARATOR: char = '|';

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "XeroApiConfig")]
    pub xero_api: XeroApiSettings,
    #[serde(rename = "LogConfig")]
    pub log: LogSettings,
    #[serde(rename = "BaseConfig")]
    pub base: BaseSettings,
    #[serde(rename = "FilterConfig")]
    pub filter: FilterSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct XeroApiSettings {
    pub rsa_key_path: Option<String>,
    pub consumer_key: Option<String>,
}

impl XeroApiSettings {
    /// The RSA key file, relative paths taken from `config_dir`.
    pub fn key_file(&self, config_dir: Option<&str>) -> Option<PathBuf> {
        self.rsa_key_path
            .as_deref()
            .map(|path| resolve_path(path, config_dir))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub stream_log_level: String,
    pub file_log_level: String,
    pub log_dir: Option<String>,
    pub log_path: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            stream_log_level: DEFAULT_STREAM_LOG_LEVEL.into(),
            file_log_level: DEFAULT_FILE_LOG_LEVEL.into(),
            log_dir: None,
            log_path: DEFAULT_LOG_PATH.into(),
        }
    }
}

impl LogSettings {
    /// Stream level, falling back to WARNING for names that do not parse.
    pub fn stream_level(&self) -> LogLevel {
        self.stream_log_level.parse().unwrap_or(LogLevel::Warning)
    }

    /// File level, falling back to DEBUG for names that do not parse.
    pub fn file_level(&self) -> LogLevel {
        self.file_log_level.parse().unwrap_or(LogLevel::Debug)
    }

    pub fn log_file(&self) -> PathBuf {
        resolve_path(&self.log_path, self.log_dir.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BaseSettings {
    pub contact_limit: Option<i64>,
    pub config_dir: Option<String>,
    pub config_path: Option<String>,
    pub data_dir: Option<String>,
    pub dump_path: String,
}

impl Default for BaseSettings {
    fn default() -> Self {
        Self {
            contact_limit: None,
            config_dir: None,
            config_path: None,
            data_dir: None,
            dump_path: DEFAULT_DUMP_PATH.into(),
        }
    }
}

impl BaseSettings {
    /// Where the CSV is written, relative paths taken from `data_dir`.
    pub fn dump_file(&self) -> PathBuf {
        resolve_path(&self.dump_path, self.data_dir.as_deref())
    }

    /// The config file, relative paths taken from `config_dir`.
    pub fn config_file(&self) -> Option<PathBuf> {
        self.config_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| resolve_path(p, self.config_dir.as_deref()))
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref().map(Path::new)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub contact_groups: Option<String>,
    pub states: Option<String>,
    pub countries: Option<String>,
}

impl FilterSettings {
    pub fn contact_groups(&self) -> Vec<&str> {
        split_filter(self.contact_groups.as_deref())
    }

    pub fn states(&self) -> Vec<&str> {
        split_filter(self.states.as_deref())
    }

    pub fn countries(&self) -> Vec<&str> {
        split_filter(self.countries.as_deref())
    }

    /// True when no filter is set.
    pub fn is_empty(&self) -> bool {
        self.contact_groups.is_none() && self.states.is_none() && self.countries.is_none()
    }
}

fn split_filter(value: Option<&str>) -> Vec<&str> {
    value
        .map(|v| {
            v.split(FILTER_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_schema() {
        let settings = Settings::default();
        assert_eq!(settings.log.stream_log_level, "WARNING");
        assert_eq!(settings.log.file_log_level, "DEBUG");
        assert_eq!(settings.log.log_path, "xero_map_gen.log");
        assert_eq!(settings.base.dump_path, "contacts.csv");
        assert!(settings.filter.is_empty());
    }

    #[test]
    fn deserializes_sparse_sections() {
        let settings: Settings = toml::from_str(
            "[FilterConfig]\nstates = \"NSW | VIC\"\n[BaseConfig]\ncontact_limit = 10\n",
        )
        .unwrap();
        assert_eq!(settings.filter.states(), vec!["NSW", "VIC"]);
        assert_eq!(settings.base.contact_limit, Some(10));
        assert_eq!(settings.base.dump_path, "contacts.csv");
    }

    #[test]
    fn unset_filter_splits_to_nothing() {
        let filter = FilterSettings::default();
        assert!(filter.countries().is_empty());
    }

    #[test]
    fn dump_file_is_relative_to_data_dir() {
        let base = BaseSettings {
            data_dir: Some("/srv/out".into()),
            ..BaseSettings::default()
        };
        assert_eq!(base.dump_file(), PathBuf::from("/srv/out/contacts.csv"));
    }

    #[test]
    fn config_file_is_relative_to_config_dir() {
        let base = BaseSettings {
            config_dir: Some("/etc/xmg".into()),
            config_path: Some("site.json".into()),
            ..BaseSettings::default()
        };
        assert_eq!(
            base.config_file(),
            Some(PathBuf::from("/etc/xmg/site.json"))
        );
        assert_eq!(BaseSettings::default().config_file(), None);
    }

    #[test]
    fn log_levels_parse_with_fallback() {
        let log = LogSettings {
            stream_log_level: "info".into(),
            file_log_level: "bogus".into(),
            ..LogSettings::default()
        };
        assert_eq!(log.stream_level(), LogLevel::Info);
        assert_eq!(log.file_level(), LogLevel::Debug);
    }

    #[test]
    fn key_file_resolves_against_config_dir() {
        let api = XeroApiSettings {
            rsa_key_path: Some("keys/privatekey.pem".into()),
            consumer_key: Some("ABC".into()),
        };
        assert_eq!(
            api.key_file(Some("/etc/xmg")),
            Some(PathBuf::from("/etc/xmg/keys/privatekey.pem"))
        );
    }
}
