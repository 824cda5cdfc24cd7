//! Layers and the merge engine.
//!
//! A [`Layer`] is an immutable snapshot of values from one source. The
//! [`ResolvedConfig`] keeps every merged layer, in order, next to the
//! deep-merged view of all of them, so "which source set this?" is always
//! answerable.

use toml::{Table, Value};

use crate::error::ConfigError;
use crate::overrides::{set_nested, table_get};
use crate::settings::Settings;
use crate::types::Provenance;

/// Deep-merge `overlay` on top of `base`.
/// If both sides have a Table for the same key, recurse.
/// Otherwise, `overlay`'s value wins.
pub fn deep_merge(mut base: Table, overlay: Table) -> Table {
    for (key, overlay_val) in overlay {
        match (base.remove(&key), overlay_val) {
            (Some(Value::Table(base_tbl)), Value::Table(overlay_tbl)) => {
                base.insert(key, Value::Table(deep_merge(base_tbl, overlay_tbl)));
            }
            (_, overlay_val) => {
                base.insert(key, overlay_val);
            }
        }
    }
    base
}

/// Values contributed by a single source.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    provenance: Provenance,
    values: Table,
}

impl Layer {
    pub fn new(provenance: Provenance, values: Table) -> Self {
        Self { provenance, values }
    }

    pub fn empty(provenance: Provenance) -> Self {
        Self::new(provenance, Table::new())
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn values(&self) -> &Table {
        &self.values
    }

    pub fn get(&self, dotted_key: &str) -> Option<&Value> {
        table_get(&self.values, dotted_key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The merged configuration plus the layers it was built from.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    merged: Table,
    sources: Vec<Layer>,
}

impl ResolvedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `layer` and deep-merge it over everything merged so far.
    pub fn merge_source(&mut self, layer: Layer) {
        let merged = std::mem::take(&mut self.merged);
        self.merged = deep_merge(merged, layer.values.clone());
        self.sources.push(layer);
    }

    /// Copy selected keys from a layer that has not been merged yet.
    ///
    /// Used for the handful of values the pipeline needs before the full
    /// merge (where to find the config file, how loud to log). The layer is
    /// expected to be merged properly later, so nothing is recorded in
    /// [`sources`](Self::sources).
    pub fn pull_forward(&mut self, layer: &Layer, keys: &[&str]) {
        for key in keys {
            if let Some(value) = layer.get(key) {
                set_nested(&mut self.merged, key, value.clone());
            }
        }
    }

    pub fn get(&self, dotted_key: &str) -> Option<&Value> {
        table_get(&self.merged, dotted_key)
    }

    pub fn get_str(&self, dotted_key: &str) -> Option<&str> {
        self.get(dotted_key).and_then(Value::as_str)
    }

    /// The most recent merged layer that set `dotted_key`.
    pub fn provenance_of(&self, dotted_key: &str) -> Option<Provenance> {
        self.sources
            .iter()
            .rev()
            .find(|layer| layer.get(dotted_key).is_some())
            .map(Layer::provenance)
    }

    /// Merged layers in merge order.
    pub fn sources(&self) -> &[Layer] {
        &self.sources
    }

    pub fn as_table(&self) -> &Table {
        &self.merged
    }

    /// Typed read-only view for the rest of the application.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Value::Table(self.merged.clone())
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::InvalidValue {
                key: "<merged>".into(),
                reason: e.to_string(),
            })
    }
}
