//! Convert dotted-key assignments into a nested `toml::Table` and read them back.
//!
//! Each `("BaseConfig.data_dir", Value)` pair is expanded into the nested table
//! structure needed for deep-merge with other config layers.

use toml::{Table, Value};

/// Convert dotted-key entries into a nested `toml::Table`.
///
/// `("LogConfig.log_dir", Value::String("/var/log"))` becomes
/// `{LogConfig = {log_dir = "/var/log"}}`.
///
/// If multiple entries target the same key, the last one wins.
pub fn overrides_to_table(entries: &[(String, Value)]) -> Table {
    let mut table = Table::new();
    for (dotted_key, value) in entries {
        set_nested(&mut table, dotted_key, value.clone());
    }
    table
}

/// Set `dotted_key` inside `table`, creating intermediate tables.
///
/// An intermediate key holding a scalar is replaced by a table.
pub fn set_nested(table: &mut Table, dotted_key: &str, value: Value) {
    let (path, leaf) = match dotted_key.rsplit_once('.') {
        Some((path, leaf)) => (Some(path), leaf),
        None => (None, dotted_key),
    };

    let mut current = table;
    for segment in path.into_iter().flat_map(|p| p.split('.')) {
        let entry = current
            .entry(segment)
            .or_insert_with(|| Value::Table(Table::new()));
        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }
        let Value::Table(next) = entry else {
            unreachable!("intermediate entry was just made a table");
        };
        current = next;
    }

    current.insert(leaf.to_string(), value);
}

/// Navigate a `toml::Table` by dotted key path (e.g. `"LogConfig.log_dir"`).
pub fn table_get<'a>(table: &'a Table, dotted_key: &str) -> Option<&'a Value> {
    let (path, leaf) = match dotted_key.rsplit_once('.') {
        Some((p, l)) => (Some(p), l),
        None => (None, dotted_key),
    };

    let tbl = match path {
        Some(path) => {
            let mut current = table;
            for segment in path.split('.') {
                current = current.get(segment)?.as_table()?;
            }
            current
        }
        None => table,
    };

    tbl.get(leaf)
}

/// All leaf values of a nested table as `(dotted key, value)` pairs.
pub fn leaves(table: &Table) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    collect_leaves(table, "", &mut out);
    out
}

fn collect_leaves<'a>(table: &'a Table, prefix: &str, out: &mut Vec<(String, &'a Value)>) {
    for (key, value) in table {
        let dotted = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Table(inner) => collect_leaves(inner, &dotted, out),
            leaf => out.push((dotted, leaf)),
        }
    }
}
