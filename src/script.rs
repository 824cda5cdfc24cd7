//! Config scripts: the assignment subset of a `.py` config file.
//!
//! A script is read line by line, never executed. Supported statements:
//!
//! ```text
//! # comment
//! c = get_config()
//! c.BaseConfig.data_dir = '~/exports'
//! c.BaseConfig.contact_limit = 100
//! c.FilterConfig.states = None        # unset
//! import os                           # ignored
//! ```
//!
//! Values are Python literals: quoted strings, integers, floats, `True`,
//! `False`, `None` and lists of those. Anything else is rejected with the
//! line it occurs on.

use std::path::Path;

use toml::{Table, Value};

use crate::error::ConfigError;
use crate::overrides::set_nested;

/// Name the config object is bound to unless the script rebinds it.
const DEFAULT_CONFIG_NAME: &str = "c";

/// Parse a config script into a nested table.
pub fn parse_script(content: &str, path: &Path) -> Result<Table, ConfigError> {
    let mut table = Table::new();
    let mut config_name = DEFAULT_CONFIG_NAME.to_string();

    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let error = |reason: String| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: line_no,
            reason,
        };

        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || is_import(line) {
            continue;
        }

        let Some((target, expr)) = line.split_once('=') else {
            return Err(error(format!("unsupported statement '{line}'")));
        };
        let target = target.trim();
        let expr = expr.trim();

        if is_identifier(target) {
            if strip_comment(expr) == "get_config()" {
                config_name = target.to_string();
                continue;
            }
            return Err(error(format!(
                "only `{config_name}.<Section>.<field> = <value>` assignments are supported"
            )));
        }

        let mut parts = target.split('.').map(str::trim);
        let (Some(object), Some(section), Some(field), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(error(format!(
                "assignment target '{target}' must look like {config_name}.<Section>.<field>"
            )));
        };
        if object != config_name {
            return Err(error(format!("'{object}' is not the config object")));
        }
        if !is_identifier(section) || !is_identifier(field) {
            return Err(error(format!("invalid assignment target '{target}'")));
        }

        match parse_literal(expr).map_err(error)? {
            Some(value) => set_nested(&mut table, &format!("{section}.{field}"), value),
            None => unset(&mut table, section, field),
        }
    }

    Ok(table)
}

fn is_import(line: &str) -> bool {
    line.starts_with("import ") || (line.starts_with("from ") && line.contains(" import "))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Drop a trailing comment from an expression without quotes in it.
fn strip_comment(expr: &str) -> &str {
    expr.split('#').next().unwrap_or_default().trim()
}

fn unset(table: &mut Table, section: &str, field: &str) {
    if let Some(Value::Table(inner)) = table.get_mut(section) {
        inner.remove(field);
    }
}

/// Parse one literal expression. `None` maps to `Ok(None)`.
fn parse_literal(expr: &str) -> Result<Option<Value>, String> {
    let mut parser = LiteralParser { src: expr, pos: 0 };
    let value = parser.value()?;
    parser.skip_ws();
    match parser.peek() {
        None | Some('#') => Ok(value),
        Some(_) => Err(format!("unexpected text after value: '{}'", parser.rest())),
    }
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn value(&mut self) -> Result<Option<Value>, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("missing value".into()),
            Some(quote @ ('\'' | '"')) => self.string(quote).map(Some),
            Some(open @ ('[' | '(')) => self.list(open).map(Some),
            Some(_) => self.word(),
        }
    }

    fn string(&mut self, quote: char) -> Result<Value, String> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string".into()),
                Some(c) if c == quote => return Ok(Value::String(out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err("unterminated string".into()),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn list(&mut self, open: char) -> Result<Value, String> {
        let close = if open == '[' { ']' } else { ')' };
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(Value::Array(items));
            }
            match self.value()? {
                Some(item) => items.push(item),
                None => return Err("None is not allowed inside a list".into()),
            }
            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some(c) if c == close => return Ok(Value::Array(items)),
                Some(c) => return Err(format!("expected ',' or '{close}', got '{c}'")),
                None => return Err(format!("unterminated list, expected '{close}'")),
            }
        }
    }

    fn word(&mut self) -> Result<Option<Value>, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'))
        {
            self.bump();
        }
        let word = &self.src[start..self.pos];
        match word {
            "None" => return Ok(None),
            "True" => return Ok(Some(Value::Boolean(true))),
            "False" => return Ok(Some(Value::Boolean(false))),
            _ => {}
        }
        let digits = word.replace('_', "");
        if let Ok(i) = digits.parse::<i64>() {
            return Ok(Some(Value::Integer(i)));
        }
        if digits.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '.' | '+' | '-'))
            && let Ok(f) = digits.parse::<f64>()
        {
            return Ok(Some(Value::Float(f)));
        }
        let shown = if word.is_empty() { self.rest() } else { word };
        Err(format!("unsupported expression '{shown}'"))
    }
}
