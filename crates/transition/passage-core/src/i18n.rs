//! Translation tables: language -> key -> string, with fallback to the
//! default language. Applying them to markup is the host's job.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PassageError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Translations {
    pub default_language: String,
    /// Keys are dot paths (`nav.home`) into the authored JSON.
    pub tables: HashMap<String, HashMap<String, String>>,
}

impl Translations {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
            tables: HashMap::new(),
        }
    }

    /// Parse `{ "<lang>": { ... }, ... }`. Nested objects flatten into dot
    /// keys, so `{"nav": {"home": "Home"}}` and `{"nav.home": "Home"}` are
    /// equivalent. Numbers and booleans are kept as text; other leaves are
    /// skipped.
    pub fn from_json(default_language: &str, text: &str) -> Result<Self> {
        let root: HashMap<String, Value> = serde_json::from_str(text)?;
        let mut tables = HashMap::with_capacity(root.len());
        for (language, value) in root {
            let Value::Object(_) = value else {
                return Err(PassageError::config(format!(
                    "translation table for {language} is not an object"
                )));
            };
            tables.insert(language, flatten(value));
        }
        if !tables.contains_key(default_language) {
            return Err(PassageError::config(format!(
                "translations have no table for default language {default_language}"
            )));
        }
        Ok(Self {
            default_language: default_language.to_string(),
            tables,
        })
    }

    pub fn insert(&mut self, language: &str, key: &str, text: &str) {
        self.tables
            .entry(language.to_string())
            .or_default()
            .insert(key.to_string(), text.to_string());
    }

    /// Text for `key` in `language`, falling back to the default language.
    pub fn lookup(&self, language: &str, key: &str) -> Option<&str> {
        self.tables
            .get(language)
            .and_then(|t| t.get(key))
            .or_else(|| {
                self.tables
                    .get(&self.default_language)
                    .and_then(|t| t.get(key))
            })
            .map(String::as_str)
    }

    /// Looked-up text with `{{name}}` placeholders filled from `params`.
    /// A missing key yields the key itself.
    pub fn translate(&self, language: &str, key: &str, params: &HashMap<String, String>) -> String {
        interpolate(self.lookup(language, key).unwrap_or(key), params)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

fn flatten(table: Value) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let mut stack = vec![(String::new(), table)];
    while let Some((prefix, value)) = stack.pop() {
        let text = match value {
            Value::Object(map) => {
                for (k, v) in map {
                    let key = if prefix.is_empty() {
                        k
                    } else {
                        format!("{prefix}.{k}")
                    };
                    stack.push((key, v));
                }
                continue;
            }
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) => continue,
        };
        out.insert(prefix, text);
    }
    out
}

/// Replace `{{name}}` (word characters only) with `params[name]`. Unknown
/// names and malformed braces are left verbatim.
pub fn interpolate(text: &str, params: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        let is_word = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        match params.get(name).filter(|_| is_word) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

/// Where a translated string lands on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationTarget {
    Placeholder,
    Alt,
    Text,
}

impl TranslationTarget {
    /// Form fields take the `placeholder`, images the `alt` text, anything
    /// else its text content.
    pub fn for_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("input") || tag.eq_ignore_ascii_case("textarea") {
            Self::Placeholder
        } else if tag.eq_ignore_ascii_case("img") {
            Self::Alt
        } else {
            Self::Text
        }
    }
}
