//! Bracketed key-value text documents
//!
//! The package manager stores install manifests (`.acf`) and other metadata
//! in a line-oriented text format:
//!
//! ```text
//! "AppState"
//! {
//!     "appid"     "346110"
//!     "buildid"   "4862417"
//! }
//! ```
//!
//! A line holding two or more tokens is a `key value` entry. A lone token
//! names the next section, which is opened by a line holding only `{` and
//! closed by a line holding only `}`. Quotes around tokens are optional and
//! removed. Parsing stops at the first blank line.
//!
//! # Example
//!
//! ```
//! use purlovia_formats::keyvalue;
//!
//! let doc = keyvalue::parse("\"AppState\"\n{\n\t\"buildid\"\t\"42\"\n}\n").expect("parse");
//! assert_eq!(doc.get_path(&["AppState", "buildid"]).and_then(|v| v.as_str()), Some("42"));
//! ```

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

/// Errors raised while parsing a key-value document
#[derive(Debug, Error)]
pub enum KeyValueError {
    /// `{` appeared without a preceding section name
    #[error("line {line}: section opened without a name")]
    MissingSectionName {
        /// One-based line number
        line: usize,
    },

    /// `}` appeared with no open section
    #[error("line {line}: closing brace without an open section")]
    UnbalancedClose {
        /// One-based line number
        line: usize,
    },

    /// The document ended with a section still open
    #[error("section {0:?} is never closed")]
    UnclosedSection(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for key-value parsing
pub type KeyValueResult<T> = Result<T, KeyValueError>;

/// A value in a key-value document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    /// Plain string value
    Value(String),
    /// Nested section
    Section(KeyValueDocument),
}

impl KeyValue {
    /// The string value, if this is not a section
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(value) => Some(value),
            Self::Section(_) => None,
        }
    }

    /// The nested section, if this is one
    pub fn as_section(&self) -> Option<&KeyValueDocument> {
        match self {
            Self::Value(_) => None,
            Self::Section(section) => Some(section),
        }
    }
}

/// Ordered mapping of keys to values or nested sections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyValueDocument {
    entries: IndexMap<String, KeyValue>,
}

impl KeyValueDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry, keeping the original position of an
    /// existing key
    pub fn insert(&mut self, key: impl Into<String>, value: KeyValue) {
        self.entries.insert(key.into(), value);
    }

    /// Look up a direct child
    pub fn get(&self, key: &str) -> Option<&KeyValue> {
        self.entries.get(key)
    }

    /// Look up a string value directly under this section
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(KeyValue::as_str)
    }

    /// Look up a nested section directly under this section
    pub fn section(&self, key: &str) -> Option<&Self> {
        self.get(key).and_then(KeyValue::as_section)
    }

    /// Follow a chain of section names and return the final value
    pub fn get_path(&self, path: &[&str]) -> Option<&KeyValue> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for key in parents {
            current = current.section(key)?;
        }
        current.get(last)
    }

    /// Iterate entries in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of direct entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the document has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "\t".repeat(depth);
        for (key, value) in &self.entries {
            match value {
                KeyValue::Value(v) => writeln!(f, "{indent}\"{key}\"\t\t\"{v}\"")?,
                KeyValue::Section(section) => {
                    writeln!(f, "{indent}\"{key}\"")?;
                    writeln!(f, "{indent}{{")?;
                    section.write_indented(f, depth + 1)?;
                    writeln!(f, "{indent}}}")?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for KeyValueDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// Parse a document from text
pub fn parse(text: &str) -> KeyValueResult<KeyValueDocument> {
    let mut root = KeyValueDocument::new();
    let mut open: Vec<(String, KeyValueDocument)> = Vec::new();
    let mut pending: Option<String> = None;

    for (number, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            trace!(line = number + 1, "Blank line ends key-value document");
            break;
        }

        match line {
            "{" => {
                let name = pending
                    .take()
                    .ok_or(KeyValueError::MissingSectionName { line: number + 1 })?;
                open.push((name, KeyValueDocument::new()));
            }
            "}" => {
                let (name, section) = open
                    .pop()
                    .ok_or(KeyValueError::UnbalancedClose { line: number + 1 })?;
                let parent = open.last_mut().map_or(&mut root, |(_, doc)| doc);
                parent.insert(name, KeyValue::Section(section));
            }
            _ => {
                let mut tokens = tokenize(line);
                if tokens.len() >= 2 {
                    let key = tokens.remove(0);
                    let value = tokens.join(" ");
                    let current = open.last_mut().map_or(&mut root, |(_, doc)| doc);
                    current.insert(key, KeyValue::Value(value));
                } else {
                    pending = tokens.pop();
                }
            }
        }
    }

    if let Some((name, _)) = open.pop() {
        return Err(KeyValueError::UnclosedSection(name));
    }

    Ok(root)
}

/// Read and parse a document from disk
pub fn read_file(path: impl AsRef<Path>) -> KeyValueResult<KeyValueDocument> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

/// Split a line into tokens. Quoted tokens may contain whitespace; quote
/// characters never survive into a token.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut token = String::new();
        if c == '"' {
            chars.next();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                token.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                if c != '"' {
                    token.push(c);
                }
                chars.next();
            }
        }
        tokens.push(token);
    }

    tokens
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value(s: &str) -> KeyValue {
        KeyValue::Value(s.to_string())
    }

    #[test]
    fn test_nested_sections() {
        let text = "\"Root\"\n{\n    \"A\"    \"1\"\n    \"Child\"\n    {\n        \"B\"    \"2\"\n    }\n}\n";
        let doc = parse(text).expect("Document should parse");

        let mut child = KeyValueDocument::new();
        child.insert("B", value("2"));
        let mut root = KeyValueDocument::new();
        root.insert("A", value("1"));
        root.insert("Child", KeyValue::Section(child));
        let mut expected = KeyValueDocument::new();
        expected.insert("Root", KeyValue::Section(root));

        assert_eq!(doc, expected);
        assert_eq!(
            serde_json::to_string(&doc).unwrap(),
            r#"{"Root":{"A":"1","Child":{"B":"2"}}}"#
        );
    }

    #[test]
    fn test_blank_line_stops_parsing() {
        let doc = parse("\"a\" \"1\"\n\n\"b\" \"2\"\n").unwrap();
        assert_eq!(doc.get_str("a"), Some("1"));
        assert_eq!(doc.get("b"), None);
    }

    #[test]
    fn test_quoted_values_keep_spaces() {
        let doc = parse("\"name\"\t\t\"Scorched Earth\"\nbare   token value\n").unwrap();
        assert_eq!(doc.get_str("name"), Some("Scorched Earth"));
        assert_eq!(doc.get_str("bare"), Some("token value"));
    }

    #[test]
    fn test_entry_order_is_preserved() {
        let doc = parse("\"z\" \"1\"\n\"a\" \"2\"\n\"m\" \"3\"\n").unwrap();
        let keys: Vec<_> = doc.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_duplicate_key_overwrites() {
        let doc = parse("\"k\" \"1\"\n\"k\" \"2\"\n").unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get_str("k"), Some("2"));
    }

    #[test]
    fn test_unbalanced_close() {
        let err = parse("\"a\" \"1\"\n}\n").expect_err("Stray brace should fail");
        assert!(matches!(err, KeyValueError::UnbalancedClose { line: 2 }));
    }

    #[test]
    fn test_unclosed_section() {
        let err = parse("\"Root\"\n{\n\"a\" \"1\"\n").expect_err("Open section should fail");
        assert!(matches!(err, KeyValueError::UnclosedSection(name) if name == "Root"));
    }

    #[test]
    fn test_open_without_name() {
        let err = parse("{\n}\n").expect_err("Anonymous section should fail");
        assert!(matches!(err, KeyValueError::MissingSectionName { line: 1 }));
    }

    #[test]
    fn test_display_reparses() {
        let text = "\"AppState\"\n{\n\"appid\" \"346110\"\n\"InstalledDepots\"\n{\n\"346111\"\n{\n\"manifest\" \"123\"\n}\n}\n}\n";
        let doc = parse(text).unwrap();
        assert_eq!(parse(&doc.to_string()).unwrap(), doc);
        assert_eq!(
            doc.get_path(&["AppState", "InstalledDepots", "346111", "manifest"])
                .and_then(KeyValue::as_str),
            Some("123")
        );
        assert_eq!(doc.get_path(&[]), None);
        assert_eq!(doc.get_path(&["AppState", "appid", "deeper"]), None);
    }
}
