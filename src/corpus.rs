//! Corpus records and their normalization into embeddable text.
//!
//! Corpora in the wild use several names for the same field. Each logical
//! field is resolved through an ordered rule table; the first rule yielding a
//! non-empty value wins.

use crate::error::{ResonateError, Result};
use crate::vector_store::RecordMetadata;
use serde_json::{Map, Value};

/// Per-field character limit applied before embedding.
pub const MAX_EMBED_TEXT_CHARS: usize = 2000;

/// Per-field character limit applied to stored metadata.
pub const MAX_METADATA_CHARS: usize = 500;

/// Source tag for records that do not carry one.
pub const DEFAULT_SOURCE: &str = "unknown-source";

/// Appended to a field cut down for embedding.
const TRUNCATION_MARKER: &str = "...";

/// How a logical field is looked up in a JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// A top-level key.
    Key(&'static str),
    /// An element of a top-level array, e.g. `text[1]`.
    Index(&'static str, usize),
}

impl FieldRule {
    fn lookup<'a>(&self, object: &'a Map<String, Value>) -> Option<&'a Value> {
        match *self {
            FieldRule::Key(key) => object.get(key),
            FieldRule::Index(key, idx) => object.get(key)?.as_array()?.get(idx),
        }
    }
}

/// Identifier rules, highest priority first.
pub const ID_RULES: &[FieldRule] = &[FieldRule::Key("id"), FieldRule::Key("_id")];

/// Question rules, highest priority first.
pub const QUESTION_RULES: &[FieldRule] = &[
    FieldRule::Index("text", 1),
    FieldRule::Key("question"),
    FieldRule::Key("prompt"),
];

/// Solution rules, highest priority first.
pub const SOLUTION_RULES: &[FieldRule] = &[
    FieldRule::Index("text", 2),
    FieldRule::Key("solution"),
    FieldRule::Key("answer"),
];

/// Source tag rules, highest priority first.
pub const SOURCE_RULES: &[FieldRule] = &[FieldRule::Key("source")];

/// Resolve a field through `rules`. Strings must be non-empty; numbers are
/// rendered in decimal. Anything else is skipped.
fn resolve(object: &Map<String, Value>, rules: &[FieldRule]) -> Option<String> {
    rules.iter().find_map(|rule| match rule.lookup(object)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// A single corpus entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Identifier carried by the record itself.
    pub id: Option<String>,
    pub question: String,
    pub solution: String,
    pub source: Option<String>,
}

impl Record {
    /// Parse one line of newline-delimited JSON.
    ///
    /// `line_number` is only used for error reporting.
    pub fn parse_line(line: &str, line_number: usize) -> Result<Self> {
        let value: Value = serde_json::from_str(line).map_err(|e| ResonateError::Parse {
            line: line_number,
            message: e.to_string(),
        })?;

        match value {
            Value::Object(object) => Ok(Self::from_object(&object)),
            other => Err(ResonateError::Parse {
                line: line_number,
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    /// Resolve all fields of a JSON object.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            id: resolve(object, ID_RULES),
            question: resolve(object, QUESTION_RULES).unwrap_or_default(),
            solution: resolve(object, SOLUTION_RULES).unwrap_or_default(),
            source: resolve(object, SOURCE_RULES),
        }
    }

    /// Text submitted to the embedding model.
    pub fn embedding_text(&self, limits: &TextLimits) -> String {
        format!(
            "QUESTION: {}\nSOLUTION: {}",
            truncate_with_marker(&self.question, limits.embed_chars),
            truncate_with_marker(&self.solution, limits.embed_chars),
        )
    }

    /// Metadata stored next to the vector.
    ///
    /// The limits here are independent of the embedding limits, so stored
    /// text can be shorter than what was embedded.
    pub fn metadata(&self, limits: &TextLimits, default_source: &str) -> RecordMetadata {
        RecordMetadata {
            question: truncate_chars(&self.question, limits.metadata_chars).to_string(),
            solution: truncate_chars(&self.solution, limits.metadata_chars).to_string(),
            source: self
                .source
                .clone()
                .unwrap_or_else(|| default_source.to_string()),
        }
    }

    /// The vector id: the record's own id, or `rec-{position}` where position
    /// is the zero-based index of the record across the whole corpus.
    pub fn vector_id(&self, position: usize) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("rec-{}", position))
    }
}

/// Truncation limits for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLimits {
    pub embed_chars: usize,
    pub metadata_chars: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            embed_chars: MAX_EMBED_TEXT_CHARS,
            metadata_chars: MAX_METADATA_CHARS,
        }
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{}{}", cut, TRUNCATION_MARKER)
    } else {
        cut.to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
