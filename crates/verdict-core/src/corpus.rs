use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ExtractionOutcome;

/// One document handed to the topic-modelling stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub id: String,
    pub text: String,
}

impl CorpusRecord {
    /// Flatten the named fields of an extraction into plain text.
    ///
    /// String fields contribute themselves, element lists contribute each
    /// item's `text`. Whitespace is collapsed per piece and pieces are
    /// joined by blank lines. Returns `None` for failed or empty outcomes.
    pub fn from_outcome(
        id: impl Into<String>,
        outcome: &ExtractionOutcome,
        fields: &[&str],
    ) -> Option<Self> {
        let map = outcome.fields()?;
        let pieces: Vec<String> = fields
            .iter()
            .filter_map(|name| map.get(*name))
            .flat_map(field_texts)
            .map(|text| collapse_whitespace(&text))
            .filter(|text| !text.is_empty())
            .collect();

        if pieces.is_empty() {
            return None;
        }
        Some(Self {
            id: id.into(),
            text: pieces.join("\n\n"),
        })
    }
}

fn field_texts(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => vec![text.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.clone()),
                Value::Object(obj) => obj.get("text").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
