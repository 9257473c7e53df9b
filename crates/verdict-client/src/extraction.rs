//! Declarative extraction configuration.
//!
//! An [`ExtractionConfig`] maps field names to [`FieldSpec`]s. Every
//! strategy except `custom` is plain data and round-trips through JSON;
//! `custom` holds a [`CustomExtractor`] that can only be attached in code.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use verdict_core::error::AppError;

use crate::document::Document;

/// Extraction strategy of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Every match as an element record.
    #[default]
    Elements,
    /// Trimmed text of the first match.
    Text,
    /// An attribute of the first match.
    Attribute,
    /// First capture (or whole match) of a pattern over the first match's text.
    Regex,
    /// Arbitrary code run against the whole document.
    Custom,
}

/// Programmatic extraction hook for `custom` fields.
pub trait CustomExtractor: Send + Sync {
    fn extract(&self, document: &Document) -> Result<Value, AppError>;
}

impl<F> CustomExtractor for F
where
    F: Fn(&Document) -> Result<Value, AppError> + Send + Sync,
{
    fn extract(&self, document: &Document) -> Result<Value, AppError> {
        self(document)
    }
}

/// How to extract a single field.
///
/// Missing required settings (e.g. a `regex` field without `pattern`) make
/// the field silently absent from the result.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Attributes copied onto each record of an `elements` field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip)]
    pub function: Option<Arc<dyn CustomExtractor>>,
}

impl FieldSpec {
    pub fn elements(selector: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Elements,
            selector: Some(selector.into()),
            ..Self::default()
        }
    }

    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Text,
            selector: Some(selector.into()),
            ..Self::default()
        }
    }

    pub fn attribute(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Attribute,
            selector: Some(selector.into()),
            attribute: Some(attribute.into()),
            ..Self::default()
        }
    }

    pub fn regex(selector: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Regex,
            selector: Some(selector.into()),
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn custom(function: impl CustomExtractor + 'static) -> Self {
        Self {
            kind: FieldKind::Custom,
            function: Some(Arc::new(function)),
            ..Self::default()
        }
    }

    /// Attributes to copy onto each element record.
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn selector(&self) -> Option<&str> {
        non_empty(&self.selector)
    }

    pub(crate) fn attribute_name(&self) -> Option<&str> {
        non_empty(&self.attribute)
    }

    pub(crate) fn pattern(&self) -> Option<&str> {
        non_empty(&self.pattern)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("kind", &self.kind)
            .field("selector", &self.selector)
            .field("attributes", &self.attributes)
            .field("attribute", &self.attribute)
            .field("pattern", &self.pattern)
            .field("function", &self.function.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

/// Ordered set of named fields to extract from a document.
#[derive(Debug, Clone, Default)]
pub struct ExtractionConfig {
    fields: Vec<(String, FieldSpec)>,
}

impl ExtractionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.insert(name, spec);
        self
    }

    /// Add a field. Re-inserting a name replaces its spec but keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, spec: FieldSpec) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = spec,
            None => self.fields.push((name, spec)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, spec)| spec)
    }

    /// Fields in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a config from a JSON object of `name -> spec`.
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        let Value::Object(map) = value else {
            return Err(AppError::ConfigError(
                "Extraction config must be a JSON object".into(),
            ));
        };
        let mut config = Self::new();
        for (name, spec) in map {
            let spec: FieldSpec = serde_json::from_value(spec)
                .map_err(|e| AppError::ConfigError(format!("Invalid field '{name}': {e}")))?;
            config.insert(name, spec);
        }
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to read extraction config {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }
}

impl Serialize for ExtractionConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, spec) in &self.fields {
            map.serialize_entry(name, spec)?;
        }
        map.end()
    }
}
