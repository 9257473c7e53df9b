use regex::Regex;
use scraper::ElementRef;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;
use verdict_core::error::AppError;
use verdict_core::events::{ScrapeEvent, ScrapeReporter};
use verdict_core::models::{ExtractedElement, ExtractionOutcome, RetryPolicy};
use verdict_core::traits::PageFetcher;

use crate::document::{Document, DocumentParser, ParserMode};
use crate::extraction::{ExtractionConfig, FieldKind, FieldSpec};

/// Link prefixes returned as-is instead of being resolved against the page.
const PASSTHROUGH_PREFIXES: [&str; 4] = ["http://", "https://", "mailto:", "tel:"];

/// Which links to pull out of a document.
#[derive(Debug, Clone)]
pub struct LinkQuery {
    pub selector: String,
    pub attribute: String,
    /// Keep only links containing this substring.
    pub filter: Option<String>,
    pub keep_link_text: bool,
}

impl Default for LinkQuery {
    fn default() -> Self {
        Self {
            selector: "a".to_string(),
            attribute: "href".to_string(),
            filter: None,
            keep_link_text: false,
        }
    }
}

impl LinkQuery {
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_link_text(mut self) -> Self {
        self.keep_link_text = true;
        self
    }
}

/// A resolved link, with its text when the query asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedLink {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Resolve `href` against the page URL.
///
/// Absolute, `mailto:` and `tel:` links and empty values are returned unchanged.
pub fn resolve_link(base: &Url, href: &str) -> String {
    if href.is_empty() || PASSTHROUGH_PREFIXES.iter().any(|p| href.starts_with(p)) {
        return href.to_string();
    }
    base.join(href)
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

/// Concatenated text of an element, untrimmed.
pub fn raw_text(element: &ElementRef<'_>) -> String {
    element.text().collect()
}

/// Concatenated text of an element, trimmed.
pub fn element_text(element: &ElementRef<'_>) -> String {
    raw_text(element).trim().to_string()
}

/// Collect links from `document`. A missing document has no links.
pub fn extract_links(
    document: Option<&Document>,
    query: &LinkQuery,
) -> Result<Vec<ExtractedLink>, AppError> {
    let Some(document) = document else {
        return Ok(Vec::new());
    };

    let mut links = Vec::new();
    for element in document.select(&query.selector)? {
        let Some(href) = element.value().attr(&query.attribute) else {
            continue;
        };
        let url = resolve_link(document.url(), href);

        if query
            .filter
            .as_deref()
            .is_some_and(|filter| !url.contains(filter))
        {
            continue;
        }

        let text = query.keep_link_text.then(|| {
            let text = element_text(&element);
            if text.is_empty() { url.clone() } else { text }
        });
        links.push(ExtractedLink { url, text });
    }
    Ok(links)
}

/// Collect every non-empty element matching `selector`.
///
/// `location` is `<tag>-<index>` where the index counts all matches,
/// including the empty ones that are skipped.
pub fn extract_elements(
    document: &Document,
    selector: &str,
    extract_attrs: &[String],
) -> Result<Vec<ExtractedElement>, AppError> {
    let elements = document
        .select(selector)?
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| {
            let text = element_text(&element);
            if text.is_empty() {
                return None;
            }
            let tag = element.value().name();
            let mut item = ExtractedElement::new(text, tag, index);
            for attr in extract_attrs {
                if let Some(value) = element.value().attr(attr) {
                    item.attributes.insert(attr.clone(), value.to_string());
                }
            }
            Some(item)
        })
        .collect();
    Ok(elements)
}

/// Run every field of `config` against `document`, in config order.
///
/// Any failure aborts the whole run; fields with missing settings or no
/// match are left out.
pub fn apply_config(
    document: &Document,
    config: &ExtractionConfig,
) -> Result<Map<String, Value>, AppError> {
    let mut result = Map::new();
    for (name, spec) in config.iter() {
        if let Some(value) = extract_field(document, spec)? {
            result.insert(name.to_string(), value);
        }
    }
    Ok(result)
}

fn extract_field(document: &Document, spec: &FieldSpec) -> Result<Option<Value>, AppError> {
    let value = match spec.kind {
        FieldKind::Elements => {
            let Some(selector) = spec.selector() else {
                return Ok(None);
            };
            let elements = extract_elements(document, selector, &spec.attributes)?;
            Some(serde_json::to_value(elements)?)
        }
        FieldKind::Text => {
            let Some(selector) = spec.selector() else {
                return Ok(None);
            };
            document
                .select_first(selector)?
                .map(|element| Value::String(element_text(&element)))
        }
        FieldKind::Attribute => {
            let (Some(selector), Some(attribute)) = (spec.selector(), spec.attribute_name()) else {
                return Ok(None);
            };
            document
                .select_first(selector)?
                .and_then(|element| element.value().attr(attribute).map(str::to_string))
                .map(Value::String)
        }
        FieldKind::Regex => {
            let (Some(selector), Some(pattern)) = (spec.selector(), spec.pattern()) else {
                return Ok(None);
            };
            let regex = Regex::new(pattern).map_err(|e| {
                AppError::ExtractionError(format!("Invalid pattern '{pattern}': {e}"))
            })?;
            document.select_first(selector)?.and_then(|element| {
                let text = raw_text(&element);
                let captures = regex.captures(&text)?;
                let matched = if regex.captures_len() > 1 {
                    captures.get(1)
                } else {
                    captures.get(0)
                };
                Some(matched.map_or(Value::Null, |m| Value::String(m.as_str().to_string())))
            })
        }
        FieldKind::Custom => match &spec.function {
            Some(function) => Some(function.extract(document)?),
            None => None,
        },
    };
    Ok(value)
}

/// Fetches pages and runs extraction over them.
#[derive(Clone)]
pub struct Extractor<F, R> {
    parser: DocumentParser<F, R>,
    policy: RetryPolicy,
    mode: ParserMode,
}

impl<F, R> Extractor<F, R>
where
    F: PageFetcher,
    R: ScrapeReporter + Clone,
{
    pub fn new(fetcher: F, reporter: R) -> Self {
        Self {
            parser: DocumentParser::new(fetcher, reporter),
            policy: RetryPolicy::default(),
            mode: ParserMode::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_mode(mut self, mode: ParserMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch and parse `url` with this extractor's policy and parser mode.
    pub async fn document(&self, url: &str) -> Result<Option<Document>, AppError> {
        self.parser.parse(url, &self.policy, self.mode).await
    }

    /// Fetch `url` and collect its links. An unavailable page has no links.
    pub async fn links(&self, url: &str, query: &LinkQuery) -> Result<Vec<ExtractedLink>, AppError> {
        let document = self.document(url).await?;
        extract_links(document.as_ref(), query)
    }

    /// Fetch `url` and run `config` over it.
    ///
    /// Fetch errors are returned as `Err`. An unavailable page or any
    /// extraction failure becomes an error-shaped [`ExtractionOutcome`].
    pub async fn extract_structured_data(
        &self,
        url: &str,
        config: &ExtractionConfig,
    ) -> Result<ExtractionOutcome, AppError> {
        match self.document(url).await? {
            Some(document) => Ok(self.interpret(&document, config)),
            None => Ok(ExtractionOutcome::fetch_failed(url)),
        }
    }

    /// Run `config` over an already-parsed document.
    pub fn interpret(&self, document: &Document, config: &ExtractionConfig) -> ExtractionOutcome {
        self.guard(document, apply_config(document, config))
    }

    /// Convert a failed extraction into an error-shaped outcome, reporting it.
    pub(crate) fn guard(
        &self,
        document: &Document,
        result: Result<Map<String, Value>, AppError>,
    ) -> ExtractionOutcome {
        let url = document.requested_url();
        match result {
            Ok(fields) => ExtractionOutcome::Fields(fields),
            Err(error) => {
                self.parser
                    .reporter()
                    .report(ScrapeEvent::ExtractionFailed { url, error: &error });
                ExtractionOutcome::failed(error.to_string(), url)
            }
        }
    }
}
