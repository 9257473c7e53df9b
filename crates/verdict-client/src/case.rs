//! Court case pages and per-year case listings.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use verdict_core::error::AppError;
use verdict_core::events::ScrapeReporter;
use verdict_core::filters::{filter_case_text, filter_opinions};
use verdict_core::models::{
    CaseInfo, CaseListing, ExtractedElement, ExtractionOutcome, ExternalLink,
};
use verdict_core::traits::PageFetcher;

use crate::document::{Document, parse_selector};
use crate::extraction::{CustomExtractor, ExtractionConfig, FieldSpec};
use crate::extractor::{Extractor, apply_config, element_text, resolve_link};

const HEADING_SELECTOR: &str = "h2, strong, span";
const DATE_SELECTOR: &str = "h2, p, div.content";
const LINKS_CONTAINER_SELECTOR: &str = "div.search-case";

const HEADER_TEXT_SELECTOR: &str = "h2, strong.heading, span.headertext";
const CASE_TEXT_SELECTOR: &str = "div.content p, div.text-left p, div.block p";
const OPINIONS_SELECTOR: &str = r#"div[id^="tab-opinion-"] p, div.opinion p"#;
const FOOTNOTES_SELECTOR: &str = r#"p a[name^="F"], p a[name*="foot"]"#;

const COURT_MARKER: &str = "Supreme Court";
const TITLE_SEPARATOR: &str = " v. ";

const CASE_PATH: &str = "/us-supreme-court/";
const EXCLUDED_PATHS: [&str; 2] = ["/years/", "/court/"];

static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s+U\.S\.\s+\d+\s+\(\d+\)").expect("valid citation regex"));

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4}\b",
    )
    .expect("valid date regex")
});

/// The fixed field set of a case page.
pub fn case_config() -> ExtractionConfig {
    ExtractionConfig::new()
        .field("case_info", FieldSpec::custom(CaseInfoExtractor))
        .field("header_text", FieldSpec::elements(HEADER_TEXT_SELECTOR))
        .field("case_text", FieldSpec::elements(CASE_TEXT_SELECTOR))
        .field("opinions", FieldSpec::elements(OPINIONS_SELECTOR))
        .field("footnotes", FieldSpec::elements(FOOTNOTES_SELECTOR))
}

/// `custom` field producing [`CaseInfo`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInfoExtractor;

impl CustomExtractor for CaseInfoExtractor {
    fn extract(&self, document: &Document) -> Result<Value, AppError> {
        Ok(serde_json::to_value(extract_case_info(document)?)?)
    }
}

/// Pull court, title, citation, date and citation links out of a case page.
///
/// A later matching heading overwrites an earlier one. The date is the
/// first long-form date found in document order. Every anchor in the
/// links container is kept, including ones without text.
pub fn extract_case_info(document: &Document) -> Result<CaseInfo, AppError> {
    let mut info = CaseInfo::default();

    for heading in document.select(HEADING_SELECTOR)? {
        let text = element_text(&heading);
        if text.contains(COURT_MARKER) {
            info.court = Some(text);
        } else if text.contains(TITLE_SEPARATOR) {
            if let Some(citation) = CITATION_RE.find(&text) {
                info.citation = Some(citation.as_str().to_string());
            }
            info.title = Some(text);
        }
    }

    for node in document.select(DATE_SELECTOR)? {
        let text = element_text(&node);
        if let Some(date) = DATE_RE.find(&text) {
            info.date = Some(date.as_str().to_string());
            break;
        }
    }

    if let Some(container) = document.select_first(LINKS_CONTAINER_SELECTOR)? {
        let anchor = parse_selector("a")?;
        info.external_links = container
            .select(&anchor)
            .map(|link| ExternalLink {
                text: element_text(&link),
                url: link.value().attr("href").unwrap_or_default().to_string(),
                title: link.value().attr("title").unwrap_or_default().to_string(),
            })
            .collect();
    }

    Ok(info)
}

/// Docket number from a case URL: the last path segment without `.html`,
/// reduced to digits and dashes. Dashes are kept so `18-1234` stays
/// distinct from `181-234`.
pub fn docket_from_url(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    let segment = segment.strip_suffix(".html").unwrap_or(segment);
    let docket: String = segment
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    (!docket.is_empty()).then_some(docket)
}

/// Case rows linked from a per-year listing page.
pub fn case_listings(document: &Document, year: i32) -> Result<Vec<CaseListing>, AppError> {
    let mut seen = HashSet::new();
    let mut listings = Vec::new();

    for anchor in document.select("a[href]")? {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.contains(CASE_PATH) || EXCLUDED_PATHS.iter().any(|p| href.contains(p)) {
            continue;
        }
        let Some(docket) = docket_from_url(href) else {
            continue;
        };
        let case_url = resolve_link(document.url(), href);
        if seen.insert(case_url.clone()) {
            listings.push(CaseListing {
                case_url,
                docket,
                year,
            });
        }
    }
    Ok(listings)
}

/// Replace a list field with its filtered form. Other shapes are left alone.
fn refine(
    fields: &mut Map<String, Value>,
    name: &str,
    filter: fn(&[ExtractedElement]) -> Vec<ExtractedElement>,
) -> Result<(), AppError> {
    let Some(value) = fields.get_mut(name).filter(|value| value.is_array()) else {
        return Ok(());
    };
    let items: Vec<ExtractedElement> = serde_json::from_value(value.take())?;
    *value = serde_json::to_value(filter(&items))?;
    Ok(())
}

/// Parses court case pages with the fixed case configuration.
#[derive(Clone)]
pub struct CaseParser<F, R> {
    extractor: Extractor<F, R>,
    config: ExtractionConfig,
}

impl<F, R> CaseParser<F, R>
where
    F: PageFetcher,
    R: ScrapeReporter + Clone,
{
    pub fn new(extractor: Extractor<F, R>) -> Self {
        Self {
            extractor,
            config: case_config(),
        }
    }

    pub fn extractor(&self) -> &Extractor<F, R> {
        &self.extractor
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Fetch a case page once and extract it.
    ///
    /// An unavailable page yields the fetch-failed outcome without running
    /// any field.
    pub async fn parse_case_page(&self, url: &str) -> Result<ExtractionOutcome, AppError> {
        match self.extractor.document(url).await? {
            Some(document) => Ok(self.parse_document(&document)),
            None => Ok(ExtractionOutcome::fetch_failed(url)),
        }
    }

    /// Extract an already-parsed case page, then filter its paragraph lists.
    pub fn parse_document(&self, document: &Document) -> ExtractionOutcome {
        let result = apply_config(document, &self.config).and_then(|mut fields| {
            refine(&mut fields, "case_text", filter_case_text)?;
            refine(&mut fields, "opinions", filter_opinions)?;
            Ok(fields)
        });
        self.extractor.guard(document, result)
    }

    /// Fetch a per-year listing page. An unavailable page lists nothing.
    pub async fn parse_year_index(&self, url: &str, year: i32) -> Result<Vec<CaseListing>, AppError> {
        match self.extractor.document(url).await? {
            Some(document) => case_listings(&document, year),
            None => Ok(Vec::new()),
        }
    }
}
