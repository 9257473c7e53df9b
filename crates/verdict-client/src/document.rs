use scraper::{ElementRef, Html, Selector};
use url::Url;
use verdict_core::error::AppError;
use verdict_core::events::{ScrapeEvent, ScrapeReporter};
use verdict_core::models::{FetchOutcome, RetryPolicy};
use verdict_core::traits::PageFetcher;

/// How the fetched body is turned into a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParserMode {
    /// Full HTML document; the tree builder adds `html`/`head`/`body` as needed.
    #[default]
    Document,
    /// Body-less fragment.
    Fragment,
}

/// Parse a CSS selector, mapping failures to [`AppError::SelectorError`].
pub fn parse_selector(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector).map_err(|e| AppError::SelectorError {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// A parsed HTML page together with the URL it was fetched from.
pub struct Document {
    url: Url,
    requested_url: String,
    html: Html,
}

impl Document {
    /// Parse `source` as the page found at `url`.
    pub fn from_html(url: &str, source: &str, mode: ParserMode) -> Result<Self, AppError> {
        let parsed = Url::parse(url)
            .map_err(|e| AppError::ParseError(format!("Invalid page URL '{url}': {e}")))?;
        let html = match mode {
            ParserMode::Document => Html::parse_document(source),
            ParserMode::Fragment => Html::parse_fragment(source),
        };
        Ok(Self {
            url: parsed,
            requested_url: url.to_string(),
            html,
        })
    }

    /// The page URL, used as the base for relative links.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL exactly as the caller passed it.
    pub fn requested_url(&self) -> &str {
        &self.requested_url
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// All elements matching `selector`, in document order.
    pub fn select(&self, selector: &str) -> Result<Vec<ElementRef<'_>>, AppError> {
        let selector = parse_selector(selector)?;
        Ok(self.html.select(&selector).collect())
    }

    /// First element matching `selector`.
    pub fn select_first(&self, selector: &str) -> Result<Option<ElementRef<'_>>, AppError> {
        let selector = parse_selector(selector)?;
        Ok(self.html.select(&selector).next())
    }

    /// True if the tree has a `<body>` with content.
    ///
    /// The HTML5 tree builder synthesizes an empty `<body>` for documents
    /// that lack one, so an empty body counts as missing.
    pub fn has_body(&self) -> bool {
        Selector::parse("body")
            .ok()
            .and_then(|body| self.html.select(&body).next())
            .is_some_and(|body| body.has_children())
    }
}

/// Fetches a URL and parses the body into a [`Document`].
///
/// Fetch exhaustion and unparseable pages yield `Ok(None)`; errors raised
/// by the fetcher propagate unchanged.
#[derive(Clone)]
pub struct DocumentParser<F, R> {
    fetcher: F,
    reporter: R,
}

impl<F, R> DocumentParser<F, R>
where
    F: PageFetcher,
    R: ScrapeReporter + Clone,
{
    pub fn new(fetcher: F, reporter: R) -> Self {
        Self { fetcher, reporter }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub async fn parse(
        &self,
        url: &str,
        policy: &RetryPolicy,
        mode: ParserMode,
    ) -> Result<Option<Document>, AppError> {
        let page = match self.fetcher.fetch(url, policy).await? {
            FetchOutcome::Success(page) => page,
            FetchOutcome::RetriesExhausted { .. } => return Ok(None),
        };

        match Document::from_html(url, &page.body, mode) {
            Ok(document) => {
                if !document.has_body() {
                    self.reporter.report(ScrapeEvent::MissingBody { url });
                }
                self.reporter.report(ScrapeEvent::DocumentParsed { url });
                Ok(Some(document))
            }
            Err(error) => {
                self.reporter
                    .report(ScrapeEvent::ParseFailed { url, error: &error });
                Ok(None)
            }
        }
    }
}
