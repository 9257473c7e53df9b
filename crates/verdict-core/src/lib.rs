pub mod config;
pub mod corpus;
pub mod error;
pub mod events;
pub mod fetch;
pub mod filters;
pub mod models;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::FetchConfig;
pub use corpus::CorpusRecord;
pub use error::{AppError, FailureKind};
pub use events::{ScrapeEvent, ScrapeReporter, SilentReporter, TracingReporter};
pub use fetch::RetryingFetcher;
pub use models::{
    CaseInfo, CaseListing, ExtractedElement, ExtractionOutcome, ExternalLink, FetchOutcome,
    FetchedPage, RawResponse, RetryPolicy,
};
pub use traits::{PageFetcher, Transport};
