pub mod case;
pub mod document;
pub mod extraction;
pub mod extractor;
pub mod transport;

pub use case::{CaseInfoExtractor, CaseParser, case_config};
pub use document::{Document, DocumentParser, ParserMode};
pub use extraction::{CustomExtractor, ExtractionConfig, FieldKind, FieldSpec};
pub use extractor::{ExtractedLink, Extractor, LinkQuery};
pub use transport::{HttpFetcher, ReqwestTransport};
