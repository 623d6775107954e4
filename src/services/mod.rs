pub mod cache;
pub mod extractors;
pub mod fetch;
pub mod orchestrator;
pub mod parser;
pub mod pipeline;
pub mod resolver;

pub use cache::ResponseCache;
pub use extractors::{ExtractionLayer, MixesDbExtractor, RawCitation, RawSetlist, SetlistFmExtractor, SiteExtractor};
pub use orchestrator::Orchestrator;
pub use parser::{parse_citation, ParsedCitation};
pub use pipeline::{derive_flags_from_title, enrich_genre, snap_genre, Batcher, PersistenceStage};
pub use resolver::Resolver;
