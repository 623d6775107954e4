pub mod mixesdb;
pub mod setlistfm;
pub mod traits;

pub use mixesdb::MixesDbExtractor;
pub use setlistfm::SetlistFmExtractor;
pub use traits::{ExtractionLayer, RawCitation, RawSetlist, SiteExtractor};
