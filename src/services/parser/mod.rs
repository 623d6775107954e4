pub mod citation_parser;

pub use citation_parser::{parse_citation, ParsedCitation};
