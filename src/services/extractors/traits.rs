//! The `SiteExtractor` trait and the layered extraction strategy every
//! concrete extractor runs through: CSS selectors, then a DOM-rendered
//! fallback, then an LLM fallback. Modeled on `PlatformCatalogWorker`'s
//! trait-object-per-source registry shape.

use async_trait::async_trait;
use chrono::NaiveDate;

/// One raw track citation as it appeared on the source page, before the
/// citation parser runs on it.
#[derive(Debug, Clone)]
pub struct RawCitation {
    pub position: i32,
    pub text: String,
    pub timestamp_ms: Option<i64>,
}

/// The unparsed result of scraping a single set/performance page.
#[derive(Debug, Clone)]
pub struct RawSetlist {
    pub source_id: String,
    pub display_name: String,
    pub event_date: Option<NaiveDate>,
    pub venue: Option<String>,
    pub citations: Vec<RawCitation>,
    /// Set when extraction could not produce a tracklist; `citations` is
    /// empty in that case. Never left implicit — a zero-count tracklist with
    /// no reason is the silent-failure condition validation rejects.
    pub scrape_error: Option<String>,
}

impl RawSetlist {
    pub fn tracklist_count(&self) -> i32 {
        self.citations.len() as i32
    }
}

/// Which layer of the strategy produced (or failed to produce) a result, for
/// metrics labeling and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionLayer {
    Css,
    DomRendered,
    Llm,
}

impl ExtractionLayer {
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionLayer::Css => "css",
            ExtractionLayer::DomRendered => "dom_rendered",
            ExtractionLayer::Llm => "llm",
        }
    }
}

/// A concrete source's extraction logic. Each implementor declares its
/// source id and allowed hosts; `extract` is handed the already-fetched page
/// body (the fetcher owns rate-limiting and anti-detection) and attempts
/// each layer of the strategy in order, stopping at the first one that
/// yields a non-empty tracklist.
#[async_trait]
pub trait SiteExtractor: Send + Sync {
    fn source_id(&self) -> &'static str;
    fn allowed_hosts(&self) -> &'static [&'static str];

    /// CSS/selector-based extraction. Cheapest, tried first.
    fn extract_css(&self, url: &str, body: &str) -> Option<RawSetlist>;

    /// DOM-rendered fallback for pages whose tracklist is injected by
    /// client-side script the raw HTML never contains. Absent a headless
    /// render backend, implementors may return `None` unconditionally; the
    /// layer still runs so the strategy order stays uniform across sources.
    async fn extract_dom_rendered(&self, url: &str, body: &str) -> Option<RawSetlist>;

    /// LLM fallback for pages neither selector nor DOM-rendering could
    /// parse. Wiring a real model backend is an external-interface concern;
    /// the default always defers.
    async fn extract_llm(&self, _url: &str, _body: &str) -> Option<RawSetlist> {
        None
    }

    /// Runs the full layered strategy, returning the first non-empty
    /// result and which layer produced it, or a `RawSetlist` carrying a
    /// `scrape_error` when every layer came up empty.
    async fn extract(&self, url: &str, body: &str) -> (RawSetlist, ExtractionLayer) {
        if let Some(result) = self.extract_css(url, body) {
            if result.tracklist_count() > 0 {
                return (result, ExtractionLayer::Css);
            }
        }

        if let Some(result) = self.extract_dom_rendered(url, body).await {
            if result.tracklist_count() > 0 {
                return (result, ExtractionLayer::DomRendered);
            }
        }

        if let Some(result) = self.extract_llm(url, body).await {
            if result.tracklist_count() > 0 {
                return (result, ExtractionLayer::Llm);
            }
        }

        (
            RawSetlist {
                source_id: self.source_id().to_string(),
                display_name: url.to_string(),
                event_date: None,
                venue: None,
                citations: Vec::new(),
                scrape_error: Some("no layer produced a non-empty tracklist".to_string()),
            },
            ExtractionLayer::Llm,
        )
    }
}
