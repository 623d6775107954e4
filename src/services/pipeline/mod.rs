pub mod enrichment;
pub mod persistence;
pub mod validation;

pub use enrichment::{derive_flags_from_title, enrich_genre, snap_genre, CONTROLLED_GENRES};
pub use persistence::PersistenceStage;
pub use validation::validate;

use crate::metrics::MetricsCollector;
use crate::models::PipelineItem;
use std::time::Duration;

/// Batches an item stream by size or flush interval, whichever comes first.
/// Grounded on `rate_limiting.rs`'s `create_optimal_batches` shape, trimmed
/// to the single batching policy this pipeline needs.
pub struct Batcher {
    batch_size: usize,
    flush_interval: Duration,
    buffer: Vec<PipelineItem>,
    last_flush: std::time::Instant,
}

impl Batcher {
    pub fn new(batch_size: usize, flush_interval: Duration) -> Self {
        Self {
            batch_size,
            flush_interval,
            buffer: Vec::new(),
            last_flush: std::time::Instant::now(),
        }
    }

    /// Adds an item, returning a full batch to flush if the size threshold
    /// or the flush interval has been reached.
    pub fn push(&mut self, item: PipelineItem) -> Option<Vec<PipelineItem>> {
        self.buffer.push(item);
        self.maybe_take()
    }

    pub fn maybe_take(&mut self) -> Option<Vec<PipelineItem>> {
        let size_reached = self.buffer.len() >= self.batch_size;
        let time_reached = self.last_flush.elapsed() >= self.flush_interval;

        if (size_reached || time_reached) && !self.buffer.is_empty() {
            self.last_flush = std::time::Instant::now();
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }

    pub fn take_remainder(&mut self) -> Option<Vec<PipelineItem>> {
        if self.buffer.is_empty() {
            None
        } else {
            self.last_flush = std::time::Instant::now();
            Some(std::mem::take(&mut self.buffer))
        }
    }
}

/// Runs an item through validation, returning it ready for the batcher, or
/// `None` if it was dropped. Enrichment is applied by the caller per item
/// type (genre snap / flag derivation act on `Track` specifically) before
/// handing the item to this function, matching the three-stage ordering:
/// validation (100) -> enrichment (200) -> persistence (300).
pub fn validate_for_batch(item: PipelineItem, metrics: &MetricsCollector) -> Option<PipelineItem> {
    validate(item, metrics).ok()
}
