pub mod enrichment;
pub mod extractor;
pub mod metrics;
pub mod pipeline;
pub mod transformer;

pub use metrics::SyncMetrics;
pub use pipeline::{Pipeline, PipelineConfig};
