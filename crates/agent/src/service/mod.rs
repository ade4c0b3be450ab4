//! Service module: per-source pipelines, line sources, and the record writer.

pub mod pipeline;
pub mod source;
pub mod writer;

pub use pipeline::{run_source, RecordPipeline};
pub use source::LineSource;
pub use writer::write_records;
