//! Multi-line record assembly.
//!
//! - `timestamp.rs`: anchored timestamp detection
//! - `first_line.rs`: ordered first-line rule table
//! - `accumulator.rs`: per-source record state machine

pub mod accumulator;
pub mod first_line;
pub mod timestamp;

pub use accumulator::RecordAccumulator;
pub use first_line::{is_first_line, matching_rule, LineKind, FIRST_LINE_RULES};
pub use timestamp::{contains_timestamp, TimestampDetector, TimestampPattern};
