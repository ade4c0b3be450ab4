//! Conf module: configuration model, loading, and per-source multiline resolution.

pub mod model;
pub mod load;
pub mod group;

pub use model::{
    AgentConfig, BoundaryMode, EmptyLinePolicy, MetricsConfig, MultilineConfig,
    SourceMultilineConfig,
};
