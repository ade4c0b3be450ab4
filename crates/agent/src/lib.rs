// Module structure for the logrecord agent.

// Core: record assembly and classification
pub mod model;
pub mod multiline;
pub mod classify;
pub mod metrics;

// Plumbing around the core
pub mod conf;
pub mod error;
pub mod service;
pub mod runtime;
