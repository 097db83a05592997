//! Feature pipeline orchestration

pub mod runner;

pub use runner::FeaturePipeline;
