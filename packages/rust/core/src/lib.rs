//! Explanation engine for kexplain.
//!
//! This crate ties the parser to a [`SchemaSource`] and turns a list of
//! resource names into a fully enriched, deterministically ordered forest.

pub mod enrichment;
pub mod output;
pub mod pipeline;
pub mod source;

#[cfg(test)]
mod mock;

pub use enrichment::{Enriched, Enricher};
pub use output::{RunReport, load_resource_names, write_forest, write_report};
pub use pipeline::{ExplainReport, Explainer, ProgressReporter, SilentProgress};
pub use source::{KubectlSource, SchemaSource};
