//! Shared types, error model, and configuration for kexplain.
//!
//! This crate is the foundation depended on by all other kexplain crates.
//! It provides:
//! - [`ExplainError`] and [`StructuralError`] — the error model
//! - Domain types ([`ExplanationNode`], [`FieldWarning`], [`ResourceFailure`])
//! - Configuration ([`AppConfig`], [`ExplainConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ExplainConfig, ExplainSettings, FailurePolicy, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ExplainError, Result, StructuralError, snippet};
pub use types::{
    ExplanationNode, FieldWarning, RESOURCE_KIND, ResourceFailure, is_scalar_kind, sort_by_name,
};
