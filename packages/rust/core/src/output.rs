//! File boundaries: the resource name list going in, JSON coming out.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use kexplain_shared::{ExplainError, ExplanationNode, FieldWarning, ResourceFailure, Result};

use crate::pipeline::ExplainReport;

/// Read root resource names, one per line.
///
/// Lines are trimmed, blank lines dropped and duplicates removed (first
/// occurrence wins). An empty result is a configuration error.
pub fn load_resource_names(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| ExplainError::io(path, e))?;
    let names = parse_resource_names(&content);

    if names.is_empty() {
        return Err(ExplainError::config(format!(
            "no resource names found in {}",
            path.display()
        )));
    }

    debug!(?path, count = names.len(), "loaded resource names");
    Ok(names)
}

fn parse_resource_names(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Write the explained forest as a JSON array, creating parent directories.
pub fn write_forest(path: &Path, resources: &[ExplanationNode]) -> Result<()> {
    let json = serde_json::to_string(resources)
        .map_err(|e| ExplainError::Serialization(e.to_string()))?;
    write_file(path, json.as_bytes())?;
    info!(?path, resources = resources.len(), "wrote explanation forest");
    Ok(())
}

/// Serialized form of a run's failures and warnings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub resources_explained: usize,
    pub fields_explained: usize,
    pub failed_resources: &'a [ResourceFailure],
    pub field_warnings: &'a [FieldWarning],
}

impl<'a> From<&'a ExplainReport> for RunReport<'a> {
    fn from(report: &'a ExplainReport) -> Self {
        Self {
            generated_at: Utc::now(),
            elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            resources_explained: report.resources.len(),
            fields_explained: report.field_count(),
            failed_resources: &report.failures,
            field_warnings: &report.warnings,
        }
    }
}

/// Write the run report as pretty JSON.
pub fn write_report(path: &Path, report: &ExplainReport) -> Result<()> {
    let json = serde_json::to_string_pretty(&RunReport::from(report))
        .map_err(|e| ExplainError::Serialization(e.to_string()))?;
    write_file(path, json.as_bytes())?;
    info!(?path, "wrote run report");
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ExplainError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| ExplainError::io(path, e))
}
