//! Schema sources: where raw `explain` documents come from.
//!
//! The engine only sees [`SchemaSource`]; [`KubectlSource`] is the production
//! implementation that shells out to `kubectl explain`.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use kexplain_parser::non_blank_lines;
use kexplain_shared::{ExplainError, Result};

/// Answers schema queries by fully-qualified name.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Fetch the raw schema document for `full_name`.
    ///
    /// With `recursive`, the document lists the full nested field structure;
    /// without it, only the field's own description.
    async fn query(&self, full_name: &str, recursive: bool) -> Result<String>;
}

/// Runs `kubectl explain` as a child process per query.
#[derive(Debug, Clone)]
pub struct KubectlSource {
    program: String,
    context: Option<String>,
}

impl KubectlSource {
    /// Create a source invoking `program` (usually `kubectl`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            context: None,
        }
    }

    /// Pin every query to a kubectl context.
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// Arguments passed to the program for one query.
    fn args(&self, full_name: &str, recursive: bool) -> Vec<String> {
        let mut args = vec!["explain".to_string(), full_name.to_string()];
        if recursive {
            args.push("--recursive".to_string());
        }
        if let Some(context) = &self.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }
        args
    }
}

#[async_trait]
impl SchemaSource for KubectlSource {
    async fn query(&self, full_name: &str, recursive: bool) -> Result<String> {
        let args = self.args(full_name, recursive);
        trace!(program = %self.program, ?args, "running explain query");

        // Dropping the future (e.g. on timeout) kills the child.
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ExplainError::query(
                    full_name,
                    format!("failed to run `{}`: {e}. Is it installed?", self.program),
                )
            })?;

        if !output.status.success() {
            return Err(ExplainError::query(
                full_name,
                format!(
                    "{} ({})",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(non_blank_lines(&stdout).collect::<Vec<_>>().join("\n"))
    }
}
