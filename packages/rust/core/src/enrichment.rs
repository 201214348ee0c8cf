//! Concurrent field enrichment.
//!
//! Every field parsed out of a field-block gets its own single-field query
//! for its description, and non-scalar fields have their nested block
//! decomposed and enriched recursively. Siblings run as tasks in a [`JoinSet`]; a single
//! [`Semaphore`] shared by the whole run bounds how many external queries
//! are in flight at once, whatever the tree depth.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use kexplain_parser::{RawField, decompose, extract_field_description};
use kexplain_shared::{
    ExplainConfig, ExplainError, ExplanationNode, FailurePolicy, FieldWarning, Result,
    sort_by_name,
};

use crate::pipeline::ProgressReporter;
use crate::source::SchemaSource;

/// Boxed future returned by recursive enrichment.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Enriched siblings plus the warnings raised anywhere below them.
#[derive(Debug, Default)]
pub struct Enriched {
    /// Nodes sorted by name.
    pub nodes: Vec<ExplanationNode>,
    /// Fields whose description query failed (tolerant policy only).
    pub warnings: Vec<FieldWarning>,
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Issues bounded, timed-out queries and enriches field trees.
///
/// Cheap to clone; clones share the source, the query permits and the
/// progress reporter.
#[derive(Clone)]
pub struct Enricher {
    source: Arc<dyn SchemaSource>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    policy: FailurePolicy,
    progress: Arc<dyn ProgressReporter>,
}

impl Enricher {
    /// Create an enricher over `source`. The config must already be validated.
    pub fn new(
        source: Arc<dyn SchemaSource>,
        config: &ExplainConfig,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            source,
            permits: Arc::new(Semaphore::new(config.max_concurrent_queries)),
            timeout: config.query_timeout,
            policy: config.failure_policy,
            progress,
        }
    }

    pub(crate) fn progress(&self) -> &dyn ProgressReporter {
        self.progress.as_ref()
    }

    /// Run one external query under the shared permit pool and timeout.
    ///
    /// The permit is held only for the query itself, never across recursion.
    pub async fn query(&self, full_name: &str, recursive: bool) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ExplainError::query(full_name, "query pool closed"))?;

        match tokio::time::timeout(self.timeout, self.source.query(full_name, recursive)).await {
            Ok(result) => result,
            Err(_) => Err(ExplainError::Timeout {
                full_name: full_name.to_string(),
                after: self.timeout,
            }),
        }
    }

    /// Enrich sibling `fields` of `parent_full_name` concurrently.
    ///
    /// Returns the nodes sorted by name regardless of completion order.
    /// The first structural error (or query failure under
    /// [`FailurePolicy::Abort`]) cancels the remaining siblings.
    pub fn enrich(&self, fields: Vec<RawField>, parent_full_name: &str) -> BoxFuture<Result<Enriched>> {
        let this = self.clone();
        let parent = parent_full_name.to_string();

        Box::pin(async move {
            let mut tasks = JoinSet::new();
            for field in fields {
                let this = this.clone();
                tasks.spawn(async move { this.enrich_field(field).await });
            }

            let mut enriched = Enriched::default();
            while let Some(joined) = tasks.join_next().await {
                let (node, warnings) = match joined {
                    Ok(outcome) => outcome?,
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(e) => {
                        return Err(ExplainError::query(
                            &parent,
                            format!("enrichment task cancelled: {e}"),
                        ));
                    }
                };
                enriched.nodes.push(node);
                enriched.warnings.extend(warnings);
            }

            sort_by_name(&mut enriched.nodes);
            Ok(enriched)
        })
    }

    async fn enrich_field(&self, field: RawField) -> Result<(ExplanationNode, Vec<FieldWarning>)> {
        let nested = if field.is_scalar() {
            Vec::new()
        } else {
            decompose(&field.nested_block, &field.full_name)?
        };

        let (description, children) = tokio::join!(
            self.describe(&field.full_name),
            self.enrich(nested, &field.full_name),
        );
        let (description, warning) = description?;
        let children = children?;

        let mut warnings = children.warnings;
        warnings.extend(warning);

        debug!(full_name = %field.full_name, children = children.nodes.len(), "enriched field");
        self.progress.field_enriched(&field.full_name);

        let node = ExplanationNode {
            name: field.name,
            fully_qualified_name: field.full_name,
            kind: field.kind,
            description,
            children: children.nodes,
        };
        Ok((node, warnings))
    }

    /// Fetch the description of one field, applying the failure policy.
    async fn describe(&self, full_name: &str) -> Result<(String, Option<FieldWarning>)> {
        match self.query(full_name, false).await {
            Ok(raw) => Ok((extract_field_description(&raw), None)),
            Err(e) if e.is_query_failure() && self.policy == FailurePolicy::Tolerant => {
                warn!(full_name, error = %e, "field enrichment failed, keeping empty description");
                let warning = FieldWarning {
                    full_name: full_name.to_string(),
                    message: e.to_string(),
                };
                Ok((String::new(), Some(warning)))
            }
            Err(e) => Err(e),
        }
    }
}
