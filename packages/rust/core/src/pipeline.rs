//! End-to-end explain pipeline: resource names → recursive query → split →
//! decompose → enrich → sorted forest.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use kexplain_parser::{decompose, split_document, validate_tree};
use kexplain_shared::{
    ExplainConfig, ExplainError, ExplanationNode, FieldWarning, ResourceFailure, Result,
    sort_by_name,
};

use crate::enrichment::Enricher;
use crate::source::SchemaSource;

/// Result of one explain run.
#[derive(Debug)]
pub struct ExplainReport {
    /// One root per successfully explained resource, ascending by name.
    pub resources: Vec<ExplanationNode>,
    /// Resources omitted from `resources`, ascending by name.
    pub failures: Vec<ResourceFailure>,
    /// Fields kept with an empty description, ascending by full name.
    pub warnings: Vec<FieldWarning>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl ExplainReport {
    /// True when every resource and field was explained without failure.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }

    /// Number of field nodes across all resources (roots excluded).
    pub fn field_count(&self) -> usize {
        self.resources.iter().map(|r| r.node_count() - 1).sum()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called once a resource's field structure has been parsed.
    fn resource_started(&self, name: &str, field_count: usize);
    /// Called after each field has been enriched.
    fn field_enriched(&self, full_name: &str);
    /// Called when a resource is done, successfully or not.
    fn resource_finished(&self, name: &str, ok: bool);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn resource_started(&self, _name: &str, _field_count: usize) {}
    fn field_enriched(&self, _full_name: &str) {}
    fn resource_finished(&self, _name: &str, _ok: bool) {}
}

// ---------------------------------------------------------------------------
// Explainer
// ---------------------------------------------------------------------------

/// Drives the pipeline for a list of root resources.
pub struct Explainer {
    enricher: Enricher,
}

impl Explainer {
    /// Create an explainer over `source` with validated settings.
    pub fn new(
        source: Arc<dyn SchemaSource>,
        config: &ExplainConfig,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            enricher: Enricher::new(source, config, progress),
        })
    }

    /// Explain every resource in `resource_names`.
    ///
    /// Resources run concurrently. A resource that fails (query failure on
    /// its recursive document, structural error anywhere in its tree, or a
    /// field failure under the abort policy) is left out of the forest and
    /// recorded in [`ExplainReport::failures`]; the others are unaffected.
    #[instrument(skip_all, fields(resources = resource_names.len()))]
    pub async fn explain(&self, resource_names: &[String]) -> Result<ExplainReport> {
        validate_resource_names(resource_names)?;
        let start = Instant::now();

        info!("beginning explanation process; do not change kubectl contexts while it runs");

        let mut tasks = JoinSet::new();
        for name in resource_names {
            let enricher = self.enricher.clone();
            let name = name.clone();
            tasks.spawn(async move {
                let outcome = explain_resource(&enricher, &name).await;
                enricher.progress().resource_finished(&name, outcome.is_ok());
                (name, outcome)
            });
        }

        let mut resources = Vec::new();
        let mut failures = Vec::new();
        let mut warnings = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (name, outcome) = match joined {
                Ok(done) => done,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    return Err(ExplainError::config(format!("resource task cancelled: {e}")));
                }
            };
            match outcome {
                Ok((node, field_warnings)) => {
                    resources.push(node);
                    warnings.extend(field_warnings);
                }
                Err(e) => {
                    error!(resource = %name, error = %e, "resource failed, omitting it from output");
                    failures.push(ResourceFailure {
                        resource: name,
                        message: e.to_string(),
                    });
                }
            }
        }

        sort_by_name(&mut resources);
        failures.sort();
        warnings.sort();

        let report = ExplainReport {
            resources,
            failures,
            warnings,
            elapsed: start.elapsed(),
        };

        info!(
            explained = report.resources.len(),
            failed = report.failures.len(),
            fields = report.field_count(),
            warnings = report.warnings.len(),
            elapsed_ms = report.elapsed.as_millis(),
            "explanation process completed"
        );

        Ok(report)
    }
}

/// Explain a single root resource.
async fn explain_resource(
    enricher: &Enricher,
    name: &str,
) -> Result<(ExplanationNode, Vec<FieldWarning>)> {
    info!(resource = %name, "explaining resource");

    let raw = enricher.query(name, true).await?;
    let document = split_document(&raw, name)?;

    // Catch structural errors anywhere in the tree before spending queries on it.
    let field_count = validate_tree(&document.field_block, name)?;
    enricher.progress().resource_started(name, field_count);

    let fields = decompose(&document.field_block, name)?;
    let enriched = enricher.enrich(fields, name).await?;

    let root = ExplanationNode::resource(name, document.description, enriched.nodes);
    Ok((root, enriched.warnings))
}

/// Reject an empty list, blank entries and duplicates.
fn validate_resource_names(names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Err(ExplainError::config("no resource names to explain"));
    }
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ExplainError::config("resource names must not be blank"));
        }
        if !seen.insert(name.as_str()) {
            return Err(ExplainError::config(format!("duplicate resource name '{name}'")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSource;
    use kexplain_shared::{FailurePolicy, RESOURCE_KIND};

    const POD_DOC: &str =
        "DESCRIPTION:\n     A pod.\nFIELDS:\n   status\t<Object>\n      phase\t<string>\n";

    fn pod_source() -> MockSource {
        MockSource::new()
            .with_resource("pod", POD_DOC)
            .with_field("pod.status", "Most recently observed status.")
            .with_field("pod.status.phase", "Current phase.")
    }

    fn explainer(source: Arc<MockSource>) -> Explainer {
        explainer_with(source, FailurePolicy::Tolerant)
    }

    fn explainer_with(source: Arc<MockSource>, policy: FailurePolicy) -> Explainer {
        let config = ExplainConfig {
            max_concurrent_queries: 4,
            query_timeout: Duration::from_secs(2),
            failure_policy: policy,
        };
        Explainer::new(source, &config, Arc::new(SilentProgress)).expect("valid config")
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn assert_qualified_names(node: &ExplanationNode) {
        for child in &node.children {
            assert_eq!(
                child.fully_qualified_name,
                format!("{}.{}", node.fully_qualified_name, child.name)
            );
            assert_qualified_names(child);
        }
        assert!(node.children.windows(2).all(|w| w[0].name < w[1].name));
    }

    #[tokio::test]
    async fn explains_pod_document() {
        let report = explainer(Arc::new(pod_source()))
            .explain(&names(&["pod"]))
            .await
            .expect("explain");

        assert!(report.is_clean());
        assert_eq!(report.resources.len(), 1);

        let pod = &report.resources[0];
        assert_eq!(pod.name, "pod");
        assert_eq!(pod.fully_qualified_name, "pod");
        assert_eq!(pod.kind, RESOURCE_KIND);
        assert_eq!(pod.description, "A pod.");

        let status = &pod.children[0];
        assert_eq!(status.fully_qualified_name, "pod.status");
        assert_eq!(status.description, "Most recently observed status.");
        assert_eq!(status.children[0].fully_qualified_name, "pod.status.phase");
        assert_eq!(status.children[0].description, "Current phase.");
        assert!(status.children[0].children.is_empty());
        assert_eq!(report.field_count(), 2);
    }

    #[tokio::test]
    async fn output_is_independent_of_query_latency() {
        let doc = "DESCRIPTION:\n     A deployment.\nFIELDS:\n   spec\t<Object>\n      replicas\t<integer>\n      selector\t<Object>\n         matchLabels\t<map[string]string>\n      paused\t<boolean>\n   kind\t<string>\n   apiVersion\t<string>\n   metadata\t<Object>\n";
        let fields = [
            "deploy.spec",
            "deploy.spec.replicas",
            "deploy.spec.selector",
            "deploy.spec.selector.matchLabels",
            "deploy.spec.paused",
            "deploy.kind",
            "deploy.apiVersion",
            "deploy.metadata",
        ];

        let mut outputs = Vec::new();
        for seed in 1..=5u64 {
            let mut source = MockSource::new().with_resource("deploy", doc);
            for (i, field) in fields.iter().enumerate() {
                let jitter = (seed * 7919 + i as u64 * 104_729) % 17;
                source = source
                    .with_field(field, &format!("About {field}."))
                    .with_delay(field, Duration::from_millis(jitter));
            }
            let report = explainer(Arc::new(source))
                .explain(&names(&["deploy"]))
                .await
                .expect("explain");
            assert_qualified_names(&report.resources[0]);
            outputs.push(serde_json::to_string(&report.resources).expect("serialize"));
        }

        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn structural_failure_omits_only_that_resource() {
        let source = pod_source().with_resource(
            "secret",
            "DESCRIPTION:\n     A secret.\nFIELDS:\n      data\t<map[string]string>\n",
        );
        let source = Arc::new(source);
        let report = explainer(source.clone())
            .explain(&names(&["secret", "pod"]))
            .await
            .expect("explain");

        assert_eq!(report.resources.len(), 1);
        assert_eq!(report.resources[0].name, "pod");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].resource, "secret");
        assert!(report.failures[0].message.contains("indented"));
        // pod: 1 recursive + 2 field queries; secret: 1 recursive, no field queries.
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn duplicate_sibling_fails_resource() {
        let source = MockSource::new().with_resource(
            "cm",
            "DESCRIPTION:\n     A config map.\nFIELDS:\n   data\t<map[string]string>\n   data\t<map[string]string>\n",
        );
        let report = explainer(Arc::new(source))
            .explain(&names(&["cm"]))
            .await
            .expect("explain");

        assert!(report.resources.is_empty());
        assert!(report.failures[0].message.contains("duplicate"));
    }

    #[tokio::test]
    async fn scalar_field_with_nested_lines_fails_resource() {
        let source = MockSource::new().with_resource(
            "pod",
            "DESCRIPTION:\n     A pod.\nFIELDS:\n   phase\t<string>\n      x\t<string>\n",
        );
        let source = Arc::new(source);
        let report = explainer(source.clone())
            .explain(&names(&["pod"]))
            .await
            .expect("explain");

        assert!(report.resources.is_empty());
        assert_eq!(report.failures[0].resource, "pod");
        assert!(report.failures[0].message.contains("pod.phase"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn abort_policy_fails_only_the_affected_resource() {
        let source = pod_source()
            .failing("pod.status.phase")
            .with_resource("cm", "DESCRIPTION:\n     A config map.\nFIELDS:\n   data\t<map[string]string>\n")
            .with_field("cm.data", "Config data.");
        let report = explainer_with(Arc::new(source), FailurePolicy::Abort)
            .explain(&names(&["pod", "cm"]))
            .await
            .expect("abort still completes the run");

        let roots: Vec<_> = report.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(roots, ["cm"]);
        assert_eq!(report.resources[0].children[0].description, "Config data.");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].resource, "pod");
        assert!(report.failures[0].message.contains("pod.status.phase"));
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn root_query_failure_is_recorded() {
        let report = explainer(Arc::new(pod_source()))
            .explain(&names(&["pod", "nosuchthing"]))
            .await
            .expect("explain");

        assert_eq!(report.resources.len(), 1);
        assert_eq!(report.failures[0].resource, "nosuchthing");
    }

    #[tokio::test]
    async fn field_warnings_are_collected_per_run() {
        let source = Arc::new(pod_source().failing("pod.status.phase"));
        let report = explainer(source)
            .explain(&names(&["pod"]))
            .await
            .expect("explain");

        assert!(!report.is_clean());
        assert_eq!(report.resources[0].children[0].children.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].full_name, "pod.status.phase");
    }

    #[tokio::test]
    async fn resources_sorted_by_name() {
        let source = pod_source()
            .with_resource("configmap", "DESCRIPTION:\n     A config map.\nFIELDS:\n   kind\t<string>\n")
            .with_field("configmap.kind", "Kind.")
            .with_delay("configmap", Duration::from_millis(20));
        let report = explainer(Arc::new(source))
            .explain(&names(&["pod", "configmap"]))
            .await
            .expect("explain");

        let roots: Vec<_> = report.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(roots, ["configmap", "pod"]);
    }

    #[tokio::test]
    async fn invalid_resource_lists_are_config_errors() {
        let explainer = explainer(Arc::new(pod_source()));
        for list in [names(&[]), names(&["pod", " "]), names(&["pod", "pod"])] {
            let err = explainer.explain(&list).await.unwrap_err();
            assert!(matches!(err, ExplainError::Config { .. }), "{list:?} gave {err:?}");
        }
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = ExplainConfig {
            max_concurrent_queries: 0,
            ..ExplainConfig::default()
        };
        assert!(Explainer::new(Arc::new(MockSource::new()), &config, Arc::new(SilentProgress)).is_err());
    }
}
