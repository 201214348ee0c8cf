//! In-memory [`SchemaSource`] for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use kexplain_shared::{ExplainError, Result};

use crate::source::SchemaSource;

/// Canned documents with optional latency, failures, and hangs per name.
#[derive(Default)]
pub(crate) struct MockSource {
    docs: HashMap<(String, bool), String>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Recursive document for a root resource.
    pub(crate) fn with_resource(mut self, name: &str, doc: &str) -> Self {
        self.docs.insert((name.to_string(), true), doc.to_string());
        self
    }

    /// Single-field document carrying `description`.
    pub(crate) fn with_field(mut self, full_name: &str, description: &str) -> Self {
        let leaf = full_name.rsplit('.').next().unwrap_or(full_name);
        let doc = format!("FIELD:    {leaf} <string>\n\nDESCRIPTION:\n     {description}\n");
        self.docs.insert((full_name.to_string(), false), doc);
        self
    }

    pub(crate) fn with_delay(mut self, full_name: &str, delay: Duration) -> Self {
        self.delays.insert(full_name.to_string(), delay);
        self
    }

    pub(crate) fn failing(mut self, full_name: &str) -> Self {
        self.failing.insert(full_name.to_string());
        self
    }

    pub(crate) fn hanging(mut self, full_name: &str) -> Self {
        self.hanging.insert(full_name.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Counts one query as in flight until dropped, including on timeout.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SchemaSource for MockSource {
    async fn query(&self, full_name: &str, recursive: bool) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let delay = if self.hanging.contains(full_name) {
            Duration::from_secs(3600)
        } else {
            self.delays.get(full_name).copied().unwrap_or_default()
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(full_name) {
            return Err(ExplainError::query(full_name, "exit status: 1 (server unavailable)"));
        }
        self.docs
            .get(&(full_name.to_string(), recursive))
            .cloned()
            .ok_or_else(|| ExplainError::query(full_name, "no such resource"))
    }
}
