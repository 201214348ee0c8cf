//! Core domain types for explanation trees.

use serde::{Deserialize, Serialize};

/// Kind assigned to every root node.
pub const RESOURCE_KIND: &str = "Resource";

// ---------------------------------------------------------------------------
// ExplanationNode
// ---------------------------------------------------------------------------

/// One node of an explanation tree: a resource root or one of its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationNode {
    /// Local identifier (the resource name for roots).
    pub name: String,
    /// Dot-joined path from the resource root; the query key for this node.
    pub fully_qualified_name: String,
    /// Free-text type label from the source, angle brackets stripped.
    pub kind: String,
    /// Prose description; empty when the source has none.
    pub description: String,
    /// Child fields, ascending by `name`.
    pub children: Vec<ExplanationNode>,
}

impl ExplanationNode {
    /// Build a root node for `resource`.
    pub fn resource(resource: &str, description: String, children: Vec<ExplanationNode>) -> Self {
        Self {
            name: resource.to_string(),
            fully_qualified_name: resource.to_string(),
            kind: RESOURCE_KIND.to_string(),
            description,
            children,
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}

/// Kinds that never carry nested fields, alone or as `[]` arrays.
const SCALAR_KINDS: [&str; 4] = ["boolean", "integer", "number", "string"];

/// True when `kind` is a leaf scalar such as `string` or `[]integer`.
///
/// Any other kind (`Object`, `[]Object`, `PodSpec`, `map[string]string`)
/// may have nested fields, or none.
pub fn is_scalar_kind(kind: &str) -> bool {
    let base = kind.trim_start_matches("[]");
    SCALAR_KINDS.contains(&base)
}

/// Sort a sibling list by name ascending.
pub fn sort_by_name(nodes: &mut [ExplanationNode]) {
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
}

// ---------------------------------------------------------------------------
// Run report entries
// ---------------------------------------------------------------------------

/// A field whose description could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldWarning {
    /// Fully-qualified name of the affected field.
    pub full_name: String,
    /// Why enrichment failed.
    pub message: String,
}

/// A resource omitted from the output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFailure {
    /// Root resource name.
    pub resource: String,
    /// Why the resource failed.
    pub message: String,
}
