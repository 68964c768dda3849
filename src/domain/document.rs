//! Wire documents produced by the parser service.
//!
//! Both documents are plain JSON. The tree document is recursive
//! (`{ name, children? }`); the trace document is kept opaque.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One node of the tree document as written by the parser.
///
/// Absent, `null` or empty `children` all denote a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeDocument>>,
}

impl TreeDocument {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: None,
        }
    }

    pub fn branch(name: impl Into<String>, children: Vec<TreeDocument>) -> Self {
        Self {
            name: name.into(),
            children: Some(children),
        }
    }

    /// Children in document order; empty for leaves.
    pub fn children(&self) -> &[TreeDocument] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Execution trace fetched alongside the tree.
///
/// Only validated as JSON. Rendering does not read it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TraceDocument(Value);

impl TraceDocument {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self)
    }

    /// Number of top-level entries (array length, object size, or 1 for scalars).
    pub fn entry_count(&self) -> usize {
        match &self.0 {
            Value::Null => 0,
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 1,
        }
    }
}
