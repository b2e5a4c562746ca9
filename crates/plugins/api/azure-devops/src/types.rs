//! Azure DevOps API request and response types.
//!
//! These types represent the raw JSON exchanged with the Work Item Tracking
//! API. Responses are deserialized and then mapped to unified types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// JSON Patch
// =============================================================================

/// JSON Patch operation kinds used by the work item API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
}

/// One entry of a JSON Patch document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonPatchOperation {
    pub op: PatchOp,
    /// `/fields/System.Title`, `/relations/-`, ...
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl JsonPatchOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
        }
    }
}

/// Value of a `/relations/-` add operation.
#[derive(Debug, Clone, Serialize)]
pub struct RelationPayload {
    pub rel: String,
    pub url: String,
}

// =============================================================================
// Work item
// =============================================================================

/// Work item as returned by `GET/POST/PATCH _apis/wit/workitems`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdoWorkItem {
    pub id: u64,
    /// Field values keyed by reference name
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Present only with `$expand=relations`
    #[serde(default)]
    pub relations: Option<Vec<AdoRelation>>,
}

/// Link to another work item or artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct AdoRelation {
    pub rel: String,
    pub url: String,
}

/// Identity reference (`System.AssignedTo` and friends).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoIdentityRef {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub unique_name: Option<String>,
}
