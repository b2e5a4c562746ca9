//! Gateway trait for the Azure DevOps work item API.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CreatedWorkItem, FieldMap, WorkItem, WorkItemType};

/// Work item operations against a single organization/project.
#[async_trait]
pub trait WorkItemGateway: Send + Sync {
    /// Create a work item. Empty field values are not sent.
    async fn create(&self, kind: WorkItemType, fields: FieldMap) -> Result<CreatedWorkItem>;

    /// Get a work item, optionally with its relations expanded.
    async fn get(&self, id: u64, expand_relations: bool) -> Result<WorkItem>;

    /// Update fields of a work item. An empty text value removes the field.
    async fn update(&self, id: u64, fields: FieldMap) -> Result<()>;

    /// Delete a work item.
    async fn delete(&self, id: u64) -> Result<()>;

    /// Add a parent-child (hierarchy) link from `parent_id` to `child_id`.
    async fn link(&self, parent_id: u64, child_id: u64) -> Result<()>;

    /// Browser URL for a work item id.
    fn work_item_url(&self, id: u64) -> String;
}
