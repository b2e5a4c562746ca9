//! Work item types shared by the gateway, the formatter and the tool layer.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Relation type linking a parent work item to its child.
pub const HIERARCHY_FORWARD: &str = "System.LinkTypes.Hierarchy-Forward";

// =============================================================================
// Work item type
// =============================================================================

/// Work item types supported by the tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkItemType {
    Task,
    Epic,
}

impl WorkItemType {
    /// Name used by the Azure DevOps REST API (`$Task`, `$Epic`).
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemType::Task => "Task",
            WorkItemType::Epic => "Epic",
        }
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "task" => Ok(WorkItemType::Task),
            "epic" => Ok(WorkItemType::Epic),
            other => Err(Error::InvalidData(format!(
                "Unsupported work item type '{}'. Expected \"Task\" or \"Epic\"",
                other
            ))),
        }
    }
}

// =============================================================================
// Fields
// =============================================================================

/// Semantic type of a work item field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain string
    Text,
    /// Rich-text HTML fragment
    Html,
    /// Whole number
    Integer,
    /// User identity (email or display name)
    Identity,
    /// Semicolon-separated tag list
    Tags,
}

/// Known Azure DevOps work item fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkItemField {
    Title,
    Description,
    AssignedTo,
    Priority,
    Tags,
    State,
    WorkItemType,
    CreatedDate,
}

impl WorkItemField {
    /// Field reference name as used in JSON Patch paths and API responses.
    pub fn reference_name(&self) -> &'static str {
        match self {
            WorkItemField::Title => "System.Title",
            WorkItemField::Description => "System.Description",
            WorkItemField::AssignedTo => "System.AssignedTo",
            WorkItemField::Priority => "Microsoft.VSTS.Common.Priority",
            WorkItemField::Tags => "System.Tags",
            WorkItemField::State => "System.State",
            WorkItemField::WorkItemType => "System.WorkItemType",
            WorkItemField::CreatedDate => "System.CreatedDate",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            WorkItemField::Description => FieldKind::Html,
            WorkItemField::AssignedTo => FieldKind::Identity,
            WorkItemField::Priority => FieldKind::Integer,
            WorkItemField::Tags => FieldKind::Tags,
            WorkItemField::Title
            | WorkItemField::State
            | WorkItemField::WorkItemType
            | WorkItemField::CreatedDate => FieldKind::Text,
        }
    }
}

/// Value stored in a [`FieldMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

impl FieldValue {
    /// An empty text value clears the field on update.
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.is_empty())
    }
}

/// Work item priority, 1 (highest) to 4 (lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Priority(u8);

impl Priority {
    pub fn new(value: i64) -> Result<Self> {
        if (1..=4).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(Error::InvalidData(format!(
                "Priority must be between 1 and 4, got {}",
                value
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Priority {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Priority> for i64 {
    fn from(priority: Priority) -> Self {
        priority.0 as i64
    }
}

/// Field values to send on create or update, keyed by known fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    values: BTreeMap<WorkItemField, FieldValue>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, checking it against the field's declared kind.
    pub fn insert(&mut self, field: WorkItemField, value: FieldValue) -> Result<()> {
        let compatible = matches!(
            (field.kind(), &value),
            (FieldKind::Integer, FieldValue::Integer(_))
                | (
                    FieldKind::Text | FieldKind::Html | FieldKind::Identity | FieldKind::Tags,
                    FieldValue::Text(_)
                )
        );
        if !compatible {
            return Err(Error::InvalidData(format!(
                "Field {} expects a {:?} value",
                field.reference_name(),
                field.kind()
            )));
        }
        self.values.insert(field, value);
        Ok(())
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.values
            .insert(WorkItemField::Title, FieldValue::Text(title.into()));
        self
    }

    /// Description must already be formatted HTML.
    pub fn with_description(mut self, html: impl Into<String>) -> Self {
        self.values
            .insert(WorkItemField::Description, FieldValue::Text(html.into()));
        self
    }

    pub fn with_assigned_to(mut self, identity: impl Into<String>) -> Self {
        self.values
            .insert(WorkItemField::AssignedTo, FieldValue::Text(identity.into()));
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.values
            .insert(WorkItemField::Tags, FieldValue::Text(tags.into()));
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.values.insert(
            WorkItemField::Priority,
            FieldValue::Integer(priority.into()),
        );
        self
    }

    pub fn get(&self, field: WorkItemField) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WorkItemField, &FieldValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Results
// =============================================================================

/// Identity of a freshly created work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedWorkItem {
    pub id: u64,
    /// Browser URL (`.../_workitems/edit/{id}`)
    pub url: String,
}

/// Link from one work item to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemRelation {
    pub rel: String,
    pub url: String,
}

impl WorkItemRelation {
    /// Id of the linked work item, taken from the last URL segment.
    pub fn target_id(&self) -> Option<u64> {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse().ok())
    }

    pub fn is_child(&self) -> bool {
        self.rel == HIERARCHY_FORWARD
    }
}

/// Work item as read back from Azure DevOps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    /// Type name as reported by the server (may be a type we cannot create)
    pub work_item_type: Option<String>,
    pub title: Option<String>,
    pub state: Option<String>,
    /// Display name of the assignee
    pub assigned_to: Option<String>,
    pub priority: Option<i64>,
    pub tags: Option<String>,
    pub created_date: Option<String>,
    pub description: Option<String>,
    /// Browser URL
    pub url: String,
    #[serde(default)]
    pub relations: Vec<WorkItemRelation>,
}

impl WorkItem {
    pub fn is_epic(&self) -> bool {
        self.work_item_type.as_deref() == Some(WorkItemType::Epic.as_str())
    }

    /// Ids of child work items, in relation order.
    pub fn child_ids(&self) -> Vec<u64> {
        self.relations
            .iter()
            .filter(|r| r.is_child())
            .filter_map(WorkItemRelation::target_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_type_parse() {
        assert_eq!("Task".parse::<WorkItemType>().unwrap(), WorkItemType::Task);
        assert_eq!(" epic ".parse::<WorkItemType>().unwrap(), WorkItemType::Epic);
        assert!("Bug".parse::<WorkItemType>().is_err());
    }

    #[test]
    fn test_field_reference_names() {
        assert_eq!(WorkItemField::Title.reference_name(), "System.Title");
        assert_eq!(
            WorkItemField::Priority.reference_name(),
            "Microsoft.VSTS.Common.Priority"
        );
        assert_eq!(WorkItemField::Priority.kind(), FieldKind::Integer);
        assert_eq!(WorkItemField::Description.kind(), FieldKind::Html);
    }

    #[test]
    fn test_priority_bounds() {
        assert_eq!(Priority::new(1).unwrap().value(), 1);
        assert_eq!(Priority::new(4).unwrap().value(), 4);
        assert!(Priority::new(0).is_err());
        assert!(Priority::new(5).is_err());
    }

    #[test]
    fn test_field_map_insert_checks_kind() {
        let mut fields = FieldMap::new();
        assert!(fields
            .insert(WorkItemField::Priority, FieldValue::Text("high".into()))
            .is_err());
        assert!(fields
            .insert(WorkItemField::Title, FieldValue::Integer(3))
            .is_err());
        fields
            .insert(WorkItemField::Priority, FieldValue::Integer(2))
            .unwrap();
        assert_eq!(
            fields.get(WorkItemField::Priority),
            Some(&FieldValue::Integer(2))
        );
    }

    #[test]
    fn test_field_map_builders_keep_field_order() {
        let fields = FieldMap::new()
            .with_tags("backend")
            .with_priority(Priority::new(2).unwrap())
            .with_title("Build API");

        let order: Vec<WorkItemField> = fields.iter().map(|(f, _)| *f).collect();
        assert_eq!(
            order,
            vec![
                WorkItemField::Title,
                WorkItemField::Priority,
                WorkItemField::Tags
            ]
        );
    }

    #[test]
    fn test_field_value_serializes_untagged() {
        assert_eq!(
            serde_json::to_value(FieldValue::Text("x".into())).unwrap(),
            serde_json::json!("x")
        );
        assert_eq!(
            serde_json::to_value(FieldValue::Integer(3)).unwrap(),
            serde_json::json!(3)
        );
        assert!(FieldValue::Text(String::new()).is_empty());
        assert!(!FieldValue::Integer(0).is_empty());
    }

    #[test]
    fn test_child_ids() {
        let item = WorkItem {
            id: 81,
            work_item_type: Some("Epic".into()),
            title: None,
            state: None,
            assigned_to: None,
            priority: None,
            tags: None,
            created_date: None,
            description: None,
            url: String::new(),
            relations: vec![
                WorkItemRelation {
                    rel: HIERARCHY_FORWARD.into(),
                    url: "https://dev.azure.com/org/proj/_apis/wit/workItems/89".into(),
                },
                WorkItemRelation {
                    rel: "System.LinkTypes.Related".into(),
                    url: "https://dev.azure.com/org/proj/_apis/wit/workItems/90".into(),
                },
                WorkItemRelation {
                    rel: HIERARCHY_FORWARD.into(),
                    url: "https://dev.azure.com/org/proj/_apis/wit/workItems/91".into(),
                },
            ],
        };

        assert!(item.is_epic());
        assert_eq!(item.child_ids(), vec![89, 91]);
    }
}
