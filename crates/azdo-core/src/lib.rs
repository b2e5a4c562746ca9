//! Core traits, types, and error handling for azdo-tools.
//!
//! This crate provides the foundational abstractions used across all azdo components.

pub mod config;
pub mod error;
pub mod gateway;
pub mod types;

pub use config::{AzureDevOpsConfig, Config};
pub use error::{Error, Result};
pub use gateway::WorkItemGateway;
pub use types::{
    CreatedWorkItem, FieldKind, FieldMap, FieldValue, Priority, WorkItem, WorkItemField,
    WorkItemRelation, WorkItemType, HIERARCHY_FORWARD,
};
