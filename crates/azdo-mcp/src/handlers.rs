//! Tool handlers for MCP server.
//!
//! Each tool parses its arguments, formats descriptions, calls the work item
//! gateway and renders the result as text. Failures never escape as JSON-RPC
//! errors: they come back as `isError` tool results.

use std::sync::Arc;

use azdo_client::AzureDevOpsClient;
use azdo_core::{
    AzureDevOpsConfig, Error, FieldMap, Priority, Result, WorkItemGateway, WorkItemType,
};
use azdo_formatting::report::{self, error_message};
use azdo_formatting::{format_description, split_task_descriptions, split_task_titles, TaskRow};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::protocol::{ToolCallResult, ToolDefinition};

/// Builds a gateway for a project. Called again on `set_project`.
pub type GatewayFactory =
    Arc<dyn Fn(&AzureDevOpsConfig) -> Result<Arc<dyn WorkItemGateway>> + Send + Sync>;

/// Text on success, full error message on failure.
type ToolOutcome<T = String> = std::result::Result<T, String>;

/// Active project and the gateway bound to it.
struct Session {
    config: AzureDevOpsConfig,
    gateway: Arc<dyn WorkItemGateway>,
}

/// Tool handler that executes tools against the active project.
pub struct ToolHandler {
    session: RwLock<Session>,
    factory: GatewayFactory,
}

impl ToolHandler {
    /// Create a handler, building the first gateway with `factory`.
    pub fn new(config: AzureDevOpsConfig, factory: GatewayFactory) -> Result<Self> {
        let gateway = factory(&config)?;
        Ok(Self {
            session: RwLock::new(Session { config, gateway }),
            factory,
        })
    }

    /// Handler backed by the Azure DevOps REST API.
    pub fn azure_devops(config: AzureDevOpsConfig) -> Result<Self> {
        Self::new(
            config,
            Arc::new(|config: &AzureDevOpsConfig| -> Result<Arc<dyn WorkItemGateway>> {
                let client = AzureDevOpsClient::new(config.clone())?;
                Ok(Arc::new(client) as Arc<dyn WorkItemGateway>)
            }),
        )
    }

    /// Name of the active project.
    pub async fn project(&self) -> String {
        self.session.read().await.config.project.clone()
    }

    async fn gateway(&self) -> Arc<dyn WorkItemGateway> {
        self.session.read().await.gateway.clone()
    }

    /// Get available tool definitions.
    pub fn available_tools(&self) -> Vec<ToolDefinition> {
        let assigned_to = serde_json::json!({
            "type": "string",
            "description": "Email address of the person to assign"
        });
        let priority = serde_json::json!({
            "type": "integer",
            "description": "Priority level (1-4, where 1 is highest)",
            "minimum": 1,
            "maximum": 4
        });
        let tags = serde_json::json!({
            "type": "string",
            "description": "Semicolon-separated tags"
        });
        let item_id = serde_json::json!({
            "type": "integer",
            "description": "The ID of the work item",
            "minimum": 1
        });

        vec![
            ToolDefinition {
                name: "create_work_item".to_string(),
                description: "Create a Task or Epic in Azure DevOps. Task descriptions should \
                              follow ado://standard/gold: Objective, Technical Requirements, \
                              Implementation Steps, Acceptance Criteria, Business Context."
                    .to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "work_item_type": {
                            "type": "string",
                            "enum": ["Task", "Epic"],
                            "description": "Type of work item to create"
                        },
                        "title": {
                            "type": "string",
                            "description": "Title of the work item"
                        },
                        "description": {
                            "type": "string",
                            "description": "Description; **Header**, ## Header, - bullets and 1. lists are converted to HTML"
                        },
                        "assigned_to": assigned_to,
                        "priority": priority,
                        "tags": tags
                    },
                    "required": ["work_item_type", "title"]
                }),
            },
            ToolDefinition {
                name: "create_epic_with_tasks".to_string(),
                description: "Create an Epic with several Tasks, link every Task to the Epic \
                              and return a summary table with URLs. Recommended way to create \
                              an Epic."
                    .to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "epic_title": {
                            "type": "string",
                            "description": "Title of the Epic"
                        },
                        "epic_description": {
                            "type": "string",
                            "description": "Description of the Epic"
                        },
                        "task_titles": {
                            "type": "string",
                            "description": "Comma-separated Task titles"
                        },
                        "task_descriptions": {
                            "type": "string",
                            "description": "Task descriptions separated by ||| in the same order as task_titles"
                        },
                        "assigned_to": assigned_to,
                        "priority": priority,
                        "tags": tags
                    },
                    "required": ["epic_title"]
                }),
            },
            ToolDefinition {
                name: "get_work_item".to_string(),
                description: "Get work item details. Epics include a table of their child \
                              work items with URLs."
                    .to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": { "item_id": item_id },
                    "required": ["item_id"]
                }),
            },
            ToolDefinition {
                name: "update_work_item".to_string(),
                description: "Update fields of an existing work item. Only the given fields \
                              change."
                    .to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "item_id": item_id,
                        "title": {
                            "type": "string",
                            "description": "New title"
                        },
                        "description": {
                            "type": "string",
                            "description": "New description"
                        },
                        "assigned_to": {
                            "type": "string",
                            "description": "Email address to assign, or \"\" to unassign"
                        },
                        "priority": priority,
                        "tags": {
                            "type": "string",
                            "description": "New semicolon-separated tags, or \"\" to remove all tags"
                        }
                    },
                    "required": ["item_id"]
                }),
            },
            ToolDefinition {
                name: "delete_work_item".to_string(),
                description: "Delete a work item".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": { "item_id": item_id },
                    "required": ["item_id"]
                }),
            },
            ToolDefinition {
                name: "link_task_to_epic".to_string(),
                description: "Make a Task the child of an Epic".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "epic_id": {
                            "type": "integer",
                            "description": "ID of the parent Epic",
                            "minimum": 1
                        },
                        "task_id": {
                            "type": "integer",
                            "description": "ID of the child Task",
                            "minimum": 1
                        }
                    },
                    "required": ["epic_id", "task_id"]
                }),
            },
            ToolDefinition {
                name: "get_current_project".to_string(),
                description: "Show the Azure DevOps project new work items are created in"
                    .to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            ToolDefinition {
                name: "set_project".to_string(),
                description: "Switch to another project in the same organization for the rest \
                              of the session"
                    .to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "new_project_name": {
                            "type": "string",
                            "description": "Name of the project to switch to"
                        }
                    },
                    "required": ["new_project_name"]
                }),
            },
        ]
    }

    /// Execute a tool by name with arguments.
    pub async fn execute(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        let outcome = match name {
            "create_work_item" => self.create_work_item(arguments).await,
            "create_epic_with_tasks" => self.create_epic_with_tasks(arguments).await,
            "get_work_item" => self.get_work_item(arguments).await,
            "update_work_item" => self.update_work_item(arguments).await,
            "delete_work_item" => self.delete_work_item(arguments).await,
            "link_task_to_epic" => self.link_task_to_epic(arguments).await,
            "get_current_project" => Ok(report::current_project_message(&self.project().await)),
            "set_project" => self.set_project(arguments).await,
            _ => return ToolCallResult::error(format!("Unknown tool: {}", name)),
        };

        match outcome {
            Ok(text) => ToolCallResult::text(text),
            Err(message) => {
                warn!(tool = name, "{}", message);
                ToolCallResult::error(message)
            }
        }
    }

    async fn create_work_item(&self, arguments: Option<Value>) -> ToolOutcome {
        const TOOL: &str = "create_work_item";
        let params: CreateWorkItemParams = parse_args(TOOL, arguments)?;
        let fail = |e: Error| error_message(TOOL, e);

        let kind: WorkItemType = params.work_item_type.parse().map_err(fail)?;
        let fields = creation_fields(
            &params.title,
            params.description.as_deref(),
            &params.assignment,
        )
        .map_err(fail)?;

        let created = self.gateway().await.create(kind, fields).await.map_err(fail)?;
        info!(id = created.id, kind = %kind, "Created work item");
        Ok(report::created_message(kind, &created))
    }

    async fn create_epic_with_tasks(&self, arguments: Option<Value>) -> ToolOutcome {
        const TOOL: &str = "create_epic_with_tasks";
        let params: CreateEpicWithTasksParams = parse_args(TOOL, arguments)?;
        let fail = |e: Error| error_message(TOOL, e);
        let gateway = self.gateway().await;

        let epic_fields = creation_fields(
            &params.epic_title,
            params.epic_description.as_deref(),
            &params.assignment,
        )
        .map_err(fail)?;
        let epic = gateway
            .create(WorkItemType::Epic, epic_fields)
            .await
            .map_err(|e| format!("Error creating Epic: {}", e))?;
        info!(id = epic.id, "Created Epic");

        let titles = split_task_titles(params.task_titles.as_deref().unwrap_or_default());
        if titles.is_empty() {
            return Ok(report::epic_only_summary(&params.epic_title, &epic));
        }

        let descriptions = split_task_descriptions(
            params.task_descriptions.as_deref().unwrap_or_default(),
            titles.len(),
        );

        let mut tasks = Vec::with_capacity(titles.len());
        for (title, description) in titles.into_iter().zip(descriptions) {
            let fields = creation_fields(&title, Some(description.as_str()), &params.assignment)
                .map_err(fail)?;
            let created = gateway
                .create(WorkItemType::Task, fields)
                .await
                .map_err(|e| format!("Error creating task '{}': {}", title, e))?;
            debug!(id = created.id, title = %title, "Created Task");
            tasks.push((title, created));
        }

        let mut rows = Vec::with_capacity(tasks.len());
        for (title, created) in tasks {
            let linked = match gateway.link(epic.id, created.id).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(epic = epic.id, task = created.id, "Failed to link task: {}", e);
                    false
                }
            };
            rows.push(TaskRow {
                title,
                created,
                linked,
            });
        }

        info!(epic = epic.id, tasks = rows.len(), "Created Epic with Tasks");
        Ok(report::epic_summary(&params.epic_title, &epic, &rows))
    }

    async fn get_work_item(&self, arguments: Option<Value>) -> ToolOutcome {
        const TOOL: &str = "get_work_item";
        let params: ItemParams = parse_args(TOOL, arguments)?;
        let gateway = self.gateway().await;

        let item = gateway
            .get(params.item_id, true)
            .await
            .map_err(|e| error_message(TOOL, e))?;

        let mut children = Vec::new();
        if item.is_epic() {
            for child_id in item.child_ids() {
                match gateway.get(child_id, false).await {
                    Ok(child) => children.push(child),
                    Err(e) => warn!(epic = item.id, child = child_id, "Skipping child: {}", e),
                }
            }
        }

        Ok(report::work_item_details(&item, &children))
    }

    async fn update_work_item(&self, arguments: Option<Value>) -> ToolOutcome {
        const TOOL: &str = "update_work_item";
        let params: UpdateWorkItemParams = parse_args(TOOL, arguments)?;
        let fail = |e: Error| error_message(TOOL, e);

        let mut fields = FieldMap::new();
        if let Some(title) = non_empty(params.title.as_deref()) {
            fields = fields.with_title(title);
        }
        if let Some(description) = params.description.as_deref() {
            fields = fields.with_description(format_description(description));
        }
        if let Some(assigned_to) = params.assigned_to {
            fields = fields.with_assigned_to(assigned_to);
        }
        if let Some(priority) = params.priority {
            fields = fields.with_priority(Priority::new(priority).map_err(fail)?);
        }
        if let Some(tags) = params.tags {
            fields = fields.with_tags(tags);
        }

        let gateway = self.gateway().await;
        gateway
            .update(params.item_id, fields)
            .await
            .map_err(fail)?;
        Ok(report::updated_message(
            &gateway.work_item_url(params.item_id),
        ))
    }

    async fn delete_work_item(&self, arguments: Option<Value>) -> ToolOutcome {
        const TOOL: &str = "delete_work_item";
        let params: ItemParams = parse_args(TOOL, arguments)?;

        self.gateway()
            .await
            .delete(params.item_id)
            .await
            .map_err(|e| error_message(TOOL, e))?;
        info!(id = params.item_id, "Deleted work item");
        Ok(report::deleted_message(params.item_id))
    }

    async fn link_task_to_epic(&self, arguments: Option<Value>) -> ToolOutcome {
        const TOOL: &str = "link_task_to_epic";
        let params: LinkParams = parse_args(TOOL, arguments)?;

        self.gateway()
            .await
            .link(params.epic_id, params.task_id)
            .await
            .map_err(|e| error_message(TOOL, e))?;
        Ok(report::linked_message(params.epic_id, params.task_id))
    }

    async fn set_project(&self, arguments: Option<Value>) -> ToolOutcome {
        const TOOL: &str = "set_project";
        let params: SetProjectParams = parse_args(TOOL, arguments)?;
        let fail = |e: Error| error_message(TOOL, e);

        let project = params.new_project_name.trim();
        if project.is_empty() {
            return Err(fail(Error::InvalidData(
                "Project name must not be empty".to_string(),
            )));
        }

        let mut session = self.session.write().await;
        let config = session.config.with_project(project);
        let gateway = (self.factory)(&config).map_err(fail)?;

        let previous = std::mem::replace(&mut session.config, config);
        session.gateway = gateway;
        info!(from = %previous.project, to = project, "Switched project");

        Ok(report::project_changed_message(&previous.project, project))
    }
}

// =============================================================================
// Parameters
// =============================================================================

/// Fields shared by the create tools.
#[derive(Debug, Default, Deserialize)]
struct Assignment {
    assigned_to: Option<String>,
    priority: Option<i64>,
    tags: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateWorkItemParams {
    work_item_type: String,
    title: String,
    description: Option<String>,
    #[serde(flatten)]
    assignment: Assignment,
}

#[derive(Debug, Deserialize)]
struct CreateEpicWithTasksParams {
    epic_title: String,
    epic_description: Option<String>,
    task_titles: Option<String>,
    task_descriptions: Option<String>,
    #[serde(flatten)]
    assignment: Assignment,
}

#[derive(Debug, Deserialize)]
struct ItemParams {
    item_id: u64,
}

#[derive(Debug, Deserialize)]
struct UpdateWorkItemParams {
    item_id: u64,
    title: Option<String>,
    description: Option<String>,
    assigned_to: Option<String>,
    priority: Option<i64>,
    tags: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkParams {
    epic_id: u64,
    task_id: u64,
}

#[derive(Debug, Deserialize)]
struct SetProjectParams {
    new_project_name: String,
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Option<Value>) -> ToolOutcome<T> {
    let arguments = arguments.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(arguments)
        .map_err(|e| error_message(tool, format!("invalid arguments: {}", e)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Fields for a new work item. Blank optional values are left out.
fn creation_fields(
    title: &str,
    description: Option<&str>,
    assignment: &Assignment,
) -> Result<FieldMap> {
    if title.trim().is_empty() {
        return Err(Error::InvalidData("Title must not be empty".to_string()));
    }

    let mut fields = FieldMap::new().with_title(title.trim());
    if let Some(description) = non_empty(description) {
        fields = fields.with_description(format_description(description));
    }
    if let Some(assigned_to) = non_empty(assignment.assigned_to.as_deref()) {
        fields = fields.with_assigned_to(assigned_to);
    }
    if let Some(priority) = assignment.priority {
        fields = fields.with_priority(Priority::new(priority)?);
    }
    if let Some(tags) = non_empty(assignment.tags.as_deref()) {
        fields = fields.with_tags(tags);
    }
    Ok(fields)
}
