//! Tool calls through the REST gateway against a mock Azure DevOps server.

use std::sync::Arc;

use azdo_client::AzureDevOpsClient;
use azdo_core::{AzureDevOpsConfig, WorkItemGateway};
use azdo_mcp::protocol::{ToolCallResult, ToolResultContent};
use azdo_mcp::{GatewayFactory, ToolHandler};
use httpmock::prelude::*;
use serde_json::json;

fn handler(server: &MockServer) -> ToolHandler {
    let config = AzureDevOpsConfig::new("contoso", "Fabrikam", "pat-123")
        .with_base_url(server.base_url());
    ToolHandler::azure_devops(config).unwrap()
}

fn text(result: &ToolCallResult) -> &str {
    match &result.content[0] {
        ToolResultContent::Text { text } => text,
    }
}

#[tokio::test]
async fn test_create_epic_with_tasks_end_to_end() {
    let server = MockServer::start();
    let api = "/contoso/Fabrikam/_apis/wit";

    let epic = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/workitems/$Epic", api))
            .header("Authorization", "Basic OnBhdC0xMjM=")
            .json_body(json!([
                {"op": "add", "path": "/fields/System.Title", "value": "Data Platform"},
                {"op": "add", "path": "/fields/System.Description", "value": "<p>Ingest everything</p>"},
                {"op": "add", "path": "/fields/Microsoft.VSTS.Common.Priority", "value": 2}
            ]));
        then.status(200).json_body(json!({"id": 81, "fields": {}}));
    });

    let import = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/workitems/$Task", api))
            .body_includes("Data Import")
            .body_includes("<ol>\\n<li>Catalogue</li>\\n<li>Validate</li>\\n</ol>");
        then.status(200).json_body(json!({"id": 89, "fields": {}}));
    });

    let reporting = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/workitems/$Task", api))
            .body_includes("Reporting")
            .body_includes("<p>Dashboards, alerts</p>");
        then.status(200).json_body(json!({"id": 90, "fields": {}}));
    });

    let link_import = server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("{}/workitems/81", api))
            .header("Content-Type", "application/json-patch+json")
            .body_includes("System.LinkTypes.Hierarchy-Forward")
            .body_includes("workItems/89");
        then.status(200).json_body(json!({"id": 81, "fields": {}}));
    });

    let link_reporting = server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("{}/workitems/81", api))
            .body_includes("workItems/90");
        then.status(400)
            .json_body(json!({"message": "TF201036: link rejected"}));
    });

    let result = handler(&server)
        .execute(
            "create_epic_with_tasks",
            Some(json!({
                "epic_title": "Data Platform",
                "epic_description": "Ingest everything",
                "task_titles": "Data Import, Reporting",
                "task_descriptions": "1. Catalogue\\n2. Validate ||| Dashboards, alerts",
                "priority": 2
            })),
        )
        .await;

    epic.assert_async().await;
    import.assert_async().await;
    reporting.assert_async().await;
    link_import.assert_async().await;
    link_reporting.assert_async().await;

    assert!(result.is_error.is_none(), "{}", text(&result));
    let output = text(&result);
    let base = server.base_url();
    assert!(output.contains(&format!(
        "| Data Platform | Epic | 81 | - | {}/contoso/Fabrikam/_workitems/edit/81 |",
        base
    )));
    assert!(output.contains("| Data Import | Task | 89 | ✅ |"));
    assert!(output.contains("| Reporting | Task | 90 | ❌ |"));
}

#[tokio::test]
async fn test_get_epic_with_children_end_to_end() {
    let server = MockServer::start();
    let api = "/contoso/Fabrikam/_apis/wit";
    let child_url = format!("{}{}/workItems/89", server.base_url(), api);

    server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/workitems/81", api))
            .query_param("$expand", "relations");
        then.status(200).json_body(json!({
            "id": 81,
            "fields": {
                "System.WorkItemType": "Epic",
                "System.Title": "Data Platform",
                "System.State": "Active",
                "Microsoft.VSTS.Common.Priority": 2
            },
            "relations": [
                {"rel": "System.LinkTypes.Hierarchy-Reverse", "url": format!("{}{}/workItems/1", server.base_url(), api)},
                {"rel": "System.LinkTypes.Hierarchy-Forward", "url": child_url}
            ]
        }));
    });

    server.mock(|when, then| {
        when.method(GET).path(format!("{}/workitems/89", api));
        then.status(200).json_body(json!({
            "id": 89,
            "fields": {
                "System.WorkItemType": "Task",
                "System.Title": "Data Import",
                "System.State": "New",
                "System.AssignedTo": {"displayName": "Ada Lovelace"}
            }
        }));
    });

    let result = handler(&server)
        .execute("get_work_item", Some(json!({"item_id": 81})))
        .await;

    let output = text(&result);
    assert!(output.contains("=== Epic Details ==="));
    assert!(output.contains("Priority: 2"));
    assert!(output.contains("Child Work Items (1 total)"));
    assert!(output.contains("| 89 | Task | Data Import | New | Ada Lovelace |"));
}

#[tokio::test]
async fn test_set_project_targets_new_project() {
    let server = MockServer::start();

    let delete = server.mock(|when, then| {
        when.method(DELETE)
            .path("/contoso/Mobile/_apis/wit/workitems/7")
            .query_param("api-version", "7.1");
        then.status(200).json_body(json!({"id": 7}));
    });

    let handler = handler(&server);
    let switched = handler
        .execute("set_project", Some(json!({"new_project_name": "Mobile"})))
        .await;
    assert!(text(&switched).contains("to 'Mobile'"));

    let result = handler
        .execute("delete_work_item", Some(json!({"item_id": 7})))
        .await;

    delete.assert_async().await;
    assert_eq!(
        text(&result),
        "Work item deleted successfully! Deleted Work item ID: 7"
    );
}

#[tokio::test]
async fn test_custom_factory_with_rest_client() {
    let server = MockServer::start();
    let base_url = server.base_url();

    let factory: GatewayFactory = Arc::new(
        move |config: &AzureDevOpsConfig| -> azdo_core::Result<Arc<dyn WorkItemGateway>> {
            let config = config.clone().with_base_url(base_url.clone());
            Ok(Arc::new(AzureDevOpsClient::new(config)?))
        },
    );
    let handler =
        ToolHandler::new(AzureDevOpsConfig::new("contoso", "Fabrikam", "pat"), factory).unwrap();

    server.mock(|when, then| {
        when.method(GET).path("/contoso/Fabrikam/_apis/wit/workitems/404");
        then.status(404)
            .json_body(json!({"message": "TF401232: Work item 404 does not exist"}));
    });

    let result = handler
        .execute("get_work_item", Some(json!({"item_id": 404})))
        .await;

    assert_eq!(result.is_error, Some(true));
    assert_eq!(
        text(&result),
        "Error during get_work_item: Not found: TF401232: Work item 404 does not exist"
    );
}
