//! Azure DevOps API client implementation.

use async_trait::async_trait;
use azdo_core::{
    AzureDevOpsConfig, CreatedWorkItem, Error, FieldMap, FieldValue, Result, WorkItem,
    WorkItemField, WorkItemGateway, WorkItemRelation, WorkItemType, HIERARCHY_FORWARD,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{AdoIdentityRef, AdoWorkItem, JsonPatchOperation, RelationPayload};

/// REST API version for all work item calls.
const API_VERSION: &str = "7.1";

/// Content type required for work item writes.
const JSON_PATCH: &str = "application/json-patch+json";

/// Azure DevOps API client bound to one organization and project.
pub struct AzureDevOpsClient {
    config: AzureDevOpsConfig,
    client: reqwest::Client,
}

impl AzureDevOpsClient {
    pub fn new(config: AzureDevOpsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("azdo-tools")
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &AzureDevOpsConfig {
        &self.config
    }

    /// Build request with auth header.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, basic_auth(&self.config.token))
    }

    /// `{api}/workitems/{id}?api-version=7.1`
    fn work_item_endpoint(&self, id: u64) -> String {
        format!(
            "{}/workitems/{}?api-version={}",
            self.config.api_base(),
            id,
            API_VERSION
        )
    }

    /// API URL identifying a work item inside a relation.
    fn relation_url(&self, id: u64) -> String {
        format!("{}/workItems/{}", self.config.api_base(), id)
    }

    /// Send a JSON Patch document.
    async fn send_patch(
        &self,
        method: reqwest::Method,
        url: &str,
        operations: &[JsonPatchOperation],
    ) -> Result<AdoWorkItem> {
        debug!(url = url, operations = operations.len(), "Azure DevOps {} request", method);

        let body = serde_json::to_vec(operations)?;
        let response = self
            .request(method, url)
            .header(CONTENT_TYPE, JSON_PATCH)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Map non-success statuses to errors and decode the body.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = message,
                "Azure DevOps API error response"
            );
            return Err(Error::from_status(status_code, error_text(&message)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// `Basic base64(":" + pat)`
fn basic_auth(token: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!(":{}", token)))
}

/// Prefer the `message` of an Azure DevOps error body over the raw JSON.
fn error_text(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn field_path(field: WorkItemField) -> String {
    format!("/fields/{}", field.reference_name())
}

fn field_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Integer(n) => Value::from(*n),
    }
}

/// Patch for a new work item: empty values are left out.
fn create_operations(fields: &FieldMap) -> Vec<JsonPatchOperation> {
    fields
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(field, value)| JsonPatchOperation::add(field_path(*field), field_json(value)))
        .collect()
}

/// Patch for an update: empty values clear the field.
fn update_operations(fields: &FieldMap) -> Vec<JsonPatchOperation> {
    fields
        .iter()
        .map(|(field, value)| {
            if value.is_empty() {
                JsonPatchOperation::remove(field_path(*field))
            } else {
                JsonPatchOperation::add(field_path(*field), field_json(value))
            }
        })
        .collect()
}

fn text_field(item: &AdoWorkItem, field: WorkItemField) -> Option<String> {
    match item.fields.get(field.reference_name())? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Identity fields are objects on current API versions, strings on old ones.
fn identity_field(item: &AdoWorkItem, field: WorkItemField) -> Option<String> {
    match item.fields.get(field.reference_name())? {
        Value::String(s) => Some(s.clone()),
        value @ Value::Object(_) => {
            let identity: AdoIdentityRef = serde_json::from_value(value.clone()).ok()?;
            identity.display_name.or(identity.unique_name)
        }
        _ => None,
    }
}

fn map_work_item(item: AdoWorkItem, config: &AzureDevOpsConfig) -> WorkItem {
    let priority = item
        .fields
        .get(WorkItemField::Priority.reference_name())
        .and_then(Value::as_i64);

    WorkItem {
        id: item.id,
        work_item_type: text_field(&item, WorkItemField::WorkItemType),
        title: text_field(&item, WorkItemField::Title),
        state: text_field(&item, WorkItemField::State),
        assigned_to: identity_field(&item, WorkItemField::AssignedTo),
        priority,
        tags: text_field(&item, WorkItemField::Tags),
        created_date: text_field(&item, WorkItemField::CreatedDate),
        description: text_field(&item, WorkItemField::Description),
        url: config.work_item_url(item.id),
        relations: item
            .relations
            .unwrap_or_default()
            .into_iter()
            .map(|r| WorkItemRelation {
                rel: r.rel,
                url: r.url,
            })
            .collect(),
    }
}

// =============================================================================
// Gateway implementation
// =============================================================================

#[async_trait]
impl WorkItemGateway for AzureDevOpsClient {
    async fn create(&self, kind: WorkItemType, fields: FieldMap) -> Result<CreatedWorkItem> {
        let url = format!(
            "{}/workitems/${}?api-version={}",
            self.config.api_base(),
            kind.as_str(),
            API_VERSION
        );
        let operations = create_operations(&fields);

        let created = self
            .send_patch(reqwest::Method::POST, &url, &operations)
            .await?;

        debug!(id = created.id, kind = %kind, "Created work item");
        Ok(CreatedWorkItem {
            id: created.id,
            url: self.config.work_item_url(created.id),
        })
    }

    async fn get(&self, id: u64, expand_relations: bool) -> Result<WorkItem> {
        let mut url = self.work_item_endpoint(id);
        if expand_relations {
            url.push_str("&$expand=relations");
        }
        debug!(url = url, "Azure DevOps GET request");

        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let item: AdoWorkItem = self.handle_response(response).await?;
        Ok(map_work_item(item, &self.config))
    }

    async fn update(&self, id: u64, fields: FieldMap) -> Result<()> {
        if fields.is_empty() {
            return Err(Error::InvalidData(
                "No fields to update were provided".to_string(),
            ));
        }

        let url = self.work_item_endpoint(id);
        let operations = update_operations(&fields);
        self.send_patch(reqwest::Method::PATCH, &url, &operations)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<()> {
        let url = self.work_item_endpoint(id);
        debug!(url = url, "Azure DevOps DELETE request");

        let response = self
            .request(reqwest::Method::DELETE, &url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(status = status_code, id, "Failed to delete work item");
            return Err(Error::from_status(status_code, error_text(&message)));
        }

        Ok(())
    }

    async fn link(&self, parent_id: u64, child_id: u64) -> Result<()> {
        let url = self.work_item_endpoint(parent_id);
        let relation = RelationPayload {
            rel: HIERARCHY_FORWARD.to_string(),
            url: self.relation_url(child_id),
        };
        let operations = [JsonPatchOperation::add(
            "/relations/-",
            serde_json::to_value(relation)?,
        )];

        self.send_patch(reqwest::Method::PATCH, &url, &operations)
            .await?;
        debug!(parent = parent_id, child = child_id, "Linked work items");
        Ok(())
    }

    fn work_item_url(&self, id: u64) -> String {
        self.config.work_item_url(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azdo_core::Priority;

    fn config() -> AzureDevOpsConfig {
        AzureDevOpsConfig::new("contoso", "Fabrikam", "pat-123")
    }

    #[test]
    fn test_basic_auth_uses_empty_user() {
        // ":pat-123"
        assert_eq!(basic_auth("pat-123"), "Basic OnBhdC0xMjM=");
    }

    #[test]
    fn test_endpoints() {
        let client = AzureDevOpsClient::new(config()).unwrap();
        assert_eq!(
            client.work_item_endpoint(89),
            "https://dev.azure.com/contoso/Fabrikam/_apis/wit/workitems/89?api-version=7.1"
        );
        assert_eq!(
            client.relation_url(90),
            "https://dev.azure.com/contoso/Fabrikam/_apis/wit/workItems/90"
        );
        assert_eq!(
            client.work_item_url(89),
            "https://dev.azure.com/contoso/Fabrikam/_workitems/edit/89"
        );
    }

    #[test]
    fn test_create_operations_skip_empty_values() {
        let fields = FieldMap::new()
            .with_title("Build API")
            .with_description("")
            .with_priority(Priority::new(2).unwrap());

        let ops = create_operations(&fields);
        assert_eq!(
            serde_json::to_value(&ops).unwrap(),
            serde_json::json!([
                {"op": "add", "path": "/fields/System.Title", "value": "Build API"},
                {"op": "add", "path": "/fields/Microsoft.VSTS.Common.Priority", "value": 2}
            ])
        );
    }

    #[test]
    fn test_update_operations_remove_empty_values() {
        let fields = FieldMap::new().with_title("Renamed").with_tags("");

        let ops = update_operations(&fields);
        assert_eq!(
            serde_json::to_value(&ops).unwrap(),
            serde_json::json!([
                {"op": "add", "path": "/fields/System.Title", "value": "Renamed"},
                {"op": "remove", "path": "/fields/System.Tags"}
            ])
        );
    }

    #[test]
    fn test_error_text_prefers_message() {
        assert_eq!(
            error_text(r#"{"$id":"1","message":"TF401232: Work item 9 does not exist"}"#),
            "TF401232: Work item 9 does not exist"
        );
        assert_eq!(error_text("plain failure"), "plain failure");
    }

    #[test]
    fn test_map_work_item() {
        let raw: AdoWorkItem = serde_json::from_value(serde_json::json!({
            "id": 81,
            "fields": {
                "System.WorkItemType": "Epic",
                "System.Title": "Automation Semantic Model",
                "System.State": "Active",
                "System.AssignedTo": {"displayName": "Ada Lovelace", "uniqueName": "ada@contoso.com"},
                "Microsoft.VSTS.Common.Priority": 1,
                "System.CreatedDate": "2024-05-01T10:00:00Z"
            },
            "relations": [
                {"rel": "System.LinkTypes.Hierarchy-Forward", "url": "https://dev.azure.com/contoso/Fabrikam/_apis/wit/workItems/89", "attributes": {"isLocked": false}}
            ]
        }))
        .unwrap();

        let item = map_work_item(raw, &config());
        assert_eq!(item.work_item_type.as_deref(), Some("Epic"));
        assert_eq!(item.assigned_to.as_deref(), Some("Ada Lovelace"));
        assert_eq!(item.priority, Some(1));
        assert_eq!(item.tags, None);
        assert_eq!(item.child_ids(), vec![89]);
        assert_eq!(
            item.url,
            "https://dev.azure.com/contoso/Fabrikam/_workitems/edit/81"
        );
    }

    // =========================================================================
    // Integration tests with httpmock
    // =========================================================================

    mod integration {
        use super::*;
        use httpmock::prelude::*;

        fn create_client(server: &MockServer) -> AzureDevOpsClient {
            AzureDevOpsClient::new(config().with_base_url(server.base_url())).unwrap()
        }

        #[tokio::test]
        async fn test_create_work_item() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/contoso/Fabrikam/_apis/wit/workitems/$Task")
                    .query_param("api-version", "7.1")
                    .header("Authorization", "Basic OnBhdC0xMjM=")
                    .header("Content-Type", "application/json-patch+json")
                    .json_body(serde_json::json!([
                        {"op": "add", "path": "/fields/System.Title", "value": "Build API"},
                        {"op": "add", "path": "/fields/System.Description", "value": "<p>REST endpoints</p>"}
                    ]));
                then.status(200).json_body(serde_json::json!({
                    "id": 90,
                    "rev": 1,
                    "fields": {"System.Title": "Build API"}
                }));
            });

            let client = create_client(&server);
            let created = client
                .create(
                    WorkItemType::Task,
                    FieldMap::new()
                        .with_title("Build API")
                        .with_description("<p>REST endpoints</p>")
                        .with_assigned_to(""),
                )
                .await
                .unwrap();

            mock.assert_async().await;
            assert_eq!(created.id, 90);
            assert_eq!(
                created.url,
                format!("{}/contoso/Fabrikam/_workitems/edit/90", server.base_url())
            );
        }

        #[tokio::test]
        async fn test_get_work_item_with_relations() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/contoso/Fabrikam/_apis/wit/workitems/81")
                    .query_param("api-version", "7.1")
                    .query_param("$expand", "relations");
                then.status(200).json_body(serde_json::json!({
                    "id": 81,
                    "fields": {
                        "System.WorkItemType": "Epic",
                        "System.Title": "Platform",
                        "System.Tags": "backend; q3"
                    },
                    "relations": [
                        {"rel": "System.LinkTypes.Hierarchy-Forward", "url": "http://x/_apis/wit/workItems/90"},
                        {"rel": "System.LinkTypes.Hierarchy-Forward", "url": "http://x/_apis/wit/workItems/91"}
                    ]
                }));
            });

            let client = create_client(&server);
            let item = client.get(81, true).await.unwrap();

            mock.assert_async().await;
            assert_eq!(item.title.as_deref(), Some("Platform"));
            assert_eq!(item.tags.as_deref(), Some("backend; q3"));
            assert_eq!(item.child_ids(), vec![90, 91]);
        }

        #[tokio::test]
        async fn test_get_work_item_not_found() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET)
                    .path("/contoso/Fabrikam/_apis/wit/workitems/999");
                then.status(404).json_body(serde_json::json!({
                    "message": "TF401232: Work item 999 does not exist."
                }));
            });

            let client = create_client(&server);
            let err = client.get(999, false).await.unwrap_err();

            match err {
                Error::NotFound(message) => assert!(message.contains("999 does not exist")),
                other => panic!("Expected NotFound, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_update_work_item() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(PATCH)
                    .path("/contoso/Fabrikam/_apis/wit/workitems/89")
                    .header("Content-Type", "application/json-patch+json")
                    .json_body(serde_json::json!([
                        {"op": "remove", "path": "/fields/System.AssignedTo"},
                        {"op": "add", "path": "/fields/Microsoft.VSTS.Common.Priority", "value": 3}
                    ]));
                then.status(200)
                    .json_body(serde_json::json!({"id": 89, "fields": {}}));
            });

            let client = create_client(&server);
            client
                .update(
                    89,
                    FieldMap::new()
                        .with_assigned_to("")
                        .with_priority(Priority::new(3).unwrap()),
                )
                .await
                .unwrap();

            mock.assert_async().await;
        }

        #[tokio::test]
        async fn test_update_without_fields_is_rejected_locally() {
            let server = MockServer::start();
            let client = create_client(&server);

            let err = client.update(89, FieldMap::new()).await.unwrap_err();
            assert!(matches!(err, Error::InvalidData(_)));
        }

        #[tokio::test]
        async fn test_delete_work_item() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(DELETE)
                    .path("/contoso/Fabrikam/_apis/wit/workitems/89")
                    .query_param("api-version", "7.1");
                then.status(200).json_body(serde_json::json!({"id": 89}));
            });

            let client = create_client(&server);
            client.delete(89).await.unwrap();
            mock.assert_async().await;
        }

        #[tokio::test]
        async fn test_delete_unauthorized() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(DELETE)
                    .path("/contoso/Fabrikam/_apis/wit/workitems/89");
                then.status(401).body("Access denied");
            });

            let client = create_client(&server);
            let err = client.delete(89).await.unwrap_err();
            assert!(matches!(err, Error::Unauthorized(_)));
        }

        #[tokio::test]
        async fn test_link_task_to_epic() {
            let server = MockServer::start();
            let child_url = format!(
                "{}/contoso/Fabrikam/_apis/wit/workItems/90",
                server.base_url()
            );

            let mock = server.mock(|when, then| {
                when.method(PATCH)
                    .path("/contoso/Fabrikam/_apis/wit/workitems/81")
                    .json_body(serde_json::json!([{
                        "op": "add",
                        "path": "/relations/-",
                        "value": {
                            "rel": "System.LinkTypes.Hierarchy-Forward",
                            "url": child_url
                        }
                    }]));
                then.status(200)
                    .json_body(serde_json::json!({"id": 81, "fields": {}}));
            });

            let client = create_client(&server);
            client.link(81, 90).await.unwrap();
            mock.assert_async().await;
        }

        #[tokio::test]
        async fn test_link_rule_violation() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(PATCH)
                    .path("/contoso/Fabrikam/_apis/wit/workitems/81");
                then.status(400).json_body(serde_json::json!({
                    "message": "TF201036: You cannot add a Child link"
                }));
            });

            let client = create_client(&server);
            let err = client.link(81, 90).await.unwrap_err();
            assert_eq!(
                err.to_string(),
                "API error: 400 - TF201036: You cannot add a Child link"
            );
        }
    }
}
