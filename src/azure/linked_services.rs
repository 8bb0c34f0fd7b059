//! Log Analytics linked services
//!
//! Typed access to `Microsoft.OperationalInsights/workspaces/linkedServices`.

use super::client::ArmClient;
pub use super::http::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PROVIDER_NAMESPACE: &str = "Microsoft.OperationalInsights";
pub const API_VERSION: &str = "2015-11-01-preview";

/// Linked service properties as they travel on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedServiceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

/// A linked service object, used both as request payload and response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, rename = "properties", skip_serializing_if = "Option::is_none")]
    pub linked_service_properties: Option<LinkedServiceProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

/// Remote operations the linked-service resource depends on
#[async_trait]
pub trait LinkedServicesApi: Send + Sync {
    /// Fetch a linked service; [`ApiError::NotFound`] when it does not exist
    async fn get(
        &self,
        resource_group: &str,
        workspace_name: &str,
        linked_service_name: &str,
    ) -> Result<LinkedService, ApiError>;

    /// Create or replace a linked service
    async fn create_or_update(
        &self,
        resource_group: &str,
        workspace_name: &str,
        linked_service_name: &str,
        parameters: &LinkedService,
    ) -> Result<LinkedService, ApiError>;

    /// Delete a linked service; [`ApiError::NotFound`] when already gone
    async fn delete(
        &self,
        resource_group: &str,
        workspace_name: &str,
        linked_service_name: &str,
    ) -> Result<(), ApiError>;
}

/// ARM-backed implementation of [`LinkedServicesApi`]
#[derive(Clone, Debug)]
pub struct LinkedServicesClient {
    client: ArmClient,
}

impl LinkedServicesClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    fn url(&self, resource_group: &str, workspace_name: &str, linked_service_name: &str) -> String {
        self.client.provider_url(
            resource_group,
            PROVIDER_NAMESPACE,
            &[
                ("workspaces", workspace_name),
                ("linkedServices", linked_service_name),
            ],
            API_VERSION,
        )
    }
}

fn decode(value: serde_json::Value) -> Result<LinkedService, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl LinkedServicesApi for LinkedServicesClient {
    async fn get(
        &self,
        resource_group: &str,
        workspace_name: &str,
        linked_service_name: &str,
    ) -> Result<LinkedService, ApiError> {
        let url = self.url(resource_group, workspace_name, linked_service_name);
        decode(self.client.get(&url).await?)
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        workspace_name: &str,
        linked_service_name: &str,
        parameters: &LinkedService,
    ) -> Result<LinkedService, ApiError> {
        let url = self.url(resource_group, workspace_name, linked_service_name);
        let body = serde_json::to_value(parameters).map_err(|e| ApiError::Decode(e.to_string()))?;
        let response = self.client.put(&url, &body).await?;
        if response.is_null() {
            return Ok(LinkedService::default());
        }
        decode(response)
    }

    async fn delete(
        &self,
        resource_group: &str,
        workspace_name: &str,
        linked_service_name: &str,
    ) -> Result<(), ApiError> {
        let url = self.url(resource_group, workspace_name, linked_service_name);
        self.client.delete(&url).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_payload_shape() {
        let payload = LinkedService {
            tags: Some(BTreeMap::from([("env".to_string(), "test".to_string())])),
            linked_service_properties: Some(LinkedServiceProperties {
                resource_id: Some("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Automation/automationAccounts/acct1".to_string()),
            }),
            ..Default::default()
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "properties": {
                    "resourceId": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Automation/automationAccounts/acct1"
                },
                "tags": {"env": "test"}
            })
        );
    }

    #[test]
    fn test_response_decoding_tolerates_missing_fields() {
        let service: LinkedService = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.OperationalInsights/workspaces/ws/linkedServices/automation",
            "name": "automation",
            "type": "Microsoft.OperationalInsights/workspaces/linkedServices"
        }))
        .unwrap();

        assert_eq!(service.name.as_deref(), Some("automation"));
        assert!(service.linked_service_properties.is_none());
        assert!(service.tags.is_none());
    }
}
