//! Log Analytics workspace linked service
//!
//! Attaches an external account (currently only an Automation account) to a
//! Log Analytics workspace. The remote object is addressed by
//! (resource group, workspace, linked-service name); all three are
//! force-new, so only `tags` can change in place.

use super::id::LinkedServiceId;
use super::schema::{FieldSchema, ResourceSchema, Validator};
use super::tags::{self, Tags};
use super::{cancellable, Plan, RemoteState, ResourceLifecycle};
use crate::azure::linked_services::{LinkedService, LinkedServiceProperties, LinkedServicesApi};
use crate::error::{Error, FieldError, Identity, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const RESOURCE_TYPE: &str = "azurerm_log_analytics_workspace_linked_service";
pub const DEFAULT_LINKED_SERVICE_NAME: &str = "automation";
pub const ALLOWED_LINKED_SERVICE_NAMES: &[&str] = &["automation"];
pub const RESOURCE_ID_KEY: &str = "resource_id";

/// Schema of the linked-service resource
pub fn linked_service_schema() -> ResourceSchema {
    ResourceSchema {
        type_name: RESOURCE_TYPE,
        fields: vec![
            FieldSchema::required_string("resource_group_name")
                .force_new()
                .case_insensitive()
                .with_validator(Validator::ResourceGroupName),
            FieldSchema::required_string("workspace_name")
                .force_new()
                .case_insensitive()
                .with_validator(Validator::WorkspaceName),
            FieldSchema::optional_string("linked_service_name")
                .force_new()
                .with_default(DEFAULT_LINKED_SERVICE_NAME)
                .one_of(ALLOWED_LINKED_SERVICE_NAMES),
            FieldSchema::required_map("linked_service_properties")
                .force_new()
                .with_elem(
                    FieldSchema::required_string(RESOURCE_ID_KEY)
                        .force_new()
                        .with_validator(Validator::ResourceId),
                ),
            FieldSchema::computed_string("name"),
            FieldSchema::optional_map("tags"),
        ],
    }
}

/// Desired state of a linked service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedServiceConfig {
    pub resource_group_name: String,
    pub workspace_name: String,
    pub linked_service_name: String,
    pub linked_service_properties: LinkedServicePropertiesConfig,
    #[serde(default)]
    pub tags: Tags,
}

/// The single-entry `linked_service_properties` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedServicePropertiesConfig {
    pub resource_id: String,
}

impl LinkedServiceConfig {
    pub fn identity(&self) -> Identity {
        Identity {
            resource_group: self.resource_group_name.clone(),
            workspace: self.workspace_name.clone(),
            linked_service: self.linked_service_name.clone(),
        }
    }

    /// Request payload for CreateOrUpdate
    pub fn to_request(&self) -> LinkedService {
        LinkedService {
            tags: tags::expand_tags(&self.tags),
            linked_service_properties: Some(expand_linked_service_properties(
                &self.linked_service_properties,
            )),
            ..Default::default()
        }
    }

    /// Decode loosely-typed host configuration, reporting every invalid field
    pub fn decode(raw: &Value) -> Result<Self> {
        let schema = linked_service_schema();
        let Some(object) = raw.as_object() else {
            return Err(Error::validation("<root>", "configuration must be a map"));
        };

        let mut errors = Vec::new();

        for key in object.keys() {
            match schema.field(key) {
                None => errors.push(FieldError::new(key.as_str(), "unsupported argument")),
                Some(field) if field.computed => {
                    errors.push(FieldError::new(key.as_str(), "computed field cannot be set"))
                }
                Some(_) => {}
            }
        }

        let mut string_field = |name: &str| -> Option<String> {
            let field = schema.field(name)?;
            let value = match object.get(name) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => match field.default {
                    Some(default) => default.to_string(),
                    None => {
                        errors.push(FieldError::new(name, "required field is missing"));
                        return None;
                    }
                },
                Some(_) => {
                    errors.push(FieldError::new(name, "expected a string"));
                    return None;
                }
            };
            if let Err(message) = field.validate(&value) {
                errors.push(FieldError::new(name, message));
                return None;
            }
            Some(value)
        };

        let resource_group_name = string_field("resource_group_name");
        let workspace_name = string_field("workspace_name");
        let linked_service_name = string_field("linked_service_name");

        let linked_service_properties =
            match decode_properties(&schema, object.get("linked_service_properties")) {
                Ok(props) => Some(props),
                Err(mut e) => {
                    errors.append(&mut e);
                    None
                }
            };

        let tags = match tags::decode_tags("tags", object.get("tags")) {
            Ok(tags) => Some(tags),
            Err(mut e) => {
                errors.append(&mut e);
                None
            }
        };

        match (
            resource_group_name,
            workspace_name,
            linked_service_name,
            linked_service_properties,
            tags,
        ) {
            (Some(rg), Some(ws), Some(ls), Some(props), Some(tags)) if errors.is_empty() => {
                Ok(Self {
                    resource_group_name: rg,
                    workspace_name: ws,
                    linked_service_name: ls,
                    linked_service_properties: props,
                    tags,
                })
            }
            _ => Err(Error::Validation(errors)),
        }
    }
}

fn decode_properties(
    schema: &ResourceSchema,
    value: Option<&Value>,
) -> Result<LinkedServicePropertiesConfig, Vec<FieldError>> {
    const FIELD: &str = "linked_service_properties";

    let Some(map) = value.and_then(Value::as_object) else {
        let message = match value {
            None | Some(Value::Null) => "required field is missing",
            Some(_) => "expected a map",
        };
        return Err(vec![FieldError::new(FIELD, message)]);
    };

    let mut errors: Vec<FieldError> = map
        .keys()
        .filter(|k| k.as_str() != RESOURCE_ID_KEY)
        .map(|k| FieldError::new(format!("{}.{}", FIELD, k), "unsupported argument"))
        .collect();

    let path = format!("{}.{}", FIELD, RESOURCE_ID_KEY);
    let resource_id = match map.get(RESOURCE_ID_KEY) {
        Some(Value::String(s)) => {
            let elem = schema
                .field(FIELD)
                .and_then(|f| f.elem.iter().find(|e| e.name == RESOURCE_ID_KEY));
            match elem.map(|e| e.validate(s)) {
                Some(Err(message)) => {
                    errors.push(FieldError::new(path, message));
                    None
                }
                _ => Some(s.clone()),
            }
        }
        None | Some(Value::Null) => {
            errors.push(FieldError::new(path, "required field is missing"));
            None
        }
        Some(_) => {
            errors.push(FieldError::new(path, "expected a string"));
            None
        }
    };

    match resource_id {
        Some(resource_id) if errors.is_empty() => Ok(LinkedServicePropertiesConfig { resource_id }),
        _ => Err(errors),
    }
}

/// Configuration properties to the request shape
pub fn expand_linked_service_properties(
    input: &LinkedServicePropertiesConfig,
) -> LinkedServiceProperties {
    LinkedServiceProperties {
        resource_id: Some(input.resource_id.clone()),
    }
}

/// Response properties to the flat configuration shape
///
/// Exact inverse of [`expand_linked_service_properties`] so a
/// create-then-read round trip reports no change.
pub fn flatten_linked_service_properties(
    input: Option<&LinkedServiceProperties>,
) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    let Some(input) = input else {
        return properties;
    };

    if let Some(resource_id) = &input.resource_id {
        properties.insert(RESOURCE_ID_KEY.to_string(), resource_id.clone());
    }
    properties
}

/// Observed state of a linked service, written back to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedServiceState {
    pub name: String,
    pub resource_group_name: String,
    pub workspace_name: String,
    pub linked_service_name: String,
    pub linked_service_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Tags,
}

/// The linked-service resource, bound to an API client
pub struct LinkedServiceResource {
    client: Arc<dyn LinkedServicesApi>,
    /// Refuse to adopt remote objects under a new logical resource
    require_import: bool,
}

impl LinkedServiceResource {
    pub fn new(client: Arc<dyn LinkedServicesApi>, require_import: bool) -> Self {
        Self {
            client,
            require_import,
        }
    }

    /// Shared implementation of create and update
    pub async fn create_or_update(
        &self,
        config: &LinkedServiceConfig,
        is_new: bool,
        cancel: &CancellationToken,
    ) -> Result<RemoteState<LinkedServiceState>> {
        tracing::info!("preparing arguments for Log Analytics Linked Service creation");

        let identity = config.identity();
        let (rg, ws, ls) = (
            config.resource_group_name.as_str(),
            config.workspace_name.as_str(),
            config.linked_service_name.as_str(),
        );

        if self.require_import && is_new {
            match cancellable(cancel, self.client.get(rg, ws, ls)).await? {
                Ok(existing) => {
                    if let Some(id) = existing.id.filter(|id| !id.is_empty()) {
                        tracing::warn!("{} already exists remotely as {}", identity, id);
                        return Err(Error::AlreadyExists {
                            resource_type: RESOURCE_TYPE,
                            id,
                        });
                    }
                }
                Err(e) if e.is_not_found() => {}
                Err(source) => {
                    return Err(Error::Remote {
                        operation: "checking for presence of existing",
                        identity,
                        source,
                    })
                }
            }
        }

        let parameters = config.to_request();
        cancellable(cancel, self.client.create_or_update(rg, ws, ls, &parameters))
            .await?
            .map_err(|source| Error::Remote {
                operation: "creating",
                identity: identity.clone(),
                source,
            })?;

        let read = cancellable(cancel, self.client.get(rg, ws, ls))
            .await?
            .map_err(|e| Error::PostWriteVerification {
                identity: identity.clone(),
                reason: e.to_string(),
            })?;

        let Some(id) = read.id.filter(|id| !id.is_empty()) else {
            return Err(Error::PostWriteVerification {
                identity,
                reason: "the service returned no ID".to_string(),
            });
        };

        tracing::debug!("{} written as {}", identity, id);
        self.read(&id, cancel).await
    }

    /// Refresh state from the remote object; `Absent` when it is gone
    pub async fn read(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteState<LinkedServiceState>> {
        let parsed = LinkedServiceId::parse(id)?;
        let (rg, ws, ls) = (
            parsed.resource_group.as_str(),
            parsed.workspace_name.as_str(),
            parsed.linked_service_name.as_str(),
        );

        let response = match cancellable(cancel, self.client.get(rg, ws, ls)).await? {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                tracing::info!("Linked Service {:?} was not found, removing from state", ls);
                return Ok(RemoteState::Absent);
            }
            Err(source) => {
                return Err(Error::Remote {
                    operation: "reading",
                    identity: identity_of(&parsed),
                    source,
                })
            }
        };

        if response.id.as_deref().map_or(true, str::is_empty) {
            tracing::info!("Linked Service {:?} returned no ID, removing from state", ls);
            return Ok(RemoteState::Absent);
        }

        let state = LinkedServiceState {
            name: response.name.clone().unwrap_or_default(),
            resource_group_name: parsed.resource_group.clone(),
            workspace_name: parsed.workspace_name.clone(),
            linked_service_name: parsed.linked_service_name.clone(),
            linked_service_properties: flatten_linked_service_properties(
                response.linked_service_properties.as_ref(),
            ),
            tags: tags::flatten_tags(response.tags.as_ref()),
        };

        Ok(RemoteState::Present {
            id: id.to_string(),
            state,
        })
    }

    /// Delete the remote object; an already-missing object is not an error
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let parsed = LinkedServiceId::parse(id)?;

        match cancellable(
            cancel,
            self.client.delete(
                &parsed.resource_group,
                &parsed.workspace_name,
                &parsed.linked_service_name,
            ),
        )
        .await?
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} already deleted", identity_of(&parsed));
                Ok(())
            }
            Err(source) => Err(Error::Remote {
                operation: "deleting",
                identity: identity_of(&parsed),
                source,
            }),
        }
    }

    /// Pass-through import: read the object an arbitrary id points at
    pub async fn import(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteState<LinkedServiceState>> {
        match self.read(id, cancel).await? {
            RemoteState::Absent => Err(Error::NotImported { id: id.to_string() }),
            present => Ok(present),
        }
    }

    /// Diff configuration against prior state
    pub fn plan(&self, prior: Option<&LinkedServiceState>, config: &LinkedServiceConfig) -> Plan {
        plan_changes(prior, config)
    }
}

fn identity_of(id: &LinkedServiceId) -> Identity {
    Identity {
        resource_group: id.resource_group.clone(),
        workspace: id.workspace_name.clone(),
        linked_service: id.linked_service_name.clone(),
    }
}

fn plan_changes(prior: Option<&LinkedServiceState>, config: &LinkedServiceConfig) -> Plan {
    let Some(prior) = prior else {
        return Plan::Create;
    };
    let schema = linked_service_schema();

    let desired_properties = flatten_linked_service_properties(Some(
        &expand_linked_service_properties(&config.linked_service_properties),
    ));

    let string_changes = [
        ("resource_group_name", &prior.resource_group_name, &config.resource_group_name),
        ("workspace_name", &prior.workspace_name, &config.workspace_name),
        ("linked_service_name", &prior.linked_service_name, &config.linked_service_name),
    ];

    let mut changed: Vec<&'static str> = string_changes
        .into_iter()
        .filter(|(name, old, new)| {
            !schema
                .field(name)
                .is_some_and(|field| field.suppresses_diff(old, new))
        })
        .map(|(name, _, _)| name)
        .collect();

    if prior.linked_service_properties != desired_properties {
        changed.push("linked_service_properties");
    }
    if prior.tags != config.tags {
        changed.push("tags");
    }

    if changed.is_empty() {
        return Plan::NoOp;
    }

    let replace = changed
        .iter()
        .any(|name| schema.field(name).is_some_and(|field| field.force_new));
    if replace {
        Plan::Replace { changed }
    } else {
        Plan::Update { changed }
    }
}

#[async_trait]
impl ResourceLifecycle for LinkedServiceResource {
    type Config = LinkedServiceConfig;
    type State = LinkedServiceState;

    fn schema(&self) -> ResourceSchema {
        linked_service_schema()
    }

    fn decode(raw: &Value) -> Result<LinkedServiceConfig> {
        LinkedServiceConfig::decode(raw)
    }

    fn plan(&self, prior: Option<&LinkedServiceState>, config: &LinkedServiceConfig) -> Plan {
        plan_changes(prior, config)
    }

    async fn create(
        &self,
        config: &LinkedServiceConfig,
        cancel: &CancellationToken,
    ) -> Result<RemoteState<LinkedServiceState>> {
        self.create_or_update(config, true, cancel).await
    }

    async fn update(
        &self,
        config: &LinkedServiceConfig,
        cancel: &CancellationToken,
    ) -> Result<RemoteState<LinkedServiceState>> {
        self.create_or_update(config, false, cancel).await
    }

    async fn read(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteState<LinkedServiceState>> {
        LinkedServiceResource::read(self, id, cancel).await
    }

    async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        LinkedServiceResource::delete(self, id, cancel).await
    }

    async fn import(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteState<LinkedServiceState>> {
        LinkedServiceResource::import(self, id, cancel).await
    }
}
