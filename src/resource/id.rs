//! Azure resource identifiers
//!
//! An ARM id is a `/`-separated list of key/value pairs:
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}/...`.

use crate::error::{Error, Result};
use std::fmt;

/// A parsed Azure resource identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: Option<String>,
    pub provider: Option<String>,
    /// Remaining (collection, name) pairs in their original order
    pub path: Vec<(String, String)>,
}

impl ResourceId {
    /// Parse an id, failing on odd segment counts, empty segments, or a
    /// missing subscription
    pub fn parse(id: &str) -> Result<Self> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_id(id, "id is empty"));
        }
        if !trimmed.starts_with('/') {
            return Err(Error::invalid_id(id, "id must start with '/'"));
        }

        let path = trimmed.trim_start_matches('/').trim_end_matches('/');
        let components: Vec<&str> = path.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(Error::invalid_id(
                id,
                "the number of path segments is not divisible by 2",
            ));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut pairs = Vec::new();

        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(Error::invalid_id(
                    id,
                    format!("key/value cannot be empty strings (key: {:?}, value: {:?})", key, value),
                ));
            }

            match key {
                "subscriptions" => subscription_id = Some(value.to_string()),
                k if k.eq_ignore_ascii_case("resourceGroups") => {
                    resource_group = Some(value.to_string())
                }
                "providers" => provider = Some(value.to_string()),
                _ => pairs.push((key.to_string(), value.to_string())),
            }
        }

        let Some(subscription_id) = subscription_id else {
            return Err(Error::invalid_id(id, "no subscription id found"));
        };

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            path: pairs,
        })
    }

    /// Look up a path segment value by its collection key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)?;
        if let Some(rg) = &self.resource_group {
            write!(f, "/resourceGroups/{}", rg)?;
        }
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
        }
        for (key, value) in &self.path {
            write!(f, "/{}/{}", key, value)?;
        }
        Ok(())
    }
}

/// Identity of a linked service, decomposed from its persisted id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedServiceId {
    pub resource_group: String,
    pub workspace_name: String,
    pub linked_service_name: String,
}

impl LinkedServiceId {
    pub fn parse(id: &str) -> Result<Self> {
        let parsed = ResourceId::parse(id)?;
        let Some(resource_group) = parsed.resource_group.clone() else {
            return Err(Error::invalid_id(id, "missing `resourceGroups` segment"));
        };
        let workspace_name = parsed
            .get("workspaces")
            .ok_or_else(|| Error::invalid_id(id, "missing `workspaces` segment"))?
            .to_string();
        let linked_service_name = parsed
            .get("linkedServices")
            .ok_or_else(|| Error::invalid_id(id, "missing `linkedServices` segment"))?
            .to_string();

        Ok(Self {
            resource_group,
            workspace_name,
            linked_service_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINKED_SERVICE_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.OperationalInsights/workspaces/ws1/linkedServices/automation";

    #[test]
    fn test_parse_linked_service_id() {
        let id = ResourceId::parse(LINKED_SERVICE_ID).unwrap();
        assert_eq!(id.subscription_id, "00000000-0000-0000-0000-000000000000");
        assert_eq!(id.resource_group.as_deref(), Some("rg1"));
        assert_eq!(id.provider.as_deref(), Some("Microsoft.OperationalInsights"));
        assert_eq!(id.get("workspaces"), Some("ws1"));
        assert_eq!(id.get("linkedServices"), Some("automation"));
        assert_eq!(id.to_string(), LINKED_SERVICE_ID);
    }

    #[test]
    fn test_lowercase_resource_groups_key_accepted() {
        let id = ResourceId::parse("/subscriptions/s/resourcegroups/RG/providers/P/things/x").unwrap();
        assert_eq!(id.resource_group.as_deref(), Some("RG"));
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let id = ResourceId::parse("/subscriptions/s/resourceGroups/rg/").unwrap();
        assert_eq!(id.resource_group.as_deref(), Some("rg"));
    }

    #[test]
    fn test_odd_segment_count_rejected() {
        let err = ResourceId::parse("/subscriptions/s/resourceGroups").unwrap_err();
        assert!(err.to_string().contains("not divisible by 2"));
    }

    #[test]
    fn test_missing_subscription_rejected() {
        let err = ResourceId::parse("/resourceGroups/rg").unwrap_err();
        assert!(err.to_string().contains("no subscription id"));
    }

    #[test]
    fn test_empty_and_relative_rejected() {
        assert!(ResourceId::parse("").is_err());
        assert!(ResourceId::parse("subscriptions/s").is_err());
        assert!(ResourceId::parse("/subscriptions//resourceGroups/rg").is_err());
    }

    #[test]
    fn test_linked_service_id_requires_every_segment() {
        let ok = LinkedServiceId::parse(LINKED_SERVICE_ID).unwrap();
        assert_eq!(ok.resource_group, "rg1");
        assert_eq!(ok.workspace_name, "ws1");
        assert_eq!(ok.linked_service_name, "automation");

        let no_workspace = "/subscriptions/s/resourceGroups/rg1/providers/Microsoft.OperationalInsights/linkedServices/automation";
        let err = LinkedServiceId::parse(no_workspace).unwrap_err();
        assert!(matches!(err, Error::InvalidId { .. }));
        assert!(err.to_string().contains("workspaces"));

        let no_group = "/subscriptions/s/providers/Microsoft.OperationalInsights/workspaces/ws1/linkedServices/automation";
        assert!(LinkedServiceId::parse(no_group).is_err());
    }
}
