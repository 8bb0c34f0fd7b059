//! Property-based tests using proptest
//!
//! These tests verify resource id parsing, the properties/tags mapping,
//! input validation and planning using randomized inputs.

use lals::azure::auth::ArmCredentials;
use lals::azure::client::{ArmClient, DEFAULT_ENDPOINT};
use lals::azure::linked_services::LinkedServicesClient;
use lals::resource::id::{LinkedServiceId, ResourceId};
use lals::resource::linked_service::{
    expand_linked_service_properties, flatten_linked_service_properties,
    LinkedServicePropertiesConfig, RESOURCE_ID_KEY,
};
use lals::resource::schema::{validate_resource_group_name, validate_workspace_name};
use lals::resource::tags::{expand_tags, flatten_tags, Tags};
use lals::resource::{LinkedServiceConfig, LinkedServiceResource, LinkedServiceState, Plan};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// Generate a path segment value valid in an ARM id
fn arb_segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.()-]{1,24}"
}

fn arb_workspace_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9-]{2,61}[a-zA-Z0-9]"
}

fn arb_resource_group_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_()-][A-Za-z0-9_.()-]{0,88}[A-Za-z0-9_()-]"
}

fn arb_tags() -> impl Strategy<Value = Tags> {
    prop::collection::btree_map("[a-z][a-z0-9-]{0,15}", "[ -~]{0,32}", 0..10)
}

/// Planning never touches the network, so any endpoint will do
fn offline_resource() -> LinkedServiceResource {
    let credentials = ArmCredentials::from_token("unused").expect("credentials");
    let client = ArmClient::new(credentials, "sub", DEFAULT_ENDPOINT).expect("client");
    LinkedServiceResource::new(Arc::new(LinkedServicesClient::new(client)), false)
}

fn state_for(config: &LinkedServiceConfig) -> LinkedServiceState {
    LinkedServiceState {
        name: config.linked_service_name.clone(),
        resource_group_name: config.resource_group_name.clone(),
        workspace_name: config.workspace_name.clone(),
        linked_service_name: config.linked_service_name.clone(),
        linked_service_properties: flatten_linked_service_properties(Some(
            &expand_linked_service_properties(&config.linked_service_properties),
        )),
        tags: config.tags.clone(),
    }
}

fn arb_config() -> impl Strategy<Value = LinkedServiceConfig> {
    (arb_resource_group_name(), arb_workspace_name(), arb_segment(), arb_tags()).prop_map(
        |(resource_group_name, workspace_name, account, tags)| LinkedServiceConfig {
            linked_service_properties: LinkedServicePropertiesConfig {
                resource_id: format!(
                    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/{resource_group_name}/providers/Microsoft.Automation/automationAccounts/{account}"
                ),
            },
            resource_group_name,
            workspace_name,
            linked_service_name: "automation".to_string(),
            tags,
        },
    )
}

proptest! {
    /// Formatting a parsed id and parsing it again is stable
    #[test]
    fn test_resource_id_display_round_trip(
        sub in arb_segment(),
        rg in arb_segment(),
        ws in arb_segment(),
        ls in arb_segment(),
    ) {
        let raw = format!(
            "/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.OperationalInsights/workspaces/{ws}/linkedServices/{ls}"
        );
        let parsed = ResourceId::parse(&raw).unwrap();
        prop_assert_eq!(parsed.to_string(), raw.clone());
        prop_assert_eq!(ResourceId::parse(&parsed.to_string()).unwrap(), parsed);

        let ids = LinkedServiceId::parse(&raw).unwrap();
        prop_assert_eq!(ids.resource_group, rg);
        prop_assert_eq!(ids.workspace_name, ws);
        prop_assert_eq!(ids.linked_service_name, ls);
    }

    /// The resource group key is matched without regard to case
    #[test]
    fn test_resource_group_key_case_insensitive(
        rg in arb_segment(),
        upper in any::<bool>(),
    ) {
        let key = if upper { "RESOURCEGROUPS" } else { "resourcegroups" };
        let raw = format!("/subscriptions/sub/{key}/{rg}/providers/Microsoft.OperationalInsights/workspaces/ws/linkedServices/automation");
        let ids = LinkedServiceId::parse(&raw).unwrap();
        prop_assert_eq!(ids.resource_group, rg);
    }

    /// Ids with an odd number of segments never parse
    #[test]
    fn test_odd_segment_count_rejected(segments in prop::collection::vec(arb_segment(), 1..12)) {
        prop_assume!(segments.len() % 2 == 1);
        let raw = format!("/{}", segments.join("/"));
        prop_assert!(ResourceId::parse(&raw).is_err());
    }

    /// Flatten is the exact inverse of expand for any resource id
    #[test]
    fn test_properties_flatten_inverts_expand(resource_id in ".{0,200}") {
        let flat = flatten_linked_service_properties(Some(&expand_linked_service_properties(
            &LinkedServicePropertiesConfig { resource_id: resource_id.clone() },
        )));
        prop_assert_eq!(flat.len(), 1);
        prop_assert_eq!(&flat[RESOURCE_ID_KEY], &resource_id);
    }

    /// Tags survive expand then flatten unchanged
    #[test]
    fn test_tags_flatten_inverts_expand(tags in arb_tags()) {
        prop_assert_eq!(flatten_tags(expand_tags(&tags).as_ref()), tags);
    }

    /// Generated workspace names are within the naming rules
    #[test]
    fn test_valid_workspace_names_accepted(name in arb_workspace_name()) {
        prop_assert!(validate_workspace_name(&name).is_ok());
    }

    /// Names with a character outside the allowed set are rejected
    #[test]
    fn test_workspace_names_with_invalid_chars_rejected(
        prefix in "[a-z0-9]{2,10}",
        bad in "[_. /@!]",
        suffix in "[a-z0-9]{2,10}",
    ) {
        let name = format!("{prefix}{bad}{suffix}");
        prop_assert!(validate_workspace_name(&name).is_err());
    }

    #[test]
    fn test_valid_resource_group_names_accepted(name in arb_resource_group_name()) {
        prop_assert!(validate_resource_group_name(&name).is_ok());
    }

    #[test]
    fn test_resource_group_trailing_period_rejected(name in "[a-z0-9]{1,40}") {
        let name = format!("{name}.");
        prop_assert!(validate_resource_group_name(&name).is_err());
    }

    /// Decoding a well-formed document yields the same values back
    #[test]
    fn test_decode_accepts_valid_documents(config in arb_config()) {
        let raw = json!({
            "resource_group_name": config.resource_group_name,
            "workspace_name": config.workspace_name,
            "linked_service_properties": {
                "resource_id": config.linked_service_properties.resource_id,
            },
            "tags": config.tags,
        });
        let decoded = LinkedServiceConfig::decode(&raw).unwrap();
        prop_assert_eq!(decoded, config);
    }

    /// State read back after applying a config plans no changes
    #[test]
    fn test_plan_after_apply_is_noop(config in arb_config()) {
        let resource = offline_resource();
        prop_assert_eq!(resource.plan(Some(&state_for(&config)), &config), Plan::NoOp);
    }

    /// Case-only changes of the workspace or resource group never replace
    #[test]
    fn test_plan_ignores_name_case(config in arb_config()) {
        let resource = offline_resource();
        let prior = state_for(&config);
        let mut desired = config.clone();
        desired.workspace_name = desired.workspace_name.to_uppercase();
        desired.resource_group_name = desired.resource_group_name.to_lowercase();
        prop_assert_eq!(resource.plan(Some(&prior), &desired), Plan::NoOp);
    }

    /// Pointing at a different account forces replacement
    #[test]
    fn test_plan_replaces_on_new_resource_id(config in arb_config(), other in arb_segment()) {
        let resource = offline_resource();
        let prior = state_for(&config);
        let mut desired = config.clone();
        desired.linked_service_properties.resource_id.push_str(&format!("/jobs/{other}"));
        let plan = resource.plan(Some(&prior), &desired);
        prop_assert_eq!(
            plan,
            Plan::Replace { changed: vec!["linked_service_properties"] }
        );
    }

    /// Tag edits update in place
    #[test]
    fn test_plan_updates_on_tag_change(config in arb_config(), value in "[a-z]{1,8}") {
        let resource = offline_resource();
        let prior = state_for(&config);
        let mut desired = config.clone();
        desired.tags.insert("proptest-added-key".to_string(), value);
        prop_assert_eq!(
            resource.plan(Some(&prior), &desired),
            Plan::Update { changed: vec!["tags"] }
        );
    }
}

