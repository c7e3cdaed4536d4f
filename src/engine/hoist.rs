//! Nested resource hoisting.
//!
//! Inline child lists are moved to the owning project's top-level collection
//! of the same name. Subnetworks nested in a VPC always land in `subnets`,
//! whichever list name they were declared under.

use super::index::{SUBNETWORK_KIND, VPC_KIND};
use crate::model::{CompleteConfig, Resource, SUBNETS_COLLECTION, TYPE_FIELD};
use crate::registry::TypeRegistry;
use serde_json::Value;
use tracing::debug;

const AUTO_CREATE_SUBNETWORKS: &str = "autoCreateSubnetworks";

/// Hoist every nested list declared in the registry. Returns the number of
/// resources moved.
///
/// A VPC that gave up at least one inline subnet becomes custom-mode unless
/// `autoCreateSubnetworks` is already set.
pub fn hoist_nested_resources(config: &mut CompleteConfig, registry: &TypeRegistry) -> usize {
    let mut moved = 0;

    for project in &mut config.projects {
        let mut hoisted: Vec<(String, Resource)> = Vec::new();

        for (collection, items) in project.collections_mut() {
            for parent in items.iter_mut().flatten() {
                let Some(kind) = parent.kind(collection).map(str::to_string) else {
                    continue;
                };
                let parent_name = parent.name().map(str::to_string);

                for (field, element_type) in registry.nested_resources(&kind) {
                    let Some(children) = parent.remove(&field) else {
                        continue;
                    };
                    let Value::Array(children) = children else {
                        // A null placeholder from the schema skeleton.
                        continue;
                    };

                    let target = if kind == VPC_KIND && element_type == SUBNETWORK_KIND {
                        SUBNETS_COLLECTION.to_string()
                    } else {
                        field.clone()
                    };
                    let before = hoisted.len();

                    for child in children {
                        let Value::Object(fields) = child else { continue };
                        let mut child = Resource::from(fields);
                        if child.is_unset(TYPE_FIELD) {
                            child.insert(TYPE_FIELD, element_type.clone());
                        }
                        if kind == VPC_KIND && child.is_unset("network") {
                            if let Some(network) = &parent_name {
                                child.insert("network", network.clone());
                            }
                        }
                        debug!(
                            "Hoisting {} '{}' out of '{}'",
                            element_type,
                            child.name().unwrap_or("<unnamed>"),
                            parent_name.as_deref().unwrap_or("<unnamed>")
                        );
                        hoisted.push((target.clone(), child));
                    }

                    if target == SUBNETS_COLLECTION
                        && kind == VPC_KIND
                        && hoisted.len() > before
                        && parent.is_unset(AUTO_CREATE_SUBNETWORKS)
                    {
                        parent.insert(AUTO_CREATE_SUBNETWORKS, false);
                    }
                }
            }
        }

        moved += hoisted.len();
        for (collection, child) in hoisted {
            project.push_resource(&collection, child);
        }
    }

    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SUBNETS_COLLECTION;
    use serde_json::json;

    fn registry() -> TypeRegistry {
        TypeRegistry::from_json_str(r#"{"vpc": {"nestedResources": {"subnets": "subnetwork"}}}"#).unwrap()
    }

    #[test]
    fn test_moves_subnets_and_links_network() {
        let mut config: CompleteConfig = serde_json::from_value(json!({"projects": [{
            "projectId": "host-project",
            "vpc": [
                {"type": "vpc", "name": "my-net", "subnets": [{"name": "my-subnet"}, {"name": "other", "network": "elsewhere"}]},
                {"type": "vpc", "name": "second", "subnets": null}
            ],
            "subnets": [{"name": "existing"}]
        }]}))
        .unwrap();

        assert_eq!(hoist_nested_resources(&mut config, &registry()), 2);

        let project = &config.projects[0];
        assert!(project.resources("vpc").all(|v| !v.contains_key("subnets")));
        let subnets: Vec<_> = project.resources(SUBNETS_COLLECTION).cloned().map(Value::from).collect();
        assert_eq!(
            subnets,
            vec![
                json!({"name": "existing"}),
                json!({"name": "my-subnet", "type": "subnetwork", "network": "my-net"}),
                json!({"name": "other", "network": "elsewhere", "type": "subnetwork"}),
            ]
        );

        let vpcs: Vec<_> = project.resources("vpc").collect();
        assert_eq!(vpcs[0].get(AUTO_CREATE_SUBNETWORKS), Some(&json!(false)));
        assert!(!vpcs[1].contains_key(AUTO_CREATE_SUBNETWORKS));
    }

    #[test]
    fn test_keeps_explicit_auto_create() {
        let mut config: CompleteConfig = serde_json::from_value(json!({"projects": [{
            "projectId": "p",
            "vpc": [{"name": "n", "autoCreateSubnetworks": true, "subnets": []}]
        }]}))
        .unwrap();
        assert_eq!(hoist_nested_resources(&mut config, &registry()), 0);
        let vpc = config.projects[0].resources("vpc").next().unwrap();
        assert!(vpc.bool_field(AUTO_CREATE_SUBNETWORKS));
        assert!(config.projects[0].collection(SUBNETS_COLLECTION).is_none());
    }

    #[test]
    fn test_empty_subnet_list_leaves_auto_create_unset() {
        let mut config: CompleteConfig = serde_json::from_value(json!({"projects": [{
            "projectId": "p",
            "vpc": [{"type": "vpc", "name": "n", "subnets": []}]
        }]}))
        .unwrap();
        assert_eq!(hoist_nested_resources(&mut config, &registry()), 0);
        let vpc = config.projects[0].resources("vpc").next().unwrap();
        assert!(!vpc.contains_key(AUTO_CREATE_SUBNETWORKS));
        assert!(!vpc.contains_key("subnets"));
    }

    #[test]
    fn test_custom_nested_mapping_still_hoists_both_subnet_lists() {
        let registry = TypeRegistry::from_json_str(
            r#"{"vpc": {"nestedResources": {"subnetworks": "subnetwork", "peerings": "peering"}}}"#,
        )
        .unwrap();
        let mut config: CompleteConfig = serde_json::from_value(json!({"projects": [{
            "projectId": "p",
            "vpc": [{
                "type": "vpc",
                "name": "net",
                "subnets": [{"name": "s1"}],
                "subnetworks": [{"name": "s2"}],
                "peerings": [{"name": "to-hub"}]
            }]
        }]}))
        .unwrap();

        assert_eq!(hoist_nested_resources(&mut config, &registry), 3);

        let project = &config.projects[0];
        let vpc = project.resources("vpc").next().unwrap();
        assert!(!vpc.contains_key("subnets"));
        assert!(!vpc.contains_key("subnetworks"));
        assert_eq!(vpc.get(AUTO_CREATE_SUBNETWORKS), Some(&json!(false)));

        let subnets: Vec<_> = project.resources(SUBNETS_COLLECTION).filter_map(|r| r.name()).collect();
        assert_eq!(subnets, vec!["s2", "s1"]);
        assert!(project.collection("subnetworks").is_none());
        assert_eq!(
            project.resources("peerings").next().and_then(|r| r.type_name()),
            Some("peering")
        );
    }
}
