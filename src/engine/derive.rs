//! Implicit resource derivation.
//!
//! A fixed rule set evaluated in order over the instantiated document:
//!
//! 1. NAT routers for VPCs with `createNat`
//! 2. Firewall rules for producers with `createRequiredFwRules`
//! 3. Service connection policy flags on VPCs serving `scp` producers
//! 4. PSC address + forwarding rule pairs for PSC producers
//! 5. PSC allow-lists built from consumer tags
//!
//! Each rule first plans against an immutable view of the document and then
//! applies its changes. Derived resources are only appended when their name
//! is not already taken in the target collection, so running the rules over
//! an already processed document changes nothing.

use super::index::{Location, ResourceIndex, VPC_KIND};
use super::instantiate::ResourceCatalog;
use crate::model::{
    bare_name, object_entry, CompleteConfig, PscSettings, Resource, ADDRESSES_COLLECTION,
    CONSUMERS_COLLECTION, FIREWALLS_COLLECTION, FORWARDING_RULES_COLLECTION, NAME_FIELD,
    PRODUCERS_COLLECTION, ROUTERS_COLLECTION,
};
use crate::registry::{ConnectivityType, TypeRegistry};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// Type of derived NAT routers.
pub const ROUTER_TYPE: &str = "router";
/// Type of derived firewall rules.
pub const FIREWALL_RULE_TYPE: &str = "firewall_rule";
/// Type of derived PSC addresses.
pub const ADDRESS_TYPE: &str = "address";
/// Type of derived PSC forwarding rules.
pub const FORWARDING_RULE_TYPE: &str = "forwardingrule";

const CREATE_NAT: &str = "createNat";
const CREATE_FW_RULES: &str = "createRequiredFwRules";
const CONNECTIVITY_TYPE: &str = "connectivityType";
const CREATE_PSC_ENDPOINT: &str = "createPscEndpoint";
const ALLOWED_CONSUMERS_TAGS: &str = "allowedConsumersTags";

/// A resource planned for a project collection.
#[derive(Debug, Clone)]
struct Derived {
    project: usize,
    collection: &'static str,
    resource: Resource,
}

/// Run every derivation rule in order.
pub fn derive_implicit_resources(
    config: &mut CompleteConfig,
    registry: &TypeRegistry,
    catalog: &ResourceCatalog,
) {
    let index = ResourceIndex::build(config, registry);

    let routers = plan_nat_routers(config, catalog);
    let routers = append_derived(config, routers);

    let firewalls = plan_firewall_rules(config, &index, catalog);
    let firewalls = append_derived(config, firewalls);

    let policies = plan_scp_policies(config, &index);
    apply_scp_policies(config, &policies);

    let endpoints = plan_psc_endpoints(config, &index, registry, catalog);
    let endpoints = append_derived(config, endpoints);

    populate_psc_allow_lists(config);

    info!(
        "Derived {} routers, {} firewall rules, {} SCP policy updates and {} PSC resources",
        routers,
        firewalls,
        policies.len(),
        endpoints
    );
}

/// Whether a producer gets a PSC endpoint.
///
/// An explicit `connectivityType` decides; otherwise the registry's
/// connectivity options do. `createPscEndpoint: false` always opts out.
pub(crate) fn wants_psc_endpoint(producer: &Resource, registry: &TypeRegistry) -> bool {
    if matches!(producer.get(CREATE_PSC_ENDPOINT), Some(Value::Bool(false))) {
        return false;
    }
    match producer.str_field(CONNECTIVITY_TYPE) {
        Some(explicit) => ConnectivityType::parse(explicit) == Some(ConnectivityType::Psc),
        None => producer
            .type_name()
            .and_then(|t| registry.get(t))
            .is_some_and(|entry| entry.supports(ConnectivityType::Psc)),
    }
}

/// Whether a VPC asks for a NAT router.
pub(crate) fn wants_nat(resource: &Resource, collection: &str) -> bool {
    resource.kind(collection) == Some(VPC_KIND) && resource.bool_field(CREATE_NAT)
}

/// Whether a producer asks for firewall rules.
pub(crate) fn wants_firewall(producer: &Resource) -> bool {
    producer.bool_field(CREATE_FW_RULES)
}

/// A `pscSettings` value: the project's own first, then the first project
/// in document order that declares it.
fn psc_setting<'a>(
    config: &'a CompleteConfig,
    project: usize,
    pick: impl Fn(&'a PscSettings) -> Option<&'a String>,
) -> Option<&'a str> {
    let own = config.projects.get(project).into_iter();
    own.chain(config.projects.iter())
        .filter_map(|p| p.psc_settings.as_ref())
        .filter_map(&pick)
        .map(String::as_str)
        .find(|s| !s.is_empty())
}

fn fields(entries: Vec<(&str, Value)>) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn append_derived(config: &mut CompleteConfig, derived: Vec<Derived>) -> usize {
    let mut added = 0;
    for item in derived {
        let Some(project) = config.projects.get_mut(item.project) else {
            continue;
        };
        let Some(name) = item.resource.name() else {
            continue;
        };
        if project.has_named(item.collection, name) {
            debug!(
                "{} '{}' already present in project '{}'",
                item.collection, name, project.project_id
            );
            continue;
        }
        project.push_resource(item.collection, item.resource);
        added += 1;
    }
    added
}

fn plan_nat_routers(config: &CompleteConfig, catalog: &ResourceCatalog) -> Vec<Derived> {
    let mut planned = Vec::new();
    for (p, project) in config.projects.iter().enumerate() {
        for (collection, vpc) in project.all_resources() {
            if !wants_nat(vpc, collection) {
                continue;
            }
            let Some(vpc_name) = vpc.name().map(bare_name) else {
                warn!("Skipping NAT router for an unnamed VPC in project '{}'", project.project_id);
                continue;
            };

            let mut router = fields(vec![
                (NAME_FIELD, json!(format!("router-{}-nat", vpc_name))),
                ("network", json!(vpc_name)),
            ]);
            let region = vpc
                .str_field("region")
                .or_else(|| config.default_region_for(project));
            if let Some(region) = region {
                router.insert("region".into(), json!(region));
            }
            router.insert("nat".into(), json!({"enabled": true}));

            planned.push(Derived {
                project: p,
                collection: ROUTERS_COLLECTION,
                resource: catalog.instantiate(ROUTER_TYPE, router),
            });
        }
    }
    planned
}

fn plan_firewall_rules(
    config: &CompleteConfig,
    index: &ResourceIndex,
    catalog: &ResourceCatalog,
) -> Vec<Derived> {
    let mut planned = Vec::new();
    for (p, project) in config.projects.iter().enumerate() {
        for producer in project.resources(PRODUCERS_COLLECTION) {
            if !wants_firewall(producer) {
                continue;
            }
            let Some(name) = producer.name() else { continue };

            let network = producer
                .str_field("networkForFirewall")
                .or_else(|| psc_setting(config, p, |s| s.network_for_psc.as_ref()));
            let Some(network) = network else {
                warn!(
                    "Skipping firewall rule for producer '{}': no networkForFirewall and no pscSettings.networkForPsc",
                    name
                );
                continue;
            };
            let owner = match index.find(config, VPC_KIND, network, Some(p)) {
                Ok(found) => found.location.project,
                Err(miss) => {
                    warn!("Skipping firewall rule for producer '{}': {}", name, miss);
                    continue;
                }
            };

            let rule = fields(vec![
                (NAME_FIELD, json!(format!("fw-allow-{}", name))),
                ("network", json!(network)),
                ("direction", json!("INGRESS")),
                ("targetTags", json!(producer.string_list(ALLOWED_CONSUMERS_TAGS))),
            ]);
            planned.push(Derived {
                project: owner,
                collection: FIREWALLS_COLLECTION,
                resource: catalog.instantiate(FIREWALL_RULE_TYPE, rule),
            });
        }
    }
    planned
}

fn plan_scp_policies(config: &CompleteConfig, index: &ResourceIndex) -> Vec<(Location, String)> {
    let mut planned = Vec::new();
    for (p, project) in config.projects.iter().enumerate() {
        for producer in project.resources(PRODUCERS_COLLECTION) {
            let is_scp = producer
                .str_field(CONNECTIVITY_TYPE)
                .and_then(ConnectivityType::parse)
                == Some(ConnectivityType::Scp);
            let Some(subnet) = producer.str_field("subnet").filter(|_| is_scp) else {
                continue;
            };
            let producer_name = producer.name().unwrap_or("<unnamed>");

            let found = match index.find_subnet(config, subnet, producer.str_field("network"), Some(p)) {
                Ok(found) => found,
                Err(miss) => {
                    warn!("Skipping SCP policy for producer '{}': {}", producer_name, miss);
                    continue;
                }
            };
            let Some(network) = found.location.network.as_deref() else {
                warn!(
                    "Skipping SCP policy for producer '{}': subnet '{}' names no network",
                    producer_name, subnet
                );
                continue;
            };
            match index.find(config, VPC_KIND, network, Some(found.location.project)) {
                Ok(vpc) => planned.push((vpc.location.clone(), bare_name(subnet).to_string())),
                Err(miss) => warn!("Skipping SCP policy for producer '{}': {}", producer_name, miss),
            }
        }
    }
    planned
}

fn apply_scp_policies(config: &mut CompleteConfig, policies: &[(Location, String)]) {
    for (location, subnet) in policies {
        let vpc = config
            .projects
            .get_mut(location.project)
            .and_then(|p| p.collection_mut(&location.collection))
            .and_then(|items| items.get_mut(location.item))
            .and_then(Option::as_mut);
        let Some(vpc) = vpc else { continue };

        vpc.insert("createScpPolicy", true);
        let mut subnets = vpc.string_list("subnetsForScpPolicy");
        if !subnets.contains(subnet) {
            subnets.push(subnet.clone());
        }
        vpc.insert("subnetsForScpPolicy", subnets);
    }
}

fn plan_psc_endpoints(
    config: &CompleteConfig,
    index: &ResourceIndex,
    registry: &TypeRegistry,
    catalog: &ResourceCatalog,
) -> Vec<Derived> {
    let mut planned = Vec::new();
    for (p, project) in config.projects.iter().enumerate() {
        for producer in project.resources(PRODUCERS_COLLECTION) {
            if !wants_psc_endpoint(producer, registry) {
                continue;
            }
            let Some(name) = producer.name() else { continue };

            let network = producer
                .str_field("network")
                .or_else(|| psc_setting(config, p, |s| s.network_for_psc.as_ref()));
            let subnet = producer
                .str_field("subnet")
                .or_else(|| psc_setting(config, p, |s| s.subnet_for_psc.as_ref()));
            let (Some(network), Some(subnet)) = (network, subnet) else {
                warn!(
                    "Skipping PSC endpoint for producer '{}': no network/subnet on the producer or in pscSettings",
                    name
                );
                continue;
            };

            let vpc = match index.find(config, VPC_KIND, network, Some(p)) {
                Ok(vpc) => vpc,
                Err(miss) => {
                    warn!("Skipping PSC endpoint for producer '{}': {}", name, miss);
                    continue;
                }
            };
            let owner = vpc.location.project;
            let subnet_region = match index.find_subnet(config, subnet, Some(network), Some(owner)) {
                Ok(found) => found.str_field("region"),
                Err(miss) => {
                    debug!("PSC subnet for producer '{}' not indexed: {}", name, miss);
                    None
                }
            };
            let region = producer
                .str_field("region")
                .or(subnet_region)
                .or_else(|| config.default_region_for(vpc.project));

            let address_name = format!("addr-{}-psc", name);
            let mut address = fields(vec![
                (NAME_FIELD, json!(address_name)),
                ("addressType", json!("INTERNAL")),
                ("subnetwork", json!(subnet)),
            ]);
            let mut rule = fields(vec![
                (NAME_FIELD, json!(format!("fr-{}-psc", name))),
                ("network", json!(network)),
                ("subnetwork", json!(subnet)),
                ("IPAddress", json!(address_name)),
            ]);
            if let Some(region) = region {
                address.insert("region".into(), json!(region));
                rule.insert("region".into(), json!(region));
            }
            rule.insert("targetProducerName".into(), json!(name));
            if let Some(producer_type) = producer.type_name() {
                rule.insert("targetProducerType".into(), json!(producer_type));
            }
            rule.insert("targetProducerProjectId".into(), json!(project.project_id));

            planned.push(Derived {
                project: owner,
                collection: ADDRESSES_COLLECTION,
                resource: catalog.instantiate(ADDRESS_TYPE, address),
            });
            planned.push(Derived {
                project: owner,
                collection: FORWARDING_RULES_COLLECTION,
                resource: catalog.instantiate(FORWARDING_RULE_TYPE, rule),
            });
        }
    }
    planned
}

/// Set `settings.ipConfiguration.pscConfig.allowedConsumerProjects` on every
/// producer carrying `allowedConsumersTags`.
fn populate_psc_allow_lists(config: &mut CompleteConfig) {
    let consumers: Vec<(String, Vec<String>)> = config
        .projects
        .iter()
        .flat_map(|project| {
            project
                .resources(CONSUMERS_COLLECTION)
                .map(move |c| (project.project_id.clone(), c.nested_string_list(&["tags", "items"])))
        })
        .collect();

    for project in &mut config.projects {
        let producers = project
            .collection_mut(PRODUCERS_COLLECTION)
            .into_iter()
            .flat_map(|items| items.iter_mut().flatten());
        for producer in producers {
            if producer.is_unset(ALLOWED_CONSUMERS_TAGS) {
                continue;
            }
            let wanted = producer.string_list(ALLOWED_CONSUMERS_TAGS);
            let mut allowed: Vec<String> = Vec::new();
            for (project_id, tags) in &consumers {
                if tags.iter().any(|t| wanted.contains(t)) && !allowed.contains(project_id) {
                    allowed.push(project_id.clone());
                }
            }
            debug!(
                "Producer '{}' allows consumers from {:?}",
                producer.name().unwrap_or("<unnamed>"),
                allowed
            );

            let settings = producer.object_entry("settings");
            let ip_configuration = object_entry(settings, "ipConfiguration");
            let psc_config = object_entry(ip_configuration, "pscConfig");
            psc_config.insert("allowedConsumerProjects".into(), json!(allowed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::from_json_str(
            r#"{
                "vpc": {"nestedResources": {"subnets": "subnetwork"}},
                "subnetwork": {},
                "cloudsql": {"connectivityOptions": ["psc"]},
                "memorystore_redis_cluster": {"connectivityOptions": ["scp"]},
                "vm": {}
            }"#,
        )
        .unwrap()
    }

    fn derive(value: Value) -> CompleteConfig {
        let mut config: CompleteConfig = serde_json::from_value(value).unwrap();
        derive_implicit_resources(&mut config, &registry(), &ResourceCatalog::default());
        config
    }

    fn names(config: &CompleteConfig, project: usize, collection: &str) -> Vec<String> {
        config.projects[project]
            .resources(collection)
            .filter_map(|r| r.name().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_nat_router_uses_document_region() {
        let config = derive(json!({
            "defaultRegion": "us-central1",
            "projects": [{"projectId": "host", "vpc": [{"type": "vpc", "name": "my-net", "createNat": true}]}]
        }));
        let router = config.projects[0].resources(ROUTERS_COLLECTION).next().unwrap();
        assert_eq!(
            Value::from(router.clone()),
            json!({
                "type": "router",
                "name": "router-my-net-nat",
                "network": "my-net",
                "region": "us-central1",
                "nat": {"enabled": true}
            })
        );
    }

    #[test]
    fn test_firewall_lands_in_network_project() {
        let config = derive(json!({"projects": [
            {"projectId": "network-project", "vpc": [{"type": "vpc", "name": "my-net"}]},
            {"projectId": "service-project", "producers": [{
                "type": "cloudsql", "name": "my-db", "createRequiredFwRules": true,
                "networkForFirewall": "my-net", "allowedConsumersTags": ["allow-db-access"],
                "createPscEndpoint": false
            }]}
        ]}));
        let rule = config.projects[0].resources(FIREWALLS_COLLECTION).next().unwrap();
        assert_eq!(rule.name(), Some("fw-allow-my-db"));
        assert_eq!(rule.string_list("targetTags"), vec!["allow-db-access"]);
        assert!(config.projects[1].collection(FIREWALLS_COLLECTION).is_none());
    }

    #[test]
    fn test_firewall_network_from_psc_settings() {
        let config = derive(json!({"projects": [
            {"projectId": "network-project", "pscSettings": {"networkForPsc": "my-net"}, "vpc": [{"type": "vpc", "name": "my-net"}]},
            {"projectId": "service-project", "producers": [{
                "type": "cloudsql", "name": "my-db", "createRequiredFwRules": true,
                "allowedConsumersTags": ["allow-db-access"]
            }]}
        ]}));
        assert_eq!(names(&config, 0, FIREWALLS_COLLECTION), vec!["fw-allow-my-db"]);
    }

    #[test]
    fn test_firewall_skipped_without_network() {
        let config = derive(json!({"projects": [{
            "projectId": "p", "producers": [{"type": "vm", "name": "x", "createRequiredFwRules": true}]
        }]}));
        assert!(config.projects[0].collection(FIREWALLS_COLLECTION).is_none());
    }

    #[test]
    fn test_firewall_skipped_when_network_is_not_a_vpc() {
        let config = derive(json!({"projects": [{
            "projectId": "p",
            "vpc": [{"type": "vpc", "name": "real-net"}],
            "producers": [{
                "type": "cloudsql", "name": "db", "createRequiredFwRules": true,
                "networkForFirewall": "ghost-net", "createPscEndpoint": false
            }]
        }]}));
        assert!(config.projects[0].collection(FIREWALLS_COLLECTION).is_none());
    }

    #[test]
    fn test_firewall_self_link_selects_named_project() {
        let link = "projects/b/global/networks/net";
        let config = derive(json!({"projects": [
            {"projectId": "a", "vpc": [{"type": "vpc", "name": "net"}], "producers": [{
                "type": "cloudsql", "name": "db", "createRequiredFwRules": true,
                "networkForFirewall": link, "createPscEndpoint": false
            }]},
            {"projectId": "b", "vpc": [{"type": "vpc", "name": "net"}]}
        ]}));
        assert!(config.projects[0].collection(FIREWALLS_COLLECTION).is_none());
        let rule = config.projects[1].resources(FIREWALLS_COLLECTION).next().unwrap();
        assert_eq!(rule.str_field("network"), Some(link));
    }

    #[test]
    fn test_scp_policy_deduplicates_subnets() {
        let config = derive(json!({"projects": [{
            "projectId": "service-project",
            "vpc": [{"type": "vpc", "name": "my-scp-net"}],
            "subnets": [{"type": "subnetwork", "name": "my-scp-subnet", "network": "my-scp-net"}],
            "producers": [
                {"type": "memorystore_redis_cluster", "name": "a", "connectivityType": "scp", "subnet": "my-scp-subnet"},
                {"type": "memorystore_redis_cluster", "name": "b", "connectivityType": "scp", "subnet": "my-scp-subnet"}
            ]
        }]}));
        let vpc = config.projects[0].resources("vpc").next().unwrap();
        assert!(vpc.bool_field("createScpPolicy"));
        assert_eq!(vpc.string_list("subnetsForScpPolicy"), vec!["my-scp-subnet"]);
    }

    #[test]
    fn test_scp_policy_for_nested_subnet() {
        let config = derive(json!({"projects": [{
            "projectId": "p",
            "vpc": [{"type": "vpc", "name": "net", "subnets": [{"name": "inner"}]}],
            "producers": [{"type": "memorystore_redis_cluster", "name": "r", "connectivityType": "scp", "subnet": "inner"}]
        }]}));
        let vpc = config.projects[0].resources("vpc").next().unwrap();
        assert_eq!(vpc.string_list("subnetsForScpPolicy"), vec!["inner"]);
    }

    #[test]
    fn test_psc_endpoint_from_producer_fields() {
        let config = derive(json!({"projects": [
            {
                "projectId": "host-project",
                "vpc": [{"type": "vpc", "name": "my-net"}],
                "subnets": [{"name": "my-psc-subnet", "region": "us-central1", "network": "my-net"}]
            },
            {"projectId": "service-project", "producers": [{
                "type": "cloudsql", "name": "my-db", "network": "my-net", "subnet": "my-psc-subnet"
            }]}
        ]}));
        assert_eq!(names(&config, 0, ADDRESSES_COLLECTION), vec!["addr-my-db-psc"]);
        let rule = config.projects[0].resources(FORWARDING_RULES_COLLECTION).next().unwrap();
        assert_eq!(
            Value::from(rule.clone()),
            json!({
                "type": "forwardingrule",
                "name": "fr-my-db-psc",
                "network": "my-net",
                "subnetwork": "my-psc-subnet",
                "IPAddress": "addr-my-db-psc",
                "region": "us-central1",
                "targetProducerName": "my-db",
                "targetProducerType": "cloudsql",
                "targetProducerProjectId": "service-project"
            })
        );
    }

    #[test]
    fn test_psc_endpoint_falls_back_to_other_project_settings() {
        let config = derive(json!({"projects": [
            {
                "projectId": "host-project",
                "pscSettings": {"networkForPsc": "my-net", "subnetForPsc": "my-psc-subnet"},
                "vpc": [{"type": "vpc", "name": "my-net"}],
                "subnets": [{"name": "my-psc-subnet", "region": "us-central1", "network": "my-net"}]
            },
            {"projectId": "service-project", "producers": [{"type": "cloudsql", "name": "my-db-fallback"}]}
        ]}));
        assert_eq!(names(&config, 0, ADDRESSES_COLLECTION), vec!["addr-my-db-fallback-psc"]);
        assert_eq!(names(&config, 0, FORWARDING_RULES_COLLECTION), vec!["fr-my-db-fallback-psc"]);
    }

    #[test]
    fn test_psc_opt_out_and_explicit_scp() {
        let config = derive(json!({"projects": [{
            "projectId": "p",
            "pscSettings": {"networkForPsc": "net", "subnetForPsc": "sub"},
            "vpc": [{"type": "vpc", "name": "net"}],
            "producers": [
                {"type": "cloudsql", "name": "off", "createPscEndpoint": false},
                {"type": "cloudsql", "name": "scp", "connectivityType": "scp"}
            ]
        }]}));
        assert!(config.projects[0].collection(ADDRESSES_COLLECTION).is_none());
    }

    #[test]
    fn test_psc_endpoint_skipped_when_network_unresolvable() {
        let config = derive(json!({"projects": [
            {"projectId": "host", "vpc": [{"type": "vpc", "name": "my-net"}]},
            {"projectId": "svc", "producers": [
                {"type": "cloudsql", "name": "no-vpc", "network": "ghost-net", "subnet": "sub"},
                {"type": "cloudsql", "name": "no-subnet", "network": "my-net"}
            ]}
        ]}));
        for project in &config.projects {
            assert!(project.collection(ADDRESSES_COLLECTION).is_none());
            assert!(project.collection(FORWARDING_RULES_COLLECTION).is_none());
        }
    }

    #[test]
    fn test_psc_endpoint_with_unindexed_subnet_uses_default_region() {
        let config = derive(json!({
            "defaultRegion": "europe-west1",
            "projects": [{
                "projectId": "host",
                "vpc": [{"type": "vpc", "name": "my-net"}],
                "producers": [{"type": "cloudsql", "name": "db", "network": "my-net", "subnet": "unknown-subnet"}]
            }]
        }));
        let address = config.projects[0].resources(ADDRESSES_COLLECTION).next().unwrap();
        assert_eq!(address.str_field("subnetwork"), Some("unknown-subnet"));
        assert_eq!(address.str_field("region"), Some("europe-west1"));
    }

    #[test]
    fn test_allow_list_from_consumer_tags() {
        let config = derive(json!({"projects": [
            {"projectId": "service-project", "producers": [{
                "type": "cloudsql", "name": "my-db", "connectivityType": "psc", "allowedConsumersTags": ["web-app"]
            }]},
            {"projectId": "consumer-project", "consumers": [
                {"type": "vm", "name": "frontend-vm", "tags": {"items": ["web-app", "another-tag"]}},
                {"type": "vm", "name": "second-vm", "tags": {"items": ["web-app"]}},
                {"type": "vm", "name": "other-vm", "tags": {"items": ["batch"]}}
            ]}
        ]}));
        let producer = config.projects[0].resources(PRODUCERS_COLLECTION).next().unwrap();
        assert_eq!(
            producer.get("settings"),
            Some(&json!({"ipConfiguration": {"pscConfig": {"allowedConsumerProjects": ["consumer-project"]}}}))
        );
    }

    #[test]
    fn test_rules_are_idempotent() {
        let input = json!({
            "defaultRegion": "us-central1",
            "projects": [{
                "projectId": "p",
                "pscSettings": {"networkForPsc": "net", "subnetForPsc": "sub"},
                "vpc": [{"type": "vpc", "name": "net", "createNat": true}],
                "subnets": [{"name": "sub", "network": "net"}],
                "producers": [{"type": "cloudsql", "name": "db", "createRequiredFwRules": true, "allowedConsumersTags": ["t"]}]
            }]
        });
        let once = derive(input);
        let mut twice = once.clone();
        derive_implicit_resources(&mut twice, &registry(), &ResourceCatalog::default());
        assert_eq!(once, twice);
        assert_eq!(names(&once, 0, ROUTERS_COLLECTION).len(), 1);
        assert_eq!(names(&once, 0, FIREWALLS_COLLECTION).len(), 1);
        assert_eq!(names(&once, 0, ADDRESSES_COLLECTION).len(), 1);
    }
}
