//! Structural checks on an architecture spec.
//!
//! Validation never blocks resolution. `generate` logs each issue as a
//! warning and carries on; `validate` reports them and fails.

use super::{
    CompleteConfig, Project, Resource, CONSUMERS_COLLECTION, PRODUCERS_COLLECTION, VPC_COLLECTION,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Root keys an architecture spec may carry.
const ROOT_KEYS: &[&str] = &["description", "projects", "defaultRegion", "namePrefix", "nameSuffix"];

/// Consumer types placed by region rather than by network interface.
const REGIONAL_CONSUMERS: &[&str] = &["cloudrun_service", "cloudrun_job"];

/// One structural problem found in a spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Where the problem is, e.g. `projects[0].consumers[1]`
    pub path: String,
    /// What is wrong
    pub message: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl CompleteConfig {
    /// Check the shape of the spec. An empty result means it is well-formed.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.description.as_deref().map_or(true, |d| d.trim().is_empty()) {
            issues.push(ValidationIssue::new("description", "must be a non-empty string"));
        }
        for key in self.extra.keys().filter(|k| !ROOT_KEYS.contains(&k.as_str())) {
            issues.push(ValidationIssue::new(key.as_str(), "unknown top-level key"));
        }
        if self.projects.is_empty() {
            issues.push(ValidationIssue::new("projects", "must list at least one project"));
        }

        let mut seen = HashSet::new();
        for (i, project) in self.projects.iter().enumerate() {
            let at = format!("projects[{}]", i);
            if project.project_id.trim().is_empty() {
                issues.push(ValidationIssue::new(&at, "projectId must be a non-empty string"));
            } else if !seen.insert(project.project_id.as_str()) {
                issues.push(ValidationIssue::new(
                    &at,
                    format!("duplicate projectId '{}'", project.project_id),
                ));
            }

            for (path, consumer) in items(project, &at, CONSUMERS_COLLECTION) {
                check_consumer(&path, consumer, &mut issues);
            }
            for (path, producer) in items(project, &at, PRODUCERS_COLLECTION) {
                let has_default = self.default_region_for(project).is_some();
                check_producer(&path, producer, has_default, &mut issues);
            }
            for (path, vpc) in items(project, &at, VPC_COLLECTION) {
                check_vpc(&path, vpc, &mut issues);
            }
        }

        issues
    }
}

/// Non-null items of one collection with their paths.
fn items<'a>(
    project: &'a Project,
    at: &'a str,
    collection: &'a str,
) -> impl Iterator<Item = (String, &'a Resource)> + 'a {
    project
        .collection(collection)
        .into_iter()
        .flat_map(|items| items.iter().enumerate())
        .filter_map(move |(j, item)| {
            item.as_ref()
                .map(|r| (format!("{}.{}[{}]", at, collection, j), r))
        })
}

fn has_str(resource: &Resource, key: &str) -> bool {
    resource.str_field(key).is_some()
}

fn check_identity(path: &str, resource: &Resource, issues: &mut Vec<ValidationIssue>) {
    for key in ["type", "name"] {
        if !has_str(resource, key) {
            issues.push(ValidationIssue::new(path, format!("missing '{}'", key)));
        }
    }
}

fn check_consumer(path: &str, consumer: &Resource, issues: &mut Vec<ValidationIssue>) {
    check_identity(path, consumer, issues);

    let regional = consumer
        .type_name()
        .is_some_and(|t| REGIONAL_CONSUMERS.contains(&t));
    if regional {
        if !has_str(consumer, "region") {
            issues.push(ValidationIssue::new(path, "missing 'region'"));
        }
        return;
    }

    let has_interfaces = matches!(
        consumer.get("networkInterfaces"),
        Some(Value::Array(interfaces)) if !interfaces.is_empty()
    );
    if !has_interfaces && !(has_str(consumer, "vpc") && has_str(consumer, "subnet")) {
        issues.push(ValidationIssue::new(
            path,
            "needs a non-empty 'networkInterfaces' list or both 'vpc' and 'subnet'",
        ));
    }
}

fn check_producer(path: &str, producer: &Resource, has_default: bool, issues: &mut Vec<ValidationIssue>) {
    check_identity(path, producer, issues);

    if !has_default && !has_str(producer, "region") && !has_str(producer, "location") {
        issues.push(ValidationIssue::new(
            path,
            "needs 'region' or 'location' when no defaultRegion applies",
        ));
    }
}

fn check_vpc(path: &str, vpc: &Resource, issues: &mut Vec<ValidationIssue>) {
    match vpc.type_name() {
        Some("vpc") => {}
        Some(other) => issues.push(ValidationIssue::new(
            path,
            format!("type must be 'vpc', found '{}'", other),
        )),
        None => issues.push(ValidationIssue::new(path, "missing 'type'")),
    }
    if !has_str(vpc, "name") {
        issues.push(ValidationIssue::new(path, "missing 'name'"));
    }
    if !matches!(vpc.get("subnets"), None | Some(Value::Null) | Some(Value::Array(_))) {
        issues.push(ValidationIssue::new(path, "'subnets' must be a list"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> CompleteConfig {
        serde_json::from_value(value).unwrap()
    }

    fn messages(config: &CompleteConfig) -> Vec<String> {
        config.validate().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_well_formed_spec_has_no_issues() {
        let config = spec(json!({
            "description": "demo",
            "defaultRegion": "us-central1",
            "projects": [{
                "projectId": "p",
                "vpc": [{"type": "vpc", "name": "net", "subnets": [{"name": "s"}]}, null],
                "producers": [{"type": "cloudsql", "name": "db"}],
                "consumers": [
                    {"type": "vm", "name": "a", "networkInterfaces": [{"network": "net"}]},
                    {"type": "vm", "name": "b", "vpc": "net", "subnet": "s"},
                    {"type": "cloudrun_service", "name": "run", "region": "us-central1"}
                ]
            }]
        }));
        assert_eq!(config.validate(), vec![]);
    }

    #[test]
    fn test_root_problems() {
        let config = spec(json!({"owner": "netops", "projects": []}));
        assert_eq!(
            messages(&config),
            vec![
                "description: must be a non-empty string",
                "owner: unknown top-level key",
                "projects: must list at least one project",
            ]
        );
    }

    #[test]
    fn test_project_ids_must_be_present_and_unique() {
        let config = spec(json!({
            "description": "d",
            "projects": [{"projectId": "a"}, {"projectId": ""}, {"projectId": "a"}]
        }));
        assert_eq!(
            messages(&config),
            vec![
                "projects[1]: projectId must be a non-empty string",
                "projects[2]: duplicate projectId 'a'",
            ]
        );
    }

    #[test]
    fn test_consumer_placement_rules() {
        let config = spec(json!({
            "description": "d",
            "projects": [{"projectId": "p", "consumers": [
                {"type": "cloudrun_job", "name": "job"},
                {"type": "vm", "name": "vm", "networkInterfaces": []},
                {"type": "vm", "vpc": "net"}
            ]}]
        }));
        let found = messages(&config);
        assert_eq!(found[0], "projects[0].consumers[0]: missing 'region'");
        assert!(found[1].starts_with("projects[0].consumers[1]: needs a non-empty 'networkInterfaces'"));
        assert_eq!(found[2], "projects[0].consumers[2]: missing 'name'");
        assert!(found[3].starts_with("projects[0].consumers[2]: needs"));
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn test_producer_region_falls_back_to_defaults() {
        let missing = spec(json!({
            "description": "d",
            "projects": [{"projectId": "p", "producers": [{"type": "cloudsql", "name": "db"}]}]
        }));
        assert_eq!(
            messages(&missing),
            vec!["projects[0].producers[0]: needs 'region' or 'location' when no defaultRegion applies"]
        );

        let project_default = spec(json!({
            "description": "d",
            "projects": [{"projectId": "p", "defaultRegion": "eu", "producers": [{"type": "cloudsql", "name": "db"}]}]
        }));
        assert!(project_default.validate().is_empty());

        let located = spec(json!({
            "description": "d",
            "projects": [{"projectId": "p", "producers": [{"type": "alloydb", "name": "db", "location": "eu"}]}]
        }));
        assert!(located.validate().is_empty());
    }

    #[test]
    fn test_vpc_shape() {
        let config = spec(json!({
            "description": "d",
            "projects": [{"projectId": "p", "vpc": [
                {"type": "subnetwork", "name": "n"},
                {"name": "m", "subnets": "s1"}
            ]}]
        }));
        assert_eq!(
            messages(&config),
            vec![
                "projects[0].vpc[0]: type must be 'vpc', found 'subnetwork'",
                "projects[0].vpc[1]: missing 'type'",
                "projects[0].vpc[1]: 'subnets' must be a list",
            ]
        );
    }
}
