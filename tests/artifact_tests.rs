//! Artifact generation tests: contexts, rendering with the fixture
//! templates, batch failure handling and writing.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use topogen::artifacts::{render_file_specs, write_artifacts, ArtifactContextBuilder};
use topogen::model::CompleteConfig;
use topogen::template::JinjaRenderer;

fn resolved(spec: &str) -> CompleteConfig {
    fixture_engine()
        .generate_from_path(fixture_path(spec))
        .unwrap()
}

#[test]
fn test_basic_renders_three_artifacts() {
    let config = resolved("specs/basic.json");
    let registry = fixture_registry();
    let builder = ArtifactContextBuilder::new(&config, &registry, fixture_path("templates"));

    let files = builder
        .generate_all_resource_files(&JinjaRenderer::new())
        .unwrap();

    let paths: Vec<&str> = files.keys().map(String::as_str).collect();
    assert_eq!(
        paths,
        vec![
            "consumer/GCE/config/my-vm.yaml",
            "organization/config/organization.yaml",
            "networking/config/networking.yaml",
        ]
    );

    let vm = &files["consumer/GCE/config/my-vm.yaml"];
    assert!(vm.contains("name: my-vm"));
    assert!(vm.contains("project: my-proj"));
    assert!(vm.contains("machineType: e2-medium"));
    assert!(vm.contains("network: my-network"));

    let networking = &files["networking/config/networking.yaml"];
    assert!(networking.contains("hostProject: my-proj"));
    assert!(networking.contains("sharedVpcHost: false"));
    assert!(networking.contains("serviceProjects: []"));
}

#[test]
fn test_psc_renders_six_artifacts() {
    let config = resolved("specs/psc.json");
    let registry = fixture_registry();
    let builder = ArtifactContextBuilder::new(&config, &registry, fixture_path("templates"));

    let files = builder
        .generate_all_resource_files(&JinjaRenderer::new())
        .unwrap();

    let mut paths: Vec<&str> = files.keys().map(String::as_str).collect();
    paths.sort_unstable();
    assert_eq!(
        paths,
        vec![
            "consumer/GCE/config/orders-api.yaml",
            "networking/config/networking.yaml",
            "networking/config/psc_endpoints.yaml",
            "organization/config/organization.yaml",
            "producer/CloudSQL/cloudsql.tfvars",
            "producer/CloudSQL/config/orders-db.yaml",
        ]
    );

    let db = &files["producer/CloudSQL/config/orders-db.yaml"];
    assert!(db.contains("project: db-project"));
    assert!(db.contains(r#"allowedConsumerProjects: ["app-project"]"#));

    assert_eq!(
        files["producer/CloudSQL/cloudsql.tfvars"].trim_end(),
        "project_id = \"db-project\"\ninstances = [\"orders-db\"]"
    );

    let networking = &files["networking/config/networking.yaml"];
    assert!(networking.contains("hostProject: net-host"));
    assert!(networking.contains("sharedVpcHost: true"));
    assert!(networking.contains(r#"serviceProjects: ["db-project","app-project"]"#));

    let psc = &files["networking/config/psc_endpoints.yaml"];
    assert!(psc.contains("- producer: orders-db"));
    assert!(psc.contains("endpointProject: net-host"));

    let org = &files["organization/config/organization.yaml"];
    for project in ["net-host", "db-project", "app-project"] {
        assert!(org.contains(&format!("  - {}", project)), "{} missing", project);
    }
}

#[test]
fn test_organisation_context_lists_apis_per_project() {
    let config = resolved("specs/psc.json");
    let registry = fixture_registry();
    let builder = ArtifactContextBuilder::new(&config, &registry, fixture_path("templates"));

    assert_eq!(
        builder.organisation_context(),
        json!({
            "projects": ["net-host", "db-project", "app-project"],
            "projectApis": {
                "net-host": ["compute.googleapis.com"],
                "db-project": ["sqladmin.googleapis.com"],
                "app-project": ["compute.googleapis.com"]
            }
        })
    );
}

#[test]
fn test_psc_context_links_endpoint_to_producer() {
    let config = resolved("specs/psc.json");
    let registry = fixture_registry();
    let builder = ArtifactContextBuilder::new(&config, &registry, fixture_path("templates"));

    assert_eq!(
        builder.psc_context(),
        json!({"pscEndpointsData": [{
            "producerName": "orders-db",
            "producerType": "cloudsql",
            "producerInstanceProjectId": "db-project",
            "endpointProjectId": "net-host",
            "forwardingRuleName": "fr-orders-db-psc",
            "network": "projects/net-host/global/networks/shared-net",
            "subnetwork": "projects/net-host/regions/us-east1/subnetworks/psc-subnet"
        }]})
    );
}

#[test]
fn test_one_failure_fails_the_batch() {
    let config = resolved("specs/psc.json");
    let registry = fixture_registry();
    let builder = ArtifactContextBuilder::new(&config, &registry, fixture_path("templates"));
    let renderer = RecordingRenderer::new().failing_on("cloudsql.yaml.j2");

    let specs = builder.all_file_specs();
    let err = render_file_specs(&specs, &renderer).unwrap_err();

    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("1 of 6"), "{}", err);
    // Every artifact was still attempted
    assert_eq!(renderer.calls().len(), specs.len());
}

#[test]
fn test_missing_template_is_a_render_failure() {
    let config = resolved("specs/basic.json");
    let registry = fixture_registry();
    let ctx = TestContext::new().unwrap();
    let builder = ArtifactContextBuilder::new(&config, &registry, ctx.path().join("no-templates"));

    let err = builder
        .generate_all_resource_files(&JinjaRenderer::new())
        .unwrap_err();
    assert!(err.is_render_failure());
}

#[test]
fn test_write_artifacts_creates_tree() {
    let config = resolved("specs/basic.json");
    let registry = fixture_registry();
    let builder = ArtifactContextBuilder::new(&config, &registry, fixture_path("templates"));
    let files = builder
        .generate_all_resource_files(&JinjaRenderer::new())
        .unwrap();

    let ctx = TestContext::new().unwrap();
    let written = write_artifacts(&ctx.output_dir(), &files).unwrap();

    assert_eq!(written.len(), 3);
    for (relative, content) in &files {
        let on_disk = std::fs::read_to_string(ctx.output_dir().join(relative)).unwrap();
        assert_eq!(&on_disk, content);
    }
}
