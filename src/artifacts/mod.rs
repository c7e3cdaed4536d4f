//! Artifact context building.
//!
//! Walks a resolved [`CompleteConfig`] and produces one [`FileSpec`] per
//! deployment artifact: a config file per generated resource, a security
//! variables file per resource type, and the organisation, networking and
//! PSC endpoint files. Rendering goes through a [`TemplateRenderer`] and is
//! all-or-nothing.

use crate::error::{Error, ErrorContext, Result};
use crate::model::{
    CompleteConfig, Project, Resource, FORWARDING_RULES_COLLECTION, PRODUCERS_COLLECTION,
    SUBNETS_COLLECTION, VPC_COLLECTION,
};
use crate::registry::{GenerationConfig, TypeRegistry};
use crate::template::TemplateRenderer;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const ORGANIZATION_OUTPUT: &str = "organization/config/organization.yaml";
const ORGANIZATION_TEMPLATE: (&str, &str) = ("organization", "organization.yaml.j2");
const NETWORKING_OUTPUT: &str = "networking/config/networking.yaml";
const NETWORKING_TEMPLATE: (&str, &str) = ("networking", "networking.yaml.j2");
const PSC_OUTPUT: &str = "networking/config/psc_endpoints.yaml";
const PSC_TEMPLATE: (&str, &str) = ("networking", "psc_endpoints.yaml.j2");

const TEMPLATE_SUFFIX: &str = ".j2";

/// One file to render: where it goes, which template, and with what.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSpec {
    /// Output path relative to the artifact root, `/`-separated
    pub output_path: String,
    /// Directory the template is loaded from
    pub template_dir: PathBuf,
    /// Template file name inside `template_dir`
    pub template_name: String,
    /// Render context
    pub context: Value,
}

impl FileSpec {
    fn new(
        output_path: impl Into<String>,
        template_dir: PathBuf,
        template_name: impl Into<String>,
        context: Value,
    ) -> Self {
        Self {
            output_path: output_path.into(),
            template_dir,
            template_name: template_name.into(),
            context,
        }
    }
}

/// Builds render contexts for every artifact of a resolved configuration.
pub struct ArtifactContextBuilder<'a> {
    config: &'a CompleteConfig,
    registry: &'a TypeRegistry,
    templates_base_dir: PathBuf,
}

impl<'a> ArtifactContextBuilder<'a> {
    /// Create a builder over a resolved configuration.
    pub fn new(
        config: &'a CompleteConfig,
        registry: &'a TypeRegistry,
        templates_base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            registry,
            templates_base_dir: templates_base_dir.into(),
        }
    }

    fn template_dir(&self, generation: &GenerationConfig) -> PathBuf {
        self.templates_base_dir
            .join(&generation.category)
            .join(&generation.folder_name)
    }

    /// Every typed resource in the document with its owning project.
    fn typed_resources(&self) -> impl Iterator<Item = (&'a Project, &'a str, &'a Resource)> {
        let config = self.config;
        config.projects.iter().flat_map(|project| {
            project.all_resources().filter_map(move |(_, resource)| {
                resource
                    .type_name()
                    .map(|type_name| (project, type_name, resource))
            })
        })
    }

    /// Per-resource config files plus one security variables file per type.
    pub fn resource_file_specs(&self) -> Vec<FileSpec> {
        let mut specs = Vec::new();
        // type -> (first project using it, instances)
        let mut security: IndexMap<&str, (&str, Vec<Value>)> = IndexMap::new();

        for (project, type_name, resource) in self.typed_resources() {
            let Some(entry) = self.registry.get(type_name) else { continue };

            if entry.security_config_template.is_some() {
                security
                    .entry(type_name)
                    .or_insert_with(|| (project.project_id.as_str(), Vec::new()))
                    .1
                    .push(json!({"projectId": project.project_id, "instance": resource}));
            }

            let Some(generation) = &entry.generation_config else { continue };
            let Some(name) = resource.name() else {
                warn!(
                    "Skipping unnamed '{}' resource in project '{}'",
                    type_name, project.project_id
                );
                continue;
            };

            let ext = template_extension(&generation.template_filename);
            specs.push(FileSpec::new(
                format!(
                    "{}/{}/config/{}.{}",
                    generation.category, generation.folder_name, name, ext
                ),
                self.template_dir(generation),
                generation.template_filename.clone(),
                json!({"projectId": project.project_id, "instance": resource}),
            ));
        }

        for (type_name, (project_id, instances)) in security {
            let Some(entry) = self.registry.get(type_name) else { continue };
            let (Some(template), Some(generation)) =
                (&entry.security_config_template, &entry.generation_config)
            else {
                debug!(
                    "Type '{}' has a security template but no generationConfig",
                    type_name
                );
                continue;
            };
            let file_name = template.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(template);
            specs.push(FileSpec::new(
                format!(
                    "{}/{}/{}",
                    generation.category, generation.folder_name, file_name
                ),
                self.template_dir(generation),
                template.clone(),
                json!({"projectId": project_id, "instances": instances}),
            ));
        }

        specs
    }

    /// Project list and the APIs each project needs enabled.
    pub fn organisation_context(&self) -> Value {
        let projects: Vec<&str> = self
            .config
            .projects
            .iter()
            .map(|p| p.project_id.as_str())
            .collect();

        let mut apis = Map::new();
        for project in &self.config.projects {
            let hosts: BTreeSet<&str> = project
                .all_resources()
                .filter_map(|(_, resource)| resource.type_name())
                .filter_map(|type_name| self.registry.get(type_name))
                .filter_map(|entry| entry.api_host())
                .collect();
            apis.insert(project.project_id.clone(), json!(hosts));
        }

        json!({"projects": projects, "projectApis": apis})
    }

    /// Shared VPC layout, or `None` when no project declares a VPC.
    pub fn networking_context(&self) -> Option<Value> {
        let projects = &self.config.projects;
        let Some(first_with_vpc) = projects
            .iter()
            .find(|p| p.resources(VPC_COLLECTION).next().is_some())
        else {
            warn!("No VPC definition found; skipping networking artifacts");
            return None;
        };
        let explicit = projects.iter().find(|p| p.is_host_project());
        let host = explicit.unwrap_or(first_with_vpc);

        let service_projects: Vec<&str> = if explicit.is_some() {
            projects
                .iter()
                .filter(|p| p.project_id != host.project_id)
                .map(|p| p.project_id.as_str())
                .collect()
        } else {
            let needle = format!("projects/{}/", host.project_id);
            projects
                .iter()
                .filter(|p| p.project_id != host.project_id)
                .filter(|p| {
                    p.all_resources()
                        .any(|(_, r)| r.fields().values().any(|v| mentions(v, &needle)))
                })
                .map(|p| p.project_id.as_str())
                .collect()
        };

        let shared = explicit.is_some() || !service_projects.is_empty();
        let networks: Vec<&Resource> = host.resources(VPC_COLLECTION).collect();
        let subnets: Vec<&Resource> = host.resources(SUBNETS_COLLECTION).collect();

        Some(json!({
            "hostProjectId": host.project_id,
            "sharedVpcHost": if shared { "true" } else { "false" },
            "sharedVpcServiceProjects": service_projects,
            "networks": networks,
            "subnets": subnets,
        }))
    }

    /// One entry per forwarding rule that targets a known producer.
    pub fn psc_context(&self) -> Value {
        let mut endpoints = Vec::new();

        for project in &self.config.projects {
            for rule in project.resources(FORWARDING_RULES_COLLECTION) {
                let Some(target) = rule.str_field("targetProducerName") else {
                    debug!(
                        "Forwarding rule {:?} in '{}' has no target producer",
                        rule.name(),
                        project.project_id
                    );
                    continue;
                };
                let Some((owner, producer)) = self.find_producer(target) else {
                    debug!(
                        "Forwarding rule {:?} targets unknown producer '{}'",
                        rule.name(),
                        target
                    );
                    continue;
                };

                endpoints.push(json!({
                    "producerName": target,
                    "producerType": producer.type_name(),
                    "producerInstanceProjectId": owner.project_id,
                    "endpointProjectId": project.project_id,
                    "forwardingRuleName": rule.name(),
                    "network": rule.get("network"),
                    "subnetwork": rule.get("subnetwork"),
                }));
            }
        }

        json!({"pscEndpointsData": endpoints})
    }

    fn find_producer(&self, name: &str) -> Option<(&'a Project, &'a Resource)> {
        self.config.projects.iter().find_map(|project| {
            project
                .resources(PRODUCERS_COLLECTION)
                .find(|p| p.name() == Some(name))
                .map(|p| (project, p))
        })
    }

    fn fixed_spec(&self, output: &str, (dir, template): (&str, &str), context: Value) -> FileSpec {
        FileSpec::new(output, self.templates_base_dir.join(dir), template, context)
    }

    /// Every artifact: resource files, organisation, networking, PSC.
    pub fn all_file_specs(&self) -> Vec<FileSpec> {
        let mut specs = self.resource_file_specs();
        specs.push(self.fixed_spec(
            ORGANIZATION_OUTPUT,
            ORGANIZATION_TEMPLATE,
            self.organisation_context(),
        ));
        if let Some(networking) = self.networking_context() {
            specs.push(self.fixed_spec(NETWORKING_OUTPUT, NETWORKING_TEMPLATE, networking));
        }
        let psc = self.psc_context();
        let has_endpoints = psc["pscEndpointsData"]
            .as_array()
            .is_some_and(|endpoints| !endpoints.is_empty());
        if has_endpoints {
            specs.push(self.fixed_spec(PSC_OUTPUT, PSC_TEMPLATE, psc));
        }
        specs
    }

    /// Render every artifact. Any failure fails the whole batch.
    pub fn generate_all_resource_files(
        &self,
        renderer: &dyn TemplateRenderer,
    ) -> Result<IndexMap<String, String>> {
        render_file_specs(&self.all_file_specs(), renderer)
    }
}

/// Render a list of file specs, returning nothing unless all succeed.
pub fn render_file_specs(
    specs: &[FileSpec],
    renderer: &dyn TemplateRenderer,
) -> Result<IndexMap<String, String>> {
    let mut rendered = IndexMap::with_capacity(specs.len());
    let mut failed = 0;

    for spec in specs {
        match renderer.render(&spec.template_dir, &spec.template_name, &spec.context) {
            Ok(text) => {
                rendered.insert(spec.output_path.clone(), text);
            }
            Err(e) => {
                error!("Failed to generate {}: {}", spec.output_path, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(Error::ArtifactBatch {
            failed,
            total: specs.len(),
        });
    }
    info!("Rendered {} artifacts", rendered.len());
    Ok(rendered)
}

/// Write rendered artifacts under `out_dir`. Returns the paths written.
pub fn write_artifacts(out_dir: &Path, files: &IndexMap<String, String>) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for (relative, content) in files {
        let path = out_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// `gce.yaml.j2` -> `yaml`.
fn template_extension(template: &str) -> &str {
    let base = template.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(template);
    base.rsplit_once('.').map_or(base, |(_, ext)| ext)
}

fn mentions(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.contains(needle),
        Value::Array(items) => items.iter().any(|v| mentions(v, needle)),
        Value::Object(map) => map.values().any(|v| mentions(v, needle)),
        _ => false,
    }
}
