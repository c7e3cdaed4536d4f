//! Template rendering for deployment artifacts.
//!
//! The artifact builder only talks to the [`TemplateRenderer`] trait; the
//! default implementation is [`JinjaRenderer`], backed by minijinja with a
//! filesystem loader rooted at each template directory.

mod filters;

pub use filters::register_filters;

use crate::error::{Error, Result};
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error};

/// Renders one template with one context.
pub trait TemplateRenderer: Send + Sync {
    /// Render `template_name` from `template_dir` with `context`.
    fn render(&self, template_dir: &Path, template_name: &str, context: &Value) -> Result<String>;
}

/// minijinja-backed renderer.
///
/// Undefined variables are errors, output is never auto-escaped, and block
/// tags do not leave blank lines behind.
#[derive(Debug, Clone, Default)]
pub struct JinjaRenderer {
    _private: (),
}

impl JinjaRenderer {
    /// Create a renderer.
    pub fn new() -> Self {
        Self::default()
    }

    fn environment(template_dir: &Path) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(template_dir));
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        // Artifacts are YAML and tfvars; never JSON-escape interpolations.
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        register_filters(&mut env);
        env
    }
}

impl TemplateRenderer for JinjaRenderer {
    fn render(&self, template_dir: &Path, template_name: &str, context: &Value) -> Result<String> {
        let shown = template_dir.join(template_name).display().to_string();

        if !template_dir.is_dir() {
            error!(
                "Failed to render template {}: template directory {} does not exist",
                template_name,
                template_dir.display()
            );
            return Err(Error::TemplateNotFound { template: shown });
        }

        let env = Self::environment(template_dir);
        let rendered = env
            .get_template(template_name)
            .and_then(|template| template.render(context));

        match rendered {
            Ok(text) => {
                debug!("Rendered {} ({} bytes)", shown, text.len());
                Ok(text)
            }
            Err(e) => {
                error!("Failed to render template {}: {:#}", template_name, e);
                if e.kind() == ErrorKind::TemplateNotFound {
                    Err(Error::TemplateNotFound { template: shown })
                } else {
                    Err(Error::template_render(shown, e.to_string()))
                }
            }
        }
    }
}
