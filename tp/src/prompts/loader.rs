//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::PromptError;
use super::embedded;

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.tripplanner/prompts/`)
    user_dir: Option<PathBuf>,
    /// Repo default directory (e.g., `prompts/`)
    repo_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a new prompt loader rooted at `root`
    ///
    /// Looks for `.tripplanner/prompts/` and `prompts/` under `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        debug!(?root, "PromptLoader::new: called");
        let user_dir = root.join(".tripplanner/prompts");
        let repo_dir = root.join("prompts");

        let user_dir_exists = user_dir.is_dir();
        let repo_dir_exists = repo_dir.is_dir();
        debug!(
            ?user_dir,
            %user_dir_exists,
            ?repo_dir,
            %repo_dir_exists,
            "PromptLoader::new: checking directories"
        );

        Self {
            hbs: Self::engine(),
            user_dir: user_dir_exists.then_some(user_dir),
            repo_dir: repo_dir_exists.then_some(repo_dir),
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
            repo_dir: None,
        }
    }

    /// Prompts are plain text, so values are inserted without HTML escaping
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.tripplanner/prompts/{name}.pmt`
    /// 2. Repo default: `prompts/{name}.pmt`
    /// 3. Embedded fallback
    pub fn load_template(&self, name: &str) -> Result<String, PromptError> {
        debug!(%name, "PromptLoader::load_template: called");
        for dir in [&self.user_dir, &self.repo_dir].into_iter().flatten() {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found on disk");
                return std::fs::read_to_string(&path).map_err(|e| PromptError::TemplateRead {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
            debug!(?path, "PromptLoader::load_template: not found");
        }

        debug!("PromptLoader::load_template: trying embedded fallback");
        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| PromptError::TemplateNotFound(name.to_string()))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String, PromptError> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}'", template_name);

        self.hbs
            .render_template(&template, context)
            .map_err(|e| PromptError::Render {
                name: template_name.to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_embedded_only_loads_itinerary() {
        let loader = PromptLoader::embedded_only();
        let content = loader.load_template("itinerary").unwrap();
        assert!(content.contains("travel itinerary"));
    }

    #[test]
    fn test_unknown_template() {
        let loader = PromptLoader::embedded_only();
        let result = loader.load_template("nonexistent-template");
        assert!(matches!(result, Err(PromptError::TemplateNotFound(_))));
    }

    #[test]
    fn test_user_override_wins_over_repo() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join(".tripplanner/prompts")).unwrap();
        fs::create_dir_all(temp.path().join("prompts")).unwrap();
        fs::write(temp.path().join(".tripplanner/prompts/itinerary.pmt"), "user {{destination}}").unwrap();
        fs::write(temp.path().join("prompts/itinerary.pmt"), "repo {{destination}}").unwrap();

        let loader = PromptLoader::new(temp.path());
        assert_eq!(loader.load_template("itinerary").unwrap(), "user {{destination}}");
    }

    #[test]
    fn test_repo_dir_used_when_no_override() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("prompts")).unwrap();
        fs::write(temp.path().join("prompts/itinerary.pmt"), "repo {{destination}}").unwrap();

        let loader = PromptLoader::new(temp.path());
        assert_eq!(loader.load_template("itinerary").unwrap(), "repo {{destination}}");
    }

    #[test]
    fn test_render_does_not_escape() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("prompts")).unwrap();
        fs::write(temp.path().join("prompts/greeting.pmt"), "Trip to {{destination}}").unwrap();

        let loader = PromptLoader::new(temp.path());
        let rendered = loader
            .render("greeting", &serde_json::json!({ "destination": "Côte d'Azur & <Nice>" }))
            .unwrap();
        assert_eq!(rendered, "Trip to Côte d'Azur & <Nice>");
    }

    #[test]
    fn test_render_reports_bad_template() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("prompts")).unwrap();
        fs::write(temp.path().join("prompts/broken.pmt"), "{{#if destination}}unclosed").unwrap();

        let loader = PromptLoader::new(temp.path());
        let result = loader.render("broken", &serde_json::json!({ "destination": "Goa" }));
        assert!(matches!(result, Err(PromptError::Render { .. })));
    }
}
