//! Handlebars rendering of template files.

use std::fs;
use std::path::Path;

use handlebars::Handlebars;

use crate::error::{TemplateError, TemplateResult};
use crate::variables::Variables;

/// Renders template file contents against a variable map.
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a renderer that leaves output unescaped and renders unknown variables as empty.
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render a template string.
    pub fn render_content(&self, content: &str, variables: &Variables) -> Result<String, String> {
        self.handlebars
            .render_template(content, variables)
            .map_err(|e| e.to_string())
    }

    /// Render the file at `source`; empty output counts as a failure for `target`.
    pub fn render_file(
        &self,
        source: &Path,
        target: &Path,
        variables: &Variables,
    ) -> TemplateResult<String> {
        let content = fs::read_to_string(source)
            .map_err(|e| TemplateError::io(format!("Could not read {}", source.display()), e))?;
        self.render_source(&content, source, target, variables)
    }

    /// Render `content` read from `source`; empty output counts as a failure for `target`.
    pub fn render_source(
        &self,
        content: &str,
        source: &Path,
        target: &Path,
        variables: &Variables,
    ) -> TemplateResult<String> {
        let rendered = self
            .render_content(content, variables)
            .map_err(|message| TemplateError::Render {
                path: source.to_path_buf(),
                message,
            })?;

        if rendered.is_empty() {
            return Err(TemplateError::RenderEmpty(target.to_path_buf()));
        }
        Ok(rendered)
    }
}
