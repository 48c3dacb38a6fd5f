// gpteo-core/src/infrastructure/jinja.rs

use minijinja::{Environment, UndefinedBehavior};

use crate::domain::error::DomainError;
use crate::domain::ports::FixRenderer;

/// minijinja-backed renderer for check fix templates.
pub struct JinjaFixRenderer {
    env: Environment<'static>,
}

impl JinjaFixRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // A typo in a template variable should surface, not render blank.
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }
}

impl Default for JinjaFixRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FixRenderer for JinjaFixRenderer {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, DomainError> {
        self.env
            .render_str(template, context)
            .map_err(|e| DomainError::Template(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn test_render_fix_template() -> Result<()> {
        let renderer = JinjaFixRenderer::new();
        let context = json!({
            "url": "https://example.com/p/1",
            "domain": "example.com",
            "found": "Mug",
            "expected": "sku, brand",
            "check": "gpteo.schema.product.complete",
        });
        let out = renderer.render(
            "Add {{ expected }} to the Product schema on {{ url }} ({{ domain | upper }})",
            &context,
        )?;
        assert_eq!(
            out,
            "Add sku, brand to the Product schema on https://example.com/p/1 (EXAMPLE.COM)"
        );
        Ok(())
    }

    #[test]
    fn test_unknown_variable_is_an_error() {
        let renderer = JinjaFixRenderer::new();
        let err = renderer.render("{{ nope }}", &json!({}));
        assert!(matches!(err, Err(DomainError::Template(_))));
    }

    #[test]
    fn test_syntax_error_is_an_error() {
        let renderer = JinjaFixRenderer::new();
        assert!(renderer.render("{% if %}", &json!({})).is_err());
    }
}
