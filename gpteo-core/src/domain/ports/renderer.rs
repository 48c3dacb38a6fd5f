// gpteo-core/src/domain/ports/renderer.rs

use crate::domain::error::DomainError;
use serde_json::Value;

/// Renders a check's `fix_template` against a finding context
/// (`url`, `domain`, `found`, `expected`, `check`).
pub trait FixRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String, DomainError>;
}
