// gpteo/src/commands/checks.rs
//
// USE CASE: List the checks the next scan would run.

use gpteo_core::domain::ports::RegistrySource;
use gpteo_core::infrastructure::config::{Settings, registry_source};

use crate::commands::render::table;

pub fn execute(settings: &Settings) -> anyhow::Result<()> {
    let registry = registry_source(settings.registry.checks_path.as_deref())?.snapshot()?;

    let mut rows = table();
    rows.set_header(vec!["Key", "Category", "Severity", "Weight", "Pages", "Name"]);
    for check in registry.active() {
        let pages = if check.page_types.is_empty() {
            "all".to_string()
        } else {
            check
                .page_types
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        rows.add_row(vec![
            check.key.clone(),
            check.category.to_string(),
            check.severity.to_string(),
            check.weight.to_string(),
            pages,
            check.name.clone(),
        ]);
    }

    println!("📋 Checks catalogue v{}", registry.version());
    println!("{}", rows);
    println!("   {} active check(s)", registry.active().count());
    Ok(())
}
