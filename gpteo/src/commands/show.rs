// gpteo/src/commands/show.rs

use uuid::Uuid;

use gpteo_core::infrastructure::config::Settings;

use crate::cli::OutputFormat;
use crate::commands::{render, service};

pub async fn execute(
    settings: &Settings,
    owner: &str,
    scan_id: Uuid,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let service = service(settings)?;
    let record = service.read(owner, scan_id).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Table => render::print_record(&record, true),
    }
    Ok(())
}
