// gpteo/src/commands/delete.rs

use uuid::Uuid;

use gpteo_core::infrastructure::config::Settings;

use crate::commands::service;

pub async fn execute(settings: &Settings, owner: &str, scan_id: Uuid) -> anyhow::Result<()> {
    let service = service(settings)?;
    service.delete(owner, scan_id).await?;
    println!("🗑️  Scan {} deleted.", scan_id);
    Ok(())
}
