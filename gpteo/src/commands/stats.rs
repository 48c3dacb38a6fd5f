// gpteo/src/commands/stats.rs

use gpteo_core::infrastructure::config::Settings;

use crate::commands::render::table;
use crate::commands::service;

pub async fn execute(settings: &Settings, owner: &str) -> anyhow::Result<()> {
    let service = service(settings)?;
    let stats = service.stats(owner).await?;

    let average = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.1}", v));

    let mut rows = table();
    rows.set_header(vec!["Metric", "Value"]);
    rows.add_row(vec!["Total".to_string(), stats.total.to_string()]);
    rows.add_row(vec!["Completed".to_string(), stats.completed.to_string()]);
    rows.add_row(vec!["Running".to_string(), stats.running.to_string()]);
    rows.add_row(vec!["Queued".to_string(), stats.queued.to_string()]);
    rows.add_row(vec!["Failed".to_string(), stats.failed.to_string()]);
    rows.add_row(vec!["Cancelled".to_string(), stats.cancelled.to_string()]);
    rows.add_row(vec!["Average SEO score".to_string(), average(stats.avg_seo_score)]);
    rows.add_row(vec!["Average GPTeo score".to_string(), average(stats.avg_gpteo_score)]);

    println!("📊 Scans for '{}'", owner);
    println!("{}", rows);
    Ok(())
}
