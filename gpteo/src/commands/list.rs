// gpteo/src/commands/list.rs

use gpteo_core::infrastructure::config::Settings;

use crate::commands::render::{score, table};
use crate::commands::service;

pub async fn execute(
    settings: &Settings,
    owner: &str,
    limit: usize,
    offset: usize,
) -> anyhow::Result<()> {
    let service = service(settings)?;
    let page = service.list(owner, limit, offset).await?;

    if page.total == 0 {
        println!("🗂️  No scans recorded for '{}'.", owner);
        return Ok(());
    }

    let mut rows = table();
    rows.set_header(vec!["Scan", "Domain", "Mode", "Status", "SEO", "GPTeo", "Queued at"]);
    for overview in &page.scans {
        let scan = &overview.scan;
        rows.add_row(vec![
            scan.id.to_string(),
            scan.domain.clone(),
            scan.mode.to_string(),
            scan.status.to_string(),
            score(scan.seo_score),
            score(scan.gpteo_score),
            scan.queued_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    println!("{}", rows);
    println!(
        "   Showing {} of {} scan(s){}",
        page.scans.len(),
        page.total,
        if page.has_more { ", more available with --offset" } else { "" }
    );
    Ok(())
}
