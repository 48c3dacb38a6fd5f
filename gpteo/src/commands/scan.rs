// gpteo/src/commands/scan.rs
//
// USE CASE: Submit a scan, wait for it to finish, report the result.

use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

use gpteo_core::domain::scan::{ScanRequest, ScanStatus};
use gpteo_core::infrastructure::config::Settings;
use gpteo_core::infrastructure::fs::write_json_report;

use crate::cli::OutputFormat;
use crate::commands::{render, service};

const POLL: Duration = Duration::from_millis(200);

pub struct ScanArgs {
    pub domain: String,
    pub urls: Vec<String>,
    pub mode: Option<String>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

pub async fn execute(settings: &Settings, owner: &str, args: ScanArgs) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let service = service(settings)?;

    let request = ScanRequest::new(args.domain, args.urls, args.mode.as_deref());
    let scan_id = match service.submit(owner, request).await {
        Ok(id) => id,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    if args.format == OutputFormat::Table {
        println!("🔎 Scan {} queued", scan_id);
    }

    // Ctrl-C cancels the scan at its next page boundary.
    let scan = tokio::select! {
        scan = service.wait_for_terminal(owner, scan_id, POLL) => scan?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n⏹️  Cancelling scan {}...", scan_id);
            service.cancel(owner, scan_id).await?;
            service.wait_for_terminal(owner, scan_id, POLL).await?
        }
    };
    service.shutdown();

    let record = service.read(owner, scan_id).await?;
    if let Some(path) = &args.output {
        write_json_report(path, &record)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Table => {
            render::print_record(&record, false);
            if let Some(path) = &args.output {
                println!("\n📄 JSON report saved to {}", path.display());
            }
            println!("\n⏱️  Finished in {:.2?}", start.elapsed());
        }
    }

    if scan.status == ScanStatus::Failed {
        eprintln!(
            "\n💥 Scan failed: {}",
            scan.error_message.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }
    Ok(())
}
