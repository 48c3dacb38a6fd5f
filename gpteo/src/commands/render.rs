// gpteo/src/commands/render.rs
//
// Terminal rendering shared by `scan` and `show`.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use gpteo_core::domain::scan::{FindingStatus, Scan, ScanStatus};
use gpteo_core::ports::ScanRecord;

pub fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn score(value: Option<u8>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn status_icon(status: ScanStatus) -> &'static str {
    match status {
        ScanStatus::Completed => "✅",
        ScanStatus::Failed => "❌",
        ScanStatus::Cancelled => "⏹️",
        ScanStatus::Queued | ScanStatus::Running => "⏳",
    }
}

pub fn print_header(scan: &Scan) {
    println!(
        "\n{} Scan {} of {} ({}): {}",
        status_icon(scan.status),
        scan.id,
        scan.domain,
        scan.mode,
        scan.status
    );
    if let Some(message) = &scan.error_message {
        println!("   Error: {}", message);
    }
    if let Some(version) = &scan.checks_version {
        println!("   Checks: v{}", version);
    }
    println!(
        "   SEO score: {}   GPTeo score: {}",
        score(scan.seo_score),
        score(scan.gpteo_score)
    );
}

/// Scores, breakdown, critical issues and per-page problems.
pub fn print_record(record: &ScanRecord, all_findings: bool) {
    print_header(&record.scan);

    let Some(summary) = &record.summary else {
        return;
    };
    println!(
        "   Pages: {}   Findings: {} (✅ {} pass, ❌ {} fail, ⚠️  {} warning)",
        summary.total_pages,
        summary.total_findings,
        summary.pass_count,
        summary.fail_count,
        summary.warning_count
    );

    let mut breakdown = table();
    breakdown.set_header(vec!["Category", "Group", "Score"]);
    for (category, groups) in [("seo", &summary.seo_breakdown), ("gpteo", &summary.gpteo_breakdown)] {
        for (group, value) in groups {
            breakdown.add_row(vec![category.to_string(), group.clone(), format!("{:.2}", value)]);
        }
    }
    println!("\n📊 Breakdown\n{}", breakdown);

    if !summary.critical_issues.is_empty() {
        let mut issues = table();
        issues.set_header(vec!["Check", "Severity", "Pages", "Message"]);
        for issue in &summary.critical_issues {
            issues.add_row(vec![
                issue.check_key.clone(),
                issue.severity.to_string(),
                issue.affected_pages.to_string(),
                issue.message.clone(),
            ]);
        }
        println!("\n🚨 Critical issues\n{}", issues);
    }

    for report in &record.pages {
        let page = &report.page;
        let findings: Vec<_> = report
            .findings
            .iter()
            .filter(|f| all_findings || f.status != FindingStatus::Pass)
            .collect();

        println!(
            "\n📄 {} [{}] {}",
            page.url,
            page.page_type,
            page.status_code
                .map_or_else(|| "-".to_string(), |code| code.to_string())
        );
        if let Some(error) = &page.fetch_error {
            println!("   Fetch error: {}", error);
        }
        if findings.is_empty() {
            continue;
        }

        let mut rows = table();
        rows.set_header(vec!["Check", "Status", "Score", "Message", "Fix"]);
        for finding in findings {
            rows.add_row(vec![
                finding.check_key.clone(),
                finding.status.to_string(),
                format!("{:.0}", finding.score),
                finding.message.clone(),
                finding.fix_suggestion.clone().unwrap_or_default(),
            ]);
        }
        println!("{}", rows);
    }
}
