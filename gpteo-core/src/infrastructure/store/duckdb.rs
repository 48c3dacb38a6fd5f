// gpteo-core/src/infrastructure/store/duckdb.rs

use async_trait::async_trait;
use chrono::SecondsFormat;
use duckdb::{Config, Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::check::ChecksRegistry;
use crate::domain::error::DomainError;
use crate::domain::scan::{Finding, Page, PageReport, Scan, ScanSummary};
use crate::error::GpteoError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::{ScanListing, ScanOverview, ScanRecord, ScanStats, ScanStore};

// Full records are kept as JSON; the scalar columns exist for filtering,
// ordering and aggregation.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS checks (
    key VARCHAR PRIMARY KEY,
    category VARCHAR NOT NULL,
    severity VARCHAR NOT NULL,
    weight INTEGER NOT NULL,
    version VARCHAR NOT NULL,
    definition VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS scans (
    id VARCHAR PRIMARY KEY,
    owner_id VARCHAR NOT NULL,
    domain VARCHAR NOT NULL,
    mode VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    queued_at VARCHAR NOT NULL,
    seo_score INTEGER,
    gpteo_score INTEGER,
    record VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS pages (
    scan_id VARCHAR NOT NULL,
    position INTEGER NOT NULL,
    url VARCHAR NOT NULL,
    page_type VARCHAR NOT NULL,
    status_code INTEGER,
    record VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS findings (
    scan_id VARCHAR NOT NULL,
    page_position INTEGER NOT NULL,
    position INTEGER NOT NULL,
    check_key VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    score DOUBLE NOT NULL,
    record VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS scan_summaries (
    scan_id VARCHAR PRIMARY KEY,
    record VARCHAR NOT NULL
);
"#;

pub struct DuckDbScanStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbScanStore {
    /// Opens (or creates) the database at `db_path`; `:memory:` for a
    /// throwaway database.
    pub fn open(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();
        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, GpteoError> {
        self.conn
            .lock()
            .map_err(|_| DatabaseError::LockPoisoned.into())
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, GpteoError> {
    serde_json::to_string(value).map_err(|e| InfrastructureError::JsonError(e).into())
}

fn from_json<T: DeserializeOwned>(table: &'static str, raw: &str) -> Result<T, GpteoError> {
    serde_json::from_str(raw).map_err(|e| {
        DatabaseError::CorruptRow {
            table,
            reason: e.to_string(),
        }
        .into()
    })
}

fn write_scan_row(conn: &Connection, scan: &Scan) -> Result<(), GpteoError> {
    let record = to_json(scan)?;
    let updated = conn.execute(
        "UPDATE scans SET status = ?, seo_score = ?, gpteo_score = ?, record = ? WHERE id = ?",
        params![
            scan.status.as_str(),
            scan.seo_score.map(i64::from),
            scan.gpteo_score.map(i64::from),
            record,
            scan.id.to_string()
        ],
    )?;
    if updated == 0 {
        return Err(DomainError::ScanNotFound(scan.id.to_string()).into());
    }
    Ok(())
}

fn query_strings(
    conn: &Connection,
    sql: &str,
    param: &str,
) -> Result<Vec<String>, GpteoError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![param], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn load_summary(conn: &Connection, id: &str) -> Result<Option<ScanSummary>, GpteoError> {
    query_strings(
        conn,
        "SELECT record FROM scan_summaries WHERE scan_id = ?",
        id,
    )?
    .first()
    .map(|raw| from_json("scan_summaries", raw))
    .transpose()
}

#[async_trait]
impl ScanStore for DuckDbScanStore {
    #[instrument(skip(self, scan), fields(scan_id = %scan.id))]
    async fn create_scan(&self, scan: &Scan) -> Result<(), GpteoError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO scans (id, owner_id, domain, mode, status, queued_at, seo_score, gpteo_score, record)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                scan.id.to_string(),
                scan.owner_id,
                scan.domain,
                scan.mode.as_str(),
                scan.status.as_str(),
                scan.queued_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                scan.seo_score.map(i64::from),
                scan.gpteo_score.map(i64::from),
                to_json(scan)?
            ],
        )?;
        Ok(())
    }

    async fn get_scan(&self, id: Uuid) -> Result<Option<Scan>, GpteoError> {
        let conn = self.lock()?;
        query_strings(&conn, "SELECT record FROM scans WHERE id = ?", &id.to_string())?
            .first()
            .map(|raw| from_json("scans", raw))
            .transpose()
    }

    #[instrument(skip(self, scan), fields(scan_id = %scan.id, status = %scan.status))]
    async fn update_scan(&self, scan: &Scan) -> Result<(), GpteoError> {
        let conn = self.lock()?;
        write_scan_row(&conn, scan)
    }

    #[instrument(skip(self, registry), fields(version = registry.version()))]
    async fn register_checks(&self, registry: &ChecksRegistry) -> Result<(), GpteoError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for check in registry.checks() {
            tx.execute(
                "INSERT INTO checks (key, category, severity, weight, version, definition)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT (key) DO UPDATE SET
                    category = excluded.category,
                    severity = excluded.severity,
                    weight = excluded.weight,
                    version = excluded.version,
                    definition = excluded.definition",
                params![
                    check.key,
                    check.category.as_str(),
                    check.severity.as_str(),
                    i64::from(check.weight),
                    check.version,
                    to_json(check)?
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    #[instrument(skip(self, scan, pages, summary), fields(scan_id = %scan.id, pages = pages.len()))]
    async fn complete_scan(
        &self,
        scan: &Scan,
        pages: &[PageReport],
        summary: &ScanSummary,
    ) -> Result<(), GpteoError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let scan_id = scan.id.to_string();

        for (page_pos, report) in pages.iter().enumerate() {
            let page = &report.page;
            tx.execute(
                "INSERT INTO pages (scan_id, position, url, page_type, status_code, record)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    scan_id,
                    page_pos as i64,
                    page.url,
                    page.page_type.as_str(),
                    page.status_code.map(i64::from),
                    to_json(page)?
                ],
            )?;

            for (pos, finding) in report.findings.iter().enumerate() {
                let registered: i64 = tx.query_row(
                    "SELECT count(*) FROM checks WHERE key = ?",
                    params![finding.check_key],
                    |row| row.get(0),
                )?;
                if registered == 0 {
                    // Dropping `tx` rolls back everything written so far.
                    return Err(GpteoError::InternalError(format!(
                        "finding references unregistered check '{}'",
                        finding.check_key
                    )));
                }
                tx.execute(
                    "INSERT INTO findings (scan_id, page_position, position, check_key, status, score, record)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                    params![
                        scan_id,
                        page_pos as i64,
                        pos as i64,
                        finding.check_key,
                        finding.status.as_str(),
                        finding.score,
                        to_json(finding)?
                    ],
                )?;
            }
        }

        tx.execute(
            "INSERT INTO scan_summaries (scan_id, record) VALUES (?, ?)",
            params![scan_id, to_json(summary)?],
        )?;
        write_scan_row(&tx, scan)?;
        tx.commit()?;

        debug!("Persisted {} pages for scan {}", pages.len(), scan_id);
        Ok(())
    }

    async fn get_results(&self, id: Uuid) -> Result<Option<ScanRecord>, GpteoError> {
        let conn = self.lock()?;
        let id = id.to_string();

        let Some(raw_scan) = query_strings(&conn, "SELECT record FROM scans WHERE id = ?", &id)?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };
        let scan: Scan = from_json("scans", &raw_scan)?;

        let mut pages: Vec<PageReport> = query_strings(
            &conn,
            "SELECT record FROM pages WHERE scan_id = ? ORDER BY position",
            &id,
        )?
        .iter()
        .map(|raw| {
            from_json::<Page>("pages", raw).map(|page| PageReport {
                page,
                findings: Vec::new(),
            })
        })
        .collect::<Result<_, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT page_position, record FROM findings WHERE scan_id = ? ORDER BY page_position, position",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (page_pos, raw) = row?;
            let finding: Finding = from_json("findings", &raw)?;
            let report = usize::try_from(page_pos)
                .ok()
                .and_then(|i| pages.get_mut(i))
                .ok_or_else(|| DatabaseError::CorruptRow {
                    table: "findings",
                    reason: format!("no page at position {}", page_pos),
                })?;
            report.findings.push(finding);
        }

        Ok(Some(ScanRecord {
            scan,
            pages,
            summary: load_summary(&conn, &id)?,
        }))
    }

    async fn list_scans(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<ScanListing, GpteoError> {
        let conn = self.lock()?;

        let total: i64 = conn.query_row(
            "SELECT count(*) FROM scans WHERE owner_id = ?",
            params![owner_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT s.record, m.record
             FROM scans s LEFT JOIN scan_summaries m ON m.scan_id = s.id
             WHERE s.owner_id = ?
             ORDER BY s.queued_at DESC, s.id DESC
             LIMIT ? OFFSET ?",
        )?;
        let rows = stmt.query_map(params![owner_id, limit as i64, offset as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut scans = Vec::new();
        for row in rows {
            let (raw_scan, raw_summary) = row?;
            scans.push(ScanOverview {
                scan: from_json("scans", &raw_scan)?,
                summary: raw_summary
                    .map(|raw| from_json("scan_summaries", &raw))
                    .transpose()?,
            });
        }

        Ok(ScanListing {
            scans,
            total: usize::try_from(total).unwrap_or_default(),
        })
    }

    #[instrument(skip(self))]
    async fn delete_scan(&self, id: Uuid) -> Result<bool, GpteoError> {
        let mut conn = self.lock()?;
        let id = id.to_string();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM findings WHERE scan_id = ?", params![id])?;
        tx.execute("DELETE FROM pages WHERE scan_id = ?", params![id])?;
        tx.execute("DELETE FROM scan_summaries WHERE scan_id = ?", params![id])?;
        let deleted = tx.execute("DELETE FROM scans WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self))]
    async fn delete_check(&self, key: &str) -> Result<bool, GpteoError> {
        let conn = self.lock()?;
        let references: i64 = conn.query_row(
            "SELECT count(*) FROM findings WHERE check_key = ?",
            params![key],
            |row| row.get(0),
        )?;
        if references > 0 {
            return Err(DomainError::CheckInUse(key.to_string()).into());
        }
        let deleted = conn.execute("DELETE FROM checks WHERE key = ?", params![key])?;
        Ok(deleted > 0)
    }

    async fn stats(&self, owner_id: &str) -> Result<ScanStats, GpteoError> {
        let conn = self.lock()?;
        let stats = conn.query_row(
            "SELECT
                count(*),
                count(*) FILTER (WHERE status = 'completed'),
                count(*) FILTER (WHERE status = 'running'),
                count(*) FILTER (WHERE status = 'queued'),
                count(*) FILTER (WHERE status = 'failed'),
                count(*) FILTER (WHERE status = 'cancelled'),
                avg(seo_score)::DOUBLE,
                avg(gpteo_score)::DOUBLE
             FROM scans WHERE owner_id = ?",
            params![owner_id],
            |row| {
                let count = |i: usize| -> duckdb::Result<usize> {
                    Ok(usize::try_from(row.get::<_, i64>(i)?).unwrap_or_default())
                };
                Ok(ScanStats {
                    total: count(0)?,
                    completed: count(1)?,
                    running: count(2)?,
                    queued: count(3)?,
                    failed: count(4)?,
                    cancelled: count(5)?,
                    avg_seo_score: row.get(6)?,
                    avg_gpteo_score: row.get(7)?,
                })
            },
        )?;
        Ok(stats)
    }
}
