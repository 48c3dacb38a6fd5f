// gpteo-core/src/infrastructure/fs.rs

use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::infrastructure::error::InfrastructureError;

/// Write content to a file atomically: a temporary file in the target's
/// directory is written, then renamed over the target.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp_file = tempfile::NamedTempFile::new_in(parent).map_err(InfrastructureError::Io)?;
    temp_file
        .write_all(content.as_ref())
        .map_err(InfrastructureError::Io)?;
    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}

/// Pretty-printed JSON report (scan, pages, findings, summary).
pub fn write_json_report<P: AsRef<Path>, T: Serialize>(
    path: P,
    report: &T,
) -> Result<(), InfrastructureError> {
    let json = serde_json::to_string_pretty(report)?;
    atomic_write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_overwrites_existing() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("report.json");

        atomic_write(&file_path, "Initial")?;
        atomic_write(&file_path, "Updated")?;

        assert_eq!(fs::read_to_string(file_path)?, "Updated");
        Ok(())
    }

    #[test]
    fn test_json_report_roundtrips() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("scan.json");
        let report = serde_json::json!({"scan": {"domain": "example.com"}, "pages": []});

        write_json_report(&file_path, &report)?;

        let back: serde_json::Value = serde_json::from_str(&fs::read_to_string(file_path)?)?;
        assert_eq!(back, report);
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let err = atomic_write("/definitely/not/a/dir/report.json", "x");
        assert!(matches!(err, Err(InfrastructureError::Io(_))));
    }
}
