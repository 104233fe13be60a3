//! Row-at-a-time CSV writer without an output buffer

use super::format_row;
use crate::error::{ExportError, Result};
use crate::types::{Dataset, HEADERS};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// How rows reach the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendMode {
    /// Keep one handle open and issue one write per row
    #[default]
    PerRow,
    /// Open, append and close the file for every row
    PerCall,
}

/// Append one escaped row to `path`, creating the file if needed.
///
/// The handle is opened and closed inside this call.
pub fn append_row<P, I, S>(path: P, row: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ExportError::create(path, e))?;

    file.write_all(format_row(row).as_bytes())?;
    Ok(())
}

/// Write the header and every record to `path` with no output buffering.
///
/// Any existing file is truncated first. The first failed write aborts the
/// export and leaves whatever was already written on disk.
pub fn export_csv_unbuffered<P: AsRef<Path>>(
    path: P,
    data: &Dataset,
    mode: AppendMode,
) -> Result<()> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), ?mode, rows = data.len(), "unbuffered csv export");

    let mut file = File::create(path).map_err(|e| ExportError::create(path, e))?;

    match mode {
        AppendMode::PerRow => {
            file.write_all(format_row(HEADERS).as_bytes())?;
            for applicant in data {
                file.write_all(format_row(applicant.fields()).as_bytes())?;
            }
        }
        AppendMode::PerCall => {
            drop(file);
            append_row(path, HEADERS)?;
            for applicant in data {
                append_row(path, applicant.fields())?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::generate_applicants;
    use tempfile::tempdir;

    #[test]
    fn test_export_per_row() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.csv");

        export_csv_unbuffered(&path, &generate_applicants(2), AppendMode::PerRow)?;

        let text = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Name*,Email*,Current Step*"));
        assert!(lines[1].starts_with("Applicant 0,applicant0@example.com,"));
        assert!(lines[1].contains("\"Rp.10,000,000\""));
        assert!(text.ends_with("Website\n"));
        assert!(!text.ends_with("\n\n"));
        Ok(())
    }

    #[test]
    fn test_modes_match() -> Result<()> {
        let dir = tempdir()?;
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        let data = generate_applicants(25);

        export_csv_unbuffered(&a, &data, AppendMode::PerRow)?;
        export_csv_unbuffered(&b, &data, AppendMode::PerCall)?;

        assert_eq!(std::fs::read(&a)?, std::fs::read(&b)?);
        Ok(())
    }

    #[test]
    fn test_existing_file_is_truncated() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale content that is longer than one row\n".repeat(50))?;

        export_csv_unbuffered(&path, &[], AppendMode::PerCall)?;

        assert_eq!(std::fs::read_to_string(&path)?, format_row(HEADERS));
        Ok(())
    }

    #[test]
    fn test_append_row_appends() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("log.csv");

        append_row(&path, ["a", "b"])?;
        append_row(&path, ["c,d"])?;

        assert_eq!(std::fs::read_to_string(&path)?, "a,b\n\"c,d\"\n");
        Ok(())
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("out.csv");

        let err = export_csv_unbuffered(&path, &[], AppendMode::PerRow).unwrap_err();
        assert!(matches!(err, ExportError::CreateError { .. }));
    }
}
