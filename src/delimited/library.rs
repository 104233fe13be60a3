//! CSV export through the `csv` crate's encoder

use crate::error::{ExportError, Result};
use crate::types::{Dataset, HEADERS};
use std::fs::File;
use std::path::Path;

/// Write the header and every record with `csv::Writer`.
///
/// Quoting is necessary-only and rows end in `\n`, matching the hand-written
/// writers for the synthetic dataset.
pub fn export_csv_library<P: AsRef<Path>>(path: P, data: &Dataset) -> Result<()> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), rows = data.len(), "library csv export");

    let file = File::create(path).map_err(|e| ExportError::create(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(file);

    writer.write_record(HEADERS)?;
    for applicant in data {
        writer.write_record(applicant.fields())?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::generate_applicants;
    use crate::delimited::{export_csv_unbuffered, AppendMode};
    use tempfile::tempdir;

    #[test]
    fn test_matches_hand_written_output() -> Result<()> {
        let dir = tempdir()?;
        let lib = dir.path().join("lib.csv");
        let raw = dir.path().join("raw.csv");
        let data = generate_applicants(50);

        export_csv_library(&lib, &data)?;
        export_csv_unbuffered(&raw, &data, AppendMode::PerRow)?;

        assert_eq!(std::fs::read(&lib)?, std::fs::read(&raw)?);
        Ok(())
    }
}
