//! Dataset to single-sheet workbook export

use super::style::Style;
use super::workbook::{
    Workbook, DEFAULT_COMPRESSION_LEVEL, DEFAULT_FLUSH_INTERVAL, DEFAULT_SHEET_NAME,
};
use super::xml::coordinates_to_cell_name;
use crate::error::Result;
use crate::types::{Dataset, HEADERS};
use std::path::Path;

/// Fill color of the header row
pub const HEADER_FILL: &str = "#800080";

/// Export `data` as a workbook with a styled header row.
///
/// Row 1 holds [`HEADERS`] in bold white on [`HEADER_FILL`]; record `k` lands
/// on row `k + 2`. The file at `path` is created only once every row has been
/// streamed, and replaces whatever was there.
pub fn export_xlsx_stream<P: AsRef<Path>>(path: P, data: &Dataset) -> Result<()> {
    export_xlsx_stream_with_interval(path, data, DEFAULT_FLUSH_INTERVAL)
}

/// [`export_xlsx_stream`] with a custom number of rows kept in memory
pub fn export_xlsx_stream_with_interval<P: AsRef<Path>>(
    path: P,
    data: &Dataset,
    flush_interval: usize,
) -> Result<()> {
    export_xlsx_stream_with_options(path, data, flush_interval, DEFAULT_COMPRESSION_LEVEL)
}

/// [`export_xlsx_stream`] with custom flush interval and deflate level (0-9)
pub fn export_xlsx_stream_with_options<P: AsRef<Path>>(
    path: P,
    data: &Dataset,
    flush_interval: usize,
    compression_level: u32,
) -> Result<()> {
    let path = path.as_ref();
    tracing::debug!(
        path = %path.display(),
        rows = data.len(),
        flush_interval,
        compression_level,
        "xlsx stream export"
    );

    let mut workbook = Workbook::new();
    workbook.set_flush_interval(flush_interval);
    workbook.set_compression_level(compression_level);
    let header_style = workbook.new_style(&Style::header(HEADER_FILL))?;

    let mut stream = workbook.new_stream_writer(DEFAULT_SHEET_NAME)?;

    stream.set_row("A1", HEADERS)?;
    for col in 1..=HEADERS.len() as u32 {
        stream.set_cell_style(&coordinates_to_cell_name(col, 1)?, header_style)?;
    }

    for (i, applicant) in data.iter().enumerate() {
        let cell = coordinates_to_cell_name(1, i as u32 + 2)?;
        stream.set_row(&cell, applicant.fields())?;
    }

    stream.flush()?.save_as(path)
}
