//! Incremental row writer for one worksheet
//!
//! [`StreamWriter::state`] reports `Open`, `Streaming` or `Failed`; any
//! failure moves the stream to `Failed`. There is no flushed or saved state
//! to query: [`StreamWriter::flush`] consumes the stream and returns a
//! [`FlushedWorkbook`], whose `save_as` consumes that in turn.

use super::style::StyleId;
use super::workbook::{FlushedWorkbook, Workbook};
use super::xml::{cell_name_to_coordinates, push_column_letter, write_escaped, MAX_COLUMNS};
use crate::error::{ExportError, Result};
use crate::types::CellValue;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};

/// Runtime state of a live [`StreamWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Created, no rows yet
    Open,
    /// At least one row accepted
    Streaming,
    /// A call failed; every later call is rejected
    Failed,
}

struct PendingCell {
    value: CellValue,
    style: StyleId,
}

struct PendingRow {
    row: u32,
    start_col: u32,
    cells: Vec<PendingCell>,
}

/// Streams rows of one sheet into a spill file.
///
/// Rows must arrive in strictly ascending order. Up to `flush_interval` rows
/// are kept in memory so their cells can still be styled; the most recently
/// written row always stays pending until the next one arrives. Rendered rows
/// are never rendered again.
pub struct StreamWriter {
    workbook: Workbook,
    sheet: String,
    spill: BufWriter<File>,
    pending: Vec<PendingRow>,
    xml_buffer: Vec<u8>,
    last_row: u32,
    last_rendered_row: u32,
    first_row: u32,
    max_col: u32,
    rows_written: u32,
    state: StreamState,
}

impl StreamWriter {
    pub(crate) fn new(workbook: Workbook, sheet: &str) -> Result<Self> {
        let spill = tempfile::tempfile().map_err(|e| ExportError::StreamInitError {
            sheet: sheet.to_string(),
            reason: format!("cannot create spill file: {}", e),
        })?;

        Ok(StreamWriter {
            workbook,
            sheet: sheet.to_string(),
            spill: BufWriter::with_capacity(64 * 1024, spill),
            pending: Vec::new(),
            xml_buffer: Vec::with_capacity(4096),
            last_row: 0,
            last_rendered_row: 0,
            first_row: 0,
            max_col: 0,
            rows_written: 0,
            state: StreamState::Open,
        })
    }

    /// Current runtime state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Name of the sheet being written
    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }

    /// Number of rows accepted so far
    pub fn rows_written(&self) -> u32 {
        self.rows_written
    }

    /// Write `values` as one row starting at `cell` (e.g. `"A2"`)
    pub fn set_row<I, V>(&mut self, cell: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.ensure_usable()?;

        let row_hint = cell_name_to_coordinates(cell).map(|(_, r)| r).unwrap_or(0);
        let result = self.push_row(cell, values);
        result.map_err(|source| {
            self.state = StreamState::Failed;
            ExportError::WriteRowError {
                row: row_hint,
                sheet: self.sheet.clone(),
                source: Box::new(source),
            }
        })
    }

    fn push_row<I, V>(&mut self, cell: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let (start_col, row) = cell_name_to_coordinates(cell)?;
        if row <= self.last_row {
            return Err(ExportError::InvalidCell(format!(
                "row {} must come after row {}",
                row, self.last_row
            )));
        }

        let cells: Vec<PendingCell> = values
            .into_iter()
            .map(|v| PendingCell {
                value: v.into(),
                style: StyleId::DEFAULT,
            })
            .collect();

        let end_col = start_col + cells.len().saturating_sub(1) as u32;
        if end_col > MAX_COLUMNS {
            return Err(ExportError::InvalidCell(format!(
                "row {} has {} cells starting at column {}",
                row,
                cells.len(),
                start_col
            )));
        }

        if self.pending.len() >= self.workbook.flush_interval() {
            self.render_pending()?;
        }

        if self.rows_written == 0 {
            self.first_row = row;
        }
        self.last_row = row;
        self.max_col = self.max_col.max(end_col);
        self.rows_written += 1;
        self.pending.push(PendingRow {
            row,
            start_col,
            cells,
        });
        self.state = StreamState::Streaming;
        Ok(())
    }

    /// Apply a registered style to one cell of a row that is still pending
    pub fn set_cell_style(&mut self, cell: &str, style: StyleId) -> Result<()> {
        self.ensure_usable()?;

        let result = self.apply_style(cell, style);
        if result.is_err() {
            self.state = StreamState::Failed;
        }
        result
    }

    fn apply_style(&mut self, cell: &str, style: StyleId) -> Result<()> {
        if !self.workbook.styles().contains(style) {
            return Err(ExportError::StyleError(format!(
                "style {} was not registered",
                style.index()
            )));
        }

        let (col, row) = cell_name_to_coordinates(cell)?;
        if row <= self.last_rendered_row {
            return Err(ExportError::InvalidState(format!(
                "row {} was already flushed",
                row
            )));
        }

        let pending = self
            .pending
            .iter_mut()
            .find(|r| r.row == row)
            .ok_or_else(|| ExportError::InvalidCell(format!("row {} was never written", row)))?;

        if col < pending.start_col {
            return Err(ExportError::InvalidCell(format!(
                "{} is left of the row's first cell",
                cell
            )));
        }
        let idx = (col - pending.start_col) as usize;
        while pending.cells.len() <= idx {
            pending.cells.push(PendingCell {
                value: CellValue::Empty,
                style: StyleId::DEFAULT,
            });
        }
        pending.cells[idx].style = style;
        self.max_col = self.max_col.max(col);
        Ok(())
    }

    /// Render every pending row and hand the workbook over for saving
    pub fn flush(mut self) -> Result<FlushedWorkbook> {
        self.ensure_usable()?;

        self.render_pending()
            .map_err(|e| ExportError::FlushError(e.to_string()))?;

        let mut spill = self
            .spill
            .into_inner()
            .map_err(|e| ExportError::FlushError(e.error().to_string()))?;
        spill
            .rewind()
            .map_err(|e| ExportError::FlushError(e.to_string()))?;

        tracing::debug!(sheet = %self.sheet, rows = self.rows_written, "stream flushed");

        let dimension = if self.rows_written == 0 {
            None
        } else {
            Some((self.first_row, self.last_row, self.max_col))
        };
        Ok(FlushedWorkbook::new(self.workbook, self.sheet, spill, dimension))
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.state == StreamState::Failed {
            return Err(ExportError::InvalidState(format!(
                "stream writer for sheet '{}' has failed",
                self.sheet
            )));
        }
        Ok(())
    }

    fn render_pending(&mut self) -> Result<()> {
        let mut num = itoa::Buffer::new();

        for pending in self.pending.drain(..) {
            self.xml_buffer.clear();
            self.xml_buffer.extend_from_slice(b"<row r=\"");
            self.xml_buffer
                .extend_from_slice(num.format(pending.row).as_bytes());
            self.xml_buffer.extend_from_slice(b"\">");

            for (offset, cell) in pending.cells.iter().enumerate() {
                self.xml_buffer.extend_from_slice(b"<c r=\"");
                push_column_letter(&mut self.xml_buffer, pending.start_col + offset as u32);
                self.xml_buffer
                    .extend_from_slice(num.format(pending.row).as_bytes());
                self.xml_buffer.extend_from_slice(b"\"");

                if cell.style != StyleId::DEFAULT {
                    self.xml_buffer.extend_from_slice(b" s=\"");
                    self.xml_buffer
                        .extend_from_slice(num.format(cell.style.index()).as_bytes());
                    self.xml_buffer.extend_from_slice(b"\"");
                }

                let text = cell.value.as_str();
                if text.is_empty() {
                    self.xml_buffer.extend_from_slice(b"/>");
                    continue;
                }

                self.xml_buffer.extend_from_slice(b" t=\"inlineStr\"><is>");
                if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
                    self.xml_buffer
                        .extend_from_slice(b"<t xml:space=\"preserve\">");
                } else {
                    self.xml_buffer.extend_from_slice(b"<t>");
                }
                write_escaped(&mut self.xml_buffer, text);
                self.xml_buffer.extend_from_slice(b"</t></is></c>");
            }

            self.xml_buffer.extend_from_slice(b"</row>");
            self.spill.write_all(&self.xml_buffer)?;
            self.last_rendered_row = pending.row;
        }

        Ok(())
    }
}
