//! Streaming single-sheet workbook writer
//!
//! ```no_run
//! use exportbench::xlsx::{Style, Workbook};
//!
//! # fn main() -> exportbench::Result<()> {
//! let mut workbook = Workbook::new();
//! let header = workbook.new_style(&Style::header("#800080"))?;
//!
//! let mut stream = workbook.new_stream_writer("Sheet1")?;
//! stream.set_row("A1", ["Name", "Email"])?;
//! stream.set_cell_style("A1", header)?;
//! stream.set_cell_style("B1", header)?;
//! stream.set_row("A2", ["Alice", "alice@example.com"])?;
//! stream.flush()?.save_as("people.xlsx")?;
//! # Ok(())
//! # }
//! ```
//!
//! Rows are rendered to an anonymous temp file as they leave the in-memory
//! window and are deflated into the final package only on save.

pub mod export;
pub mod reader;
pub mod stream;
pub mod style;
pub mod workbook;
pub mod xml;
pub mod zip_writer;

pub use export::{
    export_xlsx_stream, export_xlsx_stream_with_interval, export_xlsx_stream_with_options,
    HEADER_FILL,
};
pub use reader::{CellFormat, ReadCell, ReadRow, WorkbookReader};
pub use stream::{StreamState, StreamWriter};
pub use style::{Fill, FillPattern, Font, Style, StyleId};
pub use workbook::{
    FlushedWorkbook, Workbook, DEFAULT_COMPRESSION_LEVEL, DEFAULT_FLUSH_INTERVAL,
    DEFAULT_SHEET_NAME,
};
pub use xml::{cell_name_to_coordinates, coordinates_to_cell_name};
