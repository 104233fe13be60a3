//! Single-sheet workbook and its package parts

use super::stream::StreamWriter;
use super::style::{Style, StyleId, StyleSheet};
use super::xml::{coordinates_to_cell_name, write_escaped, XML_DECLARATION};
use super::zip_writer::StreamingZipWriter;
use crate::error::{ExportError, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Name of the only sheet in a new workbook
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Rows kept in memory before the stream renders them
pub const DEFAULT_FLUSH_INTERVAL: usize = 1000;

/// Deflate level of saved packages
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

const SHEET_PART: &str = "xl/worksheets/sheet1.xml";

/// In-memory workbook description: sheet name, styles and writer settings.
///
/// Cell data never lives here; it goes through a [`StreamWriter`] obtained
/// with [`Workbook::new_stream_writer`].
pub struct Workbook {
    sheet_name: String,
    styles: StyleSheet,
    flush_interval: usize,
    compression_level: u32,
}

impl Workbook {
    /// Create a workbook with one sheet named `Sheet1`
    pub fn new() -> Self {
        Workbook {
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            styles: StyleSheet::new(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Register a cell style for later use with [`StreamWriter::set_cell_style`]
    pub fn new_style(&mut self, style: &Style) -> Result<StyleId> {
        self.styles.register(style)
    }

    /// Set flush interval (pending rows before rendering, at least 1)
    pub fn set_flush_interval(&mut self, rows: usize) {
        self.flush_interval = rows.max(1);
    }

    /// Set deflate level used when saving (0-9)
    pub fn set_compression_level(&mut self, level: u32) {
        self.compression_level = level.min(9);
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub(crate) fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    pub(crate) fn flush_interval(&self) -> usize {
        self.flush_interval
    }

    /// Open the row-writing channel for `sheet`, consuming the workbook
    pub fn new_stream_writer(self, sheet: &str) -> Result<StreamWriter> {
        if sheet != self.sheet_name {
            return Err(ExportError::StreamInitError {
                sheet: sheet.to_string(),
                reason: format!("sheet does not exist (available: {})", self.sheet_name),
            });
        }
        StreamWriter::new(self, sheet)
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

/// Workbook whose sheet data has been fully rendered and is ready to save
pub struct FlushedWorkbook {
    workbook: Workbook,
    sheet: String,
    sheet_data: File,
    /// first row, last row, last column
    dimension: Option<(u32, u32, u32)>,
}

impl FlushedWorkbook {
    pub(crate) fn new(
        workbook: Workbook,
        sheet: String,
        sheet_data: File,
        dimension: Option<(u32, u32, u32)>,
    ) -> Self {
        FlushedWorkbook {
            workbook,
            sheet,
            sheet_data,
            dimension,
        }
    }

    /// Write the complete package to `path`, replacing any existing file
    pub fn save_as<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| ExportError::create(path, e))?;
        let sheet = self.sheet.clone();

        self.write_package(file).map_err(|source| ExportError::SaveError {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

        tracing::debug!(path = %path.display(), %sheet, "workbook saved");
        Ok(())
    }

    fn write_package(mut self, file: File) -> Result<()> {
        let writer = BufWriter::with_capacity(64 * 1024, file);
        let mut zip = StreamingZipWriter::with_compression(writer, self.workbook.compression_level);

        zip.start_entry("[Content_Types].xml")?;
        zip.write_data(CONTENT_TYPES.as_bytes())?;

        zip.start_entry("_rels/.rels")?;
        zip.write_data(ROOT_RELS.as_bytes())?;

        zip.start_entry("docProps/core.xml")?;
        zip.write_data(core_props().as_bytes())?;

        zip.start_entry("docProps/app.xml")?;
        zip.write_data(APP_PROPS.as_bytes())?;

        zip.start_entry("xl/workbook.xml")?;
        zip.write_data(&self.workbook_xml())?;

        zip.start_entry("xl/_rels/workbook.xml.rels")?;
        zip.write_data(WORKBOOK_RELS.as_bytes())?;

        zip.start_entry("xl/styles.xml")?;
        self.workbook.styles.write_xml(&mut zip)?;

        zip.start_entry(SHEET_PART)?;
        zip.write_data(&self.worksheet_head()?)?;
        std::io::copy(&mut self.sheet_data, &mut zip)?;
        zip.write_data(b"</sheetData></worksheet>")?;

        zip.finish()?;
        Ok(())
    }

    fn workbook_xml(&self) -> Vec<u8> {
        let mut xml = Vec::with_capacity(512);
        xml.extend_from_slice(XML_DECLARATION.as_bytes());
        xml.extend_from_slice(
            b"<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\n<sheets>\n<sheet name=\"",
        );
        write_escaped(&mut xml, &self.sheet);
        xml.extend_from_slice(b"\" sheetId=\"1\" r:id=\"rId1\"/>\n</sheets>\n</workbook>");
        xml
    }

    fn worksheet_head(&self) -> Result<Vec<u8>> {
        let mut xml = Vec::with_capacity(512);
        xml.extend_from_slice(XML_DECLARATION.as_bytes());
        xml.extend_from_slice(
            b"<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
        );

        let dimension = match self.dimension {
            Some((first_row, last_row, last_col)) => format!(
                "{}:{}",
                coordinates_to_cell_name(1, first_row)?,
                coordinates_to_cell_name(last_col.max(1), last_row)?
            ),
            None => "A1".to_string(),
        };
        xml.extend_from_slice(b"<dimension ref=\"");
        xml.extend_from_slice(dimension.as_bytes());
        xml.extend_from_slice(b"\"/><sheetData>");
        Ok(xml)
    }

    #[cfg(test)]
    pub(crate) fn sheet_data_to_string(mut self) -> Result<String> {
        use std::io::Read;
        let mut out = String::new();
        self.sheet_data.read_to_string(&mut out)?;
        Ok(out)
    }
}

fn core_props() -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:creator>exportbench</dc:creator>
<dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created>
<dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified>
</cp:coreProperties>"#
    )
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

const APP_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
<Application>exportbench</Application>
</Properties>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlsx::reader::WorkbookReader;
    use tempfile::tempdir;

    #[test]
    fn test_unknown_sheet_fails() {
        let err = Workbook::new().new_stream_writer("Data").err().unwrap();
        assert!(matches!(err, ExportError::StreamInitError { .. }));
    }

    #[test]
    fn test_save_writes_all_parts() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("test.xlsx");

        let mut stream = Workbook::new().new_stream_writer(DEFAULT_SHEET_NAME)?;
        stream.set_row("A1", ["Name", "Age"])?;
        stream.set_row("A2", ["Alice", "30"])?;
        stream.flush()?.save_as(&path)?;

        let mut reader = WorkbookReader::open(&path)?;
        let parts = reader.part_names();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/core.xml",
            "docProps/app.xml",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/styles.xml",
            SHEET_PART,
        ] {
            assert!(parts.iter().any(|p| p == part), "{}", part);
        }

        let sheet = reader.read_part(SHEET_PART)?;
        assert!(sheet.contains("<dimension ref=\"A1:B2\"/>"));
        assert!(sheet.ends_with("</row></sheetData></worksheet>"));
        Ok(())
    }

    #[test]
    fn test_empty_sheet_saves() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.xlsx");

        Workbook::new()
            .new_stream_writer(DEFAULT_SHEET_NAME)?
            .flush()?
            .save_as(&path)?;

        let sheet = WorkbookReader::open(&path)?.read_part(SHEET_PART)?;
        assert!(sheet.contains("<dimension ref=\"A1\"/><sheetData></sheetData>"));
        Ok(())
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.xlsx");

        let flushed = Workbook::new()
            .new_stream_writer(DEFAULT_SHEET_NAME)
            .unwrap()
            .flush()
            .unwrap();
        let err = flushed.save_as(&path).unwrap_err();
        assert!(matches!(err, ExportError::CreateError { .. }));
        assert!(!path.exists());
    }
}
