//! Read-back of the workbooks this crate writes
//!
//! Understands the subset produced by [`super::Workbook`]: inline or raw cell
//! text, per-cell style indexes, bold/colored fonts and pattern fills. Used to
//! verify exports, not as a general spreadsheet reader.

use super::xml::{cell_name_to_coordinates, is_xml_char, unescape};
use crate::error::{ExportError, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

/// One cell as stored in the sheet
#[derive(Debug, Clone, PartialEq)]
pub struct ReadCell {
    /// 1-based column
    pub column: u32,
    pub value: String,
    /// Index into `cellXfs`, 0 when unstyled
    pub style: u32,
}

/// One row as stored in the sheet
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRow {
    /// 1-based row index
    pub index: u32,
    pub cells: Vec<ReadCell>,
}

impl ReadRow {
    /// Cell text in column order
    pub fn values(&self) -> Vec<String> {
        self.cells.iter().map(|c| c.value.clone()).collect()
    }
}

/// Font and fill resolved from one `cellXfs` entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellFormat {
    pub bold: bool,
    /// ARGB, e.g. `FFFFFFFF`
    pub font_color: Option<String>,
    /// `none`, `gray125`, `solid`, ...
    pub fill_pattern: Option<String>,
    /// ARGB foreground color of the fill
    pub fill_color: Option<String>,
}

/// Reader over a saved workbook
pub struct WorkbookReader {
    archive: ZipArchive<BufReader<File>>,
}

impl WorkbookReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        Ok(WorkbookReader {
            archive: ZipArchive::new(file)?,
        })
    }

    /// Names of every part in the package, in archive order
    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Raw text of one package part.
    ///
    /// Fails when the part holds a character XML 1.0 does not allow.
    pub fn read_part(&mut self, name: &str) -> Result<String> {
        let mut text = String::new();
        self.archive.by_name(name)?.read_to_string(&mut text)?;

        if let Some((pos, bad)) = text.char_indices().find(|(_, c)| !is_xml_char(*c)) {
            return Err(ExportError::ReadError(format!(
                "{}: character U+{:04X} at byte {} is not allowed in XML",
                name, bad as u32, pos
            )));
        }
        Ok(text)
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&mut self) -> Result<Vec<String>> {
        Ok(self
            .sheet_info()?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// Every row of `sheet`, in file order
    pub fn rows(&mut self, sheet: &str) -> Result<Vec<ReadRow>> {
        let part = self
            .sheet_info()?
            .into_iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, part)| part)
            .ok_or_else(|| ExportError::ReadError(format!("Sheet '{}' not found", sheet)))?;

        let xml = self.read_part(&part)?;
        elements(&xml, "row").into_iter().map(parse_row).collect()
    }

    /// Resolved formats, indexed like the `s` attribute of cells
    pub fn cell_formats(&mut self) -> Result<Vec<CellFormat>> {
        let xml = self.read_part("xl/styles.xml")?;

        let fonts: Vec<(bool, Option<String>)> = elements(section(&xml, "fonts"), "font")
            .into_iter()
            .map(|font| {
                let bold = !start_tags(font, "b").is_empty();
                let color = start_tags(font, "color")
                    .first()
                    .and_then(|t| attr(t, "rgb"))
                    .map(str::to_string);
                (bold, color)
            })
            .collect();

        let fills: Vec<(Option<String>, Option<String>)> = elements(section(&xml, "fills"), "fill")
            .into_iter()
            .map(|fill| {
                let pattern = start_tags(fill, "patternFill")
                    .first()
                    .and_then(|t| attr(t, "patternType"))
                    .map(str::to_string);
                let color = start_tags(fill, "fgColor")
                    .first()
                    .and_then(|t| attr(t, "rgb"))
                    .map(str::to_string);
                (pattern, color)
            })
            .collect();

        start_tags(section(&xml, "cellXfs"), "xf")
            .into_iter()
            .map(|xf| {
                let font_id = index_attr(xf, "fontId")?;
                let fill_id = index_attr(xf, "fillId")?;
                let (bold, font_color) = fonts.get(font_id).cloned().ok_or_else(|| {
                    ExportError::ReadError(format!("font {} out of range", font_id))
                })?;
                let (fill_pattern, fill_color) = fills.get(fill_id).cloned().ok_or_else(|| {
                    ExportError::ReadError(format!("fill {} out of range", fill_id))
                })?;
                Ok(CellFormat {
                    bold,
                    font_color,
                    fill_pattern,
                    fill_color,
                })
            })
            .collect()
    }

    /// (sheet name, part path) pairs from workbook.xml and its rels
    fn sheet_info(&mut self) -> Result<Vec<(String, String)>> {
        let workbook = self.read_part("xl/workbook.xml")?;
        let rels = self.read_part("xl/_rels/workbook.xml.rels")?;
        let relationships = start_tags(&rels, "Relationship");

        start_tags(&workbook, "sheet")
            .into_iter()
            .map(|tag| {
                let name = attr(tag, "name")
                    .ok_or_else(|| ExportError::ReadError("sheet without name".to_string()))
                    .and_then(unescape)?;
                let rid = attr(tag, "r:id")
                    .ok_or_else(|| ExportError::ReadError(format!("sheet '{}' has no r:id", name)))?;
                let target = relationships
                    .iter()
                    .find(|rel| attr(rel, "Id") == Some(rid))
                    .and_then(|rel| attr(rel, "Target"))
                    .ok_or_else(|| {
                        ExportError::ReadError(format!("relationship {} not found", rid))
                    })?;
                Ok((name, format!("xl/{}", target.trim_start_matches('/'))))
            })
            .collect()
    }
}

fn parse_row(row: &str) -> Result<ReadRow> {
    let head = start_tags(row, "row")
        .into_iter()
        .next()
        .ok_or_else(|| ExportError::ReadError("malformed row".to_string()))?;
    let index = index_attr(head, "r")? as u32;

    let cells = elements(row, "c")
        .into_iter()
        .map(|cell| {
            let tag = start_tags(cell, "c")
                .into_iter()
                .next()
                .ok_or_else(|| ExportError::ReadError("malformed cell".to_string()))?;
            let reference =
                attr(tag, "r").ok_or_else(|| ExportError::ReadError("cell without r".to_string()))?;
            let (column, _) = cell_name_to_coordinates(reference)?;
            let style = match attr(tag, "s") {
                Some(s) => s
                    .parse()
                    .map_err(|_| ExportError::ReadError(format!("bad style index '{}'", s)))?,
                None => 0,
            };

            let texts = elements(cell, "t");
            let value = if !texts.is_empty() {
                texts
                    .iter()
                    .map(|t| unescape(inner_text(t)))
                    .collect::<Result<String>>()?
            } else {
                match elements(cell, "v").first() {
                    Some(v) => unescape(inner_text(v))?,
                    None => String::new(),
                }
            };

            Ok(ReadCell {
                column,
                value,
                style,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ReadRow { index, cells })
}

/// Content between `<name ...>` and `</name>`, or "" when absent
fn section<'a>(xml: &'a str, name: &str) -> &'a str {
    elements(xml, name).into_iter().next().unwrap_or("")
}

/// Positions of start tags named exactly `name` (not prefixes like `<rows`)
fn tag_starts(xml: &str, name: &str) -> Vec<usize> {
    let needle = format!("<{}", name);
    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(i) = xml[pos..].find(&needle) {
        let start = pos + i;
        let after = start + needle.len();
        if matches!(xml.as_bytes().get(after), Some(b' ' | b'>' | b'/')) {
            found.push(start);
        }
        pos = after;
    }
    found
}

/// Start (or self-closing) tags named `name`, e.g. `<c r="A1" s="1">`
fn start_tags<'a>(xml: &'a str, name: &str) -> Vec<&'a str> {
    tag_starts(xml, name)
        .into_iter()
        .filter_map(|start| xml[start..].find('>').map(|end| &xml[start..=start + end]))
        .collect()
}

/// Whole elements named `name`, from start tag through matching end tag
fn elements<'a>(xml: &'a str, name: &str) -> Vec<&'a str> {
    let close = format!("</{}>", name);
    tag_starts(xml, name)
        .into_iter()
        .filter_map(|start| {
            let tag_end = start + xml[start..].find('>')?;
            if xml.as_bytes()[tag_end - 1] == b'/' {
                return Some(&xml[start..=tag_end]);
            }
            let end = tag_end + xml[tag_end..].find(&close)? + close.len();
            Some(&xml[start..end])
        })
        .collect()
}

/// Text between the first `>` and the last `<` of an element
fn inner_text(element: &str) -> &str {
    match (element.find('>'), element.rfind('<')) {
        (Some(open), Some(close)) if close > open => &element[open + 1..close],
        _ => "",
    }
}

fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!(" {}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')?;
    Some(&tag[start..start + end])
}

fn index_attr(tag: &str, name: &str) -> Result<usize> {
    attr(tag, name)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ExportError::ReadError(format!("missing or bad '{}' in {}", name, tag)))
}
