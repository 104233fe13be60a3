//! Cell style registry rendered into `xl/styles.xml`

use super::xml::{write_escaped, XML_DECLARATION};
use crate::error::{ExportError, Result};
use indexmap::IndexSet;
use std::io::Write;

/// Handle to a registered style (index into `cellXfs`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleId(pub(crate) u32);

impl StyleId {
    /// The built-in unformatted style
    pub const DEFAULT: StyleId = StyleId(0);

    /// Get the style index for XML
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// Font part of a style
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Font {
    pub bold: bool,
    /// `#RRGGBB`
    pub color: Option<String>,
}

/// Fill pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillPattern {
    #[default]
    None,
    Solid,
}

/// Fill part of a style
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fill {
    pub pattern: FillPattern,
    /// `#RRGGBB`
    pub color: Option<String>,
}

/// Reusable formatting descriptor applied to cells by [`StyleId`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    pub font: Option<Font>,
    pub fill: Option<Fill>,
}

impl Style {
    /// Bold white text on a solid fill
    pub fn header(fill_color: &str) -> Self {
        Style {
            font: Some(Font {
                bold: true,
                color: Some("#FFFFFF".to_string()),
            }),
            fill: Some(Fill {
                pattern: FillPattern::Solid,
                color: Some(fill_color.to_string()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
struct FontKey {
    bold: bool,
    argb: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FillKey {
    None,
    Gray125,
    Solid(Option<String>),
}

/// Deduplicating store of fonts, fills and cell formats.
///
/// Index 0 of every table is the unformatted default, and fill 1 is the
/// `gray125` entry spreadsheet applications expect.
#[derive(Debug, Clone)]
pub struct StyleSheet {
    fonts: IndexSet<FontKey>,
    fills: IndexSet<FillKey>,
    xfs: IndexSet<(usize, usize)>,
}

impl StyleSheet {
    pub fn new() -> Self {
        let mut fonts = IndexSet::new();
        fonts.insert(FontKey::default());

        let mut fills = IndexSet::new();
        fills.insert(FillKey::None);
        fills.insert(FillKey::Gray125);

        let mut xfs = IndexSet::new();
        xfs.insert((0, 0));

        StyleSheet { fonts, fills, xfs }
    }

    /// Register a style and return its id. Identical styles share one id.
    pub fn register(&mut self, style: &Style) -> Result<StyleId> {
        let font = match &style.font {
            Some(f) => FontKey {
                bold: f.bold,
                argb: f.color.as_deref().map(parse_color).transpose()?,
            },
            None => FontKey::default(),
        };

        let fill = match &style.fill {
            None => FillKey::None,
            Some(Fill {
                pattern: FillPattern::None,
                color: Some(_),
            }) => {
                return Err(ExportError::StyleError(
                    "fill color given without a fill pattern".to_string(),
                ))
            }
            Some(Fill {
                pattern: FillPattern::None,
                color: None,
            }) => FillKey::None,
            Some(Fill {
                pattern: FillPattern::Solid,
                color,
            }) => FillKey::Solid(color.as_deref().map(parse_color).transpose()?),
        };

        let (font_id, _) = self.fonts.insert_full(font);
        let (fill_id, _) = self.fills.insert_full(fill);
        let (xf_id, _) = self.xfs.insert_full((font_id, fill_id));

        Ok(StyleId(xf_id as u32))
    }

    /// Whether `id` was handed out by this sheet
    pub fn contains(&self, id: StyleId) -> bool {
        (id.0 as usize) < self.xfs.len()
    }

    /// Number of registered cell formats, including the default
    pub fn len(&self) -> usize {
        self.xfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xfs.is_empty()
    }

    /// Write the complete `styles.xml` part
    pub fn write_xml<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut xml = Vec::with_capacity(2048);
        let mut num = itoa::Buffer::new();

        xml.extend_from_slice(XML_DECLARATION.as_bytes());
        xml.extend_from_slice(
            b"<styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\n",
        );

        xml.extend_from_slice(b"<fonts count=\"");
        xml.extend_from_slice(num.format(self.fonts.len()).as_bytes());
        xml.extend_from_slice(b"\">\n");
        for font in &self.fonts {
            xml.extend_from_slice(b"<font>");
            if font.bold {
                xml.extend_from_slice(b"<b/>");
            }
            xml.extend_from_slice(b"<sz val=\"11\"/>");
            if let Some(argb) = &font.argb {
                xml.extend_from_slice(b"<color rgb=\"");
                write_escaped(&mut xml, argb);
                xml.extend_from_slice(b"\"/>");
            }
            xml.extend_from_slice(b"<name val=\"Calibri\"/></font>\n");
        }
        xml.extend_from_slice(b"</fonts>\n");

        xml.extend_from_slice(b"<fills count=\"");
        xml.extend_from_slice(num.format(self.fills.len()).as_bytes());
        xml.extend_from_slice(b"\">\n");
        for fill in &self.fills {
            match fill {
                FillKey::None => {
                    xml.extend_from_slice(b"<fill><patternFill patternType=\"none\"/></fill>\n")
                }
                FillKey::Gray125 => {
                    xml.extend_from_slice(b"<fill><patternFill patternType=\"gray125\"/></fill>\n")
                }
                FillKey::Solid(argb) => {
                    xml.extend_from_slice(b"<fill><patternFill patternType=\"solid\">");
                    if let Some(argb) = argb {
                        xml.extend_from_slice(b"<fgColor rgb=\"");
                        write_escaped(&mut xml, argb);
                        xml.extend_from_slice(b"\"/>");
                    }
                    xml.extend_from_slice(b"</patternFill></fill>\n");
                }
            }
        }
        xml.extend_from_slice(b"</fills>\n");

        xml.extend_from_slice(
            b"<borders count=\"1\">\n<border><left/><right/><top/><bottom/><diagonal/></border>\n</borders>\n",
        );
        xml.extend_from_slice(
            b"<cellStyleXfs count=\"1\">\n<xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/>\n</cellStyleXfs>\n",
        );

        xml.extend_from_slice(b"<cellXfs count=\"");
        xml.extend_from_slice(num.format(self.xfs.len()).as_bytes());
        xml.extend_from_slice(b"\">\n");
        for &(font_id, fill_id) in &self.xfs {
            xml.extend_from_slice(b"<xf numFmtId=\"0\" fontId=\"");
            xml.extend_from_slice(num.format(font_id).as_bytes());
            xml.extend_from_slice(b"\" fillId=\"");
            xml.extend_from_slice(num.format(fill_id).as_bytes());
            xml.extend_from_slice(b"\" borderId=\"0\" xfId=\"0\"");
            if font_id > 0 {
                xml.extend_from_slice(b" applyFont=\"1\"");
            }
            if fill_id > 0 {
                xml.extend_from_slice(b" applyFill=\"1\"");
            }
            xml.extend_from_slice(b"/>\n");
        }
        xml.extend_from_slice(b"</cellXfs>\n");

        xml.extend_from_slice(
            b"<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>\n",
        );
        xml.extend_from_slice(b"</styleSheet>");

        writer.write_all(&xml)?;
        Ok(())
    }
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self::new()
    }
}

/// `#RRGGBB` -> opaque `FFRRGGBB`
fn parse_color(color: &str) -> Result<String> {
    let hex = color
        .strip_prefix('#')
        .filter(|h| h.len() == 6 && h.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| ExportError::StyleError(format!("invalid color '{}'", color)))?;
    Ok(format!("FF{}", hex.to_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_header_style() {
        let mut sheet = StyleSheet::new();
        let id = sheet.register(&Style::header("#800080")).unwrap();

        assert_eq!(id.index(), 1);
        assert!(sheet.contains(id));
        assert!(!sheet.contains(StyleId(2)));

        let mut out = Vec::new();
        sheet.write_xml(&mut out).unwrap();
        let xml = String::from_utf8(out).unwrap();
        assert!(xml.contains("<font><b/><sz val=\"11\"/><color rgb=\"FFFFFFFF\"/>"));
        assert!(xml.contains("<patternFill patternType=\"solid\"><fgColor rgb=\"FF800080\"/>"));
        assert!(xml.contains("<cellXfs count=\"2\">"));
        assert!(xml.contains("fontId=\"1\" fillId=\"2\""));
    }

    #[test]
    fn test_identical_styles_share_id() {
        let mut sheet = StyleSheet::new();
        let a = sheet.register(&Style::header("#800080")).unwrap();
        let b = sheet.register(&Style::header("#800080")).unwrap();
        let c = sheet.register(&Style::header("#00FF00")).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(sheet.len(), 3);
    }

    #[test]
    fn test_empty_style_is_default() {
        let mut sheet = StyleSheet::new();
        assert_eq!(sheet.register(&Style::default()).unwrap(), StyleId::DEFAULT);
    }

    #[test]
    fn test_invalid_styles_rejected() {
        let mut sheet = StyleSheet::new();
        for bad in ["800080", "#80008", "#GGGGGG", "#8000800"] {
            let err = sheet.register(&Style::header(bad)).unwrap_err();
            assert!(matches!(err, ExportError::StyleError(_)), "{}", bad);
        }

        let colored_without_pattern = Style {
            font: None,
            fill: Some(Fill {
                pattern: FillPattern::None,
                color: Some("#FFFFFF".to_string()),
            }),
        };
        assert!(sheet.register(&colored_without_pattern).is_err());
        assert_eq!(sheet.len(), 1);
    }
}
