//! XML text helpers and A1-style cell coordinates

use crate::error::{ExportError, Result};

/// Last row index a worksheet can hold
pub const MAX_ROWS: u32 = 1_048_576;

/// Last column index a worksheet can hold (XFD)
pub const MAX_COLUMNS: u32 = 16_384;

/// XML declaration every package part starts with
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

/// Append the column letters for 1-based column `n` (1 -> A, 27 -> AA)
pub fn push_column_letter(buffer: &mut Vec<u8>, mut n: u32) {
    if n == 0 {
        return;
    }
    let mut tmp = [0u8; 10];
    let mut len = 0;
    while n > 0 {
        let rem = (n - 1) % 26;
        tmp[len] = b'A' + rem as u8;
        len += 1;
        n = (n - 1) / 26;
    }
    for i in (0..len).rev() {
        buffer.push(tmp[i]);
    }
}

/// Build a cell name from 1-based column and row, e.g. `(2, 3)` -> `B3`
pub fn coordinates_to_cell_name(col: u32, row: u32) -> Result<String> {
    if col == 0 || col > MAX_COLUMNS || row == 0 || row > MAX_ROWS {
        return Err(ExportError::InvalidCell(format!(
            "column {} row {} out of range",
            col, row
        )));
    }
    let mut buffer = Vec::with_capacity(10);
    push_column_letter(&mut buffer, col);
    let mut num = itoa::Buffer::new();
    buffer.extend_from_slice(num.format(row).as_bytes());
    // only ASCII letters and digits were pushed
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Split a cell name into 1-based `(column, row)`, e.g. `AA10` -> `(27, 10)`
pub fn cell_name_to_coordinates(cell: &str) -> Result<(u32, u32)> {
    let invalid = || ExportError::InvalidCell(cell.to_string());

    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || letters.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let mut col: u32 = 0;
    for b in letters.bytes() {
        let upper = b.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return Err(invalid());
        }
        col = col * 26 + (upper - b'A' + 1) as u32;
    }

    let row: u32 = digits.parse().map_err(|_| invalid())?;
    if col > MAX_COLUMNS || row == 0 || row > MAX_ROWS {
        return Err(invalid());
    }
    Ok((col, row))
}

/// Whether `c` matches the XML 1.0 `Char` production
pub fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Append `s` as XML character data.
///
/// The five markup characters become entities and `\r` becomes `&#xD;` so
/// parsers do not fold it into a line break. Characters XML cannot carry are
/// replaced with U+FFFD.
pub fn write_escaped(buffer: &mut Vec<u8>, s: &str) {
    for c in s.chars() {
        match c {
            '&' => buffer.extend_from_slice(b"&amp;"),
            '<' => buffer.extend_from_slice(b"&lt;"),
            '>' => buffer.extend_from_slice(b"&gt;"),
            '"' => buffer.extend_from_slice(b"&quot;"),
            '\'' => buffer.extend_from_slice(b"&apos;"),
            '\r' => buffer.extend_from_slice(b"&#xD;"),
            c if !is_xml_char(c) => buffer.extend_from_slice("\u{FFFD}".as_bytes()),
            _ => {
                let mut buf = [0; 4];
                buffer.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}

/// Decode character data the way an XML parser would.
///
/// Raw `\r\n` and lone `\r` become `\n` before entities and character
/// references are resolved, so only `&#xD;` yields a carriage return. Raw or
/// referenced characters outside the XML character range are rejected.
/// Unknown entities are kept verbatim.
pub fn unescape(s: &str) -> Result<String> {
    if let Some(bad) = s.chars().find(|c| !is_xml_char(*c)) {
        return Err(ExportError::ReadError(format!(
            "character U+{:04X} is not allowed in XML",
            bad as u32
        )));
    }

    let normalized;
    let mut rest = if s.contains('\r') {
        normalized = s.replace("\r\n", "\n").replace('\r', "\n");
        normalized.as_str()
    } else {
        s
    };

    let mut out = String::with_capacity(rest.len());
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let Some(semi) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .map(|code| {
                    char::from_u32(code).filter(|c| is_xml_char(*c)).ok_or_else(|| {
                        ExportError::ReadError(format!(
                            "reference &{}; is not an XML character",
                            entity
                        ))
                    })
                })
                .transpose()?,
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_names() {
        assert_eq!(coordinates_to_cell_name(1, 1).unwrap(), "A1");
        assert_eq!(coordinates_to_cell_name(26, 1).unwrap(), "Z1");
        assert_eq!(coordinates_to_cell_name(27, 1).unwrap(), "AA1");
        assert_eq!(coordinates_to_cell_name(13, 100).unwrap(), "M100");
        assert_eq!(coordinates_to_cell_name(MAX_COLUMNS, 1).unwrap(), "XFD1");
        assert!(coordinates_to_cell_name(0, 1).is_err());
        assert!(coordinates_to_cell_name(1, MAX_ROWS + 1).is_err());
    }

    #[test]
    fn test_cell_name_parsing() {
        assert_eq!(cell_name_to_coordinates("A1").unwrap(), (1, 1));
        assert_eq!(cell_name_to_coordinates("m2").unwrap(), (13, 2));
        assert_eq!(cell_name_to_coordinates("AA10").unwrap(), (27, 10));
        assert_eq!(cell_name_to_coordinates("XFD1048576").unwrap(), (16_384, 1_048_576));

        for bad in ["", "A", "1", "A0", "1A", "A1B", "XFE1", "A1048577", "Ä1"] {
            assert!(cell_name_to_coordinates(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_xml_escaping() {
        let mut out = Vec::new();
        write_escaped(&mut out, "<test>&\"value\"'");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "&lt;test&gt;&amp;&quot;value&quot;&apos;"
        );
    }

    #[test]
    fn test_carriage_return_and_control_characters() {
        let mut out = Vec::new();
        write_escaped(&mut out, "a\r\nb\tc\u{7}d\u{0}\u{B}\u{FFFE}\u{1F600}");
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text, "a&#xD;\nb\tc\u{FFFD}d\u{FFFD}\u{FFFD}\u{FFFD}\u{1F600}");
        assert!(text.chars().all(|c| is_xml_char(c) && c != '\r'));
    }

    #[test]
    fn test_escaped_text_parses_as_xml() {
        let original = "line\r\nnext\rlast & <tag> \u{1}";
        let mut xml = b"<t>".to_vec();
        write_escaped(&mut xml, original);
        xml.extend_from_slice(b"</t>");

        let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
        let mut buf = Vec::new();
        let mut text = String::new();
        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                quick_xml::events::Event::Text(t) => text.push_str(&t.unescape().unwrap()),
                quick_xml::events::Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        assert_eq!(text, "line\r\nnext\rlast & <tag> \u{FFFD}");
    }

    #[test]
    fn test_unescape() {
        let original = "a < b && \"c\" > 'd' ✓";
        let mut out = Vec::new();
        write_escaped(&mut out, original);
        assert_eq!(unescape(&String::from_utf8(out).unwrap()).unwrap(), original);

        assert_eq!(unescape("&#65;&#x42;").unwrap(), "AB");
        assert_eq!(unescape("fish & chips").unwrap(), "fish & chips");
        assert_eq!(unescape("&bogus;").unwrap(), "&bogus;");
    }

    #[test]
    fn test_unescape_normalizes_line_endings() {
        assert_eq!(unescape("a\r\nb\rc\nd").unwrap(), "a\nb\nc\nd");
        assert_eq!(unescape("a&#xD;\nb").unwrap(), "a\r\nb");
        assert_eq!(unescape("a&#13;\r\nb").unwrap(), "a\r\nb");
    }

    #[test]
    fn test_unescape_rejects_forbidden_characters() {
        for bad in ["bell\u{7}here", "\u{0}", "x\u{1F}", "\u{FFFF}", "&#x7;", "&#0;"] {
            assert!(
                matches!(unescape(bad), Err(ExportError::ReadError(_))),
                "{:?}",
                bad
            );
        }
        assert_eq!(unescape("tab\there").unwrap(), "tab\there");
    }
}
