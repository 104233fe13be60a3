//! Delimited-text exporters
//!
//! Three ways of producing the same comma-separated file:
//! - [`unbuffered`]: one `write` per row (or one open/append/close per row)
//! - [`buffered`]: rows accumulate in a fixed-size buffer that is flushed as it fills
//! - [`library`]: rows go through the `csv` crate's encoder
//!
//! The hand-written writers share [`escape_field`] and [`format_row`], so they
//! produce byte-identical output for the same records.

pub mod buffered;
pub mod library;
pub mod unbuffered;

use std::borrow::Cow;

pub use buffered::{export_csv_buffered, BufferedCsvWriter, DEFAULT_BUFFER_SIZE};
pub use library::export_csv_library;
pub use unbuffered::{append_row, export_csv_unbuffered, AppendMode};

/// Make a raw value safe to place in one comma-delimited field.
///
/// Values containing a comma, double quote, CR or LF are wrapped in double
/// quotes with embedded quotes doubled. Anything else is returned unchanged.
/// Call it exactly once per raw value: it is not idempotent on its own output.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if !needs_quoting(value) {
        return Cow::Borrowed(value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

#[inline]
fn needs_quoting(value: &str) -> bool {
    value
        .bytes()
        .any(|b| matches!(b, b',' | b'"' | b'\n' | b'\r'))
}

/// Escape every field, join with commas and terminate with `\n`.
pub fn format_row<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_field(field.as_ref()));
    }
    line.push('\n');
    line
}
