//! Comma-separated text used by the history file and the export download.
//!
//! Output starts with a UTF-8 byte-order mark so spreadsheet tools pick the
//! right encoding for non-ASCII keywords. Input tolerates a missing BOM,
//! CRLF line endings and blank lines.

use crate::error::StoreError;

pub const BOM: char = '\u{feff}';

/// Quote a field if it contains a delimiter, quote or line break
pub fn escape_field(text: &str) -> String {
    if text.contains(',') || text.contains('"') || text.contains('\n') || text.contains('\r') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Append one record (terminated by `\n`) to `out`
pub fn write_record<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let line = fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push('\n');
}

/// Split text into records of fields.
///
/// Quoted fields may contain delimiters, doubled quotes and line breaks.
/// Fails only when a quoted field is never closed.
pub fn parse(text: &str) -> Result<Vec<Vec<String>>, StoreError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);

    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut quote_line = 0;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
                quote_line = line;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                quoted = false;
            }
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                line += 1;
                if record.is_empty() && field.is_empty() && !quoted {
                    continue;
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                quoted = false;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(StoreError::Malformed(format!(
            "unterminated quoted field starting on line {}",
            quote_line
        )));
    }

    if !record.is_empty() || !field.is_empty() || quoted {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}
