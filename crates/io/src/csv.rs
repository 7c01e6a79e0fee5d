// CSV/TSV import/export for tables

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use rosterlink_core::{SchemaError, Table, Value};
use tracing::debug;

use crate::error::IoError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter. Sniffed on read and `,` on write when unset.
    pub delimiter: Option<u8>,
    /// Cell text read as (and written for) a null value.
    pub null_marker: String,
    /// Parse cells as integer, float or `%Y-%m-%d` date before falling back to text.
    pub infer_types: bool,
}

impl CsvOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_inference(mut self) -> Self {
        self.infer_types = true;
        self
    }
}

pub fn read_table(path: &Path, options: &CsvOptions) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    read_table_from_str(&content, options)
}

/// Parse CSV text whose first line is the header row.
///
/// Short rows are padded with nulls; a row with more cells than the header
/// is an arity error. A bare cell equal to the null marker reads as null,
/// while a quoted one (`""` under the default marker) stays text.
pub fn read_table_from_str(content: &str, options: &CsvOptions) -> Result<Table, IoError> {
    let delimiter = options.delimiter.unwrap_or_else(|| sniff_delimiter(content));
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(IoError::MissingHeader);
    }
    let width = headers.len();
    let mut table = Table::with_fields(headers.iter())?;

    let mut record = csv::StringRecord::new();
    let mut row_idx = 0;
    while reader.read_record(&mut record)? {
        if record.len() > width {
            return Err(SchemaError::ArityMismatch {
                row: row_idx,
                expected: width,
                found: record.len(),
            }
            .into());
        }

        // Only rows holding a marker-like cell need the raw text
        let quoted = if record.iter().any(|cell| cell == options.null_marker) {
            let start = record.position().map_or(0, |p| p.byte() as usize);
            let end = (reader.position().byte() as usize).min(content.len());
            quoted_fields(&content.as_bytes()[start..end], delimiter)
        } else {
            Vec::new()
        };

        let row = (0..width)
            .map(|col| match record.get(col) {
                Some(raw) => parse_cell(raw, quoted.get(col).copied().unwrap_or(false), options),
                None => Value::Null,
            })
            .collect();
        table.push_row(row)?;
        row_idx += 1;
    }

    debug!(rows = table.len(), columns = width, delimiter = %(delimiter as char), "csv read");
    Ok(table)
}

/// Which fields of one raw record started with a quote.
fn quoted_fields(raw: &[u8], delimiter: u8) -> Vec<bool> {
    let mut flags = Vec::new();
    let mut current = false;
    let mut at_field_start = true;
    let mut in_quotes = false;

    let first = raw.iter().position(|&b| b != b'\n' && b != b'\r').unwrap_or(raw.len());
    let mut bytes = raw[first..].iter().copied().peekable();
    while let Some(b) = bytes.next() {
        if in_quotes {
            if b == b'"' {
                if bytes.peek() == Some(&b'"') {
                    bytes.next();
                } else {
                    in_quotes = false;
                }
            }
        } else if b == delimiter {
            flags.push(current);
            current = false;
            at_field_start = true;
        } else if b == b'\n' || b == b'\r' {
            break;
        } else {
            if at_field_start && b == b'"' {
                current = true;
                in_quotes = true;
            }
            at_field_start = false;
        }
    }
    flags.push(current);
    flags
}

fn parse_cell(raw: &str, quoted: bool, options: &CsvOptions) -> Value {
    if !quoted && raw == options.null_marker {
        Value::Null
    } else if options.infer_types {
        Value::infer(raw)
    } else {
        Value::Str(raw.to_string())
    }
}

pub fn write_table(table: &Table, path: &Path, options: &CsvOptions) -> Result<(), IoError> {
    let file_error = |source| IoError::File {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::create(path).map_err(file_error)?;
    let mut out = std::io::BufWriter::new(file);
    write_rows(&mut out, table, options).map_err(file_error)?;
    out.flush().map_err(file_error)?;
    debug!(rows = table.len(), path = %path.display(), "csv written");
    Ok(())
}

pub fn write_table_to_string(table: &Table, options: &CsvOptions) -> Result<String, IoError> {
    let mut out = Vec::new();
    write_rows(&mut out, table, options).map_err(|e| IoError::Csv(e.into()))?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

// csv::Writer picks quoting per writer, not per field; text equal to the null
// marker must be quoted while the null itself stays bare.
fn write_rows<W: Write>(out: &mut W, table: &Table, options: &CsvOptions) -> std::io::Result<()> {
    let delimiter = options.delimiter.unwrap_or(b',');
    let header: Vec<Cow<'_, str>> = table
        .fields()
        .iter()
        .map(|f| encode_field(f, delimiter, &options.null_marker))
        .collect();
    write_line(out, &header, delimiter)?;

    for row in table.rows() {
        let cells: Vec<Cow<'_, str>> = row
            .iter()
            .map(|value| match value {
                Value::Null => Cow::Borrowed(options.null_marker.as_str()),
                Value::Str(text) => encode_field(text, delimiter, &options.null_marker),
                other => Cow::Owned(encode_field(&other.to_string(), delimiter, &options.null_marker).into_owned()),
            })
            .collect();
        write_line(out, &cells, delimiter)?;
    }
    Ok(())
}

fn write_line<W: Write>(out: &mut W, cells: &[Cow<'_, str>], delimiter: u8) -> std::io::Result<()> {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.write_all(&[delimiter])?;
        }
        out.write_all(cell.as_bytes())?;
    }
    out.write_all(b"\n")
}

fn encode_field<'a>(text: &'a str, delimiter: u8, null_marker: &str) -> Cow<'a, str> {
    let needs_quotes = text == null_marker
        || text
            .bytes()
            .any(|b| b == delimiter || b == b'"' || b == b'\n' || b == b'\r');
    if needs_quotes {
        Cow::Owned(format!("\"{}\"", text.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(text)
    }
}

const SNIFF_CANDIDATES: [u8; 4] = [b'\t', b';', b',', b'|'];
const SNIFF_LINES: usize = 10;

/// Detect the most likely field delimiter from the first few lines.
///
/// Candidates are tab, semicolon, comma and pipe, in that order of preference
/// on ties. Comma when no candidate splits the header.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample = content.lines().take(SNIFF_LINES).collect::<Vec<_>>().join("\n");

    let mut best: Option<(u8, usize)> = None;
    for delimiter in SNIFF_CANDIDATES {
        if let Some(score) = delimiter_score(&sample, delimiter) {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((delimiter, score));
            }
        }
    }

    match best {
        Some((delimiter, score)) => {
            debug!(delimiter = %(delimiter as char), score, "sniffed delimiter");
            delimiter
        }
        None => b',',
    }
}

/// Header width times the number of sampled records agreeing with it, or
/// `None` when the header does not split.
fn delimiter_score(sample: &str, delimiter: u8) -> Option<usize> {
    let widths: Vec<usize> = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample.as_bytes())
        .records()
        .map(|record| record.map_or(0, |r| r.len()))
        .collect();
    let header = *widths.first()?;
    (header > 1).then(|| header * widths.iter().filter(|&&w| w == header).count())
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let bytes = std::fs::read(path).map_err(|source| IoError::File {
        path: path.to_path_buf(),
        source,
    })?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            debug!(path = %path.display(), "not UTF-8, decoding as Windows-1252");
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}
