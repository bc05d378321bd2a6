//! I/O helpers for delimited text: encoding resolution, delimiter sniffing,
//! and reader/writer construction.
//!
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Delimiter sniffing**: picks among `,` `;` tab `|` by per-line
//!   consistency over the first lines of the input.
//! - **Writers**: CSV output always quotes fields so values survive a reload
//!   unchanged.

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::table::Table;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DELIMITER_CANDIDATES: &[u8] = b",;\t|";
const SNIFF_LINES: usize = 10;

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Decodes text, honouring a byte-order mark. Returns `None` when the bytes
/// are not valid in the requested encoding.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

/// Guesses the field delimiter from the leading lines of `text`.
pub fn sniff_delimiter(text: &str) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    let Some(first) = lines.first() else {
        return DEFAULT_CSV_DELIMITER;
    };

    let mut best: Option<(u8, usize)> = None;
    for &candidate in DELIMITER_CANDIDATES {
        let count = count_unquoted(first, candidate);
        if count == 0 {
            continue;
        }
        let consistent = lines
            .iter()
            .all(|line| count_unquoted(line, candidate) == count);
        if consistent && best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((candidate, count));
        }
    }
    if let Some((delimiter, _)) = best {
        return delimiter;
    }

    DELIMITER_CANDIDATES
        .iter()
        .map(|&candidate| (candidate, count_unquoted(first, candidate)))
        .filter(|(_, count)| *count > 0)
        .fold(None, |acc: Option<(u8, usize)>, item| match acc {
            Some(current) if current.1 >= item.1 => Some(current),
            _ => Some(item),
        })
        .map_or(DEFAULT_CSV_DELIMITER, |(delimiter, _)| delimiter)
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    })
}

pub fn csv_writer<W: Write>(writer: W, delimiter: u8) -> csv::Writer<W> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true);
    builder.from_writer(writer)
}

/// Writes the header row followed by every row; nulls become empty fields.
pub fn write_table<W: Write>(writer: &mut csv::Writer<W>, table: &Table) -> csv::Result<()> {
    writer.write_record(table.columns().iter().map(|c| c.name.as_str()))?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.as_display()))?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
