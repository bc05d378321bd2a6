//! Decodes raw upload bytes into an untyped [`Table`].
//!
//! The first row is always the header. No row is skipped and no value is
//! rewritten: delimited text yields text cells (empty fields become null),
//! spreadsheets yield number, text, or null cells.

use std::{fs, io::Cursor, path::Path};

use calamine::{Data, DataType, Reader, open_workbook_auto_from_rs};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};

use crate::{
    data::{Cell, format_number},
    error::LoadError,
    io_utils,
    table::Table,
};

/// Local file header, empty archive, and spanned archive markers.
const ZIP_SIGNATURES: [&[u8]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];
const OLE_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Spreadsheet,
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Field delimiter; sniffed from the content when absent.
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

pub fn detect_format(bytes: &[u8]) -> SourceFormat {
    let zip = ZIP_SIGNATURES.iter().any(|sig| bytes.starts_with(sig));
    if zip || bytes.starts_with(OLE_SIGNATURE) {
        SourceFormat::Spreadsheet
    } else {
        SourceFormat::Delimited
    }
}

pub fn load_path(path: &Path, options: &LoadOptions) -> Result<Table, LoadError> {
    let bytes = fs::read(path)?;
    load_bytes(&bytes, options)
}

pub fn load_bytes(bytes: &[u8], options: &LoadOptions) -> Result<Table, LoadError> {
    let table = match detect_format(bytes) {
        SourceFormat::Spreadsheet => read_spreadsheet(bytes)?,
        SourceFormat::Delimited => read_delimited(bytes, options)?,
    };
    info!(
        "Loaded {} row(s) x {} column(s)",
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

fn read_delimited(bytes: &[u8], options: &LoadOptions) -> Result<Table, LoadError> {
    if bytes.contains(&0) {
        return Err(LoadError::UnsupportedFormat(
            "input contains binary data and is not a known spreadsheet container".to_string(),
        ));
    }
    let text = io_utils::decode_text(bytes, options.encoding).ok_or_else(|| {
        LoadError::UnsupportedFormat(format!(
            "input is neither a spreadsheet nor valid {} text",
            options.encoding.name()
        ))
    })?;
    if text.trim().is_empty() {
        return Ok(Table::empty());
    }

    let delimiter = options
        .delimiter
        .unwrap_or_else(|| io_utils::sniff_delimiter(&text));
    debug!(
        "Reading delimited text with delimiter '{}'",
        io_utils::printable_delimiter(delimiter)
    );

    let mut reader = io_utils::open_csv_reader(text.as_bytes(), delimiter);
    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record
            .map_err(malformed)?
            .iter()
            .map(str::to_string)
            .collect(),
        None => return Ok(Table::empty()),
    };

    let width = headers.len();
    let mut rows = Vec::new();
    let mut ragged = 0usize;
    for record in records {
        let record = record.map_err(malformed)?;
        if record.len() != width {
            ragged += 1;
        }
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Null
                    } else {
                        Cell::text(field)
                    }
                })
                .collect(),
        );
    }
    if ragged > 0 {
        warn!("{ragged} row(s) did not match the header width of {width} and were padded or truncated");
    }
    Ok(Table::from_rows(headers, rows))
}

fn malformed(err: csv::Error) -> LoadError {
    let line = err.position().map_or(0, |pos| pos.line());
    LoadError::Malformed {
        line,
        message: err.to_string(),
    }
}

fn read_spreadsheet(bytes: &[u8]) -> Result<Table, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|err| {
        LoadError::UnsupportedFormat(format!("container is not a readable workbook: {err}"))
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|err| LoadError::Spreadsheet(err.to_string()))?;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Ok(Table::empty());
    };
    let headers = header_row.iter().map(header_text).collect();
    let rows = sheet_rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();
    Ok(Table::from_rows(headers, rows))
}

fn header_text(cell: &Data) -> String {
    match spreadsheet_cell(cell) {
        Cell::Null => String::new(),
        other => other.as_display(),
    }
}

fn spreadsheet_cell(cell: &Data) -> Cell {
    match cell {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) if s.is_empty() => Cell::Null,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Bool(b) => Cell::text(b.to_string()),
        Data::DateTime(_) => match DataType::as_datetime(cell) {
            Some(dt) => Cell::text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => cell.as_f64().map_or(Cell::Null, |f| Cell::text(format_number(f))),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Error(_) | Data::Empty => Cell::Null,
    }
}
