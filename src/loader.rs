#![cfg(not(tarpaulin_include))]

//! Spreadsheet uploads → row grids for [`TableRef`](crate::state::TableRef).

use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::error::{ReportError, Result};

pub type Grid = Vec<Vec<String>>;

/// Parse CSV text into rows of cells.
///
/// One record per line; quoted fields may contain commas and `""` escapes.
/// Trailing blank lines are dropped.
///
/// # Examples
/// ```
/// use annual_report::loader::parse_csv;
///
/// let rows = parse_csv("Name,Count\n\"Smith, J\",3\n").unwrap();
/// assert_eq!(rows[1], vec!["Smith, J", "3"]);
/// ```
pub fn parse_csv(text: &str) -> Result<Grid> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows: Grid = text
        .lines()
        .map(|line| parse_csv_row(line.trim_end_matches('\r')))
        .collect();

    while rows
        .last()
        .is_some_and(|r| r.iter().all(|c| c.trim().is_empty()))
    {
        rows.pop();
    }

    if rows.is_empty() {
        return Err(ReportError::Table("CSV file is empty".into()));
    }
    Ok(rows)
}

// Parse a CSV row into a vector of strings
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Escaped quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            _ => current_field.push(c),
        }
    }

    result.push(current_field);
    result
}

/// First worksheet of an XLSX/XLS workbook.
pub fn from_excel_bytes(bytes: Vec<u8>) -> Result<Grid> {
    use calamine::{open_workbook_auto_from_rs, Reader};

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ReportError::Table(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReportError::Table("no sheets found in workbook".into()))?
        .map_err(|e| ReportError::Table(e.to_string()))?;

    if range.is_empty() {
        return Err(ReportError::Table("sheet is empty".into()));
    }

    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}

/// Pick a parser from the file name's extension.
pub fn parse_table_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Grid> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => {
            let text = String::from_utf8(bytes)
                .map_err(|_| ReportError::Table("CSV is not valid UTF-8".into()))?;
            parse_csv(&text)
        }
        Some("xlsx") | Some("xls") => from_excel_bytes(bytes),
        Some(ext) => Err(ReportError::Table(format!(
            "unsupported file extension: {} (use .csv, .xlsx or .xls)",
            ext
        ))),
        None => Err(ReportError::Table("file has no extension".into())),
    }
}

/// Load a table file from disk.
pub fn load_table(filepath: impl AsRef<Path>) -> Result<Grid> {
    let path = filepath.as_ref();
    let name = path.to_string_lossy().into_owned();
    parse_table_bytes(&name, fs::read(path)?)
}
