//! File ingestion: picks a reader by extension and yields a [`DataFrame`].
//!
//! - `.csv`: decoded as UTF-8 (BOM stripped), falling back to
//!   Windows-1252, then handed to [`CsvParser`].
//! - `.xlsx`: first worksheet via `calamine`, first row as header.
//!
//! Anything else is [`CompareError::UnsupportedFormat`]. A table without
//! rows or columns is [`CompareError::EmptyInput`].
//!
//! ```
//! use u_compare::loader::load_table;
//!
//! let df = load_table("people.csv", b"name,age\nAnn,31\n").unwrap();
//! assert_eq!(df.row_count(), 1);
//!
//! assert!(load_table("people.json", b"{}").is_err());
//! ```

use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, Xlsx};
use encoding_rs::{UTF_8, WINDOWS_1252};
use tracing::{debug, info};

use crate::csv_parser::{dedupe_headers, CsvParser};
use crate::dataframe::{Cell, Column, DataFrame};
use crate::error::CompareError;

/// Input formats understood by [`load_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Detects the format from a file name's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self, CompareError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(CompareError::UnsupportedFormat {
                filename: filename.to_string(),
            }),
        }
    }
}

/// Parses uploaded bytes into a table, choosing the reader by `filename`.
pub fn load_table(filename: &str, bytes: &[u8]) -> Result<DataFrame, CompareError> {
    let format = FileFormat::from_filename(filename)?;
    let df = match format {
        FileFormat::Csv => CsvParser::new().parse_str(&decode_text(bytes)?)?,
        FileFormat::Xlsx => read_xlsx(bytes)?,
    };
    if df.is_empty() || df.row_count() == 0 {
        return Err(CompareError::EmptyInput);
    }
    info!(
        filename,
        ?format,
        rows = df.row_count(),
        columns = df.column_count(),
        "table loaded"
    );
    Ok(df)
}

/// Reads a file from disk and parses it with [`load_table`].
pub fn load_path(path: impl AsRef<Path>) -> Result<DataFrame, CompareError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| CompareError::reading(path, e))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    load_table(name, &bytes)
}

/// Decodes CSV bytes: UTF-8 first, Windows-1252 when that fails.
///
/// Windows-1252 maps every byte, so it cannot fail by itself. Text holding
/// NUL characters is rejected instead: that is a binary file or a UTF-16
/// export, and neither decodes into meaningful cells.
pub fn decode_text(bytes: &[u8]) -> Result<Cow<'_, str>, CompareError> {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    let text = if had_errors {
        debug!("input is not valid UTF-8, retrying as windows-1252");
        WINDOWS_1252.decode_without_bom_handling(bytes).0
    } else {
        text
    };
    if text.contains('\0') {
        return Err(CompareError::Decode {
            message: "Unsupported encoding. Please use UTF-8, Latin-1, or CP1252 encoding.".into(),
        });
    }
    Ok(text)
}

// ── Workbooks ─────────────────────────────────────────────────────────

fn read_xlsx(bytes: &[u8]) -> Result<DataFrame, CompareError> {
    let workbook_err = |e: &dyn std::fmt::Display| CompareError::Workbook {
        message: e.to_string(),
    };
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(|e| workbook_err(&e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| workbook_err(&"no worksheet found"))?
        .map_err(|e| workbook_err(&e))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::new());
    };
    let raw_headers: Vec<String> = header
        .iter()
        .map(|c| match c {
            Data::Empty => String::new(),
            other => other.to_string(),
        })
        .collect();
    let names = dedupe_headers(&raw_headers);

    let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (col, slot) in cells.iter_mut().enumerate() {
            slot.push(row.get(col).map_or(Cell::Missing, cell_from_data));
        }
    }

    let mut df = DataFrame::new();
    for (name, col_cells) in names.into_iter().zip(cells) {
        df.add_column(name, Column::from_cells(&col_cells))?;
    }
    Ok(df)
}

/// Maps a spreadsheet cell onto the table's cell model.
pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) => Cell::Number(*v),
        Data::String(s) if s.trim().is_empty() => Cell::Missing,
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}
