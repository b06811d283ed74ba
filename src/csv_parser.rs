//! CSV text to [`DataFrame`](crate::dataframe::DataFrame).
//!
//! Tokenizing is done by the `csv` crate (RFC 4180 quoting, CRLF, embedded
//! delimiters). Each field becomes a [`Cell`] and every column's storage
//! is then inferred by [`Column::from_cells`].
//!
//! Null markers such as empty, `NA`, `N/A`, `NaN`, `null`, `None` and
//! `#N/A` read as missing. Short rows are padded with missing values;
//! long rows are an error carrying the offending line number.
//!
//! ```
//! use u_compare::csv_parser::CsvParser;
//! use u_compare::dataframe::StorageType;
//!
//! let csv = "name,value\nAlice,1.5\nBob,2.3\n";
//! let df = CsvParser::new().parse_str(csv).unwrap();
//! assert_eq!(df.row_count(), 2);
//! assert_eq!(df.column_by_name("value").unwrap().storage_type(), StorageType::Numeric);
//! ```

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::dataframe::{Cell, Column, DataFrame};
use crate::error::CompareError;

/// Field values read as missing.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Reader settings for delimited text.
///
/// ```
/// use u_compare::csv_parser::CsvParser;
///
/// let df = CsvParser::new().delimiter(b';').parse_str("a;b\n1;2\n3;4\n").unwrap();
/// assert_eq!(df.column_names(), &["a", "b"]);
/// ```
#[derive(Debug, Clone)]
pub struct CsvParser {
    delimiter: u8,
    has_header: bool,
    missing: Vec<String>,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            missing: MISSING_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl CsvParser {
    /// Comma separated, first row is the header, standard missing markers.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Without a header, columns are named by position: `"0"`, `"1"`, ...
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Replaces the set of field values that read as missing.
    pub fn null_markers(mut self, markers: Vec<String>) -> Self {
        self.missing = markers;
        self
    }

    /// Parses CSV text.
    ///
    /// Input with no data rows yields an empty DataFrame; callers decide
    /// whether that is an error.
    pub fn parse_str(&self, input: &str) -> Result<DataFrame, CompareError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let records = self.read_records(input)?;

        let mut records = records.into_iter();
        let Some((first_line, first)) = records.next() else {
            return Ok(DataFrame::new());
        };
        let (headers, body): (Vec<String>, Vec<(usize, StringRecord)>) = if self.has_header {
            let raw: Vec<String> = first.iter().map(str::to_string).collect();
            (dedupe_headers(&raw), records.collect())
        } else {
            let names = (0..first.len()).map(|i| i.to_string()).collect();
            (names, std::iter::once((first_line, first)).chain(records).collect())
        };
        if body.is_empty() {
            return Ok(DataFrame::new());
        }

        let width = headers.len();
        let mut columns: Vec<Vec<Cell>> = vec![Vec::with_capacity(body.len()); width];
        for (line, record) in &body {
            if record.len() > width {
                return Err(CompareError::CsvParse {
                    line: *line,
                    message: format!("expected {width} fields, saw {}", record.len()),
                });
            }
            for (idx, cells) in columns.iter_mut().enumerate() {
                cells.push(match record.get(idx) {
                    Some(field) if !self.is_missing(field) => Cell::Text(field.to_string()),
                    _ => Cell::Missing,
                });
            }
        }

        let mut df = DataFrame::new();
        for (name, cells) in headers.into_iter().zip(columns) {
            df.add_column(name, Column::from_cells(&cells))?;
        }
        Ok(df)
    }

    /// Non-blank records paired with the line they start on.
    fn read_records(&self, input: &str) -> Result<Vec<(usize, StringRecord)>, CompareError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input.as_bytes());

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| CompareError::CsvParse {
                line: e.position().map_or(0, |p| p.line() as usize),
                message: e.to_string(),
            })?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line() as usize);
            records.push((line, record));
        }
        Ok(records)
    }

    fn is_missing(&self, field: &str) -> bool {
        self.missing.iter().any(|m| m == field)
    }
}

/// Makes header names unique by suffixing repeats with `.1`, `.2`, ...
/// Blank headers become `Unnamed: <index>`.
pub(crate) fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.iter()
        .enumerate()
        .map(|(i, h)| {
            let base = match h.trim() {
                "" => format!("Unnamed: {i}"),
                trimmed => trimmed.to_string(),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, Classification};
    use crate::dataframe::StorageType;

    // ── Basic parsing ───────────────────────────────────────────────

    #[test]
    fn header_and_rows() {
        let df = CsvParser::new().parse_str("a,b,c\n1,2,3\n4,5,6\n").unwrap();
        assert_eq!((df.row_count(), df.column_count()), (2, 3));
        assert_eq!(df.column_names(), &["a", "b", "c"]);
    }

    #[test]
    fn blank_lines_skipped() {
        let df = CsvParser::new().parse_str("a,b\n1,2\n\n,\n3,4\n").unwrap();
        assert_eq!(df.row_count(), 2);
    }

    #[test]
    fn fields_are_trimmed() {
        let df = CsvParser::new().parse_str("city , n\n Oslo , 3 \n").unwrap();
        assert_eq!(df.column_names(), &["city", "n"]);
        let city = df.column_by_name("city").unwrap();
        assert_eq!(city.label_at(0).as_deref(), Some("Oslo"));
        assert_eq!(df.column_by_name("n").unwrap().storage_type(), StorageType::Numeric);
    }

    #[test]
    fn parse_numeric_columns() {
        let csv = "x,y\n1.5,2.7\n3.1,-4.2\n0,100\n";
        let df = CsvParser::new().parse_str(csv).unwrap();
        let x = df.column_by_name("x").unwrap();
        assert_eq!(x.storage_type(), StorageType::Numeric);
        assert_eq!(x.valid_numeric_values().unwrap(), vec![1.5, 3.1, 0.0]);
    }

    #[test]
    fn booleans_are_strings() {
        let csv = "flag\ntrue\nfalse\ntrue\ntrue\n";
        let df = CsvParser::new().parse_str(csv).unwrap();
        let flag = df.column_by_name("flag").unwrap();
        assert_ne!(flag.storage_type(), StorageType::Numeric);
        assert_eq!(classify(flag), Classification::Categorical);
        assert_eq!(flag.label_at(1).as_deref(), Some("false"));
    }

    #[test]
    fn parse_text_column() {
        let csv = "name\nAlice\nBob\nCharlie\n";
        let df = CsvParser::new().parse_str(csv).unwrap();
        let name = df.column_by_name("name").unwrap();
        assert_eq!(name.storage_type(), StorageType::Text);
        assert_eq!(name.label_at(2).as_deref(), Some("Charlie"));
    }

    // ── Missing values and ragged rows ──────────────────────────────

    #[test]
    fn parse_null_markers() {
        let csv = "x\n1.0\nNA\n3.0\nNone\n5.0\nnull\n";
        let df = CsvParser::new().parse_str(csv).unwrap();
        let x = df.column_by_name("x").unwrap();
        assert_eq!(x.storage_type(), StorageType::Numeric);
        assert_eq!(x.null_count(), 3);
        assert!(!x.is_valid(1));
        assert!(!x.is_valid(3));
        assert!(!x.is_valid(5));
    }

    #[test]
    fn custom_null_markers_replace_defaults() {
        let df = CsvParser::new()
            .null_markers(vec!["-".into(), String::new()])
            .parse_str("x\n1\n-\nNA\n")
            .unwrap();
        let x = df.column_by_name("x").unwrap();
        assert_eq!(x.storage_type(), StorageType::Text);
        assert_eq!(x.null_count(), 1);
        assert_eq!(x.label_at(2).as_deref(), Some("NA"));
    }

    #[test]
    fn all_null_column() {
        let csv = "x,y\nNA,1\n,2\nnull,3\n";
        let df = CsvParser::new().parse_str(csv).unwrap();
        let x = df.column_by_name("x").unwrap();
        assert_eq!(x.null_count(), 3);
        assert_eq!(x.valid_count(), 0);
    }

    #[test]
    fn short_rows_are_padded() {
        let csv = "a,b\n1,2\n3\n";
        let df = CsvParser::new().parse_str(csv).unwrap();
        let b = df.column_by_name("b").unwrap();
        assert_eq!(b.null_count(), 1);
    }

    #[test]
    fn long_rows_are_rejected() {
        let csv = "a,b\n1,2\n3,4,5\n";
        let err = CsvParser::new().parse_str(csv).unwrap_err();
        assert!(matches!(err, CompareError::CsvParse { line: 3, .. }));
    }

    // ── Quoting and line endings ────────────────────────────────────

    #[test]
    fn parse_quoted_fields() {
        let csv = "name,desc\nAlice,\"hello, world\"\nBob,\"she said \"\"hi\"\"\"\n";
        let df = CsvParser::new().parse_str(csv).unwrap();
        let desc = df.column_by_name("desc").unwrap();
        assert_eq!(desc.label_at(0).as_deref(), Some("hello, world"));
        assert_eq!(desc.label_at(1).as_deref(), Some("she said \"hi\""));
    }

    #[test]
    fn parse_crlf_and_bom() {
        let csv = "\u{feff}a,b\r\n1,x\r\n2,y\r\n";
        let df = CsvParser::new().parse_str(csv).unwrap();
        assert_eq!(df.column_names(), &["a", "b"]);
        assert_eq!(df.row_count(), 2);
    }

    #[test]
    fn header_only_is_empty() {
        let df = CsvParser::new().parse_str("a,b\n").unwrap();
        assert!(df.is_empty());
    }

    #[test]
    fn duplicate_and_blank_headers() {
        let df = CsvParser::new().parse_str("a,a,\n1,2,3\n").unwrap();
        assert_eq!(df.column_names(), &["a", "a.1", "Unnamed: 2"]);
    }

    #[test]
    fn no_header_mode() {
        let df = CsvParser::new()
            .has_header(false)
            .parse_str("1,2\n3,4\n")
            .unwrap();
        assert_eq!(df.row_count(), 2);
        assert_eq!(df.column_names(), &["0", "1"]);
    }
}
