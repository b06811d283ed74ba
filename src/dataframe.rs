//! Column-major DataFrame for tabular data.
//!
//! The [`DataFrame`] stores data in column-major order with typed columns
//! and a compact validity bitmap for tracking missing values. It is the
//! in-memory table every operation in this crate reads; nothing here ever
//! mutates a table once it has been built.
//!
//! # Column Types
//!
//! | Type | Storage | Use case |
//! |------|---------|----------|
//! | [`Numeric`](Column::Numeric) | `Vec<f64>` + bitmap | Every non-missing cell is a number |
//! | [`Categorical`](Column::Categorical) | Dictionary + `Vec<u32>` | Low-cardinality strings |
//! | [`Text`](Column::Text) | `Vec<String>` + bitmap | High-cardinality strings |
//!
//! # Example
//!
//! ```
//! use u_compare::dataframe::{Cell, DataFrame};
//!
//! let df = DataFrame::from_cells(vec![
//!     ("score".to_string(), vec![Cell::from(1.0), Cell::from(2.0), Cell::Missing]),
//!     ("team".to_string(), vec![Cell::from("a"), Cell::from("b"), Cell::from("a")]),
//! ]).unwrap();
//! assert_eq!(df.row_count(), 3);
//! assert_eq!(df.column_count(), 2);
//! ```

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use crate::error::CompareError;

/// Maximum unique-value ratio for a string column to be dictionary-encoded
/// as Categorical instead of stored as Text.
const CATEGORICAL_THRESHOLD: f64 = 0.5;

/// Maximum dictionary size for categorical columns.
const MAX_CATEGORICAL_UNIQUE: usize = 1000;

// ── Cell ──────────────────────────────────────────────────────────────

/// A single scalar cell as handed over by a file reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A native number (spreadsheet readers produce these).
    Number(f64),
    /// Raw text. Text that parses as a number still counts as numeric.
    Text(String),
    /// Absent value.
    Missing,
}

impl Cell {
    /// Returns the numeric interpretation of this cell, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) if !v.is_nan() => Some(*v),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
            _ => None,
        }
    }

    /// Returns `true` for [`Cell::Missing`] and for NaN numbers.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Number(v) => v.is_nan(),
            Self::Text(_) => false,
        }
    }

    /// Renders the cell as a label. Missing cells have no label.
    pub fn label(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Missing => None,
            Self::Number(v) if v.is_nan() => None,
            Self::Number(v) => Some(Cow::Owned(format_number(*v))),
            Self::Text(s) => Some(Cow::Borrowed(s.as_str())),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Missing, Into::into)
    }
}

/// Formats a number the way it would appear as a key: integral values
/// without a fractional part, everything else in shortest round-trip form.
pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

// ── ValidityBitmap ────────────────────────────────────────────────────

/// Bit-packed validity bitmap using `Vec<u64>`.
///
/// Each bit indicates whether the corresponding row is valid (1) or
/// missing (0).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityBitmap {
    bits: Vec<u64>,
    len: usize,
}

impl ValidityBitmap {
    /// Creates a bitmap where all `len` positions are valid.
    pub fn all_valid(len: usize) -> Self {
        let n_words = len.div_ceil(64);
        let mut bits = vec![u64::MAX; n_words];
        let trailing = len % 64;
        if trailing != 0 && n_words > 0 {
            bits[n_words - 1] = (1u64 << trailing) - 1;
        }
        Self { bits, len }
    }

    /// Creates a bitmap where all `len` positions are missing.
    pub fn all_invalid(len: usize) -> Self {
        Self {
            bits: vec![0u64; len.div_ceil(64)],
            len,
        }
    }

    /// Creates an empty bitmap with no rows.
    pub fn empty() -> Self {
        Self {
            bits: Vec::new(),
            len: 0,
        }
    }

    /// Returns `true` if the value at `idx` is present.
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        let (word, bit) = (idx / 64, idx % 64);
        (self.bits[word] >> bit) & 1 == 1
    }

    /// Appends a new position.
    pub fn push(&mut self, valid: bool) {
        let idx = self.len;
        self.len += 1;
        let (word, bit) = (idx / 64, idx % 64);
        if word >= self.bits.len() {
            self.bits.push(0);
        }
        if valid {
            self.bits[word] |= 1u64 << bit;
        }
    }

    /// Returns the total number of tracked positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the bitmap tracks zero positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counts the number of missing positions.
    pub fn null_count(&self) -> usize {
        let valid_count: usize = self.bits.iter().map(|w| w.count_ones() as usize).sum();
        self.len - valid_count
    }

    /// Counts the number of present positions.
    pub fn valid_count(&self) -> usize {
        self.len - self.null_count()
    }

    /// Returns an iterator over indices of present positions.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.is_valid(i))
    }
}

// ── StorageType ───────────────────────────────────────────────────────

/// Physical storage chosen for a column when it was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// Dense `f64` storage.
    Numeric,
    /// Dictionary-encoded strings.
    Categorical,
    /// Plain strings.
    Text,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "Numeric"),
            Self::Categorical => write!(f, "Categorical"),
            Self::Text => write!(f, "Text"),
        }
    }
}

// ── Column ────────────────────────────────────────────────────────────

/// A typed column with validity bitmap for missing values.
///
/// Invalid positions hold a default value (0.0, empty string, or index 0)
/// that must be ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Dense `f64` values. Missing positions hold `0.0`.
    Numeric {
        values: Vec<f64>,
        validity: ValidityBitmap,
    },
    /// Dictionary-encoded strings.
    ///
    /// `dictionary` holds unique values in first-seen order and `indices`
    /// maps each row to a dictionary slot.
    Categorical {
        dictionary: Vec<String>,
        indices: Vec<u32>,
        validity: ValidityBitmap,
    },
    /// Free-form text. Missing positions hold an empty string.
    Text {
        values: Vec<String>,
        validity: ValidityBitmap,
    },
}

impl Column {
    /// Creates a numeric column.
    pub fn numeric(values: Vec<f64>, validity: ValidityBitmap) -> Self {
        Self::Numeric { values, validity }
    }

    /// Creates a categorical column from a dictionary and indices.
    pub fn categorical(dictionary: Vec<String>, indices: Vec<u32>, validity: ValidityBitmap) -> Self {
        Self::Categorical {
            dictionary,
            indices,
            validity,
        }
    }

    /// Creates a text column.
    pub fn text(values: Vec<String>, validity: ValidityBitmap) -> Self {
        Self::Text { values, validity }
    }

    /// Builds a column from raw cells, inferring its storage.
    ///
    /// Numeric storage is chosen when every non-missing cell reads as a
    /// number. A column with no present cells is stored as numeric with
    /// every position missing. Otherwise strings are dictionary-encoded
    /// when fewer than half of them are distinct.
    ///
    /// ```
    /// use u_compare::dataframe::{Cell, Column, StorageType};
    ///
    /// let col = Column::from_cells(&[Cell::from("1.5"), Cell::Missing, Cell::from(3.0)]);
    /// assert_eq!(col.storage_type(), StorageType::Numeric);
    /// assert_eq!(col.null_count(), 1);
    /// ```
    pub fn from_cells(cells: &[Cell]) -> Self {
        let n = cells.len();
        let present: Vec<&Cell> = cells.iter().filter(|c| !c.is_missing()).collect();
        if present.is_empty() {
            return Self::numeric(vec![0.0; n], ValidityBitmap::all_invalid(n));
        }

        if present.iter().all(|c| c.as_number().is_some()) {
            let mut values = Vec::with_capacity(n);
            let mut validity = ValidityBitmap::empty();
            for cell in cells {
                match cell.as_number() {
                    Some(v) => {
                        values.push(v);
                        validity.push(true);
                    }
                    None => {
                        values.push(0.0);
                        validity.push(false);
                    }
                }
            }
            return Self::numeric(values, validity);
        }

        let labels: Vec<Option<Cow<'_, str>>> = cells.iter().map(Cell::label).collect();
        let unique: HashSet<&str> = labels.iter().flatten().map(|s| &**s).collect();
        let ratio = unique.len() as f64 / present.len() as f64;
        if ratio < CATEGORICAL_THRESHOLD && unique.len() <= MAX_CATEGORICAL_UNIQUE {
            build_categorical(&labels)
        } else {
            build_text(&labels)
        }
    }

    /// Returns the physical storage of this column.
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::Numeric { .. } => StorageType::Numeric,
            Self::Categorical { .. } => StorageType::Categorical,
            Self::Text { .. } => StorageType::Text,
        }
    }

    /// Returns the number of rows in this column.
    pub fn len(&self) -> usize {
        self.validity().len()
    }

    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the validity bitmap.
    pub fn validity(&self) -> &ValidityBitmap {
        match self {
            Self::Numeric { validity, .. }
            | Self::Categorical { validity, .. }
            | Self::Text { validity, .. } => validity,
        }
    }

    /// Returns the number of missing values.
    pub fn null_count(&self) -> usize {
        self.validity().null_count()
    }

    /// Returns the number of present values.
    pub fn valid_count(&self) -> usize {
        self.validity().valid_count()
    }

    /// Returns `true` if the value at `idx` is present.
    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity().is_valid(idx)
    }

    /// Returns the numeric value at `idx`, or `None` if missing or not numeric.
    pub fn number_at(&self, idx: usize) -> Option<f64> {
        match self {
            Self::Numeric { values, validity } if validity.is_valid(idx) => Some(values[idx]),
            _ => None,
        }
    }

    /// Returns present numeric values (missing excluded) as a new `Vec<f64>`.
    pub fn valid_numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            Self::Numeric { values, validity } => {
                Some(validity.valid_indices().map(|i| values[i]).collect())
            }
            _ => None,
        }
    }

    /// Returns the string label of the value at `idx`.
    ///
    /// Numbers are stringified with [`format_number`]; missing values have
    /// no label.
    pub fn label_at(&self, idx: usize) -> Option<Cow<'_, str>> {
        if !self.is_valid(idx) {
            return None;
        }
        match self {
            Self::Numeric { values, .. } => Some(Cow::Owned(format_number(values[idx]))),
            Self::Categorical {
                dictionary,
                indices,
                ..
            } => dictionary
                .get(indices[idx] as usize)
                .map(|s| Cow::Borrowed(s.as_str())),
            Self::Text { values, .. } => Some(Cow::Borrowed(values[idx].as_str())),
        }
    }
}

fn build_categorical(labels: &[Option<Cow<'_, str>>]) -> Column {
    let mut dict_map: HashMap<&str, u32> = HashMap::new();
    let mut dictionary: Vec<String> = Vec::new();
    let mut indices = Vec::with_capacity(labels.len());
    let mut validity = ValidityBitmap::empty();

    for label in labels {
        match label {
            Some(val) => {
                let val: &str = val;
                let idx = *dict_map.entry(val).or_insert_with(|| {
                    dictionary.push(val.to_string());
                    (dictionary.len() - 1) as u32
                });
                indices.push(idx);
                validity.push(true);
            }
            None => {
                indices.push(0);
                validity.push(false);
            }
        }
    }

    Column::categorical(dictionary, indices, validity)
}

fn build_text(labels: &[Option<Cow<'_, str>>]) -> Column {
    let mut texts = Vec::with_capacity(labels.len());
    let mut validity = ValidityBitmap::empty();

    for label in labels {
        match label {
            Some(val) => {
                texts.push(val.to_string());
                validity.push(true);
            }
            None => {
                texts.push(String::new());
                validity.push(false);
            }
        }
    }

    Column::text(texts, validity)
}

// ── DataFrame ─────────────────────────────────────────────────────────

/// Column-major tabular data structure.
///
/// Stores named columns of typed data. All columns have the same number
/// of rows.
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl DataFrame {
    /// Creates an empty DataFrame with no columns or rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a DataFrame from named cell vectors, inferring column storage.
    pub fn from_cells(columns: Vec<(String, Vec<Cell>)>) -> Result<Self, CompareError> {
        let mut df = Self::new();
        for (name, cells) in columns {
            df.add_column(name, Column::from_cells(&cells))?;
        }
        Ok(df)
    }

    /// Adds a named column to the DataFrame.
    ///
    /// Returns an error if the column length doesn't match the existing
    /// row count (unless this is the first column).
    pub fn add_column(&mut self, name: String, column: Column) -> Result<(), CompareError> {
        let col_len = column.len();
        if self.columns.is_empty() {
            self.row_count = col_len;
        } else if col_len != self.row_count {
            return Err(CompareError::DimensionMismatch {
                expected: self.row_count,
                actual: col_len,
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Returns the number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the DataFrame has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns column names in order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Returns a reference to the column with the given `name`.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// Looks up a column, failing with [`CompareError::ColumnNotFound`]
    /// that lists every available column.
    pub fn require_column(&self, name: &str) -> Result<&Column, CompareError> {
        self.column_by_name(name)
            .ok_or_else(|| CompareError::ColumnNotFound {
                name: name.to_string(),
                available: self.names.clone(),
            })
    }

    /// Returns an iterator over (name, column) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(|s| s.as_str()).zip(self.columns.iter())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── ValidityBitmap tests ──────────────────────────────────────

    #[test]
    fn bitmap_boundary_64() {
        let bm = ValidityBitmap::all_valid(64);
        assert_eq!(bm.bits.len(), 1);
        assert_eq!(bm.null_count(), 0);

        let bm65 = ValidityBitmap::all_valid(65);
        assert_eq!(bm65.bits.len(), 2);
        assert!(bm65.is_valid(64));
    }

    #[test]
    fn bitmap_push_and_indices() {
        let mut bm = ValidityBitmap::empty();
        for i in 0..130 {
            bm.push(i % 3 != 0);
        }
        assert_eq!(bm.len(), 130);
        assert_eq!(bm.null_count(), (0..130).filter(|i| i % 3 == 0).count());
        let first: Vec<usize> = bm.valid_indices().take(4).collect();
        assert_eq!(first, vec![1, 2, 4, 5]);
    }

    // ── Cell tests ───────────────────────────────────────────────

    #[test]
    fn cell_numeric_interpretation() {
        assert_eq!(Cell::from("2.5").as_number(), Some(2.5));
        assert_eq!(Cell::from(" 7 ").as_number(), Some(7.0));
        assert_eq!(Cell::from("abc").as_number(), None);
        assert_eq!(Cell::Number(f64::NAN).as_number(), None);
        assert!(Cell::Number(f64::NAN).is_missing());
        assert!(Cell::from(None::<f64>).is_missing());
    }

    #[test]
    fn number_labels_drop_integral_fraction() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(Cell::from(4.0).label().as_deref(), Some("4"));
    }

    // ── Column tests ─────────────────────────────────────────────

    #[test]
    fn from_cells_numeric_with_missing() {
        let col = Column::from_cells(&[Cell::from(1.0), Cell::Missing, Cell::from("3")]);
        assert_eq!(col.storage_type(), StorageType::Numeric);
        assert_eq!(col.valid_numeric_values(), Some(vec![1.0, 3.0]));
        assert_eq!(col.number_at(1), None);
    }

    #[test]
    fn from_cells_all_missing_is_numeric_storage() {
        let col = Column::from_cells(&[Cell::Missing, Cell::Missing]);
        assert_eq!(col.storage_type(), StorageType::Numeric);
        assert_eq!(col.null_count(), 2);
    }

    #[test]
    fn from_cells_low_cardinality_is_categorical() {
        let cells: Vec<Cell> = ["a", "b", "a", "a", "b"].iter().map(|&s| s.into()).collect();
        let col = Column::from_cells(&cells);
        assert_eq!(col.storage_type(), StorageType::Categorical);
        assert_eq!(col.label_at(2).as_deref(), Some("a"));
    }

    #[test]
    fn from_cells_high_cardinality_is_text() {
        let cells: Vec<Cell> = ["x", "y", "z"].iter().map(|&s| s.into()).collect();
        let col = Column::from_cells(&cells);
        assert_eq!(col.storage_type(), StorageType::Text);
        assert_eq!(col.label_at(0).as_deref(), Some("x"));
    }

    #[test]
    fn mixed_numbers_and_text_stringify_numbers() {
        let col = Column::from_cells(&[
            Cell::from(1.0),
            Cell::from("n/a-ish"),
            Cell::from(1.0),
            Cell::from(1.0),
            Cell::from(1.0),
        ]);
        assert_eq!(col.storage_type(), StorageType::Categorical);
        assert_eq!(col.label_at(0).as_deref(), Some("1"));
    }

    // ── DataFrame tests ──────────────────────────────────────────

    #[test]
    fn column_length_mismatch() {
        let mut df = DataFrame::new();
        df.add_column(
            "x".to_string(),
            Column::numeric(vec![1.0, 2.0], ValidityBitmap::all_valid(2)),
        )
        .unwrap();

        let result = df.add_column(
            "y".to_string(),
            Column::numeric(vec![1.0, 2.0, 3.0], ValidityBitmap::all_valid(3)),
        );
        assert!(matches!(
            result,
            Err(CompareError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn require_column_lists_available() {
        let df = DataFrame::from_cells(vec![
            ("a".into(), vec![Cell::from(1.0)]),
            ("b".into(), vec![Cell::from(2.0)]),
        ])
        .unwrap();
        assert!(df.require_column("a").is_ok());
        match df.require_column("zzz") {
            Err(CompareError::ColumnNotFound { name, available }) => {
                assert_eq!(name, "zzz");
                assert_eq!(available, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn dataframe_iter_preserves_order() {
        let df = DataFrame::from_cells(vec![
            ("x".into(), vec![Cell::from(1.0)]),
            ("y".into(), vec![Cell::from("a")]),
        ])
        .unwrap();
        let names: Vec<&str> = df.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(df.row_count(), 1);
    }
}
