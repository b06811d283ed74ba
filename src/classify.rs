//! Numeric / categorical column classification.
//!
//! Every strategy decision in [`compare`](crate::compare) and
//! [`profiling`](crate::profiling) starts from [`classify`]. A column is
//! numeric when it has at least one present value and every present value
//! is a number; anything else, including a column with no present values,
//! is categorical.
//!
//! ```
//! use u_compare::classify::{classify, Classification};
//! use u_compare::dataframe::{Cell, Column};
//!
//! let scores = Column::from_cells(&[Cell::from(1.0), Cell::from("2")]);
//! assert_eq!(classify(&scores), Classification::Numeric);
//!
//! let empty = Column::from_cells(&[Cell::Missing, Cell::Missing]);
//! assert_eq!(classify(&empty), Classification::Categorical);
//! ```

use serde::{Deserialize, Serialize};

use crate::dataframe::Column;

/// Column classification used to pick statistics and comparison strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Every present value is a number.
    Numeric,
    /// Anything else.
    Categorical,
}

impl Classification {
    /// Returns `true` for [`Classification::Numeric`].
    pub fn is_numeric(self) -> bool {
        self == Self::Numeric
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Categorical => write!(f, "categorical"),
        }
    }
}

/// Classifies a column. Never fails.
pub fn classify(column: &Column) -> Classification {
    match column {
        Column::Numeric { validity, .. } if validity.valid_count() > 0 => Classification::Numeric,
        _ => Classification::Categorical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::Cell;

    #[test]
    fn all_numbers_is_numeric() {
        let col = Column::from_cells(&[Cell::from(1.0), Cell::from(-2.5), Cell::from("1e3")]);
        assert_eq!(classify(&col), Classification::Numeric);
    }

    #[test]
    fn missing_values_do_not_affect_numeric() {
        let col = Column::from_cells(&[Cell::Missing, Cell::from(4.0), Cell::Missing]);
        assert_eq!(classify(&col), Classification::Numeric);
    }

    #[test]
    fn single_string_makes_categorical() {
        let col = Column::from_cells(&[Cell::from(1.0), Cell::from("x"), Cell::from(3.0)]);
        assert_eq!(classify(&col), Classification::Categorical);
    }

    #[test]
    fn all_missing_is_categorical() {
        let col = Column::from_cells(&vec![Cell::Missing; 4]);
        assert_eq!(classify(&col), Classification::Categorical);
    }

    #[test]
    fn zero_rows_is_categorical() {
        let col = Column::from_cells(&[]);
        assert_eq!(classify(&col), Classification::Categorical);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Classification::Numeric).unwrap(),
            "\"numeric\""
        );
        assert_eq!(Classification::Categorical.to_string(), "categorical");
    }
}
