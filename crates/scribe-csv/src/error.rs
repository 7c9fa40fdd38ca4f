//! Error types for the scribe-csv kernel.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed CSV: {0}")]
  Format(String),

  #[error("column {0:?} does not exist in the CSV header")]
  ColumnMissing(String),

  /// `row` is 1-based over data rows; the header is row 0.
  #[error("cannot parse {value:?} as a number at row {row}, column {column:?}")]
  NumericParse {
    row:    usize,
    column: String,
    value:  String,
  },
}

impl From<csv::Error> for Error {
  fn from(err: csv::Error) -> Self { Self::Format(err.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
