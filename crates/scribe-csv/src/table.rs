//! In-memory CSV table: a header row plus string cells.

use std::{collections::HashMap, io::Read};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CsvTable {
  headers: Vec<String>,
  rows:    Vec<Vec<String>>,
  columns: HashMap<String, usize>,
}

impl CsvTable {
  /// Read a comma-delimited table whose first record is the header.
  ///
  /// Blank or repeated header names and rows whose width differs from the
  /// header are rejected.
  pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    if headers.is_empty() {
      return Err(Error::Format("missing header row".into()));
    }

    let mut columns = HashMap::with_capacity(headers.len());
    for (i, name) in headers.iter().enumerate() {
      if name.trim().is_empty() {
        return Err(Error::Format(format!("header cell {} is blank", i + 1)));
      }
      if columns.insert(name.clone(), i).is_some() {
        return Err(Error::Format(format!("header {name:?} appears more than once")));
      }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
      rows.push(record?.iter().map(str::to_owned).collect());
    }

    Ok(Self { headers, rows, columns })
  }

  pub fn parse(input: &str) -> Result<Self> { Self::from_reader(input.as_bytes()) }

  pub fn headers(&self) -> &[String] { &self.headers }

  pub fn rows(&self) -> &[Vec<String>] { &self.rows }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  /// Position of `name` in the header.
  pub fn column(&self, name: &str) -> Result<usize> {
    self.columns.get(name).copied().ok_or_else(|| Error::ColumnMissing(name.to_owned()))
  }
}
