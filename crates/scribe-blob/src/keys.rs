//! Object key layout.
//!
//! An uploaded CSV lives at `reports/<reportID>/<csvID>.csv` and its
//! unique-values index at `reports/<reportID>/<csvID>.columns.json`.

use uuid::Uuid;

pub fn csv_key(report_id: Uuid, csv_id: Uuid) -> String { format!("reports/{report_id}/{csv_id}.csv") }

pub fn columns_key(report_id: Uuid, csv_id: Uuid) -> String {
  format!("reports/{report_id}/{csv_id}.columns.json")
}

/// Recover `(report_id, csv_id)` from a CSV object key.
pub fn parse_csv_key(key: &str) -> Option<(Uuid, Uuid)> {
  let rest = key.strip_prefix("reports/")?;
  let (report, file) = rest.split_once('/')?;
  let csv = file.strip_suffix(".csv")?;
  Some((Uuid::parse_str(report).ok()?, Uuid::parse_str(csv).ok()?))
}
