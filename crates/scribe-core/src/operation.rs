//! Tracking records for asynchronous work (CSV indexing).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How long an operation record is retained after creation, in seconds.
pub const OPERATION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Operation {
  #[serde(rename = "OperationID")]
  pub operation_id:    Uuid,
  pub completed:       bool,
  /// Unix seconds; the record is purged after this instant.
  pub delete_at:       i64,
  /// The report an upload was issued for.
  #[serde(rename = "ReportID", default)]
  pub report_id:       Option<Uuid>,
  #[serde(default)]
  pub requested_by:    String,
  /// Unix seconds after which the upload is refused. Zero when the
  /// operation does not accept an upload.
  #[serde(default)]
  pub upload_deadline: i64,
}

impl Operation {
  pub fn pending(operation_id: Uuid, now: i64) -> Self {
    Self {
      operation_id,
      completed: false,
      delete_at: now + OPERATION_TTL_SECS,
      report_id: None,
      requested_by: String::new(),
      upload_deadline: 0,
    }
  }

  /// A pending CSV upload into `report_id`, accepted until `deadline`.
  pub fn csv_upload(csv_id: Uuid, report_id: Uuid, requested_by: String, deadline: i64, now: i64) -> Self {
    Self { report_id: Some(report_id), requested_by, upload_deadline: deadline, ..Self::pending(csv_id, now) }
  }

  /// Whether an upload of `report_id`'s CSV may still be stored under this
  /// operation at `now`.
  pub fn accepts_upload(&self, report_id: Uuid, now: i64) -> bool {
    !self.completed && self.report_id == Some(report_id) && now <= self.upload_deadline
  }

  /// Whether the upload this operation tracks may be indexed into
  /// `report_id`.
  pub fn tracks_upload(&self, report_id: Uuid) -> bool {
    !self.completed && self.report_id == Some(report_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn uploads_are_bound_to_their_report_and_deadline() {
    let (csv, report) = (Uuid::new_v4(), Uuid::new_v4());
    let op = Operation::csv_upload(csv, report, "alice".into(), 1_000, 100);

    assert!(op.accepts_upload(report, 1_000));
    assert!(!op.accepts_upload(report, 1_001));
    assert!(!op.accepts_upload(Uuid::new_v4(), 500));
    assert!(op.tracks_upload(report));

    let done = Operation { completed: true, ..op };
    assert!(!done.accepts_upload(report, 500));
    assert!(!done.tracks_upload(report));
  }

  #[test]
  fn plain_operations_accept_no_upload() {
    let op = Operation::pending(Uuid::new_v4(), 100);
    assert!(!op.tracks_upload(Uuid::new_v4()));
  }
}
