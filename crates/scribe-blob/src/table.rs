//! Loading uploaded CSVs and reading/writing their column indexes.

use std::io::BufReader;

use scribe_core::blob::BlobStore;
use scribe_csv::{ColumnValues, CsvTable};

use crate::{Error, Result};

fn backend<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
  Error::Backend(Box::new(err))
}

/// Download the object at `key` into a temporary file and parse it.
///
/// The temporary file is removed when parsing finishes, fails or panics.
pub async fn load_csv<B: BlobStore>(blob: &B, key: &str) -> Result<CsvTable> {
  let tmp = tempfile::NamedTempFile::new()?;
  if !blob.download_to(key, tmp.path()).await.map_err(backend)? {
    return Err(Error::NotFound(key.to_owned()));
  }

  tokio::task::spawn_blocking(move || -> Result<CsvTable> {
    let file = tmp.reopen()?;
    Ok(CsvTable::from_reader(BufReader::new(file))?)
  })
  .await
  .map_err(|e| Error::Task(e.to_string()))?
}

pub async fn put_column_values<B: BlobStore>(
  blob: &B,
  key: &str,
  values: &ColumnValues,
) -> Result<()> {
  let body = serde_json::to_vec(values)?;
  blob.put_object(key, body, "application/json").await.map_err(backend)
}

pub async fn get_column_values<B: BlobStore>(blob: &B, key: &str) -> Result<ColumnValues> {
  let body = blob.get_object(key).await.map_err(backend)?;
  let body = body.ok_or_else(|| Error::NotFound(key.to_owned()))?;
  Ok(serde_json::from_slice(&body)?)
}
