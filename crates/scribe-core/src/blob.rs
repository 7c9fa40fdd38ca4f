//! Object storage for uploaded CSV files and their derived column indexes.

use std::{future::Future, path::Path, time::Duration};

pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn put_object<'a>(
    &'a self,
    key: &'a str,
    data: Vec<u8>,
    content_type: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// `None` if no object exists under `key`.
  fn get_object<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + 'a;

  /// Stream an object into a local file. Returns `false` if it does not exist.
  fn download_to<'a>(
    &'a self,
    key: &'a str,
    dest: &'a Path,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// A URL the client may `PUT` the object body to until `expires_in` elapses.
  fn presign_upload<'a>(
    &'a self,
    key: &'a str,
    expires_in: Duration,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
