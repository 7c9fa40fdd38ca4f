//! Object storage for Scribe: uploaded CSV files and their column indexes.
//!
//! Two [`BlobStore`](scribe_core::blob::BlobStore) backends are provided: a
//! local directory ([`FsBlobStore`]) whose presigned URLs point back at the
//! API server, and Amazon S3 ([`S3BlobStore`]). [`Blobs`] selects between
//! them at runtime.

pub mod error;
mod fs;
pub mod keys;
mod s3;
mod table;

pub use error::{Error, Result};
pub use fs::FsBlobStore;
pub use s3::S3BlobStore;
pub use table::{get_column_values, load_csv, put_column_values};

use std::{path::Path, time::Duration};

use scribe_core::blob::BlobStore;

/// The configured blob backend.
pub enum Blobs {
  Fs(FsBlobStore),
  S3(S3BlobStore),
}

impl BlobStore for Blobs {
  type Error = Error;

  async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
    match self {
      Self::Fs(store) => store.put_object(key, data, content_type).await,
      Self::S3(store) => store.put_object(key, data, content_type).await,
    }
  }

  async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>> {
    match self {
      Self::Fs(store) => store.get_object(key).await,
      Self::S3(store) => store.get_object(key).await,
    }
  }

  async fn download_to(&self, key: &str, dest: &Path) -> Result<bool> {
    match self {
      Self::Fs(store) => store.download_to(key, dest).await,
      Self::S3(store) => store.download_to(key, dest).await,
    }
  }

  async fn presign_upload(&self, key: &str, expires_in: Duration) -> Result<String> {
    match self {
      Self::Fs(store) => store.presign_upload(key, expires_in).await,
      Self::S3(store) => store.presign_upload(key, expires_in).await,
    }
  }
}
