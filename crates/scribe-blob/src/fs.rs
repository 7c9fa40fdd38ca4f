//! Local-directory blob backend.
//!
//! Presigned upload URLs point at the API server's `PUT /blobs/{key}` route,
//! which writes the body back through this store.

use std::{
  io::ErrorKind,
  path::{Component, Path, PathBuf},
  time::Duration,
};

use scribe_core::blob::BlobStore;
use tracing::{debug, instrument};

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct FsBlobStore {
  root:       PathBuf,
  public_url: String,
}

impl FsBlobStore {
  /// Store objects under `root`; presigned URLs are rooted at `public_url`.
  pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
    Self { root: root.into(), public_url: public_url.into() }
  }

  /// Map a key to a path under the root, refusing anything that could
  /// escape it.
  fn path_for(&self, key: &str) -> Result<PathBuf> {
    let relative = Path::new(key);
    let safe = !key.is_empty()
      && !key.contains('\\')
      && relative.components().all(|c| matches!(c, Component::Normal(_)));
    if safe { Ok(self.root.join(relative)) } else { Err(Error::InvalidKey(key.to_owned())) }
  }
}

impl BlobStore for FsBlobStore {
  type Error = Error;

  #[instrument(skip(self, data, _content_type), fields(bytes = data.len()))]
  async fn put_object(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<()> {
    let path = self.path_for(key)?;
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, data).await?;
    debug!(path = %path.display(), "stored object");
    Ok(())
  }

  async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let path = self.path_for(key)?;
    match tokio::fs::read(&path).await {
      Ok(data) => Ok(Some(data)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn download_to(&self, key: &str, dest: &Path) -> Result<bool> {
    let path = self.path_for(key)?;
    match tokio::fs::copy(&path, dest).await {
      Ok(_) => Ok(true),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
      Err(e) => Err(e.into()),
    }
  }

  /// The `expires` parameter only tells the client when the URL lapses; the
  /// receiving route enforces the window recorded with the upload.
  async fn presign_upload(&self, key: &str, expires_in: Duration) -> Result<String> {
    self.path_for(key)?;
    let expires = chrono::Utc::now().timestamp() + expires_in.as_secs() as i64;
    Ok(format!("{}/blobs/{key}?expires={expires}", self.public_url.trim_end_matches('/')))
  }
}
