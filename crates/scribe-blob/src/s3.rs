//! Amazon S3 blob backend.

use std::{path::Path, time::Duration};

use aws_config::BehaviorVersion;
use aws_sdk_s3::{
  Client,
  config::Region,
  error::{DisplayErrorContext, SdkError},
  operation::get_object::GetObjectError,
  presigning::PresigningConfig,
  primitives::ByteStream,
};
use scribe_core::blob::BlobStore;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::{Error, Result};

fn s3_error<E: std::error::Error>(err: E) -> Error { Error::S3(DisplayErrorContext(err).to_string()) }

fn is_no_such_key<R>(err: &SdkError<GetObjectError, R>) -> bool {
  err.as_service_error().is_some_and(GetObjectError::is_no_such_key)
}

/// Objects in one bucket, using the default AWS credential chain.
///
/// The client is built on first use. Initialisation failures are returned to
/// the caller and retried on the next request.
pub struct S3BlobStore {
  bucket: String,
  region: String,
  client: OnceCell<Client>,
}

impl S3BlobStore {
  pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
    Self { bucket: bucket.into(), region: region.into(), client: OnceCell::new() }
  }

  async fn client(&self) -> Result<&Client> {
    self
      .client
      .get_or_try_init(|| async {
        if self.bucket.is_empty() {
          return Err(Error::Config("S3 bucket name is empty".into()));
        }
        let config = aws_config::defaults(BehaviorVersion::latest())
          .region(Region::new(self.region.clone()))
          .load()
          .await;
        info!(bucket = %self.bucket, region = %self.region, "S3 client initialised");
        Ok(Client::new(&config))
      })
      .await
  }

  async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let response =
      match self.client().await?.get_object().bucket(&self.bucket).key(key).send().await {
        Ok(response) => response,
        Err(e) if is_no_such_key(&e) => return Ok(None),
        Err(e) => return Err(s3_error(e)),
      };
    let data = response.body.collect().await.map_err(s3_error)?.into_bytes().to_vec();
    debug!(bytes = data.len(), bucket = %self.bucket, key, "downloaded object");
    Ok(Some(data))
  }
}

impl BlobStore for S3BlobStore {
  type Error = Error;

  #[instrument(skip(self, data), fields(bytes = data.len()))]
  async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
    self
      .client()
      .await?
      .put_object()
      .bucket(&self.bucket)
      .key(key)
      .content_type(content_type)
      .body(ByteStream::from(data))
      .send()
      .await
      .map_err(s3_error)?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>> { self.fetch(key).await }

  #[instrument(skip(self))]
  async fn download_to(&self, key: &str, dest: &Path) -> Result<bool> {
    match self.fetch(key).await? {
      Some(data) => {
        tokio::fs::write(dest, data).await?;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  #[instrument(skip(self))]
  async fn presign_upload(&self, key: &str, expires_in: Duration) -> Result<String> {
    let config = PresigningConfig::expires_in(expires_in).map_err(s3_error)?;
    let request = self
      .client()
      .await?
      .put_object()
      .bucket(&self.bucket)
      .key(key)
      .content_type("text/csv")
      .presigned(config)
      .await
      .map_err(s3_error)?;
    Ok(request.uri().to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn empty_bucket_fails_every_time() {
    let store = S3BlobStore::new("", "us-east-2");
    assert!(matches!(store.get_object("k").await, Err(Error::Config(_))));
    assert!(matches!(store.get_object("k").await, Err(Error::Config(_))));
    assert!(store.client.get().is_none());
  }
}
