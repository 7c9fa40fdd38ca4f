//! The text-generation seam used for `Generator` text outputs.

use std::future::Future;

pub trait TextGenerator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Complete a single user-role prompt and return the reply text.
  fn complete(&self, prompt: String)
  -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}
