//! Server configuration.
//!
//! Values come from an optional TOML file, then `SCRIBE_*` environment
//! variables, then the deployment variables `REPORT_TABLE`, `TEMPLATE_TABLE`,
//! `OPERATION_TABLE`, `USER_POOL_ID`, `S3_BUCKET`, `OPENAI_API_KEY`,
//! `AWS_REGION` and `HOOK_SECRET`, which win over everything else.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Which [`BlobStore`](scribe_core::blob::BlobStore) backend to run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
  #[default]
  Fs,
  S3,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  /// Public root of this server; filesystem upload URLs are built from it.
  pub base_url:        String,
  pub store_path:      PathBuf,
  pub report_table:    String,
  pub template_table:  String,
  pub operation_table: String,
  pub blob_backend:    BlobBackend,
  pub blob_dir:        PathBuf,
  pub s3_bucket:       String,
  pub aws_region:      String,
  pub openai_api_key:  String,
  pub openai_model:    String,
  pub openai_base_url: String,
  /// When set, signup hook events from any other pool are refused.
  pub user_pool_id:    String,
  /// Shared secret the object-store and user-pool hooks must present in
  /// `x-hook-secret`. Hooks are refused while it is empty.
  pub hook_secret:     String,
  pub retention_days:  u32,
  pub report_types:    Vec<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:            "127.0.0.1".into(),
      port:            8080,
      base_url:        "http://localhost:8080".into(),
      store_path:      PathBuf::from("scribe.db"),
      report_table:    "reports".into(),
      template_table:  "templates".into(),
      operation_table: "operations".into(),
      blob_backend:    BlobBackend::Fs,
      blob_dir:        PathBuf::from("blobs"),
      s3_bucket:       String::new(),
      aws_region:      "us-east-2".into(),
      openai_api_key:  String::new(),
      openai_model:    "gpt-3.5-turbo".into(),
      openai_base_url: "https://api.openai.com/v1".into(),
      user_pool_id:    String::new(),
      hook_secret:     String::new(),
      retention_days:  30,
      report_types:    vec![
        "Fire Station Analysis".into(),
        "EMS Response".into(),
        "Community Risk Assessment".into(),
      ],
    }
  }
}

/// Deployment variables read without a prefix, with the key they set.
const DEPLOYMENT_VARS: [(&str, &str); 8] = [
  ("REPORT_TABLE", "report_table"),
  ("TEMPLATE_TABLE", "template_table"),
  ("OPERATION_TABLE", "operation_table"),
  ("USER_POOL_ID", "user_pool_id"),
  ("S3_BUCKET", "s3_bucket"),
  ("OPENAI_API_KEY", "openai_api_key"),
  ("AWS_REGION", "aws_region"),
  ("HOOK_SECRET", "hook_secret"),
];

impl ServerConfig {
  /// Load configuration from `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    let mut builder = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("SCRIBE"));
    for (var, key) in DEPLOYMENT_VARS {
      builder = builder.set_override_option(key, std::env::var(var).ok())?;
    }
    let mut cfg: ServerConfig = builder.build()?.try_deserialize()?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.blob_dir = expand_tilde(&cfg.blob_dir);
    Ok(cfg)
  }

  pub fn tables(&self) -> scribe_store_sqlite::Tables {
    scribe_store_sqlite::Tables {
      report:    self.report_table.clone(),
      template:  self.template_table.clone(),
      operation: self.operation_table.clone(),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn defaults_apply_when_file_is_missing() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/scribe.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.retention_days, 30);
    assert_eq!(cfg.report_types.len(), 3);
    assert!(cfg.hook_secret.is_empty());
  }

  #[test]
  fn file_values_override_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "port = 9090\nblob_backend = \"s3\"\nreport_types = [\"Audit\"]").unwrap();

    let cfg = ServerConfig::load(file.path()).unwrap();
    assert_eq!(cfg.port, 9090);
    assert_eq!(cfg.blob_backend, BlobBackend::S3);
    assert_eq!(cfg.report_types, ["Audit"]);
    assert_eq!(cfg.host, "127.0.0.1");
  }

  #[test]
  fn tilde_expands_to_home() {
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    }
    assert_eq!(expand_tilde(Path::new("rel/x.db")), PathBuf::from("rel/x.db"));
  }
}
