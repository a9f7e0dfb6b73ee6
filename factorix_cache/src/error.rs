use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("cache lock timed out for key `{0}`")]
  LockTimeoutError(String),

  #[error("cache entry at {0} has no metadata sidecar")]
  MissingMetadata(PathBuf),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
