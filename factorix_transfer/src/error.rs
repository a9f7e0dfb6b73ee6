use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
  #[error("http client error: {status} {body}")]
  HTTPClientError { status: u16, body: String },

  #[error("http server error: {0}")]
  HTTPServerError(u16),

  #[error("invalid url: {0}")]
  URLError(String),

  #[error("too many redirects for {0}")]
  TooManyRedirectsError(String),

  #[error("network timeout: {0}")]
  NetworkTimeoutError(String),

  #[error("digest mismatch: expected {expected}, got {actual}")]
  DigestMismatchError { expected: String, actual: String },

  #[error("lock timeout for key `{0}`")]
  LockTimeoutError(String),

  #[error("configuration error: {0}")]
  ConfigurationError(String),

  #[error(transparent)]
  Cache(#[from] factorix_cache::CacheError),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, TransferError>;
