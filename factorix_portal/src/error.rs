use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
  #[error("invalid api key")]
  InvalidApiKey,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("unknown mod: {0}")]
  UnknownMod(String),

  #[error("mod already exists: {0}")]
  ModAlreadyExists(String),

  #[error("edit_mod requires at least one metadata field")]
  EmptyMetadata,

  #[error(transparent)]
  Transfer(#[from] factorix_transfer::TransferError),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PortalError>;
