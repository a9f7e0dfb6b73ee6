use thiserror::Error;

/// Errors raised by the command planner itself, as opposed to the crates it
/// orchestrates (§7 "Control" kinds, plus the graph/state errors the load
/// phase can surface).
#[derive(Debug, Error)]
pub enum PlannerError {
  #[error("the user declined to confirm the plan")]
  OperationAborted,

  #[error("refusing to mutate state while the game is running (lock file present at {0})")]
  GameRunning(std::path::PathBuf),

  #[error("unknown mod `{0}`")]
  UnknownMod(String),

  #[error("cannot uninstall `{subject}`: `{dependent}` has a required dependency on it")]
  UninstallBlocked { subject: String, dependent: String },

  #[error("validation failed: {0:?}")]
  ValidationFailed(Vec<factorix_core::graph::validator::ValidationError>),

  #[error(transparent)]
  Core(#[from] factorix_core::error::Error),

  #[error(transparent)]
  Cache(#[from] factorix_cache::CacheError),

  #[error(transparent)]
  Transfer(#[from] factorix_transfer::TransferError),

  #[error(transparent)]
  Portal(#[from] factorix_portal::PortalError),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
