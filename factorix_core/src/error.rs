use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for the parse/format/state concerns owned by `factorix_core`.
///
/// I/O, authorization and control-flow errors (§7) live in the crates that
/// actually perform I/O (`factorix_cache`, `factorix_transfer`,
/// `factorix_portal`, `factorix_planner`); this enum only covers the parts
/// of the taxonomy that can surface while parsing, decoding or validating
/// purely in-memory data.
#[derive(Debug, Error)]
pub enum Error {
  #[error("dependency parse error: {0}")]
  DependencyParseError(String),

  #[error("version parse error: {0}")]
  VersionParseError(String),

  #[error("file format error: {0}")]
  FileFormatError(String),

  #[error("unknown property type tag: {0}")]
  UnknownPropertyType(u8),

  #[error("encoding error: {0}")]
  EncodingError(String),

  #[error("graph error: {0}")]
  GraphError(String),

  #[error("cycle error: dependency graph contains a cycle among {0:?}")]
  CycleError(Vec<String>),

  #[error("invalid settings section: {0}")]
  InvalidSectionError(String),

  #[error("extra data after property tree in {path}: {extra_bytes} byte(s) left over")]
  ExtraDataError { path: PathBuf, extra_bytes: usize },

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, Error>;
