//! Error type for `tally-store-sqlite`.

use tally_core::store::{ErrorKind, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tally_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("column decode error: {0}")]
  Decode(String),

  #[error("commitment not found: {0}")]
  CommitmentNotFound(uuid::Uuid),

  #[error("category not found: {0}")]
  CategoryNotFound(uuid::Uuid),

  #[error("category {0} is a system category and cannot be deleted")]
  SystemCategory(uuid::Uuid),
}

impl StoreError for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::CommitmentNotFound(_) | Self::CategoryNotFound(_) => {
        ErrorKind::NotFound
      }
      Self::SystemCategory(_) => ErrorKind::Rejected,
      Self::Core(tally_core::Error::InvalidTransition { .. }) => {
        ErrorKind::Rejected
      }
      Self::Core(
        tally_core::Error::InvalidCycle(_) | tally_core::Error::EmptyTitle,
      ) => ErrorKind::Invalid,
      _ => ErrorKind::Backend,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

