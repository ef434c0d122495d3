//! Error types for `tally-core`.

use thiserror::Error;

use crate::commitment::Status;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid status transition: {from} -> {to}")]
  InvalidTransition { from: Status, to: Status },

  #[error("custom cycle interval must be within [2, 365] days, got {0}")]
  InvalidCycle(u16),

  #[error("commitment title must not be empty")]
  EmptyTitle,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
