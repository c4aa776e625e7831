//! Error types for `cram-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown question kind: {0:?}")]
  UnknownQuestionKind(String),

  #[error("score must be a number, got NaN")]
  InvalidScore,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
