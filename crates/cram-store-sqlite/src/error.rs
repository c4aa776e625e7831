//! Error type for `cram-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cram_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("topic not found: {0}")]
  TopicNotFound(uuid::Uuid),

  #[error("folder not found: {0}")]
  FolderNotFound(uuid::Uuid),

  #[error("topic {0} is already archived")]
  AlreadyArchived(uuid::Uuid),

  #[error("topic {0} is not archived")]
  NotArchived(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
