//! Error types for the saasy-import codecs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("line {line}: malformed CSV header: {reason}")]
  MalformedHeader { line: usize, reason: String },

  #[error("line {line}: malformed CSV row: {reason}")]
  MalformedRow { line: usize, reason: String },

  #[error("line {line}: invalid date in {column}: {value:?}")]
  InvalidDate {
    line:   usize,
    column: &'static str,
    value:  String,
  },

  #[error("line {line}: invalid decimal in {column}: {value:?}")]
  InvalidDecimal {
    line:   usize,
    column: &'static str,
    value:  String,
  },

  #[error("unknown input format: {0}")]
  UnknownFormat(String),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Core(#[from] saasy_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
