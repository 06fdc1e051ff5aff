use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  /// Non-positive node count or learning rate, or weights that don't chain.
  #[error("invalid configuration: {0}")]
  InvalidConfiguration(String),

  /// An input matrix disagrees with the configured network shape.
  #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
  DimensionMismatch {
    context: &'static str,
    expected: usize,
    found: usize,
  },

  /// The rides table is missing a column, holds a non-numeric value or is too short.
  #[error("dataset: {0}")]
  Dataset(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Csv(#[from] csv::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn mismatch(context: &'static str, expected: usize, found: usize) -> Self {
    Error::DimensionMismatch {
      context,
      expected,
      found,
    }
  }
}
