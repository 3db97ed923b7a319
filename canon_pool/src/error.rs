use std::{error::Error, fmt::Display};

use canon_core::{EncodingError, TableError};

/// Errors surfaced by the shared pool: a table contract violation or a
/// transcoding failure, passed through unchanged.
#[derive(Debug, PartialEq, Eq)]
pub enum PoolError {
  Table(TableError),
  Encoding(EncodingError),
}

impl Display for PoolError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PoolError::Table(error) => write!(f, "{error}"),
      PoolError::Encoding(error) => write!(f, "{error}"),
    }
  }
}

impl Error for PoolError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      PoolError::Table(error) => Some(error),
      PoolError::Encoding(error) => Some(error),
    }
  }
}

impl From<TableError> for PoolError {
  fn from(error: TableError) -> PoolError {
    PoolError::Table(error)
  }
}

impl From<EncodingError> for PoolError {
  fn from(error: EncodingError) -> PoolError {
    PoolError::Encoding(error)
  }
}

pub type PoolResult<T> = Result<T, PoolError>;
