use std::{error::Error, fmt::Display};

/// Errors raised by intern table construction and operations.
#[derive(Debug, PartialEq, Eq)]
pub enum TableError {
  InvalidCapacity,
  InvalidMaxCount,
  InvalidMaxLength,
  ConcurrentModification,
}

impl Display for TableError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match *self {
      TableError::InvalidCapacity => write!(f, "Capacity is out of range."),
      TableError::InvalidMaxCount => write!(f, "Max count must be at least one."),
      TableError::InvalidMaxLength => write!(f, "Max length is out of range."),
      TableError::ConcurrentModification => {
        write!(f, "Bucket chain exceeded table capacity, the table was mutated concurrently.")
      }
    }
  }
}

impl Error for TableError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    None
  }
}

pub type TableResult<T> = Result<T, TableError>;

/// Errors raised while decoding byte slices into code units.
#[derive(Debug, PartialEq, Eq)]
pub enum EncodingError {
  /// A byte above 0x7f at the given position in input declared 7-bit.
  NonAscii(usize),
  InvalidUtf8,
  InvalidUtf16,
  OddUtf16Length,
  UnknownLabel,
}

impl Display for EncodingError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match *self {
      EncodingError::NonAscii(position) => {
        write!(f, "Byte at position {position} is outside the 7-bit range.")
      }
      EncodingError::InvalidUtf8 => write!(f, "Input is not valid UTF-8."),
      EncodingError::InvalidUtf16 => write!(f, "Input contains an unpaired UTF-16 surrogate."),
      EncodingError::OddUtf16Length => write!(f, "UTF-16 input has an odd byte length."),
      EncodingError::UnknownLabel => write!(f, "Unknown encoding label."),
    }
  }
}

impl Error for EncodingError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    None
  }
}

pub type EncodingResult<T> = Result<T, EncodingError>;
