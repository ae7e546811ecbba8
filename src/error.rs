//! Error type shared by every binops module.

use std::io;
use thiserror::Error;

/// Errors that can occur while parsing specifications or reading records.
#[derive(Error, Debug)]
pub enum BinopsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Not a range {0:?}")]
    NotARange(String),

    #[error("{0:?} is not increasing")]
    NotIncreasing(String),

    #[error("{0:?} is not positive")]
    NotPositive(String),

    #[error("Not a number {0:?}")]
    NotANumber(String),

    #[error("Invalid directive {0:?}")]
    InvalidDirective(String),

    #[error("Invalid pattern {token:?}: {message}")]
    InvalidPattern { token: String, message: String },

    #[error("Invalid filter {token:?}: {message}")]
    InvalidFilter { token: String, message: String },

    #[error("Invalid variable length {token:?}: {message}")]
    InvalidVlen { token: String, message: String },

    #[error("Invalid format {token:?}: {message}")]
    InvalidFormat { token: String, message: String },

    #[error("Invalid record width {0}")]
    InvalidWidth(u64),

    #[error("Value {value} does not fit directive {directive:?}")]
    Encode { value: i128, directive: String },

    #[error("Cannot seek to offset {offset}, earlier than start of pipe buffer at {watermark}")]
    BelowWatermark { offset: u64, watermark: u64 },

    #[error("Negative index {index} needs a record of known length")]
    UnresolvedNegative { index: i64 },

    #[error("Record at offset {offset} has non-positive length {length}")]
    RecordLength { offset: u64, length: i128 },
}

pub type Result<T> = std::result::Result<T, BinopsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_token() {
        let e = BinopsError::NotARange("1...2".to_string());
        assert_eq!(e.to_string(), "Not a range \"1...2\"");

        let e = BinopsError::NotPositive("-1..0".to_string());
        assert_eq!(e.to_string(), "\"-1..0\" is not positive");

        let e = BinopsError::BelowWatermark {
            offset: 3,
            watermark: 4,
        };
        assert!(e.to_string().contains("offset 3"));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "short");
        let e: BinopsError = io_err.into();
        assert!(matches!(e, BinopsError::Io(_)));
    }
}
