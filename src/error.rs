//! Error types for lsmdb.

use std::io;
use thiserror::Error;

/// Result type alias for lsmdb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store operations.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// I/O error from file or socket operations.
    #[error("I/O error: {0}")]
    Io(String),

    /// Data corruption detected in an on-disk file.
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// Malformed command or argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create a corruption error with the given message.
    pub fn corruption<S: Into<String>>(msg: S) -> Self {
        Error::Corruption(msg.into())
    }

    /// Create an invalid-argument error with the given message.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Check if this error indicates corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::corruption("bad data");
        assert_eq!(format!("{}", err), "Corruption detected: bad data");

        let err = Error::invalid_argument("r requires 2 arguments");
        assert_eq!(
            format!("{}", err),
            "Invalid argument: r requires 2 arguments"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_corruption() {
        assert!(Error::corruption("bad").is_corruption());
        assert!(!Error::invalid_argument("bad").is_corruption());
    }
}
