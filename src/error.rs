//! Error handling for the daqlink crate
//!
//! This module defines the error taxonomy for the acquisition core and a
//! Result alias used throughout the crate.
//!
//! Malformed protocol lines are deliberately NOT part of this taxonomy:
//! they are line noise, silently dropped by the dispatcher. Everything a
//! caller can observe and react to lives here.

use thiserror::Error;

/// Main error type for daqlink operations
#[derive(Error, Debug)]
pub enum DaqError {
    /// The underlying transport could not be opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// An outbound write failed or was attempted on a link that is not open
    #[error("Write error: {0}")]
    Write(String),

    /// The link dropped unexpectedly while reading
    #[error("Link lost: {0}")]
    LinkLost(String),

    /// Sensor-conversion math is undefined for the given input
    #[error("Domain error: {0}")]
    Domain(String),

    /// A replay file is malformed
    #[error("Format error: {0}")]
    Format(String),

    /// A recorded session could not be written to disk
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A channel number or channel mode is out of range
    #[error("Channel error: {0}")]
    Channel(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for daqlink operations
pub type Result<T> = std::result::Result<T, DaqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DaqError::Domain("log undefined for r <= 0".to_string());
        assert_eq!(err.to_string(), "Domain error: log undefined for r <= 0");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
        let err: DaqError = io.into();
        assert!(matches!(err, DaqError::Io(_)));
        assert!(err.to_string().contains("read timed out"));
    }
}
