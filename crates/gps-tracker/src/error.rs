//! GPS Error Types

use thiserror::Error;

/// Errors that can occur while talking to a GPS receiver
#[derive(Debug, Error)]
pub enum GpsError {
    /// Serial port connection error
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Malformed NMEA sentence
    #[error("Invalid NMEA sentence: {0}")]
    Parse(String),

    /// Checksum mismatch
    #[error("NMEA checksum mismatch: expected {expected:02X}, got {actual:02X}")]
    Checksum { expected: u8, actual: u8 },
}

impl From<std::io::Error> for GpsError {
    fn from(err: std::io::Error) -> Self {
        GpsError::Serial(err.to_string())
    }
}

impl From<tokio_serial::Error> for GpsError {
    fn from(err: tokio_serial::Error) -> Self {
        GpsError::Serial(err.to_string())
    }
}
