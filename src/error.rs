//! Error types and result handling for mqtt-replay.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! Errors are classified so that the process exit status reflects the
//! failure category: see [`Error::exit_code`].
//!
//! # Example
//!
//! ```rust
//! use mqtt_replay::{Error, Result};
//!
//! fn open_source() -> Result<()> {
//!     Err(Error::Config("CSV file not found: data.csv".to_string()))
//! }
//!
//! match open_source() {
//!     Ok(()) => println!("Opened"),
//!     Err(Error::Config(msg)) => eprintln!("Configuration error: {}", msg),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for mqtt-replay operations.
///
/// This enum represents all possible errors that can occur during a replay
/// run, from configuration issues to runtime failures. User interruption is
/// deliberately not an error; an interrupted run still produces an `Ok`
/// summary.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error: unreadable CSV source, invalid flag
    /// combination, or a bad config file. No connection is attempted and
    /// no rows are published when this occurs.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Nothing is listening at the configured broker address. Fatal before
    /// any row is read or published.
    #[error("Connection refused by {addr}: make sure the broker is running and accessible")]
    ConnectionRefused {
        /// The `host:port` the connection was attempted against
        addr: String,
    },

    /// Generic connection error not covered by specific types, such as a
    /// connect timeout or a dropped transport during the handshake.
    #[error("Connection error: {0}")]
    Connection(String),

    /// MQTT client error while submitting a publish or disconnect request.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// CSV parse or read error while streaming rows.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error when encoding row payloads.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error from the source file or the network layer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

impl Error {
    /// Process exit status for this failure category.
    ///
    /// `0` is reserved for success (including user interruption), so every
    /// variant maps to a non-zero code: configuration problems exit with
    /// `2`, a refused broker connection with `3`, and anything that failed
    /// mid-stream with `4`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::ConnectionRefused { .. } => 3,
            Error::Connection(_)
            | Error::Mqtt(_)
            | Error::Csv(_)
            | Error::Serialization(_)
            | Error::Io(_) => 4,
        }
    }
}

/// A convenient Result type alias for mqtt-replay operations.
///
/// This is equivalent to `std::result::Result<T, mqtt_replay::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::Config("bad".into()).exit_code(), 2);
        assert_eq!(
            Error::ConnectionRefused {
                addr: "localhost:1883".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(Error::Connection("lost".into()).exit_code(), 4);
        let io = Error::Io(std::io::Error::other("boom"));
        assert_eq!(io.exit_code(), 4);
    }

    #[test]
    fn test_connection_refused_message_has_guidance() {
        let e = Error::ConnectionRefused {
            addr: "10.0.0.5:1883".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("10.0.0.5:1883"));
        assert!(msg.contains("broker is running"));
    }

    #[test]
    fn test_config_error_conversion() {
        let e = Error::from(config::ConfigError::NotFound("broker.host".into()));
        assert!(matches!(e, Error::Config(_)));
        assert_eq!(e.exit_code(), 2);
    }
}
