//! Error types for the vehicle-rig crate.

use std::fmt;

/// Result type for vehicle-rig operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring the controllers.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Reading a configuration file failed.
    Io {
        /// The path that could not be read.
        path: String,
        /// The error message.
        message: String,
    },
    /// Configuration text was not valid TOML for the expected schema.
    Parse {
        /// The error message.
        message: String,
    },
    /// Configuration could not be written as TOML.
    Serialize {
        /// The error message.
        message: String,
    },
    /// A configuration value is out of range.
    InvalidConfig {
        /// Dotted name of the offending field.
        field: &'static str,
        /// Description of what was invalid.
        detail: String,
    },
    /// The camera offset was zero-length or non-finite.
    DegenerateOffset,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { path, message } => {
                write!(f, "failed to read {path}: {message}")
            }
            Error::Parse { message } => write!(f, "invalid configuration: {message}"),
            Error::Serialize { message } => {
                write!(f, "failed to serialize configuration: {message}")
            }
            Error::InvalidConfig { field, detail } => {
                write!(f, "invalid value for {field}: {detail}")
            }
            Error::DegenerateOffset => {
                write!(f, "camera offset must be finite and non-zero")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Parse {
            message: e.to_string(),
        }
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Serialize {
            message: e.to_string(),
        }
    }
}
