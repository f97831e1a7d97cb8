//! Error types for the consensus clustering crate

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building tables, clustering, or scoring
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input parameters
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Error message
        message: String,
    },

    /// Empty or malformed input data
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Error message
        message: String,
    },

    /// A cluster assignment is too degenerate to score
    #[error("Insufficient cluster separation: {message}")]
    InsufficientClusterSeparation {
        /// Error message
        message: String,
    },

    /// Too few areas have complete benchmark data to compare against
    #[error("Missing benchmark data: {message}")]
    MissingBenchmarkData {
        /// Error message
        message: String,
    },

    /// Numeric computation failure inside an algorithm
    #[error("Computation error: {message}")]
    Computation {
        /// Error message
        message: String,
    },

    /// I/O failure reading or writing clustering outputs
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure on a persisted clustering output
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new InvalidParameter error
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a new InvalidData error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new InsufficientClusterSeparation error
    pub fn insufficient_separation(message: impl Into<String>) -> Self {
        Self::InsufficientClusterSeparation {
            message: message.into(),
        }
    }

    /// Create a new MissingBenchmarkData error
    pub fn missing_benchmark(message: impl Into<String>) -> Self {
        Self::MissingBenchmarkData {
            message: message.into(),
        }
    }

    /// Create a new Computation error
    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation {
            message: message.into(),
        }
    }
}
