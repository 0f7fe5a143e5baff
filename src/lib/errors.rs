//! Custom error types for gataca operations.

use thiserror::Error;

/// Result type alias for gataca operations
pub type Result<T> = std::result::Result<T, GatacaError>;

/// Error type for gataca operations
#[derive(Error, Debug)]
pub enum GatacaError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "BAM", "FASTA")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Required reference sequence not found
    #[error("Reference sequence '{ref_name}' not found in header")]
    ReferenceNotFound {
        /// The reference sequence name
        ref_name: String,
    },

    /// Region string could not be parsed
    #[error("Invalid region '{region}': {reason}")]
    InvalidRegion {
        /// The region as given on the command line
        region: String,
        /// Explanation of the problem
        reason: String,
    },

    /// External realigner failure
    #[error("Realignment of '{read_name}' failed: {reason}")]
    Realignment {
        /// Name of the read whose fragments were being realigned
        read_name: String,
        /// Explanation of the failure
        reason: String,
    },
}
