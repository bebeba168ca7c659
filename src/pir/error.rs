//! Error handling for the PIR engine
//!
//! Every recoverable failure of query construction, answering, decoding or
//! (de)serialization is a [`PirError`]. Violations of the server's own
//! bookkeeping are not errors: they indicate a bug and abort.

use thiserror::Error;

/// PIR operation error
#[derive(Debug, Error)]
pub enum PirError {
    /// Parameters are unusable (not NTT friendly, rows do not fit, ...)
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Serialized material was produced under different parameters
    #[error("parameter mismatch: expected fingerprint {expected:#018x}, found {found:#018x}")]
    ParameterMismatch { expected: u64, found: u64 },

    /// Truncated or otherwise malformed serialized input
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Query target is not below the believed row count
    #[error("index {index} is out of range for {row_count} rows")]
    IndexOutOfRange { index: usize, row_count: usize },

    /// Write to a row that was never allocated
    #[error("index {index} was never allocated ({row_count} rows allocated)")]
    IndexNotAllocated { index: usize, row_count: usize },

    /// Query covers more chunks than the database holds
    #[error("query carries {query_chunks} ciphertexts but the database has {db_chunks} chunks")]
    QueryTooLarge { query_chunks: usize, db_chunks: usize },

    /// Rotation requested without the matching key-switching key
    #[error("no Galois key for element {0}")]
    MissingGaloisKey(usize),

    /// Answer did not decrypt to a well-formed row
    #[error("answer for index {0} does not decrypt to a row under this client's key")]
    Undecodable(usize),
}

impl From<bincode::Error> for PirError {
    fn from(err: bincode::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Result type for PIR operations
pub type Result<T> = std::result::Result<T, PirError>;

/// Create a `PirError::Malformed` with format string support
macro_rules! malformed {
    ($($arg:tt)*) => {
        $crate::pir::error::PirError::Malformed(format!($($arg)*))
    };
}

pub(crate) use malformed;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bincode_errors_are_malformed() {
        let err: bincode::Error = bincode::deserialize::<u64>(&[1, 2]).unwrap_err();
        assert!(matches!(PirError::from(err), PirError::Malformed(_)));
    }

    #[test]
    fn test_display() {
        let err = PirError::QueryTooLarge {
            query_chunks: 3,
            db_chunks: 2,
        };
        assert_eq!(
            err.to_string(),
            "query carries 3 ciphertexts but the database has 2 chunks"
        );
        assert_eq!(malformed!("bad {}", 7).to_string(), "malformed input: bad 7");
    }
}
