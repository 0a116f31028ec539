//! Error types for the signing library.
//!
//! This module defines all error types that can occur while protecting keys,
//! preparing signature placeholders, and verifying signed PDFs.
//!
//! A signature that simply does not match is *not* an error: verification
//! reports it as `Ok(false)`. The variants below are reserved for conditions
//! that make the requested operation impossible to carry out.

use crate::signatures::SplicerState;

/// Result type alias for signing library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during key handling, signing and verification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The private key container could not be decrypted (wrong PIN or corrupted data)
    #[error("Private key decryption failed: {0}")]
    KeyDecryption(String),

    /// The reserved signature slot cannot hold the encoded signature
    #[error("Signature slot too small: need {required} hex digits, {available} reserved")]
    SlotTooSmall {
        /// Hex digits needed for the encoded signature
        required: usize,
        /// Hex digits available in the placeholder
        available: usize,
    },

    /// The signed PDF is structurally inconsistent and cannot be verified
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// PIN does not have the expected shape
    #[error("Invalid PIN: {0}")]
    InvalidPin(String),

    /// Input is not a usable PDF
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// PDF syntax could not be parsed
    #[error("Parse error at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where the error occurred
        offset: usize,
        /// Description of the parse error
        reason: String,
    },

    /// A splicer operation was called out of order
    #[error("Invalid splicer state: expected {expected:?}, found {found:?}")]
    InvalidState {
        /// State the operation requires
        expected: SplicerState,
        /// State the splicer was in
        found: SplicerState,
    },

    /// An excluded range does not fit inside the document
    #[error("Invalid byte range {start}..{end} for document of {len} bytes")]
    InvalidRange {
        /// Range start
        start: usize,
        /// Range end (exclusive)
        end: usize,
        /// Document length
        len: usize,
    },

    /// Key encoding, parsing or generation failure
    #[error("Key error: {0}")]
    Key(String),

    /// Cryptographic operation failure (signing)
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether asking the user for the PIN again can resolve the error.
    pub fn is_pin_retryable(&self) -> bool {
        matches!(self, Error::KeyDecryption(_) | Error::InvalidPin(_))
    }
}
