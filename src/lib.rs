// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::manual_range_contains)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PAdES Oxide
//!
//! PAdES-style PDF signing in Rust: PIN-protected RSA keys, byte-range
//! digests, incremental signature updates and verification.
//!
//! ## Core Features
//!
//! ### Keys
//! - **Key Pairs**: RSA-4096 by default, PKCS#8 / SPKI PEM encodings
//! - **Key Container**: private key encrypted with AES-256-CBC under a key
//!   derived from a six-digit PIN, stored as `IV ‖ ciphertext`
//!
//! ### Signing
//! - **Incremental Updates**: the signature dictionary is appended; the
//!   original file is a byte-exact prefix of the signed one
//! - **Byte Ranges**: fixed-width `/ByteRange` and `/Contents` slots,
//!   filled in place without moving any other byte
//! - **Schemes**: RSASSA-PSS (default) or PKCS#1 v1.5 over SHA-256/384/512
//!
//! ### Verification
//! - **Consistency Checks**: the byte range must exactly bracket the
//!   `/Contents` hex string it excludes
//! - **Multiple Signatures**: every revision is verified over its own bytes
//!
//! ## Quick Start
//!
//! ```ignore
//! use pades_oxide::keys::{decrypt_private_key, KeyPair, Pin, encrypt_private_key};
//! use pades_oxide::signatures::{verify, PdfSigner, SignOptions};
//!
//! # fn main() -> pades_oxide::Result<()> {
//! let pin = Pin::parse("123456")?;
//! let pair = KeyPair::generate(4096)?;
//! let container = encrypt_private_key(pair.private_key(), &pin)?.to_bytes();
//!
//! let key = decrypt_private_key(&container, &pin)?;
//! let signer = PdfSigner::new(key, SignOptions::default().with_reason("Approved"))?;
//! let signed = signer.sign(std::fs::read("contract.pdf")?)?;
//!
//! assert!(verify(&signed, pair.public_key())?);
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Minimal PDF syntax
pub mod lexer;
pub mod object;
pub mod parser;
pub mod xref;

// Key protection
pub mod keys;

// Byte-range digests
pub mod digest;

// Signing and verification
pub mod signatures;

// Configuration
pub mod config;

// File-level operations
pub mod api;

// Re-exports
pub use config::SignerConfig;
pub use digest::DigestAlgorithm;
pub use error::{Error, Result};
pub use keys::{KeyPair, Pin};
pub use signatures::{
    verify, PdfSigner, SignOptions, SignatureAlgorithm, SignatureScheme, SignatureSplicer,
    VerificationReport, VerificationStatus,
};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
