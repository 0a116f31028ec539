//! PDF digital signatures.
//!
//! Signing appends an incremental update holding one signature dictionary.
//! Its `/Contents` hex string is a fixed-size slot, and `/ByteRange` names
//! every byte of the file except that slot. The RSA signature is computed
//! over the byte-range digest and spliced into the slot without moving any
//! other byte.
//!
//! ## Signature formats
//!
//! The `/SubFilter` name records the scheme and digest:
//!
//! - `pades.rsassa_pss.sha256` (default), `.sha384`, `.sha512`
//! - `pades.rsassa_pkcs1v15.sha256`, `.sha384`, `.sha512`
//!
//! ## Example
//!
//! ```ignore
//! use pades_oxide::signatures::{verify, PdfSigner, SignOptions};
//!
//! let signer = PdfSigner::new(private_key, SignOptions::default().with_reason("Approved"))?;
//! let signed = signer.sign(std::fs::read("document.pdf")?)?;
//! assert!(verify(&signed, &public_key)?);
//! ```
//!
//! ## PDF Specification Reference
//!
//! - ISO 32000-1:2008 Section 7.5.6 - Incremental Updates
//! - ISO 32000-1:2008 Section 12.8 - Digital Signatures

mod byterange;
mod contents;
mod signer;
mod splicer;
mod types;
mod verifier;

pub use byterange::{ByteRange, ByteRangeCalculator, BYTE_RANGE_PLACEHOLDER};
pub use contents::{decode_contents, encode_contents};
pub use signer::{sign_digest, PdfSigner};
pub use splicer::{PlaceholderSlot, SignatureSplicer, SplicerState};
pub use types::{
    ExtractedSignature, SignOptions, Signature, SignatureAlgorithm, SignatureInfo,
    SignatureScheme, SignerReference, VerificationReport, VerificationStatus, DEFAULT_SLOT_SIZE,
    MAX_SLOT_SIZE,
};
pub use verifier::{
    extract_all_signatures, extract_byte_range_and_signature, extract_signature_info, verify,
    verify_all, verify_detailed, verify_digest, SignatureVerifier,
};
