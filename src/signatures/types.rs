//! Digital signature types and data structures.
//!
//! This module defines the core types shared by the splicer, the signer and
//! the verifier.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::byterange::ByteRange;
use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};

/// Default size of the signature slot in bytes (before hex encoding).
///
/// An RSA-4096 signature is 512 bytes; the DER envelope adds four.
pub const DEFAULT_SLOT_SIZE: usize = 1024;

/// Largest slot the two-byte DER length of the envelope can describe.
pub const MAX_SLOT_SIZE: usize = 0xFFFF + 4;

/// RSA signature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SignatureScheme {
    /// RSASSA-PSS with MGF1 over the same digest and a salt as long as the digest
    #[default]
    RsaPss,
    /// RSASSA-PKCS1-v1_5
    RsaPkcs1v15,
}

impl SignatureScheme {
    /// Get the name of this scheme.
    pub fn name(&self) -> &'static str {
        match self {
            SignatureScheme::RsaPss => "RSASSA-PSS",
            SignatureScheme::RsaPkcs1v15 => "RSASSA-PKCS1-v1_5",
        }
    }

    fn token(&self) -> &'static str {
        match self {
            SignatureScheme::RsaPss => "rsassa_pss",
            SignatureScheme::RsaPkcs1v15 => "rsassa_pkcs1v15",
        }
    }
}

/// Signature scheme plus the digest it is computed over.
///
/// Written into the signature dictionary as the `/SubFilter` name, for
/// example `/pades.rsassa_pss.sha256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SignatureAlgorithm {
    /// RSA padding scheme
    pub scheme: SignatureScheme,
    /// Byte-range digest
    pub digest: DigestAlgorithm,
}

impl SignatureAlgorithm {
    /// Create an algorithm from its parts.
    pub fn new(scheme: SignatureScheme, digest: DigestAlgorithm) -> Self {
        Self { scheme, digest }
    }

    /// Get the PDF name for this algorithm.
    pub fn as_pdf_name(&self) -> String {
        let digest = match self.digest {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        };
        format!("pades.{}.{}", self.scheme.token(), digest)
    }

    /// Parse a PDF name written by [`SignatureAlgorithm::as_pdf_name`].
    pub fn from_pdf_name(name: &str) -> Option<Self> {
        let mut parts = name.split('.');
        if parts.next()? != "pades" {
            return None;
        }
        let scheme = match parts.next()? {
            "rsassa_pss" => SignatureScheme::RsaPss,
            "rsassa_pkcs1v15" => SignatureScheme::RsaPkcs1v15,
            _ => return None,
        };
        let digest = match parts.next()? {
            "sha256" => DigestAlgorithm::Sha256,
            "sha384" => DigestAlgorithm::Sha384,
            "sha512" => DigestAlgorithm::Sha512,
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self { scheme, digest })
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} with {}", self.scheme.name(), self.digest.name())
    }
}

/// Who produced a signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignerReference {
    /// Display name of the signer (`/Name`)
    pub name: Option<String>,
    /// Hex SHA-256 of the signer's SubjectPublicKeyInfo (`/SignerKeyId`)
    pub key_id: Option<String>,
}

/// A computed signature, ready to be embedded once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Algorithm the value was produced with
    pub algorithm: SignatureAlgorithm,
    /// Raw RSA signature
    pub bytes: Vec<u8>,
    /// Signer reference
    pub signer: SignerReference,
}

/// Options for signing a PDF.
#[derive(Debug, Clone)]
pub struct SignOptions {
    /// Signature scheme and digest
    pub algorithm: SignatureAlgorithm,
    /// Bytes reserved for the encoded signature
    pub slot_size: usize,
    /// Name of the signer
    pub name: Option<String>,
    /// Reason for signing
    pub reason: Option<String>,
    /// Location where the document was signed
    pub location: Option<String>,
    /// Contact information
    pub contact_info: Option<String>,
    /// Signing time; the current local time when unset
    pub signing_time: Option<DateTime<FixedOffset>>,
    /// Key id written as `/SignerKeyId`
    pub key_id: Option<String>,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::default(),
            slot_size: DEFAULT_SLOT_SIZE,
            name: None,
            reason: None,
            location: None,
            contact_info: None,
            signing_time: None,
            key_id: None,
        }
    }
}

impl SignOptions {
    /// Set the signature algorithm.
    pub fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the slot size in bytes.
    pub fn with_slot_size(mut self, slot_size: usize) -> Self {
        self.slot_size = slot_size;
        self
    }

    /// Set the signer name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the reason for signing.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the signing location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the contact information.
    pub fn with_contact_info(mut self, contact_info: impl Into<String>) -> Self {
        self.contact_info = Some(contact_info.into());
        self
    }

    /// Fix the signing time instead of using the clock.
    pub fn with_signing_time(mut self, time: DateTime<FixedOffset>) -> Self {
        self.signing_time = Some(time);
        self
    }

    /// Set the key id written into the signature dictionary.
    ///
    /// The id is written as a PDF hex string, so it must be an even number
    /// of hex digits; [`SignOptions::validate`] rejects anything else.
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Check that the options can be written into a signature dictionary.
    pub fn validate(&self) -> Result<()> {
        if self.slot_size == 0 || self.slot_size > MAX_SLOT_SIZE {
            return Err(Error::Config(format!(
                "signature slot size must be between 1 and {} bytes, got {}",
                MAX_SLOT_SIZE, self.slot_size
            )));
        }

        if let Some(key_id) = &self.key_id {
            if key_id.is_empty() || hex::decode(key_id).is_err() {
                return Err(Error::Config(format!(
                    "key id must be an even number of hex digits, got {:?}",
                    key_id
                )));
            }
        }

        Ok(())
    }
}

/// Information about an existing signature in a PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignatureInfo {
    /// Object number of the signature dictionary
    pub object_number: Option<u32>,
    /// Name of the signer
    pub signer_name: Option<String>,
    /// Signing time as written (`D:YYYYMMDDHHmmSS+HH'mm'`)
    pub signing_time: Option<String>,
    /// Reason for signing
    pub reason: Option<String>,
    /// Signing location
    pub location: Option<String>,
    /// Contact information
    pub contact_info: Option<String>,
    /// Raw `/SubFilter` name
    pub sub_filter: Option<String>,
    /// Parsed algorithm, when the sub-filter is one of ours
    pub algorithm: Option<SignatureAlgorithm>,
    /// Signer key id
    pub key_id: Option<String>,
    /// Byte range of the signed data
    pub byte_range: Vec<u64>,
    /// Whether the signature covers the whole document
    pub covers_whole_document: bool,
}

/// A signature pulled out of a signed PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSignature {
    /// Validated byte range
    pub byte_range: ByteRange,
    /// Signature algorithm
    pub algorithm: SignatureAlgorithm,
    /// Raw RSA signature, envelope removed
    pub signature: Vec<u8>,
    /// Signer reference
    pub signer: SignerReference,
    /// Dictionary metadata
    pub info: SignatureInfo,
}

/// Result of signature verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    /// Overall verification status
    pub status: VerificationStatus,
    /// Signature information
    pub signature_info: SignatureInfo,
    /// Verification messages (errors, warnings)
    pub messages: Vec<String>,
    /// Whether bytes were appended after the signature
    pub document_modified: bool,
    /// Whether the embedded key id names the key used to verify
    pub signer_matches: Option<bool>,
}

/// Verification status of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerificationStatus {
    /// Signature is valid and covers the whole document
    Valid,
    /// Signature does not match
    Invalid,
    /// Signature is valid for its revision but the document was extended later
    ValidWithWarnings,
}

impl VerificationStatus {
    /// Check if the status indicates a valid signature.
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationStatus::Valid)
    }

    /// Check if the status indicates any form of validity (including warnings).
    pub fn is_ok(&self) -> bool {
        matches!(self, VerificationStatus::Valid | VerificationStatus::ValidWithWarnings)
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            VerificationStatus::Valid => "valid",
            VerificationStatus::Invalid => "invalid",
            VerificationStatus::ValidWithWarnings => "valid (document modified after signing)",
        };
        f.write_str(text)
    }
}
