//! Configuration for key generation and signing.

use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::keys::{DEFAULT_KEY_BITS, MIN_KEY_BITS};
use crate::signatures::{
    SignOptions, SignatureAlgorithm, SignatureScheme, DEFAULT_SLOT_SIZE, MAX_SLOT_SIZE,
};

/// Largest key size accepted for generation.
pub const MAX_KEY_BITS: usize = 16384;

/// DER header of an OCTET STRING up to 64 KiB long.
const ENVELOPE_OVERHEAD: usize = 4;

/// Signer configuration.
///
/// # Example
///
/// ```
/// use pades_oxide::config::SignerConfig;
/// use pades_oxide::digest::DigestAlgorithm;
///
/// let config = SignerConfig::new()
///     .with_digest(DigestAlgorithm::Sha512)
///     .with_key_bits(3072);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerConfig {
    /// Bytes reserved for the encoded signature.
    pub slot_size: usize,

    /// RSA padding scheme.
    pub scheme: SignatureScheme,

    /// Byte-range digest.
    pub digest: DigestAlgorithm,

    /// Modulus size for newly generated keys.
    pub key_bits: usize,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SignerConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            slot_size: DEFAULT_SLOT_SIZE,
            scheme: SignatureScheme::default(),
            digest: DigestAlgorithm::default(),
            key_bits: DEFAULT_KEY_BITS,
        }
    }

    /// Set the signature slot size in bytes.
    pub fn with_slot_size(mut self, slot_size: usize) -> Self {
        self.slot_size = slot_size;
        self
    }

    /// Set the RSA signature scheme.
    pub fn with_scheme(mut self, scheme: SignatureScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set the digest algorithm.
    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    /// Set the key size for generation.
    pub fn with_key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = key_bits;
        self
    }

    /// The combined signature algorithm.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::new(self.scheme, self.digest)
    }

    /// Check the values against each other.
    ///
    /// The slot must hold a signature made with a key of `key_bits`.
    pub fn validate(&self) -> Result<()> {
        if self.key_bits < MIN_KEY_BITS || self.key_bits > MAX_KEY_BITS {
            return Err(Error::Config(format!(
                "key size must be between {} and {} bits, got {}",
                MIN_KEY_BITS, MAX_KEY_BITS, self.key_bits
            )));
        }
        if self.key_bits % 8 != 0 {
            return Err(Error::Config(format!(
                "key size must be a multiple of 8, got {}",
                self.key_bits
            )));
        }

        if self.slot_size > MAX_SLOT_SIZE {
            return Err(Error::Config(format!(
                "slot of {} bytes exceeds the {}-byte maximum",
                self.slot_size, MAX_SLOT_SIZE
            )));
        }

        let needed = self.key_bits / 8 + ENVELOPE_OVERHEAD;
        if self.slot_size < needed {
            return Err(Error::Config(format!(
                "slot of {} bytes cannot hold a {}-bit signature ({} bytes needed)",
                self.slot_size, self.key_bits, needed
            )));
        }

        Ok(())
    }

    /// Signing options carrying this configuration.
    pub fn to_sign_options(&self) -> SignOptions {
        SignOptions::default()
            .with_algorithm(self.algorithm())
            .with_slot_size(self.slot_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SignerConfig::default();
        assert_eq!(config.slot_size, 1024);
        assert_eq!(config.key_bits, 4096);
        assert_eq!(config.algorithm().as_pdf_name(), "pades.rsassa_pss.sha256");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SignerConfig::new()
            .with_scheme(SignatureScheme::RsaPkcs1v15)
            .with_digest(DigestAlgorithm::Sha384)
            .with_slot_size(600);
        let options = config.to_sign_options();
        assert_eq!(options.slot_size, 600);
        assert_eq!(options.algorithm.as_pdf_name(), "pades.rsassa_pkcs1v15.sha384");
    }

    #[test]
    fn test_validate_key_bits() {
        assert!(SignerConfig::new().with_key_bits(1024).validate().is_err());
        assert!(SignerConfig::new().with_key_bits(2049).validate().is_err());
        assert!(SignerConfig::new().with_key_bits(32768).validate().is_err());
        assert!(SignerConfig::new().with_key_bits(2048).validate().is_ok());
    }

    #[test]
    fn test_validate_slot_fits_signature() {
        let config = SignerConfig::new().with_slot_size(512);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        assert!(config.with_slot_size(516).validate().is_ok());
        assert!(config.with_key_bits(2048).validate().is_ok());

        for slot_size in [MAX_SLOT_SIZE + 1, usize::MAX] {
            let config = SignerConfig::new().with_slot_size(slot_size);
            assert!(matches!(config.validate(), Err(Error::Config(_))));
        }
    }
}
