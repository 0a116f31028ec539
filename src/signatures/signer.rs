//! PDF signing implementation.
//!
//! [`PdfSigner`] drives a [`SignatureSplicer`] through the whole sequence:
//! placeholder, byte range, digest, RSA signature, embed.

use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, Pss, RsaPrivateKey};
use sha2::{Sha256, Sha384, Sha512};

use super::splicer::SignatureSplicer;
use super::types::{SignOptions, Signature, SignatureAlgorithm, SignatureScheme, SignerReference};
use crate::digest::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::keys::key_id;

/// PSS salt length used for `key`: the largest the encoded message allows.
pub(crate) fn pss_salt_len(key: &impl PublicKeyParts, digest: DigestAlgorithm) -> usize {
    let em_len = key.n().bits().saturating_sub(1).div_ceil(8);
    em_len.saturating_sub(digest.output_len() + 2)
}

/// Sign a precomputed digest with `key`.
///
/// The digest length must match `algorithm.digest`.
pub fn sign_digest(
    key: &RsaPrivateKey,
    algorithm: SignatureAlgorithm,
    digest: &[u8],
) -> Result<Vec<u8>> {
    if digest.len() != algorithm.digest.output_len() {
        return Err(Error::Crypto(format!(
            "{} digest must be {} bytes, got {}",
            algorithm.digest.name(),
            algorithm.digest.output_len(),
            digest.len()
        )));
    }

    let salt = pss_salt_len(key, algorithm.digest);
    let result = match (algorithm.scheme, algorithm.digest) {
        (SignatureScheme::RsaPss, DigestAlgorithm::Sha256) => {
            key.sign_with_rng(&mut OsRng, Pss::new_with_salt::<Sha256>(salt), digest)
        },
        (SignatureScheme::RsaPss, DigestAlgorithm::Sha384) => {
            key.sign_with_rng(&mut OsRng, Pss::new_with_salt::<Sha384>(salt), digest)
        },
        (SignatureScheme::RsaPss, DigestAlgorithm::Sha512) => {
            key.sign_with_rng(&mut OsRng, Pss::new_with_salt::<Sha512>(salt), digest)
        },
        (SignatureScheme::RsaPkcs1v15, DigestAlgorithm::Sha256) => {
            key.sign(Pkcs1v15Sign::new::<Sha256>(), digest)
        },
        (SignatureScheme::RsaPkcs1v15, DigestAlgorithm::Sha384) => {
            key.sign(Pkcs1v15Sign::new::<Sha384>(), digest)
        },
        (SignatureScheme::RsaPkcs1v15, DigestAlgorithm::Sha512) => {
            key.sign(Pkcs1v15Sign::new::<Sha512>(), digest)
        },
    };

    result.map_err(|e| Error::Crypto(format!("RSA signing failed: {}", e)))
}

/// PDF signer that creates digital signatures.
pub struct PdfSigner {
    key: RsaPrivateKey,
    options: SignOptions,
}

impl PdfSigner {
    /// Create a signer for `key`.
    ///
    /// When the options carry no key id, the id of `key`'s public half is
    /// filled in so verifiers can tell which key to use. Options that
    /// [`SignOptions::validate`] rejects fail with [`Error::Config`].
    pub fn new(key: RsaPrivateKey, mut options: SignOptions) -> Result<Self> {
        if options.key_id.is_none() {
            options.key_id = Some(key_id(&key.to_public_key())?);
        }
        options.validate()?;
        Ok(Self { key, options })
    }

    /// Get the signing options.
    pub fn options(&self) -> &SignOptions {
        &self.options
    }

    /// Signer reference recorded with each signature.
    pub fn signer(&self) -> SignerReference {
        SignerReference {
            name: self.options.name.clone(),
            key_id: self.options.key_id.clone(),
        }
    }

    /// Sign a byte-range digest.
    pub fn create_signature(&self, digest: &[u8]) -> Result<Signature> {
        let bytes = sign_digest(&self.key, self.options.algorithm, digest)?;
        Ok(Signature {
            algorithm: self.options.algorithm,
            bytes,
            signer: self.signer(),
        })
    }

    /// Sign a PDF and return the signed document.
    ///
    /// The input is left untouched at the start of the output; the signature
    /// lives in one appended incremental update.
    pub fn sign(&self, pdf: Vec<u8>) -> Result<Vec<u8>> {
        let mut splicer = SignatureSplicer::new(pdf)?;

        splicer.insert_placeholder(&self.options)?;
        splicer.finalize_byte_range()?;

        let digest = splicer.signing_digest(self.options.algorithm.digest)?;
        let signature = self.create_signature(&digest)?;

        if let Err(e) = splicer.embed_signature(&signature.bytes) {
            if let Error::SlotTooSmall { required, .. } = &e {
                log::warn!(
                    "Signature needs {} hex digits; increase the slot size to at least {} bytes",
                    required,
                    required / 2
                );
            }
            return Err(e);
        }

        log::info!("Signed document with {}", signature.algorithm);
        splicer.into_signed_bytes()
    }
}

impl std::fmt::Debug for PdfSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfSigner")
            .field("key", &"[REDACTED]")
            .field("options", &self.options)
            .finish()
    }
}
