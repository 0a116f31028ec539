//! Key pair packaging: public PEM files and PIN-encrypted private key containers.
//!
//! ## Container format
//!
//! ```text
//! IV (16) | AES-256-CBC(PKCS#7, PKCS#8 PEM of the private key)
//! ```
//!
//! The AES key is derived from the PIN (see [`derive_key`]). Nothing in the
//! container says which PIN was used: decrypting with a wrong one either fails
//! the padding check or yields bytes that do not parse as a private key, and
//! both cases are reported as [`Error::KeyDecryption`].

use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::cipher::{aes256_decrypt, aes256_encrypt, BLOCK_LEN, IV_LEN};
use super::pin::{derive_key, Pin};
use crate::error::{Error, Result};

/// Default RSA modulus size.
pub const DEFAULT_KEY_BITS: usize = 4096;
/// Smallest modulus accepted for new keys.
pub const MIN_KEY_BITS: usize = 2048;
/// Public exponent used for generated keys.
pub const PUBLIC_EXPONENT: u64 = 65537;

/// An RSA key pair.
///
/// The public and private halves are usable on their own; the private half
/// only ever leaves this type encrypted (see [`encrypt_private_key`]).
#[derive(Clone)]
pub struct KeyPair {
    bits: usize,
    public: RsaPublicKey,
    private: RsaPrivateKey,
}

impl KeyPair {
    /// Generate a fresh key pair with a modulus of `bits` bits.
    pub fn generate(bits: usize) -> Result<Self> {
        if bits < MIN_KEY_BITS {
            return Err(Error::Key(format!(
                "RSA key size {} is below the minimum of {}",
                bits, MIN_KEY_BITS
            )));
        }

        log::info!("Generating {}-bit RSA key pair", bits);
        let exponent = rsa::BigUint::from(PUBLIC_EXPONENT);
        let private = RsaPrivateKey::new_with_exp(&mut OsRng, bits, &exponent)
            .map_err(|e| Error::Key(format!("Failed to generate RSA key: {}", e)))?;

        Ok(Self::from_private(private))
    }

    /// Rebuild the pair from a private key (e.g. one just decrypted).
    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self {
            bits: public.size() * 8,
            public,
            private,
        }
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// The public half.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// The private half.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// Signer reference for the public half.
    pub fn key_id(&self) -> Result<String> {
        key_id(&self.public)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &self.bits)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// An encrypted private key as stored in a `.bin` key file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPrivateKeyContainer {
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedPrivateKeyContainer {
    /// Parse `IV ‖ ciphertext`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < IV_LEN + BLOCK_LEN {
            return Err(Error::KeyDecryption(format!(
                "key container too short: {} bytes",
                data.len()
            )));
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&data[..IV_LEN]);

        Ok(Self {
            iv,
            ciphertext: data[IV_LEN..].to_vec(),
        })
    }

    /// Serialize as `IV ‖ ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(IV_LEN + self.ciphertext.len());
        buf.extend_from_slice(&self.iv);
        buf.extend_from_slice(&self.ciphertext);
        buf
    }

    /// The initialization vector.
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// The encrypted PEM.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

/// Encrypt a private key under a PIN.
///
/// A fresh IV is drawn from the OS RNG on every call, so encrypting the same
/// key twice gives different containers.
pub fn encrypt_private_key(private: &RsaPrivateKey, pin: &Pin) -> Result<EncryptedPrivateKeyContainer> {
    let pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| Error::Key(format!("Failed to encode private key: {}", e)))?;

    let mut iv = [0u8; IV_LEN];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| Error::Crypto(format!("OS random generator unavailable: {}", e)))?;

    let key = derive_key(pin);
    let ciphertext = aes256_encrypt(&key, &iv, pem.as_bytes())?;

    Ok(EncryptedPrivateKeyContainer { iv, ciphertext })
}

/// Decrypt a container back to the exact PKCS#8 PEM that was encrypted.
pub fn decrypt_private_key_pem(container: &[u8], pin: &Pin) -> Result<Zeroizing<String>> {
    let container = EncryptedPrivateKeyContainer::from_bytes(container)?;

    let key = derive_key(pin);
    let plaintext = aes256_decrypt(&key, container.iv(), container.ciphertext())?;

    let pem = std::str::from_utf8(&plaintext)
        .map_err(|_| Error::KeyDecryption("invalid PIN or corrupted key file".to_string()))?;

    Ok(Zeroizing::new(pem.to_string()))
}

/// Decrypt a container and parse the private key.
pub fn decrypt_private_key(container: &[u8], pin: &Pin) -> Result<RsaPrivateKey> {
    let pem = decrypt_private_key_pem(container, pin)?;

    let private = RsaPrivateKey::from_pkcs8_pem(&pem)
        .map_err(|_| Error::KeyDecryption("invalid PIN or corrupted key file".to_string()))?;
    private
        .validate()
        .map_err(|_| Error::KeyDecryption("decrypted key failed validation".to_string()))?;

    Ok(private)
}

/// Encode a public key as SubjectPublicKeyInfo PEM.
pub fn export_public_key(public: &RsaPublicKey) -> Result<String> {
    public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| Error::Key(format!("Failed to encode public key: {}", e)))
}

/// Decode a PEM public key.
///
/// SubjectPublicKeyInfo (`BEGIN PUBLIC KEY`) is what [`export_public_key`]
/// writes; bare PKCS#1 (`BEGIN RSA PUBLIC KEY`) is accepted too.
pub fn import_public_key(pem: &[u8]) -> Result<RsaPublicKey> {
    let text = std::str::from_utf8(pem)
        .map_err(|_| Error::Key("public key file is not valid PEM text".to_string()))?;

    RsaPublicKey::from_public_key_pem(text)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(text))
        .map_err(|e| Error::Key(format!("Failed to parse public key: {}", e)))
}

/// Hex SHA-256 of the DER SubjectPublicKeyInfo.
pub fn key_id(public: &RsaPublicKey) -> Result<String> {
    let der = public
        .to_public_key_der()
        .map_err(|e| Error::Key(format!("Failed to encode public key DER: {}", e)))?;
    Ok(hex::encode(Sha256::digest(der.as_bytes())))
}
