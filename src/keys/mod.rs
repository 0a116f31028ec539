//! Key handling: RSA key pairs, PINs, and the encrypted private key container.
//!
//! A key pair is written as two files:
//!
//! - `<name>_public.pem` - SubjectPublicKeyInfo PEM, unencrypted
//! - `<name>_private.bin` - `IV ‖ AES-256-CBC(PKCS#8 PEM)` under a key derived
//!   from a six-digit PIN
//!
//! The derived AES key is recomputed for every encrypt/decrypt call and wiped
//! when it goes out of scope; nothing is cached between calls.

mod cipher;
mod codec;
mod pin;

pub use cipher::{IV_LEN, KEY_LEN};
pub use codec::{
    decrypt_private_key, decrypt_private_key_pem, encrypt_private_key, export_public_key,
    import_public_key, key_id, EncryptedPrivateKeyContainer, KeyPair, DEFAULT_KEY_BITS,
    MIN_KEY_BITS,
};
pub use pin::{derive_key, Pin, PIN_LEN};

pub use rsa::{RsaPrivateKey, RsaPublicKey};

/// Shared key pairs for unit tests. Generating RSA keys is slow, so each pair
/// is created once per test binary.
#[cfg(test)]
pub(crate) mod test_keys {
    use super::KeyPair;
    use std::sync::OnceLock;

    static PRIMARY: OnceLock<KeyPair> = OnceLock::new();
    static SECONDARY: OnceLock<KeyPair> = OnceLock::new();

    pub(crate) fn primary() -> &'static KeyPair {
        PRIMARY.get_or_init(|| KeyPair::generate(2048).unwrap())
    }

    pub(crate) fn secondary() -> &'static KeyPair {
        SECONDARY.get_or_init(|| KeyPair::generate(2048).unwrap())
    }
}
