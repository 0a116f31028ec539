//! Six-digit PINs and the symmetric key derived from them.

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::cipher::KEY_LEN;
use crate::error::{Error, Result};

/// Number of digits in a PIN.
pub const PIN_LEN: usize = 6;

/// A validated six-digit numeric PIN.
///
/// The digits live in a zeroizing buffer and are wiped when the value is
/// dropped. `Debug` never prints them.
#[derive(Clone)]
pub struct Pin(Zeroizing<String>);

impl Pin {
    /// Validate and wrap a PIN.
    ///
    /// Rejects empty input, anything other than ASCII digits, and any length
    /// other than [`PIN_LEN`].
    pub fn parse(pin: &str) -> Result<Self> {
        if pin.is_empty() {
            return Err(Error::InvalidPin("PIN can not be empty".to_string()));
        }
        if !pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPin(
                "PIN must not contain anything other than digits".to_string(),
            ));
        }
        if pin.len() != PIN_LEN {
            return Err(Error::InvalidPin(format!("PIN must be {} digits long", PIN_LEN)));
        }
        Ok(Self(Zeroizing::new(pin.to_string())))
    }

    /// Canonical byte encoding fed into the key derivation.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pin([REDACTED])")
    }
}

impl std::str::FromStr for Pin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Derive the AES-256 key for a PIN.
///
/// The key is `SHA-256(pin)` with no salt, so equal PINs produce equal keys
/// across users. Key files written by earlier releases depend on this exact
/// derivation.
pub fn derive_key(pin: &Pin) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&Sha256::digest(pin.as_bytes()));
    key
}
