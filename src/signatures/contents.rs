//! Encoding of the `/Contents` value.
//!
//! The slot is wider than any signature and padded with zeros, so the raw
//! signature is wrapped in a DER OCTET STRING whose length header tells the
//! verifier where the value ends. The padding after it must be all zeros.

use der::asn1::OctetString;
use der::{Decode, Encode, Reader, SliceReader};

use crate::error::{Error, Result};

/// DER-wrap and hex-encode a signature (uppercase digits, no brackets).
pub fn encode_contents(signature: &[u8]) -> Result<String> {
    let envelope = OctetString::new(signature)
        .and_then(|octets| octets.to_der())
        .map_err(|e| Error::Crypto(format!("Failed to encode signature envelope: {}", e)))?;
    Ok(hex::encode_upper(envelope))
}

/// Recover the signature from the decoded bytes of a `/Contents` string.
pub fn decode_contents(contents: &[u8]) -> Result<Vec<u8>> {
    if contents.iter().all(|&b| b == 0) {
        return Err(Error::MalformedSignature(
            "Signature slot is still an empty placeholder".to_string(),
        ));
    }

    let malformed =
        |e: der::Error| Error::MalformedSignature(format!("Invalid signature envelope: {}", e));

    let mut reader = SliceReader::new(contents).map_err(malformed)?;
    let octets = OctetString::decode(&mut reader).map_err(malformed)?;
    let consumed = usize::try_from(reader.position()).map_err(malformed)?;

    if contents[consumed..].iter().any(|&b| b != 0) {
        return Err(Error::MalformedSignature(
            "Unexpected data after the signature envelope".to_string(),
        ));
    }

    Ok(octets.into_bytes())
}
