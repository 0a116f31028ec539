//! Byte-range digests.
//!
//! A PDF signature covers the whole file except the hex string that will hold
//! the signature value. Both the signer and the verifier hash
//! `document[..excluded.start] ‖ document[excluded.end..]`, so the digest stays
//! stable when the placeholder is later overwritten with the real signature.

use std::ops::Range;

use serde::Serialize;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{Error, Result};

/// Digest algorithm used for the byte-range hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DigestAlgorithm {
    /// SHA-256 (recommended)
    #[default]
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Size of the digest output in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Parse an algorithm name as written by [`DigestAlgorithm::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SHA-256" | "SHA256" => Some(DigestAlgorithm::Sha256),
            "SHA-384" | "SHA384" => Some(DigestAlgorithm::Sha384),
            "SHA-512" | "SHA512" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }
}

/// Hash `document` with SHA-256, skipping the `excluded` range.
pub fn hash(document: &[u8], excluded: Range<usize>) -> Result<Vec<u8>> {
    hash_with(DigestAlgorithm::Sha256, document, excluded)
}

/// Hash `document` with `algorithm`, skipping the `excluded` range.
///
/// An empty range hashes the whole document.
pub fn hash_with(
    algorithm: DigestAlgorithm,
    document: &[u8],
    excluded: Range<usize>,
) -> Result<Vec<u8>> {
    check_range(document, &excluded)?;

    let before = &document[..excluded.start];
    let after = &document[excluded.end..];

    let digest = match algorithm {
        DigestAlgorithm::Sha256 => digest_parts::<Sha256>(before, after),
        DigestAlgorithm::Sha384 => digest_parts::<Sha384>(before, after),
        DigestAlgorithm::Sha512 => digest_parts::<Sha512>(before, after),
    };

    Ok(digest)
}

/// Concatenate the two runs described by a PDF `/ByteRange` array.
///
/// Returns the exact bytes covered by the signature.
pub fn signed_bytes(document: &[u8], byte_range: &[u64; 4]) -> Result<Vec<u8>> {
    let run = |offset: u64, length: u64| -> Result<Range<usize>> {
        let start = offset as usize;
        let end = start
            .checked_add(length as usize)
            .ok_or(Error::InvalidRange {
                start,
                end: usize::MAX,
                len: document.len(),
            })?;
        if end > document.len() {
            return Err(Error::InvalidRange {
                start,
                end,
                len: document.len(),
            });
        }
        Ok(start..end)
    };

    let first = run(byte_range[0], byte_range[1])?;
    let second = run(byte_range[2], byte_range[3])?;

    let mut out = Vec::with_capacity(first.len() + second.len());
    out.extend_from_slice(&document[first]);
    out.extend_from_slice(&document[second]);
    Ok(out)
}

fn check_range(document: &[u8], excluded: &Range<usize>) -> Result<()> {
    if excluded.start > excluded.end || excluded.end > document.len() {
        return Err(Error::InvalidRange {
            start: excluded.start,
            end: excluded.end,
            len: document.len(),
        });
    }
    Ok(())
}

fn digest_parts<D: Digest>(before: &[u8], after: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(before);
    hasher.update(after);
    hasher.finalize().to_vec()
}
