//! PDF signature verification.
//!
//! The verifier never recomputes the byte range from the document layout: it
//! reads `/ByteRange` from the signature dictionary, checks that the range is
//! consistent with the dictionary it sits in, and hashes exactly the bytes
//! it names.

use std::ops::Range;

use rsa::{Pkcs1v15Sign, Pss, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};

use super::byterange::ByteRange;
use super::contents::decode_contents;
use super::signer::pss_salt_len;
use super::types::{
    ExtractedSignature, SignatureAlgorithm, SignatureInfo, SignatureScheme, SignerReference,
    VerificationReport, VerificationStatus,
};
use crate::digest::{hash_with, DigestAlgorithm};
use crate::error::{Error, Result};
use crate::keys::key_id;
use crate::object::{DictEntry, Dictionary, Object};
use crate::parser::parse_object_at;
use crate::xref::object_headers;

/// Check an RSA signature over a precomputed digest.
///
/// Any mismatch, including a signature of the wrong length, is `false`.
pub fn verify_digest(
    public_key: &RsaPublicKey,
    algorithm: SignatureAlgorithm,
    digest: &[u8],
    signature: &[u8],
) -> bool {
    let salt = pss_salt_len(public_key, algorithm.digest);
    let result = match (algorithm.scheme, algorithm.digest) {
        (SignatureScheme::RsaPss, DigestAlgorithm::Sha256) => {
            public_key.verify(Pss::new_with_salt::<Sha256>(salt), digest, signature)
        },
        (SignatureScheme::RsaPss, DigestAlgorithm::Sha384) => {
            public_key.verify(Pss::new_with_salt::<Sha384>(salt), digest, signature)
        },
        (SignatureScheme::RsaPss, DigestAlgorithm::Sha512) => {
            public_key.verify(Pss::new_with_salt::<Sha512>(salt), digest, signature)
        },
        (SignatureScheme::RsaPkcs1v15, DigestAlgorithm::Sha256) => {
            public_key.verify(Pkcs1v15Sign::new::<Sha256>(), digest, signature)
        },
        (SignatureScheme::RsaPkcs1v15, DigestAlgorithm::Sha384) => {
            public_key.verify(Pkcs1v15Sign::new::<Sha384>(), digest, signature)
        },
        (SignatureScheme::RsaPkcs1v15, DigestAlgorithm::Sha512) => {
            public_key.verify(Pkcs1v15Sign::new::<Sha512>(), digest, signature)
        },
    };
    result.is_ok()
}

/// Extract the newest signature of a signed PDF.
///
/// Fails with [`Error::MalformedSignature`] when there is no signature
/// dictionary or the newest one is inconsistent.
pub fn extract_byte_range_and_signature(signed_pdf: &[u8]) -> Result<ExtractedSignature> {
    read_newest(signed_pdf).map_err(Error::from)
}

/// Extract every signature, oldest first.
pub fn extract_all_signatures(signed_pdf: &[u8]) -> Result<Vec<ExtractedSignature>> {
    let dictionaries = signature_dictionaries(signed_pdf);
    if dictionaries.is_empty() {
        return Err(Error::MalformedSignature("no signature dictionary found".to_string()));
    }
    dictionaries
        .iter()
        .map(|(number, dict)| read_signature(signed_pdf, *number, dict).map_err(Error::from))
        .collect()
}

/// Why a signature could not be read.
enum Unreadable {
    /// Nothing can be checked: the file carries no signature, was cut short
    /// of its declared range, or holds an unusable value in the slot.
    Fatal(Error),
    /// Signed bytes no longer form a usable signature dictionary.
    Damaged {
        reason: String,
        info: SignatureInfo,
    },
}

impl From<Unreadable> for Error {
    fn from(unreadable: Unreadable) -> Self {
        match unreadable {
            Unreadable::Fatal(e) => e,
            Unreadable::Damaged { reason, .. } => Error::MalformedSignature(reason),
        }
    }
}

fn damaged(error: Error, info: &SignatureInfo) -> Unreadable {
    let reason = match error {
        Error::MalformedSignature(reason) => reason,
        other => other.to_string(),
    };
    Unreadable::Damaged {
        reason,
        info: info.clone(),
    }
}

fn read_newest(data: &[u8]) -> std::result::Result<ExtractedSignature, Unreadable> {
    if let Some((number, dict)) = signature_dictionaries(data).pop() {
        return read_signature(data, number, &dict);
    }

    let fatal = |reason: &str| Unreadable::Fatal(Error::MalformedSignature(reason.to_string()));
    match last_signature_marker(data) {
        None => Err(fatal("no signature dictionary found")),
        Some(pos) if !data[pos..].windows(2).any(|w| w == b">>") => {
            Err(fatal("signature dictionary runs past the end of the file"))
        },
        Some(_) => Err(Unreadable::Damaged {
            reason: "signature dictionary cannot be parsed".to_string(),
            info: SignatureInfo::default(),
        }),
    }
}

/// Offset of the last `/ByteRange` or `/SubFilter` key left in the file.
fn last_signature_marker(data: &[u8]) -> Option<usize> {
    [&b"/ByteRange"[..], &b"/SubFilter"[..]]
        .iter()
        .filter_map(|marker| data.windows(marker.len()).rposition(|w| w == *marker))
        .max()
}

/// Find signature dictionaries in file order.
///
/// A signature dictionary is any dictionary with both `/ByteRange` and
/// `/Contents`, either as an indirect object of its own or inline as the
/// `/V` of a signature field.
fn signature_dictionaries(data: &[u8]) -> Vec<(u32, Dictionary)> {
    let headers = object_headers(data);
    let mut found = Vec::new();

    for (i, (number, header)) in headers.iter().enumerate() {
        let window_end = headers.get(i + 1).map_or(data.len(), |(_, next)| next.start);
        let window = &data[header.end..window_end.max(header.end)];
        if !window.windows(10).any(|w| w == b"/ByteRange") {
            continue;
        }

        match parse_object_at(data, header.end) {
            Ok((Object::Dictionary(dict), _)) => {
                if let Some(sig) = select_signature_dictionary(dict) {
                    found.push((*number, sig));
                }
            },
            Ok(_) => {},
            Err(e) => log::debug!("Skipping object {} at {}: {}", number, header.start, e),
        }
    }

    found
}

fn select_signature_dictionary(dict: Dictionary) -> Option<Dictionary> {
    if dict.contains_key("ByteRange") && dict.contains_key("Contents") {
        return Some(dict);
    }
    match dict.get("V") {
        Some(Object::Dictionary(v)) if v.contains_key("ByteRange") && v.contains_key("Contents") => {
            Some(v.clone())
        },
        _ => None,
    }
}

fn read_signature(
    data: &[u8],
    number: u32,
    dict: &Dictionary,
) -> std::result::Result<ExtractedSignature, Unreadable> {
    let mut info = extract_signature_info(dict);
    info.object_number = Some(number);

    let byte_range = read_byte_range(dict).map_err(|e| damaged(e, &info))?;
    if let Err(e) = byte_range.validate(data.len()) {
        // The range reaches past the end: the file was cut short.
        if byte_range.covered_end() > data.len() as u64 {
            return Err(Unreadable::Fatal(e));
        }
        return Err(damaged(e, &info));
    }
    info.covers_whole_document = byte_range.covers(data.len());

    let contents = dict.entry("Contents").ok_or_else(|| {
        damaged(Error::MalformedSignature("missing /Contents".to_string()), &info)
    })?;
    let raw_contents = contents_bytes(data, contents).map_err(|e| damaged(e, &info))?;

    if byte_range.excluded() != contents.span {
        let mismatch = Error::MalformedSignature(format!(
            "ByteRange gap {:?} does not match the /Contents string at {:?}",
            byte_range.excluded(),
            contents.span
        ));
        return Err(damaged(mismatch, &info));
    }

    let algorithm = match info.sub_filter.as_deref() {
        None => {
            let missing = Error::MalformedSignature("missing /SubFilter".to_string());
            return Err(damaged(missing, &info));
        },
        Some(name) => SignatureAlgorithm::from_pdf_name(name).ok_or_else(|| {
            let unsupported =
                Error::MalformedSignature(format!("unsupported signature format /{}", name));
            damaged(unsupported, &info)
        })?,
    };

    let signature = decode_contents(raw_contents).map_err(Unreadable::Fatal)?;

    Ok(ExtractedSignature {
        byte_range,
        algorithm,
        signature,
        signer: SignerReference {
            name: info.signer_name.clone(),
            key_id: info.key_id.clone(),
        },
        info,
    })
}

fn read_byte_range(dict: &Dictionary) -> Result<ByteRange> {
    let values = dict
        .get("ByteRange")
        .and_then(Object::as_array)
        .ok_or_else(|| Error::MalformedSignature("/ByteRange is not an array".to_string()))?;

    if values.len() != 4 {
        return Err(Error::MalformedSignature(format!(
            "/ByteRange has {} elements, expected 4",
            values.len()
        )));
    }

    let mut out = [0u64; 4];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = value
            .as_integer()
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| {
                Error::MalformedSignature(
                    "/ByteRange must hold four non-negative integers".to_string(),
                )
            })?;
    }

    Ok(ByteRange::new(out))
}

/// The decoded `/Contents` bytes; the value must be a hex string.
fn contents_bytes<'a>(data: &[u8], entry: &'a DictEntry) -> Result<&'a [u8]> {
    let is_hex = data.get(entry.span.start) == Some(&b'<');
    match (&entry.value, is_hex) {
        (Object::String(bytes), true) => Ok(bytes),
        _ => Err(Error::MalformedSignature("/Contents is not a hex string".to_string())),
    }
}

/// Extract signature information from a signature dictionary.
pub fn extract_signature_info(dict: &Dictionary) -> SignatureInfo {
    let text = |key: &str| dict.get(key).and_then(Object::as_text);

    SignatureInfo {
        signer_name: text("Name"),
        signing_time: text("M"),
        reason: text("Reason"),
        location: text("Location"),
        contact_info: text("ContactInfo"),
        sub_filter: dict.get("SubFilter").and_then(Object::as_name).map(str::to_string),
        algorithm: dict
            .get("SubFilter")
            .and_then(Object::as_name)
            .and_then(SignatureAlgorithm::from_pdf_name),
        key_id: dict.get("SignerKeyId").and_then(Object::as_string).map(hex::encode),
        byte_range: dict
            .get("ByteRange")
            .and_then(Object::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_integer().and_then(|i| u64::try_from(i).ok()))
                    .collect()
            })
            .unwrap_or_default(),
        ..SignatureInfo::default()
    }
}

/// Verifier for PDF digital signatures made with one public key.
pub struct SignatureVerifier {
    public_key: RsaPublicKey,
    key_id: Option<String>,
}

impl SignatureVerifier {
    /// Create a verifier for `public_key`.
    pub fn new(public_key: RsaPublicKey) -> Self {
        let key_id = key_id(&public_key).ok();
        Self { public_key, key_id }
    }

    /// Whether the newest signature is valid and covers the whole file.
    pub fn verify(&self, signed_pdf: &[u8]) -> Result<bool> {
        Ok(self.verify_detailed(signed_pdf)?.status.is_valid())
    }

    /// Verify the newest signature and report the details.
    ///
    /// A signature dictionary whose signed bytes were damaged is reported as
    /// [`VerificationStatus::Invalid`]. Errors are kept for documents with no
    /// signature, documents shorter than their declared range, and slots
    /// whose value cannot be decoded.
    pub fn verify_detailed(&self, signed_pdf: &[u8]) -> Result<VerificationReport> {
        let report = self.report(signed_pdf, read_newest(signed_pdf))?;
        log::info!(
            "Signature in object {:?}: {}",
            report.signature_info.object_number,
            report.status
        );
        Ok(report)
    }

    /// Verify every signature, each over the revision it signed.
    pub fn verify_all(&self, signed_pdf: &[u8]) -> Result<Vec<VerificationReport>> {
        let dictionaries = signature_dictionaries(signed_pdf);
        if dictionaries.is_empty() {
            return Ok(vec![self.verify_detailed(signed_pdf)?]);
        }
        dictionaries
            .iter()
            .map(|(number, dict)| {
                self.report(signed_pdf, read_signature(signed_pdf, *number, dict))
            })
            .collect()
    }

    fn report(
        &self,
        data: &[u8],
        read: std::result::Result<ExtractedSignature, Unreadable>,
    ) -> Result<VerificationReport> {
        match read {
            Ok(extracted) => self.check(data, &extracted),
            Err(Unreadable::Damaged { reason, info }) => {
                log::warn!("Signature dictionary is damaged: {}", reason);
                Ok(VerificationReport {
                    status: VerificationStatus::Invalid,
                    signature_info: info,
                    messages: vec![format!("Signature dictionary is damaged: {}", reason)],
                    document_modified: false,
                    signer_matches: None,
                })
            },
            Err(Unreadable::Fatal(e)) => Err(e),
        }
    }

    fn check(&self, data: &[u8], extracted: &ExtractedSignature) -> Result<VerificationReport> {
        let covered: Range<usize> = 0..extracted.byte_range.covered_end() as usize;
        let digest = hash_with(
            extracted.algorithm.digest,
            &data[covered.clone()],
            extracted.byte_range.excluded(),
        )?;

        let mut report = VerificationReport {
            status: VerificationStatus::Invalid,
            signature_info: extracted.info.clone(),
            messages: Vec::new(),
            document_modified: !extracted.byte_range.covers(data.len()),
            signer_matches: None,
        };

        if let (Some(embedded), Some(ours)) = (&extracted.signer.key_id, &self.key_id) {
            let matches = embedded.eq_ignore_ascii_case(ours);
            report.signer_matches = Some(matches);
            if !matches {
                report
                    .messages
                    .push("Signature names a different signing key".to_string());
            }
        }

        if !verify_digest(&self.public_key, extracted.algorithm, &digest, &extracted.signature) {
            report
                .messages
                .push(format!("{} signature does not match", extracted.algorithm));
            return Ok(report);
        }

        if report.document_modified {
            report.status = VerificationStatus::ValidWithWarnings;
            report.messages.push(format!(
                "Signature covers the first {} of {} bytes; the document was changed after signing",
                covered.end,
                data.len()
            ));
        } else {
            report.status = VerificationStatus::Valid;
        }

        Ok(report)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// Verify the newest signature of `signed_pdf` against `public_key`.
///
/// `Ok(false)` means the signature does not match, its signed bytes were
/// damaged, or bytes were appended after it. Errors mean the document cannot
/// be verified at all: it carries no signature, it is shorter than its
/// declared `/ByteRange`, or the slot holds no decodable signature.
pub fn verify(signed_pdf: &[u8], public_key: &RsaPublicKey) -> Result<bool> {
    SignatureVerifier::new(public_key.clone()).verify(signed_pdf)
}

/// Like [`verify`], with the full report.
pub fn verify_detailed(signed_pdf: &[u8], public_key: &RsaPublicKey) -> Result<VerificationReport> {
    SignatureVerifier::new(public_key.clone()).verify_detailed(signed_pdf)
}

/// Verify every signature of `signed_pdf`, oldest first.
pub fn verify_all(signed_pdf: &[u8], public_key: &RsaPublicKey) -> Result<Vec<VerificationReport>> {
    SignatureVerifier::new(public_key.clone()).verify_all(signed_pdf)
}
