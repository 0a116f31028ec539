//! Integration tests for signing and verification.
//!
//! Tests cover:
//! - Sign-then-verify on a structured PDF and on a header-only stub
//! - Tampering inside and outside the signature slot
//! - Wrong keys, double signing, truncated files
//! - The splicer state machine driven by hand

use std::sync::OnceLock;

use pades_oxide::digest::{hash, hash_with, DigestAlgorithm};
use pades_oxide::keys::{decrypt_private_key, encrypt_private_key, KeyPair, Pin};
use pades_oxide::signatures::{
    extract_all_signatures, extract_byte_range_and_signature, sign_digest, verify,
    verify_detailed, PdfSigner, SignOptions, SignatureAlgorithm, SignatureScheme,
    SignatureSplicer, SplicerState, VerificationStatus, BYTE_RANGE_PLACEHOLDER,
};
use pades_oxide::Error;

fn signer_key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate(2048).unwrap())
}

fn other_key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate(2048).unwrap())
}

/// Build a one-page PDF with a correct classic xref table.
fn sample_pdf() -> Vec<u8> {
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>",
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>",
        "<< /Length 42 >>\nstream\nBT /F1 12 Tf 72 720 Td (Hello World) Tj ET\nendstream",
    ];

    let mut pdf = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    pdf
}

fn sign(pdf: &[u8], options: SignOptions) -> Vec<u8> {
    PdfSigner::new(signer_key().private_key().clone(), options)
        .unwrap()
        .sign(pdf.to_vec())
        .unwrap()
}

fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .rposition(|w| w == needle)
        .unwrap_or_else(|| panic!("{:?} not found", String::from_utf8_lossy(needle)))
}

mod round_trip {
    use super::*;

    #[test]
    fn test_sign_then_verify() {
        let pdf = sample_pdf();
        let signed = sign(&pdf, SignOptions::default().with_name("Jan Kowalski"));

        assert!(signed.starts_with(&pdf));
        assert!(verify(&signed, signer_key().public_key()).unwrap());
    }

    #[test]
    fn test_every_algorithm() {
        let pdf = sample_pdf();
        for scheme in [SignatureScheme::RsaPss, SignatureScheme::RsaPkcs1v15] {
            for digest in [DigestAlgorithm::Sha256, DigestAlgorithm::Sha384, DigestAlgorithm::Sha512] {
                let algorithm = SignatureAlgorithm::new(scheme, digest);
                let signed = sign(&pdf, SignOptions::default().with_algorithm(algorithm));

                let report = verify_detailed(&signed, signer_key().public_key()).unwrap();
                assert_eq!(report.status, VerificationStatus::Valid, "{}", algorithm);
                assert_eq!(report.signature_info.algorithm, Some(algorithm));
            }
        }
    }

    #[test]
    fn test_trailer_chains_to_previous_revision() {
        let pdf = sample_pdf();
        let signed = sign(&pdf, SignOptions::default());
        let update = String::from_utf8_lossy(&signed[pdf.len()..]).into_owned();

        let prev = find(&pdf, b"startxref\n") + "startxref\n".len();
        let prev_offset: String = pdf[prev..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .map(|&b| b as char)
            .collect();

        assert!(update.starts_with("5 0 obj\n"));
        assert!(update.contains("/Size 6"));
        assert!(update.contains(&format!("/Prev {}", prev_offset)));
        assert!(update.contains("/Root 1 0 R"));
        assert!(update.ends_with("%%EOF\n"));
    }

    #[test]
    fn test_metadata_round_trip() {
        let signed = sign(
            &sample_pdf(),
            SignOptions::default()
                .with_name("Zoë Ångström")
                .with_reason("Contract (v2) approval")
                .with_location("Gdańsk")
                .with_contact_info("zoe@example.com"),
        );

        let info = verify_detailed(&signed, signer_key().public_key())
            .unwrap()
            .signature_info;
        assert_eq!(info.signer_name.as_deref(), Some("Zoë Ångström"));
        assert_eq!(info.reason.as_deref(), Some("Contract (v2) approval"));
        assert_eq!(info.location.as_deref(), Some("Gdańsk"));
        assert_eq!(info.contact_info.as_deref(), Some("zoe@example.com"));
        assert!(info.signing_time.unwrap().starts_with("D:"));
        assert_eq!(info.key_id, Some(signer_key().key_id().unwrap()));
    }

    #[test]
    fn test_explicit_key_id() {
        let signed = sign(&sample_pdf(), SignOptions::default().with_key_id("C0FFEE"));
        let extracted = extract_byte_range_and_signature(&signed).unwrap();
        assert_eq!(extracted.signer.key_id.as_deref(), Some("c0ffee"));

        let report = verify_detailed(&signed, signer_key().public_key()).unwrap();
        assert_eq!(report.status, VerificationStatus::Valid);
        assert_eq!(report.signer_matches, Some(false));
    }

    #[test]
    fn test_key_id_that_is_not_hex_is_refused() {
        let result = PdfSigner::new(
            signer_key().private_key().clone(),
            SignOptions::default().with_key_id("alice@example.com"),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_pin_protected_key_scenario() {
        let pair = KeyPair::generate(4096).unwrap();
        let pin = Pin::parse("123456").unwrap();
        let container = encrypt_private_key(pair.private_key(), &pin).unwrap().to_bytes();

        let stub = b"%PDF-1.4\n%".to_vec();
        assert_eq!(stub.len(), 10);

        let private_key = decrypt_private_key(&container, &pin).unwrap();
        let signed = PdfSigner::new(private_key, SignOptions::default())
            .unwrap()
            .sign(stub.clone())
            .unwrap();

        assert!(signed.starts_with(&stub));
        assert!(verify(&signed, pair.public_key()).unwrap());
        assert!(!verify(&signed, other_key().public_key()).unwrap());

        let extracted = extract_byte_range_and_signature(&signed).unwrap();
        assert_eq!(extracted.signature.len(), 512);
    }
}

mod tampering {
    use super::*;

    #[test]
    fn test_wrong_key() {
        let signed = sign(&sample_pdf(), SignOptions::default());
        assert!(!verify(&signed, other_key().public_key()).unwrap());

        let report = verify_detailed(&signed, other_key().public_key()).unwrap();
        assert_eq!(report.status, VerificationStatus::Invalid);
        assert_eq!(report.signer_matches, Some(false));
    }

    #[test]
    fn test_flip_byte_in_original_content() {
        let mut signed = sign(&sample_pdf(), SignOptions::default());
        let pos = find(&signed, b"Hello World");
        signed[pos] = b'J';
        assert!(!verify(&signed, signer_key().public_key()).unwrap());
    }

    #[test]
    fn test_flip_byte_in_signature_dictionary() {
        let mut signed = sign(&sample_pdf(), SignOptions::default().with_reason("Approved"));
        let pos = find(&signed, b"(Approved)") + 1;
        signed[pos] = b'a';
        assert!(!verify(&signed, signer_key().public_key()).unwrap());
    }

    /// Flip the lowest bit of every signed byte, one at a time.
    ///
    /// No flip may verify. The only flips allowed to fail as malformed are
    /// those inside the `/ByteRange` field that push its end past the file.
    fn assert_every_flip_rejected(signed: &[u8]) {
        let public_key = signer_key().public_key();
        let slot = extract_byte_range_and_signature(signed).unwrap().byte_range.excluded();
        let field_start = find(signed, b"/ByteRange ") + "/ByteRange ".len();
        let field = field_start..field_start + BYTE_RANGE_PLACEHOLDER.len();

        let mut rejected = 0;
        for pos in (0..signed.len()).filter(|pos| !slot.contains(pos)) {
            let mut tampered = signed.to_vec();
            tampered[pos] ^= 0x01;

            match verify(&tampered, public_key) {
                Ok(false) => rejected += 1,
                Ok(true) => panic!("flip at {} still verifies", pos),
                Err(Error::MalformedSignature(reason)) => {
                    assert!(field.contains(&pos), "flip at {} is malformed: {}", pos, reason);
                    assert!(verify_detailed(&tampered, public_key).is_err());
                },
                Err(e) => panic!("flip at {} failed with {}", pos, e),
            }
        }
        assert!(rejected >= signed.len() - slot.len() - field.len());
    }

    #[test]
    fn test_every_single_byte_flip_on_stub() {
        let signed = sign(b"%PDF-1.4\n%", SignOptions::default());
        assert_every_flip_rejected(&signed);
    }

    #[test]
    fn test_every_single_byte_flip_on_document() {
        let signed = sign(&sample_pdf(), SignOptions::default().with_reason("Approved"));
        assert_every_flip_rejected(&signed);
    }

    #[test]
    fn test_damaged_signature_header() {
        let signed = sign(&sample_pdf(), SignOptions::default());
        let mut tampered = signed.clone();
        let pos = find(&signed, b"5 0 obj") + 1;
        tampered[pos] = b'!';

        let report = verify_detailed(&tampered, signer_key().public_key()).unwrap();
        assert_eq!(report.status, VerificationStatus::Invalid);
        assert!(report.messages[0].contains("damaged"));
    }

    #[test]
    fn test_flip_signature_digit() {
        let signed = sign(&sample_pdf(), SignOptions::default());
        let slot = extract_byte_range_and_signature(&signed).unwrap().byte_range.excluded();

        // Past the 4-byte DER header, inside the RSA value.
        let mut tampered = signed.clone();
        let pos = slot.start + 1 + 8 + 10;
        tampered[pos] = if tampered[pos] == b'0' { b'1' } else { b'0' };
        assert!(!verify(&tampered, signer_key().public_key()).unwrap());
    }

    #[test]
    fn test_garbage_in_slot_padding() {
        let mut signed = sign(&sample_pdf(), SignOptions::default());
        let slot = extract_byte_range_and_signature(&signed).unwrap().byte_range.excluded();
        signed[slot.end - 2] = b'F';
        assert!(matches!(
            verify(&signed, signer_key().public_key()),
            Err(Error::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_appended_bytes() {
        let mut signed = sign(&sample_pdf(), SignOptions::default());
        signed.extend_from_slice(b"\n% appended\n");

        assert!(!verify(&signed, signer_key().public_key()).unwrap());
        let report = verify_detailed(&signed, signer_key().public_key()).unwrap();
        assert_eq!(report.status, VerificationStatus::ValidWithWarnings);
    }

    #[test]
    fn test_truncated_file_is_malformed() {
        let signed = sign(&sample_pdf(), SignOptions::default());

        let cut_tail = &signed[..signed.len() - 10];
        assert!(matches!(
            verify(cut_tail, signer_key().public_key()),
            Err(Error::MalformedSignature(_))
        ));

        let cut_in_dict = &signed[..find(&signed, b"/Contents")];
        assert!(matches!(
            verify(cut_in_dict, signer_key().public_key()),
            Err(Error::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_unsigned_pdf_is_malformed() {
        assert!(matches!(
            verify(&sample_pdf(), signer_key().public_key()),
            Err(Error::MalformedSignature(_))
        ));
    }
}

mod multiple_signatures {
    use super::*;

    #[test]
    fn test_double_signing() {
        let pdf = sample_pdf();
        let first = sign(&pdf, SignOptions::default().with_name("First"));
        let second = PdfSigner::new(
            other_key().private_key().clone(),
            SignOptions::default().with_name("Second"),
        )
        .unwrap()
        .sign(first.clone())
        .unwrap();

        assert!(second.starts_with(&first));

        let all = extract_all_signatures(&second).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].info.signer_name.as_deref(), Some("First"));
        assert_eq!(all[1].info.signer_name.as_deref(), Some("Second"));

        // Newest signature, newest key.
        assert!(verify(&second, other_key().public_key()).unwrap());
        assert!(!verify(&second, signer_key().public_key()).unwrap());

        // The first signature still holds over its own revision.
        let first_revision = &second[..all[0].byte_range.covered_end() as usize];
        assert_eq!(first_revision, &first[..]);
        assert!(verify(first_revision, signer_key().public_key()).unwrap());
    }
}

mod splicer {
    use super::*;

    #[test]
    fn test_manual_signing_sequence() {
        let pdf = sample_pdf();
        let options = SignOptions::default();
        let mut splicer = SignatureSplicer::new(pdf.clone()).unwrap();

        let slot = splicer.insert_placeholder(&options).unwrap();
        let range = splicer.finalize_byte_range().unwrap();
        assert_eq!(range.excluded(), slot.excluded());
        assert_eq!(range.covered_end() as usize, splicer.bytes().len());

        let digest = splicer.signing_digest(DigestAlgorithm::Sha256).unwrap();
        assert_eq!(digest, hash(splicer.bytes(), slot.excluded()).unwrap());

        let signature = sign_digest(signer_key().private_key(), options.algorithm, &digest).unwrap();
        splicer.embed_signature(&signature).unwrap();
        assert_eq!(splicer.state(), SplicerState::Signed);

        let signed = splicer.into_signed_bytes().unwrap();
        assert_eq!(
            hash_with(DigestAlgorithm::Sha256, &signed, slot.excluded()).unwrap(),
            digest
        );
        assert!(verify(&signed, signer_key().public_key()).unwrap());
    }

    #[test]
    fn test_out_of_order_calls() {
        let mut splicer = SignatureSplicer::new(sample_pdf()).unwrap();
        assert!(matches!(
            splicer.embed_signature(&[0u8; 256]),
            Err(Error::InvalidState {
                expected: SplicerState::ByteRangeFinalized,
                found: SplicerState::Unsigned
            })
        ));
        assert!(matches!(
            splicer.signing_digest(DigestAlgorithm::Sha256),
            Err(Error::InvalidState { .. })
        ));
        assert_eq!(splicer.state(), SplicerState::Unsigned);
    }

    #[test]
    fn test_slot_too_small() {
        let result = PdfSigner::new(
            signer_key().private_key().clone(),
            SignOptions::default().with_slot_size(200),
        )
        .unwrap()
        .sign(sample_pdf());

        match result {
            Err(Error::SlotTooSmall {
                required,
                available,
            }) => {
                assert_eq!(required, (256 + 4) * 2);
                assert_eq!(available, 400);
            },
            other => panic!("expected SlotTooSmall, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_not_a_pdf() {
        assert!(matches!(
            SignatureSplicer::new(b"PK\x03\x04 zip archive".to_vec()),
            Err(Error::InvalidPdf(_))
        ));
    }
}
