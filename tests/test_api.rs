//! Integration tests for the file-level API.
//!
//! Tests cover key file generation, signing a file on disk and verifying
//! the `<stem>_signed.pdf` output.

use std::fs;

use pades_oxide::api::{
    generate_key_files_with, sign_pdf_file, verify_pdf_file, KeyFiles,
};
use pades_oxide::keys::{decrypt_private_key, import_public_key, Pin, IV_LEN};
use pades_oxide::signatures::SignOptions;
use pades_oxide::{Error, SignerConfig};
use tempfile::tempdir;

fn config() -> SignerConfig {
    SignerConfig::new().with_key_bits(2048)
}

fn pin(s: &str) -> Pin {
    Pin::parse(s).unwrap()
}

#[test]
fn test_generate_key_files() {
    let dir = tempdir().unwrap();
    let files = generate_key_files_with(&pin("123456"), dir.path().join("alice"), &config()).unwrap();

    assert_eq!(files, KeyFiles::for_base(dir.path().join("alice")));

    let pem = fs::read_to_string(&files.public_key).unwrap();
    assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----\n"));
    let public = import_public_key(pem.as_bytes()).unwrap();

    let container = fs::read(&files.private_key).unwrap();
    assert!(container.len() > IV_LEN);
    assert_eq!((container.len() - IV_LEN) % 16, 0);
    let private = decrypt_private_key(&container, &pin("123456")).unwrap();
    assert_eq!(private.to_public_key(), public);
}

#[test]
fn test_generate_refuses_overwrite() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("bob");
    generate_key_files_with(&pin("111111"), &base, &config()).unwrap();
    let before = fs::read(dir.path().join("bob_private.bin")).unwrap();

    let err = generate_key_files_with(&pin("222222"), &base, &config()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(fs::read(dir.path().join("bob_private.bin")).unwrap(), before);
}

#[test]
fn test_generate_rejects_bad_config() {
    let dir = tempdir().unwrap();
    let result = generate_key_files_with(
        &pin("123456"),
        dir.path().join("weak"),
        &SignerConfig::new().with_key_bits(1024),
    );
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(!dir.path().join("weak_public.pem").exists());
}

#[test]
fn test_sign_and_verify_file() {
    let dir = tempdir().unwrap();
    let keys = generate_key_files_with(&pin("123456"), dir.path().join("k"), &config()).unwrap();
    let others = generate_key_files_with(&pin("123456"), dir.path().join("o"), &config()).unwrap();

    let pdf = dir.path().join("invoice.pdf");
    fs::write(&pdf, b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n").unwrap();

    let options = SignOptions::default().with_reason("Paid");
    let signed = sign_pdf_file(&pdf, &keys.private_key, &pin("123456"), &options).unwrap();

    assert_eq!(signed, dir.path().join("invoice_signed.pdf"));
    assert!(fs::read(&signed).unwrap().starts_with(&fs::read(&pdf).unwrap()));
    assert!(verify_pdf_file(&signed, &keys.public_key).unwrap());
    assert!(!verify_pdf_file(&signed, &others.public_key).unwrap());

    // The input itself is unsigned.
    assert!(matches!(
        verify_pdf_file(&pdf, &keys.public_key),
        Err(Error::MalformedSignature(_))
    ));
}

#[test]
fn test_sign_with_wrong_pin() {
    let dir = tempdir().unwrap();
    let keys = generate_key_files_with(&pin("123456"), dir.path().join("k"), &config()).unwrap();
    let pdf = dir.path().join("doc.pdf");
    fs::write(&pdf, b"%PDF-1.4\n").unwrap();

    let err = sign_pdf_file(&pdf, &keys.private_key, &pin("123465"), &SignOptions::default())
        .unwrap_err();
    assert!(err.is_pin_retryable());
    assert!(!dir.path().join("doc_signed.pdf").exists());
}

#[test]
fn test_missing_files() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        verify_pdf_file(dir.path().join("nope.pdf"), dir.path().join("nope.pem")),
        Err(Error::Io(_))
    ));
}
