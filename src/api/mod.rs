//! File-level operations for key generation, signing and verification.
//!
//! Everything here reads whole files into memory, calls into [`crate::keys`]
//! and [`crate::signatures`], and writes whole files back. No file handle
//! outlives a call.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pades_oxide::api::{generate_key_files, sign_pdf_file, verify_pdf_file};
//! use pades_oxide::keys::Pin;
//! use pades_oxide::signatures::SignOptions;
//!
//! let pin = Pin::parse("123456")?;
//! let keys = generate_key_files(&pin, "alice")?;
//!
//! let signed = sign_pdf_file("contract.pdf", &keys.private_key, &pin, &SignOptions::default())?;
//! assert!(verify_pdf_file(&signed, &keys.public_key)?);
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::SignerConfig;
use crate::error::{Error, Result};
use crate::keys::{
    decrypt_private_key, encrypt_private_key, export_public_key, import_public_key, KeyPair, Pin,
};
use crate::signatures::{verify, PdfSigner, SignOptions};

/// Paths of a generated key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFiles {
    /// `<name>_public.pem`
    pub public_key: PathBuf,
    /// `<name>_private.bin`
    pub private_key: PathBuf,
}

impl KeyFiles {
    /// File names derived from `base_path`.
    pub fn for_base(base_path: impl AsRef<Path>) -> Self {
        let base = base_path.as_ref();
        Self {
            public_key: with_suffix(base, "_public.pem"),
            private_key: with_suffix(base, "_private.bin"),
        }
    }
}

/// Generate a 4096-bit key pair and write it next to `base_path`.
pub fn generate_key_files(pin: &Pin, base_path: impl AsRef<Path>) -> Result<KeyFiles> {
    generate_key_files_with(pin, base_path, &SignerConfig::default())
}

/// Like [`generate_key_files`], with the key size taken from `config`.
pub fn generate_key_files_with(
    pin: &Pin,
    base_path: impl AsRef<Path>,
    config: &SignerConfig,
) -> Result<KeyFiles> {
    config.validate()?;

    let files = KeyFiles::for_base(base_path);
    refuse_existing(&files)?;

    let pair = KeyPair::generate(config.key_bits)?;
    write_key_files(&pair, pin, &files)?;
    Ok(files)
}

/// Write an existing key pair: the public key as PEM, the private key as
/// an encrypted container.
///
/// Existing files are never overwritten.
pub fn write_key_files(pair: &KeyPair, pin: &Pin, files: &KeyFiles) -> Result<()> {
    refuse_existing(files)?;

    let public_pem = export_public_key(pair.public_key())?;
    let container = encrypt_private_key(pair.private_key(), pin)?;

    write_new(&files.private_key, &container.to_bytes())?;
    if let Err(e) = write_new(&files.public_key, public_pem.as_bytes()) {
        discard(&files.private_key);
        return Err(e);
    }

    log::info!(
        "Saved key pair to {} and {}",
        files.private_key.display(),
        files.public_key.display()
    );
    Ok(())
}

/// Sign `pdf_path` with the encrypted key in `private_key_file`.
///
/// The result is written to `<stem>_signed.pdf` in the same directory and
/// its path returned.
pub fn sign_pdf_file(
    pdf_path: impl AsRef<Path>,
    private_key_file: impl AsRef<Path>,
    pin: &Pin,
    options: &SignOptions,
) -> Result<PathBuf> {
    let pdf_path = pdf_path.as_ref();

    let container = fs::read(private_key_file.as_ref())?;
    let private_key = decrypt_private_key(&container, pin)?;

    let document = fs::read(pdf_path)?;
    let signer = PdfSigner::new(private_key, options.clone())?;
    let signed = signer.sign(document)?;

    let output = signed_output_path(pdf_path);
    fs::write(&output, signed)?;
    log::info!("Wrote signed document {}", output.display());
    Ok(output)
}

/// Verify the newest signature of `signed_pdf` with the PEM public key in
/// `public_key_file`.
pub fn verify_pdf_file(
    signed_pdf: impl AsRef<Path>,
    public_key_file: impl AsRef<Path>,
) -> Result<bool> {
    let public_key = import_public_key(&fs::read(public_key_file.as_ref())?)?;
    let document = fs::read(signed_pdf.as_ref())?;
    verify(&document, &public_key)
}

/// `<stem>_signed.pdf` next to `pdf_path`.
pub fn signed_output_path(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    pdf_path.with_file_name(format!("{}_signed.pdf", stem))
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn refuse_existing(files: &KeyFiles) -> Result<()> {
    for path in [&files.public_key, &files.private_key] {
        if path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )));
        }
    }
    Ok(())
}

/// Create `path` and write `data`; a partly written file is removed.
fn write_new(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = file.write_all(data).and_then(|()| file.sync_all()) {
        drop(file);
        discard(path);
        return Err(e.into());
    }
    Ok(())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::warn!("Could not remove {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_file_names() {
        let files = KeyFiles::for_base("/tmp/keys/alice");
        assert_eq!(files.public_key, PathBuf::from("/tmp/keys/alice_public.pem"));
        assert_eq!(files.private_key, PathBuf::from("/tmp/keys/alice_private.bin"));
    }

    #[test]
    fn test_signed_output_path() {
        assert_eq!(
            signed_output_path(Path::new("/docs/contract.pdf")),
            PathBuf::from("/docs/contract_signed.pdf")
        );
        assert_eq!(
            signed_output_path(Path::new("report.v2.pdf")),
            PathBuf::from("report.v2_signed.pdf")
        );
    }

    #[test]
    fn test_write_key_files_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles::for_base(dir.path().join("k"));
        fs::write(&files.public_key, b"keep me").unwrap();

        let pair = crate::keys::test_keys::primary();
        let pin = Pin::parse("123456").unwrap();
        let err = write_key_files(pair, &pin, &files).unwrap_err();

        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::AlreadyExists));
        assert_eq!(fs::read(&files.public_key).unwrap(), b"keep me");
        assert!(!files.private_key.exists());
    }

    #[test]
    fn test_failed_public_key_write_leaves_no_private_key() {
        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles {
            public_key: dir.path().join("missing").join("k_public.pem"),
            private_key: dir.path().join("k_private.bin"),
        };

        let pin = Pin::parse("123456").unwrap();
        let err = write_key_files(crate::keys::test_keys::primary(), &pin, &files).unwrap_err();

        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
        assert!(!files.private_key.exists());
        assert!(!files.public_key.exists());
    }

    #[test]
    fn test_sign_and_verify_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles::for_base(dir.path().join("k"));
        let pin = Pin::parse("654321").unwrap();
        write_key_files(crate::keys::test_keys::primary(), &pin, &files).unwrap();

        let pdf = dir.path().join("doc.pdf");
        fs::write(&pdf, b"%PDF-1.4\n%stub\n").unwrap();

        let signed = sign_pdf_file(&pdf, &files.private_key, &pin, &SignOptions::default()).unwrap();
        assert_eq!(signed, dir.path().join("doc_signed.pdf"));
        assert!(verify_pdf_file(&signed, &files.public_key).unwrap());

        let wrong = Pin::parse("000000").unwrap();
        assert!(matches!(
            sign_pdf_file(&pdf, &files.private_key, &wrong, &SignOptions::default()),
            Err(Error::KeyDecryption(_))
        ));
    }
}
