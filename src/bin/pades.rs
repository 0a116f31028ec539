//! PAdES signing tool
//!
//! Generates PIN-protected key pairs, signs PDFs and verifies signatures.
//!
//! Usage:
//!   pades keygen --name alice
//!   PADES_PIN=123456 pades sign contract.pdf --key alice_private.bin --reason Approved
//!   pades verify contract_signed.pdf --public-key alice_public.pem
//!   pades --json inspect contract_signed.pdf
//!
//! Exit codes: 0 success, 1 signature invalid, 2 malformed or unusable input,
//! 3 wrong or badly formed PIN, 4 I/O failure.

use std::fs;
use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use zeroize::Zeroizing;

use pades_oxide::api::{generate_key_files_with, sign_pdf_file};
use pades_oxide::keys::{import_public_key, Pin};
use pades_oxide::signatures::{extract_all_signatures, verify_all, verify_detailed, SignOptions};
use pades_oxide::{DigestAlgorithm, Error, SignatureScheme, SignerConfig};

#[derive(Debug, Parser)]
#[command(name = "pades", version, about = "PAdES-style PDF signing with PIN-protected RSA keys")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate <NAME>_public.pem and <NAME>_private.bin
    Keygen {
        /// Base path of the key files
        #[arg(long)]
        name: PathBuf,

        /// RSA modulus size
        #[arg(long, default_value_t = pades_oxide::keys::DEFAULT_KEY_BITS)]
        bits: usize,
    },

    /// Sign a PDF, writing <STEM>_signed.pdf next to it
    Sign {
        /// PDF to sign
        pdf: PathBuf,

        /// Encrypted private key container
        #[arg(long)]
        key: PathBuf,

        #[command(flatten)]
        algorithm: AlgorithmArgs,

        /// Bytes reserved for the signature
        #[arg(long, default_value_t = pades_oxide::signatures::DEFAULT_SLOT_SIZE)]
        slot_size: usize,

        /// Signer name
        #[arg(long)]
        signer: Option<String>,

        /// Reason for signing
        #[arg(long)]
        reason: Option<String>,

        /// Signing location
        #[arg(long)]
        location: Option<String>,

        /// Contact information
        #[arg(long)]
        contact: Option<String>,
    },

    /// Verify a signed PDF against a public key
    Verify {
        /// Signed PDF
        pdf: PathBuf,

        /// PEM public key
        #[arg(long)]
        public_key: PathBuf,

        /// Verify every signature, not only the newest
        #[arg(long)]
        all: bool,
    },

    /// List the signatures of a PDF without verifying them
    Inspect {
        /// Signed PDF
        pdf: PathBuf,
    },
}

#[derive(Debug, clap::Args)]
struct AlgorithmArgs {
    /// RSA signature scheme
    #[arg(long, value_enum, default_value_t = SchemeArg::Pss)]
    scheme: SchemeArg,

    /// Byte-range digest
    #[arg(long, value_enum, default_value_t = DigestArg::Sha256)]
    digest: DigestArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemeArg {
    Pss,
    Pkcs1v15,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DigestArg {
    Sha256,
    Sha384,
    Sha512,
}

impl AlgorithmArgs {
    fn apply(&self, config: SignerConfig) -> SignerConfig {
        let scheme = match self.scheme {
            SchemeArg::Pss => SignatureScheme::RsaPss,
            SchemeArg::Pkcs1v15 => SignatureScheme::RsaPkcs1v15,
        };
        let digest = match self.digest {
            DigestArg::Sha256 => DigestAlgorithm::Sha256,
            DigestArg::Sha384 => DigestAlgorithm::Sha384,
            DigestArg::Sha512 => DigestAlgorithm::Sha512,
        };
        config.with_scheme(scheme).with_digest(digest)
    }
}

/// Read the PIN from `PADES_PIN`, piped stdin, or an interactive prompt.
fn read_pin(prompt: &str) -> Result<Pin, Error> {
    if let Ok(pin) = std::env::var("PADES_PIN") {
        let pin = Zeroizing::new(pin);
        if !pin.is_empty() {
            return Pin::parse(&pin);
        }
    }

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        stdin.lock().read_line(&mut buf)?;
        return Pin::parse(buf.trim_end());
    }

    let pin = Zeroizing::new(rpassword::prompt_password(prompt)?);
    Pin::parse(&pin)
}

fn exit_code(err: &Error) -> u8 {
    match err {
        Error::KeyDecryption(_) | Error::InvalidPin(_) => 3,
        Error::Io(_) => 4,
        _ => 2,
    }
}

fn run(cli: Cli) -> Result<ExitCode, Error> {
    match cli.command {
        Commands::Keygen { name, bits } => {
            let config = SignerConfig::new().with_key_bits(bits);
            config.validate()?;
            let pin = read_pin("PIN (6 digits): ")?;
            let files = generate_key_files_with(&pin, &name, &config)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "public_key": files.public_key,
                        "private_key": files.private_key,
                    })
                );
            } else {
                println!(
                    "Keys {} and {} have been generated",
                    files.private_key.display(),
                    files.public_key.display()
                );
            }
            Ok(ExitCode::SUCCESS)
        },
        Commands::Sign {
            pdf,
            key,
            algorithm,
            slot_size,
            signer,
            reason,
            location,
            contact,
        } => {
            let config = algorithm.apply(SignerConfig::new().with_slot_size(slot_size));
            let mut options: SignOptions = config.to_sign_options();
            options.name = signer;
            options.reason = reason;
            options.location = location;
            options.contact_info = contact;
            options.validate()?;

            let pin = read_pin("PIN: ")?;
            let output = sign_pdf_file(&pdf, &key, &pin, &options)?;
            if cli.json {
                println!("{}", serde_json::json!({ "signed": output }));
            } else {
                println!("Signed PDF saved as {}", output.display());
            }
            Ok(ExitCode::SUCCESS)
        },
        Commands::Verify {
            pdf,
            public_key,
            all,
        } => {
            let public_key = import_public_key(&fs::read(&public_key)?)?;
            let document = fs::read(&pdf)?;

            let reports = if all {
                verify_all(&document, &public_key)?
            } else {
                vec![verify_detailed(&document, &public_key)?]
            };

            if cli.json {
                println!("{}", to_json(&reports)?);
            } else {
                for report in &reports {
                    let info = &report.signature_info;
                    println!(
                        "Signature {}: {}",
                        info.object_number.map(|n| n.to_string()).unwrap_or_default(),
                        report.status
                    );
                    for message in &report.messages {
                        println!("  {}", message);
                    }
                }
            }

            // Earlier signatures are expected to be followed by later updates.
            let newest_valid = reports.last().is_some_and(|r| r.status.is_valid());
            let all_ok = reports.iter().all(|r| r.status.is_ok());
            Ok(if newest_valid && all_ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        },
        Commands::Inspect { pdf } => {
            let document = fs::read(&pdf)?;
            let signatures = extract_all_signatures(&document)?;
            let infos: Vec<_> = signatures.iter().map(|s| &s.info).collect();

            if cli.json {
                println!("{}", to_json(&infos)?);
            } else {
                for (i, sig) in signatures.iter().enumerate() {
                    let info = &sig.info;
                    println!("Signature #{} (object {:?})", i + 1, info.object_number);
                    println!("  Algorithm:  {}", sig.algorithm);
                    println!("  ByteRange:  {}", sig.byte_range.to_pdf_string());
                    println!("  Whole file: {}", info.covers_whole_document);
                    for (label, value) in [
                        ("Signer", &info.signer_name),
                        ("Time", &info.signing_time),
                        ("Reason", &info.reason),
                        ("Location", &info.location),
                        ("Contact", &info.contact_info),
                        ("Key id", &info.key_id),
                    ] {
                        if let Some(value) = value {
                            println!("  {:<11} {}", format!("{}:", label), value);
                        }
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Io(e.into()))
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_code(&e))
        },
    }
}
