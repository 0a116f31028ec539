//! Signature placeholder insertion and signature splicing.
//!
//! A [`SignatureSplicer`] owns the document bytes and moves through four
//! states:
//!
//! ```text
//! Unsigned --insert_placeholder--> PlaceholderInserted
//!          --finalize_byte_range--> ByteRangeFinalized
//!          --embed_signature------> Signed
//! ```
//!
//! The placeholder is appended as an incremental update, so the input is a
//! byte-exact prefix of the output. After that only two fixed-width fields
//! inside the new signature dictionary are ever overwritten, and every
//! recorded offset stays valid until the end.

use std::ops::Range;

use chrono::{DateTime, FixedOffset, Local};

use super::byterange::{ByteRange, ByteRangeCalculator, BYTE_RANGE_PLACEHOLDER};
use super::contents::encode_contents;
use super::types::SignOptions;
use crate::digest::{hash_with, DigestAlgorithm};
use crate::error::{Error, Result};
use crate::xref::{IncrementalUpdate, TrailerInfo};

/// How far into the file the `%PDF-` header may start.
const HEADER_SEARCH_LIMIT: usize = 1024;

/// Where the splicer is in the signing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplicerState {
    /// No placeholder yet
    Unsigned,
    /// Signature dictionary appended, `/ByteRange` still zeros
    PlaceholderInserted,
    /// `/ByteRange` written; the document can be hashed
    ByteRangeFinalized,
    /// Signature written into the slot
    Signed,
}

/// Location of the reserved fields inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderSlot {
    /// Offset of the `<` opening the `/Contents` hex string
    pub contents_offset: usize,
    /// Width of the hex string including both brackets
    pub contents_len: usize,
    /// Offset of the `[` opening the `/ByteRange` array
    pub byte_range_offset: usize,
    /// Reserved width of the `/ByteRange` field
    pub byte_range_len: usize,
    /// Object number of the signature dictionary
    pub object_number: u32,
}

impl PlaceholderSlot {
    /// The bytes left out of the digest.
    pub fn excluded(&self) -> Range<usize> {
        self.contents_offset..self.contents_offset + self.contents_len
    }
}

/// Splices a signature into a PDF as an incremental update.
#[derive(Debug)]
pub struct SignatureSplicer {
    document: Vec<u8>,
    original_len: usize,
    state: SplicerState,
    calculator: ByteRangeCalculator,
    slot: Option<PlaceholderSlot>,
    byte_range: Option<ByteRange>,
}

impl SignatureSplicer {
    /// Take ownership of a PDF.
    ///
    /// Fails with [`Error::InvalidPdf`] when no `%PDF-` header is found near
    /// the start of the data.
    pub fn new(document: Vec<u8>) -> Result<Self> {
        let window = &document[..document.len().min(HEADER_SEARCH_LIMIT)];
        if !window.windows(5).any(|w| w == b"%PDF-") {
            return Err(Error::InvalidPdf("missing %PDF- header".to_string()));
        }

        Ok(Self {
            original_len: document.len(),
            document,
            state: SplicerState::Unsigned,
            calculator: ByteRangeCalculator::default(),
            slot: None,
            byte_range: None,
        })
    }

    /// Current state.
    pub fn state(&self) -> SplicerState {
        self.state
    }

    /// The document as it currently stands.
    pub fn bytes(&self) -> &[u8] {
        &self.document
    }

    /// Length of the document handed to [`SignatureSplicer::new`].
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// The reserved slot, once inserted.
    pub fn slot(&self) -> Option<&PlaceholderSlot> {
        self.slot.as_ref()
    }

    /// The finalized byte range.
    pub fn byte_range(&self) -> Option<ByteRange> {
        self.byte_range
    }

    fn expect_state(&self, expected: SplicerState) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState {
                expected,
                found: self.state,
            });
        }
        Ok(())
    }

    fn current_slot(&self) -> Result<PlaceholderSlot> {
        self.slot.ok_or(Error::InvalidState {
            expected: SplicerState::PlaceholderInserted,
            found: self.state,
        })
    }

    /// Append the signature dictionary, an `xref` section and a trailer.
    pub fn insert_placeholder(&mut self, options: &SignOptions) -> Result<PlaceholderSlot> {
        self.expect_state(SplicerState::Unsigned)?;

        options.validate()?;

        let trailer = TrailerInfo::read(&self.document)?;
        if trailer.encrypted {
            return Err(Error::InvalidPdf("encrypted PDFs cannot be signed".to_string()));
        }

        let calculator = ByteRangeCalculator::new(options.slot_size)?;
        let (body, layout) = build_signature_dictionary(options, &calculator);

        let mut update = IncrementalUpdate::begin(&mut self.document, trailer);
        let object_number = update.allocate();
        let body_offset = update.add_object(object_number, body.as_bytes());
        update.finish();

        let slot = PlaceholderSlot {
            contents_offset: body_offset + layout.contents,
            contents_len: calculator.placeholder_size(),
            byte_range_offset: body_offset + layout.byte_range,
            byte_range_len: BYTE_RANGE_PLACEHOLDER.len(),
            object_number,
        };

        log::info!(
            "Inserted signature placeholder: object {} with {}-byte slot at offset {}",
            object_number,
            options.slot_size,
            slot.contents_offset
        );

        self.calculator = calculator;
        self.slot = Some(slot);
        self.state = SplicerState::PlaceholderInserted;
        Ok(slot)
    }

    /// Write the final `/ByteRange` into its reserved field.
    ///
    /// The document length does not change.
    pub fn finalize_byte_range(&mut self) -> Result<ByteRange> {
        self.expect_state(SplicerState::PlaceholderInserted)?;
        let slot = self.current_slot()?;

        let range = self
            .calculator
            .calculate_byte_range(self.document.len(), slot.contents_offset);
        let text = range.to_fixed_width(slot.byte_range_len)?;

        let field = slot.byte_range_offset..slot.byte_range_offset + slot.byte_range_len;
        self.document[field].copy_from_slice(text.as_bytes());

        log::debug!("Finalized ByteRange {}", range.to_pdf_string());

        self.byte_range = Some(range);
        self.state = SplicerState::ByteRangeFinalized;
        Ok(range)
    }

    /// Digest of everything except the slot.
    pub fn signing_digest(&self, algorithm: DigestAlgorithm) -> Result<Vec<u8>> {
        self.expect_state(SplicerState::ByteRangeFinalized)?;
        let slot = self.current_slot()?;
        hash_with(algorithm, &self.document, slot.excluded())
    }

    /// Write the signature into the slot.
    ///
    /// On [`Error::SlotTooSmall`] nothing is written and the splicer stays
    /// in [`SplicerState::ByteRangeFinalized`]; the document has to be
    /// prepared again with a larger slot.
    pub fn embed_signature(&mut self, signature: &[u8]) -> Result<()> {
        self.expect_state(SplicerState::ByteRangeFinalized)?;
        let slot = self.current_slot()?;

        let hex = encode_contents(signature)?;
        self.calculator
            .insert_signature(&mut self.document, slot.contents_offset, &hex)?;

        log::debug!(
            "Embedded {}-byte signature into object {}",
            signature.len(),
            slot.object_number
        );

        self.state = SplicerState::Signed;
        Ok(())
    }

    /// The finished document.
    pub fn into_signed_bytes(self) -> Result<Vec<u8>> {
        self.expect_state(SplicerState::Signed)?;
        Ok(self.document)
    }
}

/// Offsets of the reserved values relative to the start of the dictionary.
#[derive(Debug, Clone, Copy)]
struct DictionaryLayout {
    byte_range: usize,
    contents: usize,
}

/// Build the signature dictionary with both placeholders in place.
fn build_signature_dictionary(
    options: &SignOptions,
    calculator: &ByteRangeCalculator,
) -> (String, DictionaryLayout) {
    let mut dict = String::from("<<\n");

    dict.push_str("/Type /Sig\n");
    dict.push_str("/Filter /Adobe.PPKLite\n");
    dict.push_str(&format!("/SubFilter /{}\n", options.algorithm.as_pdf_name()));

    dict.push_str("/ByteRange ");
    let byte_range = dict.len();
    dict.push_str(BYTE_RANGE_PLACEHOLDER);
    dict.push('\n');

    let text_fields = [
        ("Name", &options.name),
        ("Reason", &options.reason),
        ("Location", &options.location),
        ("ContactInfo", &options.contact_info),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value {
            dict.push_str(&format!("/{} {}\n", key, encode_text_string(value)));
        }
    }

    let signing_time = options
        .signing_time
        .unwrap_or_else(|| Local::now().into());
    dict.push_str(&format!("/M ({})\n", format_pdf_date(&signing_time)));

    if let Some(key_id) = &options.key_id {
        dict.push_str(&format!("/SignerKeyId <{}>\n", key_id));
    }

    dict.push_str("/Contents ");
    let contents = dict.len();
    dict.push_str(&calculator.generate_placeholder());
    dict.push_str("\n>>");

    (
        dict,
        DictionaryLayout {
            byte_range,
            contents,
        },
    )
}

/// Encode a text string for a signature dictionary.
///
/// ASCII text becomes an escaped literal string; anything else is written
/// as UTF-16BE with a byte order mark.
fn encode_text_string(s: &str) -> String {
    if s.is_ascii() {
        return format!("({})", escape_pdf_string(s));
    }

    let mut hex = String::from("<FEFF");
    for unit in s.encode_utf16() {
        hex.push_str(&format!("{:04X}", unit));
    }
    hex.push('>');
    hex
}

/// Escape special characters in a PDF literal string.
fn escape_pdf_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 10);
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '(' => result.push_str("\\("),
            ')' => result.push_str("\\)"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a time as a PDF date string: `D:YYYYMMDDHHmmSS+HH'mm'`.
fn format_pdf_date(time: &DateTime<FixedOffset>) -> String {
    let offset = time.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let minutes = offset.abs() / 60;
    format!(
        "{}{}{:02}'{:02}'",
        time.format("D:%Y%m%d%H%M%S"),
        sign,
        minutes / 60,
        minutes % 60
    )
}
