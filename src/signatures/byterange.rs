//! ByteRange calculation for PDF signatures.
//!
//! PDF digital signatures use a ByteRange array to specify which portions
//! of the document are covered by the signature. The signature itself is
//! stored in a placeholder that is excluded from the signed bytes.
//!
//! ## ByteRange Format
//!
//! The ByteRange is an array of four integers:
//! `[offset1, length1, offset2, length2]`
//!
//! Where:
//! - `offset1` = 0 (start of file)
//! - `length1` = byte offset where the signature value begins
//! - `offset2` = byte offset where the signature value ends
//! - `length2` = remaining bytes to end of file
//!
//! The signature value is a hex-encoded string within `<` and `>` delimiters,
//! and the delimiters belong to the excluded gap.
//!
//! The array is written before its values are known, so the signature
//! dictionary reserves [`BYTE_RANGE_PLACEHOLDER`] and the final array is
//! space-padded to the same width. No byte moves when it is filled in.

use std::ops::Range;

use serde::Serialize;

use crate::error::{Error, Result};

/// Fixed-width `/ByteRange` value reserved in a fresh signature dictionary.
///
/// Ten digits per field hold any offset below 10 GB.
pub const BYTE_RANGE_PLACEHOLDER: &str = "[0 0000000000 0000000000 0000000000]";

/// A validated-on-demand `/ByteRange` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange([u64; 4]);

impl ByteRange {
    /// Wrap four raw values.
    pub fn new(values: [u64; 4]) -> Self {
        Self(values)
    }

    /// The range covering a `file_size`-byte file except `excluded`.
    pub fn around(file_size: usize, excluded: Range<usize>) -> Self {
        Self([
            0,
            excluded.start as u64,
            excluded.end as u64,
            file_size.saturating_sub(excluded.end) as u64,
        ])
    }

    /// The four values.
    pub fn values(&self) -> [u64; 4] {
        self.0
    }

    /// The gap between the two runs.
    pub fn excluded(&self) -> Range<usize> {
        self.0[1] as usize..self.0[2] as usize
    }

    /// Offset one past the last signed byte.
    pub fn covered_end(&self) -> u64 {
        self.0[2].saturating_add(self.0[3])
    }

    /// Whether the range runs to the end of a `file_len`-byte file.
    pub fn covers(&self, file_len: usize) -> bool {
        self.covered_end() == file_len as u64
    }

    /// Check the range against a document of `file_len` bytes.
    ///
    /// The first run must start at 0, the runs must not overlap, and the
    /// second run must end inside the document. A range that stops short of
    /// the end is structurally fine: it describes an earlier revision.
    pub fn validate(&self, file_len: usize) -> Result<()> {
        let [offset1, length1, offset2, length2] = self.0;

        if offset1 != 0 {
            return Err(Error::MalformedSignature(format!(
                "ByteRange must start at 0, got {}",
                offset1
            )));
        }

        if length1 > offset2 {
            return Err(Error::MalformedSignature(format!(
                "ByteRange first range ({}) overlaps with second range start ({})",
                length1, offset2
            )));
        }

        let end = offset2.checked_add(length2).ok_or_else(|| {
            Error::MalformedSignature("ByteRange second range overflows".to_string())
        })?;
        if end > file_len as u64 {
            return Err(Error::MalformedSignature(format!(
                "ByteRange ends at {} but the file has only {} bytes",
                end, file_len
            )));
        }

        Ok(())
    }

    /// Format as a PDF array string.
    pub fn to_pdf_string(&self) -> String {
        format!("[{} {} {} {}]", self.0[0], self.0[1], self.0[2], self.0[3])
    }

    /// Format as a PDF array, right-padded with spaces to `width` bytes.
    pub fn to_fixed_width(&self, width: usize) -> Result<String> {
        let formatted = self.to_pdf_string();
        if formatted.len() > width {
            return Err(Error::InvalidPdf(format!(
                "ByteRange {} does not fit in its {}-byte field",
                formatted, width
            )));
        }
        Ok(format!("{:<width$}", formatted, width = width))
    }
}

/// Calculator for the `/Contents` placeholder and the ranges around it.
#[derive(Debug)]
pub struct ByteRangeCalculator {
    /// Size of the placeholder for the signature value (hex digits + 2 for angle brackets)
    placeholder_size: usize,
}

impl ByteRangeCalculator {
    /// Create a calculator for a slot of `slot_size` bytes.
    ///
    /// The placeholder size will be calculated as: (slot_size * 2) + 2
    /// because the value is hex-encoded and enclosed in angle brackets.
    pub fn new(slot_size: usize) -> Result<Self> {
        let placeholder_size = slot_size
            .checked_mul(2)
            .and_then(|digits| digits.checked_add(2))
            .ok_or_else(|| {
                Error::Config(format!("signature slot of {} bytes is too large", slot_size))
            })?;
        Ok(Self { placeholder_size })
    }

    /// Create a calculator with a specific placeholder size.
    pub fn with_placeholder_size(placeholder_size: usize) -> Self {
        Self { placeholder_size }
    }

    /// Get the placeholder size (for the /Contents value).
    pub fn placeholder_size(&self) -> usize {
        self.placeholder_size
    }

    /// Hex digits available between the angle brackets.
    pub fn hex_capacity(&self) -> usize {
        self.placeholder_size.saturating_sub(2)
    }

    /// `<000...000>` filling the whole placeholder.
    pub fn generate_placeholder(&self) -> String {
        format!("<{}>", "0".repeat(self.hex_capacity()))
    }

    /// Calculate the ByteRange given the position of the /Contents value.
    ///
    /// `contents_offset` is the offset of the opening `<`.
    pub fn calculate_byte_range(&self, file_size: usize, contents_offset: usize) -> ByteRange {
        ByteRange::around(file_size, contents_offset..contents_offset + self.placeholder_size)
    }

    /// Replace the placeholder at `contents_offset` with `signature_hex`,
    /// padded with `0` digits to the placeholder width.
    pub fn insert_signature(
        &self,
        pdf_data: &mut [u8],
        contents_offset: usize,
        signature_hex: &str,
    ) -> Result<()> {
        if signature_hex.len() > self.hex_capacity() {
            return Err(Error::SlotTooSmall {
                required: signature_hex.len(),
                available: self.hex_capacity(),
            });
        }

        let end = contents_offset + self.placeholder_size;
        let slot = pdf_data.get_mut(contents_offset..end).ok_or_else(|| {
            Error::InvalidPdf("Signature insertion would exceed file bounds".to_string())
        })?;
        if slot.first() != Some(&b'<') || slot.last() != Some(&b'>') {
            return Err(Error::InvalidPdf(format!(
                "No signature placeholder at offset {}",
                contents_offset
            )));
        }

        let body = &mut slot[1..self.placeholder_size - 1];
        body.fill(b'0');
        body[..signature_hex.len()].copy_from_slice(signature_hex.as_bytes());
        Ok(())
    }
}

impl Default for ByteRangeCalculator {
    fn default() -> Self {
        Self::with_placeholder_size(crate::signatures::DEFAULT_SLOT_SIZE * 2 + 2)
    }
}
