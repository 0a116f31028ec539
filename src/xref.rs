//! Cross-reference sections and trailers for incremental updates.
//!
//! Signing never rewrites existing bytes. It appends new objects followed by
//! a classic `xref` section and a trailer whose `/Prev` points at the previous
//! cross-reference data (PDF 32000-1, 7.5.6). To do that we only need a few
//! facts about the latest revision, collected in [`TrailerInfo`].

use std::ops::Range;

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::parser::parse_dictionary_at;

lazy_static! {
    /// Regex for finding "N G obj" headers
    static ref RE_OBJ_PATTERN: Regex = Regex::new(r"(\d+)\s+(\d+)\s+obj\b").unwrap();

    /// Regex for finding "trailer <<" patterns
    static ref RE_TRAILER: Regex = Regex::new(r"trailer\s*<<").unwrap();
}

/// What an incremental update needs to know about the latest revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrailerInfo {
    /// Offset named by the last `startxref`, used as `/Prev`
    pub startxref: Option<u64>,
    /// First unused object number
    pub size: u32,
    /// Document catalog
    pub root: Option<ObjectRef>,
    /// Document information dictionary
    pub info: Option<ObjectRef>,
    /// Raw `/ID` array, copied as written
    pub id: Option<Vec<u8>>,
    /// Whether the trailer has an `/Encrypt` entry
    pub encrypted: bool,
}

impl TrailerInfo {
    /// Read the trailer facts of the latest revision of `data`.
    ///
    /// Classic trailers and cross-reference streams are both understood.
    /// A file without either is accepted with an empty trailer so that a
    /// bare header can still be signed; `/Root` and `/Prev` are then omitted.
    pub fn read(data: &[u8]) -> Result<Self> {
        let startxref = find_startxref(data);
        let max_obj = max_object_number(data);

        let dict = match latest_trailer_dictionary(data, startxref)? {
            Some(dict) => dict,
            None => {
                log::warn!("No trailer found; the update will carry no /Root or /Prev");
                return Ok(Self {
                    startxref,
                    size: max_obj.map_or(1, |n| n.saturating_add(1)),
                    ..Self::default()
                });
            },
        };

        let declared_size = dict
            .get("Size")
            .and_then(Object::as_integer)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);
        let scanned_size = max_obj.map_or(0, |n| n.saturating_add(1));
        let size = declared_size.max(scanned_size).max(1);

        let info = Self {
            startxref,
            size,
            root: dict.get("Root").and_then(Object::as_reference),
            info: dict.get("Info").and_then(Object::as_reference),
            id: dict.entry("ID").map(|e| data[e.span.clone()].to_vec()),
            encrypted: dict.contains_key("Encrypt"),
        };

        log::debug!(
            "Trailer: startxref={:?} size={} root={:?}",
            info.startxref,
            info.size,
            info.root
        );
        Ok(info)
    }
}

/// Offset named by the last `startxref` keyword, if any.
pub fn find_startxref(data: &[u8]) -> Option<u64> {
    const KEYWORD: &[u8] = b"startxref";

    let pos = data.windows(KEYWORD.len()).rposition(|w| w == KEYWORD)?;
    let digits: String = data[pos + KEYWORD.len()..]
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .take_while(|b| b.is_ascii_digit())
        .map(|&b| b as char)
        .collect();

    digits.parse().ok()
}

/// Highest object number declared by an `N G obj` header.
pub fn max_object_number(data: &[u8]) -> Option<u32> {
    RE_OBJ_PATTERN
        .captures_iter(data)
        .filter_map(|caps| std::str::from_utf8(&caps[1]).ok()?.parse::<u32>().ok())
        .max()
}

/// Every `N G obj` header with its object number and byte span.
pub fn object_headers(data: &[u8]) -> Vec<(u32, Range<usize>)> {
    RE_OBJ_PATTERN
        .captures_iter(data)
        .filter_map(|caps| {
            let number = std::str::from_utf8(&caps[1]).ok()?.parse::<u32>().ok()?;
            Some((number, caps.get(0)?.range()))
        })
        .collect()
}

fn latest_trailer_dictionary(data: &[u8], startxref: Option<u64>) -> Result<Option<Dictionary>> {
    if let Some(m) = RE_TRAILER.find_iter(data).last() {
        let dict_start = m.end() - 2;
        let (dict, _) = parse_dictionary_at(data, dict_start)
            .map_err(|e| Error::InvalidPdf(format!("unreadable trailer: {}", e)))?;
        return Ok(Some(dict));
    }

    // Cross-reference stream: the dictionary of the object at startxref.
    let Some(offset) = startxref.and_then(|o| usize::try_from(o).ok()) else {
        return Ok(None);
    };
    let Some(window) = data.get(offset..) else {
        return Ok(None);
    };
    let Some(header) = RE_OBJ_PATTERN.find(window).filter(|m| m.start() == 0) else {
        return Ok(None);
    };

    match parse_dictionary_at(data, offset + header.end()) {
        Ok((dict, _)) if dict.get("Type").and_then(Object::as_name) == Some("XRef") => {
            Ok(Some(dict))
        },
        _ => Ok(None),
    }
}

/// Appends one incremental update to a document buffer.
///
/// Objects are written with [`IncrementalUpdate::add_object`]; offsets are
/// absolute positions in the buffer, which already holds the whole previous
/// document. [`IncrementalUpdate::finish`] writes the `xref` section and the
/// trailer.
pub struct IncrementalUpdate<'a> {
    document: &'a mut Vec<u8>,
    trailer: TrailerInfo,
    entries: Vec<(u32, u64)>,
}

impl<'a> IncrementalUpdate<'a> {
    /// Start an update at the end of `document`.
    pub fn begin(document: &'a mut Vec<u8>, trailer: TrailerInfo) -> Self {
        if !document.ends_with(b"\n") && !document.ends_with(b"\r") {
            document.push(b'\n');
        }
        Self {
            document,
            trailer,
            entries: Vec::new(),
        }
    }

    /// Allocate the next free object number.
    pub fn allocate(&mut self) -> u32 {
        let number = self.trailer.size;
        self.trailer.size += 1;
        number
    }

    /// Write `number 0 obj <body> endobj`.
    ///
    /// Returns the absolute offset at which `body` starts.
    pub fn add_object(&mut self, number: u32, body: &[u8]) -> usize {
        let header_offset = self.document.len();
        self.document.extend_from_slice(format!("{} 0 obj\n", number).as_bytes());
        let body_offset = self.document.len();
        self.document.extend_from_slice(body);
        self.document.extend_from_slice(b"\nendobj\n");

        self.entries.push((number, header_offset as u64));
        body_offset
    }

    /// Write the cross-reference section and trailer.
    ///
    /// Returns the offset of the new `xref` keyword.
    pub fn finish(mut self) -> u64 {
        let xref_offset = self.document.len() as u64;
        self.entries.sort_by_key(|(number, _)| *number);

        let mut out = String::from("xref\n");
        for (number, offset) in &self.entries {
            out.push_str(&format!("{} 1\n{:010} {:05} n \n", number, offset, 0));
        }

        let size = self
            .entries
            .iter()
            .map(|(n, _)| n + 1)
            .max()
            .unwrap_or(0)
            .max(self.trailer.size);

        out.push_str("trailer\n<<\n");
        out.push_str(&format!("  /Size {}\n", size));
        if let Some(prev) = self.trailer.startxref {
            out.push_str(&format!("  /Prev {}\n", prev));
        }
        if let Some(root) = self.trailer.root {
            out.push_str(&format!("  /Root {}\n", root));
        }
        if let Some(info) = self.trailer.info {
            out.push_str(&format!("  /Info {}\n", info));
        }
        self.document.extend_from_slice(out.as_bytes());
        if let Some(id) = &self.trailer.id {
            self.document.extend_from_slice(b"  /ID ");
            self.document.extend_from_slice(id);
            self.document.push(b'\n');
        }
        self.document
            .extend_from_slice(format!(">>\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());

        xref_offset
    }
}
