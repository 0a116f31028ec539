//! PDF object types.
//!
//! Dictionaries keep their entries in file order together with the byte span
//! each value occupies, so callers can overwrite or exclude a value in place.

use std::ops::Range;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (decoded bytes of a literal or hex string)
    String(Vec<u8>),
    /// Name (without the leading /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary
    Dictionary(Dictionary),
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

/// One `/Key value` pair of a dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct DictEntry {
    /// Key without the leading /
    pub key: String,
    /// Parsed value
    pub value: Object,
    /// Absolute byte span of the value in the source buffer
    pub span: Range<usize>,
}

/// A PDF dictionary in file order.
///
/// Duplicate keys are kept; lookups return the last one, which is what
/// readers do in practice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<DictEntry>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, key: impl Into<String>, value: Object, span: Range<usize>) {
        self.entries.push(DictEntry {
            key: key.into(),
            value,
            span,
        });
    }

    /// Look up an entry by key.
    pub fn entry(&self, key: &str) -> Option<&DictEntry> {
        self.entries.iter().rev().find(|e| e.key == key)
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entry(key).map(|e| &e.value)
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[DictEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Object {
    /// Get the type name of this object.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Try to cast to string bytes.
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Try to cast to dictionary.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// String value decoded as text.
    ///
    /// Strings starting with the UTF-16BE byte order mark are decoded as
    /// UTF-16; anything else is read as (lossy) UTF-8.
    pub fn as_text(&self) -> Option<String> {
        self.as_string().map(decode_text_string)
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, or UTF-8).
pub fn decode_text_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        },
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_last_key_wins() {
        let mut dict = Dictionary::new();
        dict.push("Size", Object::Integer(3), 0..1);
        dict.push("Size", Object::Integer(7), 5..6);
        assert_eq!(dict.get("Size"), Some(&Object::Integer(7)));
        assert_eq!(dict.entry("Size").map(|e| e.span.clone()), Some(5..6));
        assert_eq!(dict.len(), 2);
        assert!(!dict.contains_key("Root"));
    }

    #[test]
    fn test_casts() {
        assert_eq!(Object::Integer(5).as_integer(), Some(5));
        assert_eq!(Object::Name("Sig".into()).as_name(), Some("Sig"));
        assert_eq!(Object::String(b"abc".to_vec()).as_text().as_deref(), Some("abc"));
        assert_eq!(Object::Reference(ObjectRef::new(1, 0)).as_reference(), Some(ObjectRef::new(1, 0)));
        assert!(Object::Null.as_dict().is_none());
        assert_eq!(Object::Array(vec![]).type_name(), "Array");
    }

    #[test]
    fn test_decode_text_string() {
        assert_eq!(decode_text_string(b"plain"), "plain");
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x5A, 0x00, 0xFC]), "Z\u{fc}");
    }

    #[test]
    fn test_object_ref_display() {
        assert_eq!(ObjectRef::new(12, 0).to_string(), "12 0 R");
    }
}
