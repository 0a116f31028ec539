//! PDF object parser.
//!
//! Builds [`Object`]s from [`lexer`](crate::lexer) tokens. Only direct objects
//! are supported; streams are never needed to read a trailer or a signature
//! dictionary.

use std::ops::Range;

use crate::error::{Error, Result};
use crate::lexer::{token_at, Token};
use crate::object::{Dictionary, Object, ObjectRef};

/// Nesting limit for arrays and dictionaries.
const MAX_DEPTH: usize = 64;

/// Decode escape sequences in a literal string (ISO 32000-1, 7.3.4.2).
///
/// Handles `\n \r \t \b \f \( \) \\`, octal `\ddd`, and line continuations.
/// An unknown escape drops the backslash.
///
/// ```
/// # use pades_oxide::parser::decode_literal_string_escapes;
/// assert_eq!(decode_literal_string_escapes(b"a\\(b\\)\\101"), b"a(b)A");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut iter = raw.iter().copied().peekable();

    while let Some(c) = iter.next() {
        if c != b'\\' {
            out.push(c);
            continue;
        }
        let Some(next) = iter.next() else {
            break;
        };
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'\n' => {},
            b'\r' => {
                if iter.peek() == Some(&b'\n') {
                    iter.next();
                }
            },
            b'0'..=b'7' => {
                let mut code = u32::from(next - b'0');
                for _ in 0..2 {
                    match iter.peek() {
                        Some(&d @ b'0'..=b'7') => {
                            code = code * 8 + u32::from(d - b'0');
                            iter.next();
                        },
                        _ => break,
                    }
                }
                out.push((code & 0xFF) as u8);
            },
            other => out.push(other),
        }
    }

    out
}

/// Decode the digits of a hex string.
///
/// Whitespace is ignored and an odd trailing digit is padded with 0.
pub fn decode_hex(digits: &[u8]) -> Result<Vec<u8>> {
    let mut clean: Vec<u8> = digits.iter().copied().filter(|c| !c.is_ascii_whitespace()).collect();
    if clean.len() % 2 == 1 {
        clean.push(b'0');
    }
    hex::decode(&clean).map_err(|e| Error::ParseError {
        offset: 0,
        reason: format!("Invalid hex string: {}", e),
    })
}

/// Parse the object that starts at or after `offset`.
///
/// Returns the object and its absolute span in `data`.
pub fn parse_object_at(data: &[u8], offset: usize) -> Result<(Object, Range<usize>)> {
    parse_value(data, offset, 0)
}

/// Parse a dictionary that starts at or after `offset`.
pub fn parse_dictionary_at(data: &[u8], offset: usize) -> Result<(Dictionary, Range<usize>)> {
    match parse_value(data, offset, 0)? {
        (Object::Dictionary(dict), span) => Ok((dict, span)),
        (other, span) => Err(Error::ParseError {
            offset: span.start,
            reason: format!("expected dictionary, found {}", other.type_name()),
        }),
    }
}

fn next_token(data: &[u8], offset: usize) -> Result<(Token<'_>, Range<usize>)> {
    token_at(data, offset).ok_or_else(|| Error::ParseError {
        offset,
        reason: "unexpected end of input or invalid token".to_string(),
    })
}

fn parse_value(data: &[u8], offset: usize, depth: usize) -> Result<(Object, Range<usize>)> {
    if depth > MAX_DEPTH {
        return Err(Error::ParseError {
            offset,
            reason: "objects nested too deeply".to_string(),
        });
    }

    let (tok, span) = next_token(data, offset)?;
    let object = match tok {
        Token::Null => Object::Null,
        Token::True => Object::Boolean(true),
        Token::False => Object::Boolean(false),
        Token::Real(r) => Object::Real(r),
        Token::Name(name) => Object::Name(name),
        Token::LiteralString(raw) => Object::String(decode_literal_string_escapes(raw)),
        Token::HexString(digits) => Object::String(decode_hex(digits).map_err(|_| {
            Error::ParseError {
                offset: span.start,
                reason: "invalid hex string".to_string(),
            }
        })?),
        Token::Integer(id) => {
            // `id gen R` is a reference; anything else leaves the integer alone.
            if let Some((Token::Integer(gen), gen_span)) = token_at(data, span.end) {
                if let Some((Token::R, r_span)) = token_at(data, gen_span.end) {
                    if let (Ok(id), Ok(gen)) = (u32::try_from(id), u16::try_from(gen)) {
                        let reference = Object::Reference(ObjectRef::new(id, gen));
                        return Ok((reference, span.start..r_span.end));
                    }
                }
            }
            Object::Integer(id)
        },
        Token::ArrayStart => return parse_array(data, span.start, span.end, depth),
        Token::DictStart => return parse_dictionary(data, span.start, span.end, depth),
        other => {
            return Err(Error::ParseError {
                offset: span.start,
                reason: format!("unexpected token {:?}", other),
            })
        },
    };

    Ok((object, span))
}

fn parse_array(
    data: &[u8],
    start: usize,
    mut pos: usize,
    depth: usize,
) -> Result<(Object, Range<usize>)> {
    let mut items = Vec::new();
    loop {
        if let (Token::ArrayEnd, end) = next_token(data, pos)? {
            return Ok((Object::Array(items), start..end.end));
        }
        let (item, span) = parse_value(data, pos, depth + 1)?;
        items.push(item);
        pos = span.end;
    }
}

fn parse_dictionary(
    data: &[u8],
    start: usize,
    mut pos: usize,
    depth: usize,
) -> Result<(Object, Range<usize>)> {
    let mut dict = Dictionary::new();
    loop {
        let (tok, span) = next_token(data, pos)?;
        let key = match tok {
            Token::DictEnd => return Ok((Object::Dictionary(dict), start..span.end)),
            Token::Name(key) => key,
            other => {
                return Err(Error::ParseError {
                    offset: span.start,
                    reason: format!("dictionary key must be a name, found {:?}", other),
                })
            },
        };
        let (value, value_span) = parse_value(data, span.end, depth + 1)?;
        pos = value_span.end;
        dict.push(key, value, value_span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        assert_eq!(parse_object_at(b"42", 0).unwrap().0, Object::Integer(42));
        assert_eq!(parse_object_at(b" null", 0).unwrap().0, Object::Null);
        assert_eq!(parse_object_at(b"(a\\)b)", 0).unwrap().0, Object::String(b"a)b".to_vec()));
        assert_eq!(parse_object_at(b"<41 4>", 0).unwrap().0, Object::String(b"A@".to_vec()));
    }

    #[test]
    fn test_parse_reference() {
        let (obj, span) = parse_object_at(b"  12 0 R /Next", 0).unwrap();
        assert_eq!(obj, Object::Reference(ObjectRef::new(12, 0)));
        assert_eq!(span, 2..8);

        // Two integers not followed by R stay integers.
        let (obj, span) = parse_object_at(b"[0 10 20 30]", 0).unwrap();
        assert_eq!(
            obj,
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(10),
                Object::Integer(20),
                Object::Integer(30)
            ])
        );
        assert_eq!(span, 0..12);
    }

    #[test]
    fn test_parse_dictionary_with_spans() {
        let data = b"<< /Type /Sig /ByteRange [0 1 2 3] /Contents <00ff> /Sub << /A 1 >> >>";
        let (dict, span) = parse_dictionary_at(data, 0).unwrap();
        assert_eq!(span, 0..data.len());
        assert_eq!(dict.get("Type").and_then(Object::as_name), Some("Sig"));

        let contents = dict.entry("Contents").unwrap();
        assert_eq!(&data[contents.span.clone()], b"<00ff>");
        assert_eq!(contents.value, Object::String(vec![0x00, 0xff]));

        let range = dict.entry("ByteRange").unwrap();
        assert_eq!(&data[range.span.clone()], b"[0 1 2 3]");

        let sub = dict.get("Sub").and_then(Object::as_dict).unwrap();
        assert_eq!(sub.get("A"), Some(&Object::Integer(1)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_dictionary_at(b"<< /A 1", 0).is_err());
        assert!(parse_dictionary_at(b"<< 1 2 >>", 0).is_err());
        assert!(parse_dictionary_at(b"[1 2]", 0).is_err());

        let deep = "[".repeat(MAX_DEPTH + 2);
        assert!(parse_object_at(deep.as_bytes(), 0).is_err());
    }

    #[test]
    fn test_decode_literal_escapes() {
        assert_eq!(decode_literal_string_escapes(b"a\\nb"), b"a\nb");
        assert_eq!(decode_literal_string_escapes(b"line\\\ncontinued"), b"linecontinued");
        assert_eq!(decode_literal_string_escapes(b"\\0533"), b"+3");
        assert_eq!(decode_literal_string_escapes(b"\\q"), b"q");
    }
}
