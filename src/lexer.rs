//! PDF lexer (tokenizer).
//!
//! Tokenizes just enough PDF syntax to read trailers and signature
//! dictionaries: numbers, literal and hex strings, names, the `true` / `false`
//! / `null` keywords, array and dictionary delimiters, `obj` / `endobj` and the
//! `R` reference marker.
//!
//! Whitespace (space, \t, \r, \n, \0, \f) and comments (% to EOL) are skipped.
//! [`token_at`] reports where each token sits in the input, because the
//! signature verifier needs the exact location of `/Contents` and `/ByteRange`.

use std::ops::Range;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{map, opt, recognize, value},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

/// Token types recognized by the lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g., 42, -123)
    Integer(i64),

    /// Real number (e.g., 3.14, -.5)
    Real(f64),

    /// Raw literal string bytes, escapes not decoded
    LiteralString(&'a [u8]),

    /// Raw hex string digits, whitespace preserved
    HexString(&'a [u8]),

    /// Name without the leading slash, `#XX` escapes decoded
    Name(String),

    /// `true`
    True,

    /// `false`
    False,

    /// `null`
    Null,

    /// `[`
    ArrayStart,

    /// `]`
    ArrayEnd,

    /// `<<`
    DictStart,

    /// `>>`
    DictEnd,

    /// `obj`
    ObjStart,

    /// `endobj`
    ObjEnd,

    /// `R` in `10 0 R`
    R,
}

/// PDF whitespace (ISO 32000-1, Table 1).
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// PDF delimiter characters (ISO 32000-1, Table 2).
pub fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

/// Skip whitespace and comments, returning the rest of the input.
pub fn skip_ws(mut input: &[u8]) -> &[u8] {
    loop {
        match input.first() {
            Some(&c) if is_whitespace(c) => input = &input[1..],
            Some(b'%') => {
                let eol = input
                    .iter()
                    .position(|&c| c == b'\r' || c == b'\n')
                    .unwrap_or(input.len());
                input = &input[eol..];
            },
            _ => return input,
        }
    }
}

fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let number: IResult<&[u8], &[u8]> = recognize(tuple((
        opt(one_of("+-")),
        alt((recognize(pair(digit1, opt(pair(char('.'), digit0)))), recognize(pair(char('.'), digit1)))),
    )))(input);
    let (rest, text) = number?;

    let fail = || nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit));
    let text = std::str::from_utf8(text).map_err(|_| fail())?;

    if text.contains('.') {
        let number: f64 = text.parse().map_err(|_| fail())?;
        Ok((rest, Token::Real(number)))
    } else {
        let number: i64 = text.trim_start_matches('+').parse().map_err(|_| fail())?;
        Ok((rest, Token::Integer(number)))
    }
}

/// Literal strings may nest balanced parentheses; `\` escapes the next byte.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let open: IResult<&[u8], char> = char('(')(input);
    let (body, _) = open?;
    let mut depth = 1usize;
    let mut i = 0;

    while i < body.len() {
        match body[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[i + 1..], Token::LiteralString(&body[..i])));
                }
            },
            _ => {},
        }
        i += 1;
    }

    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)))
}

fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    if input.starts_with(b"<<") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    delimited(
        char('<'),
        map(take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c)), Token::HexString),
        char('>'),
    )(input)
}

/// Decode `#XX` escape sequences in a name (ISO 32000-1, 7.3.5).
///
/// Malformed escapes are kept as written.
///
/// ```
/// # use pades_oxide::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes(b"Adobe#2EPPKLite"), "Adobe.PPKLite");
/// assert_eq!(decode_name_escapes(b"A#"), "A#");
/// ```
pub fn decode_name_escapes(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] == b'#' {
            if let Some(byte) = raw
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
            {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    preceded(char('/'), map(take_while(is_regular), |raw| Token::Name(decode_name_escapes(raw))))(
        input,
    )
}

fn parse_keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let keyword: IResult<&[u8], Token<'_>> = alt((
        value(Token::DictStart, tag("<<")),
        value(Token::DictEnd, tag(">>")),
        value(Token::ArrayStart, tag("[")),
        value(Token::ArrayEnd, tag("]")),
        value(Token::False, tag("false")),
        value(Token::True, tag("true")),
        value(Token::Null, tag("null")),
        value(Token::ObjEnd, tag("endobj")),
        value(Token::ObjStart, tag("obj")),
        value(Token::R, tag("R")),
    ))(input);
    let (rest, token) = keyword?;

    // A keyword must end at a token boundary: "nullify" is not "null".
    let is_word = !matches!(
        token,
        Token::DictStart | Token::DictEnd | Token::ArrayStart | Token::ArrayEnd
    );
    if is_word && rest.first().is_some_and(|&c| is_regular(c)) {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    Ok((rest, token))
}

/// Parse a single token, skipping leading whitespace and comments.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let input = skip_ws(input);
    alt((parse_keyword, parse_name, parse_number, parse_literal_string, parse_hex_string))(input)
}

/// Parse the token that starts at or after `offset` in `data`.
///
/// Returns the token and its absolute byte span, without the leading
/// whitespace. `None` at end of input or on bytes that are not a token.
pub fn token_at(data: &[u8], offset: usize) -> Option<(Token<'_>, Range<usize>)> {
    let input = data.get(offset..)?;
    let start = data.len() - skip_ws(input).len();
    let (rest, tok) = token(input).ok()?;
    Some((tok, start..data.len() - rest.len()))
}
