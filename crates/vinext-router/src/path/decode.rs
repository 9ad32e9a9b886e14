use std::borrow::Cow;

/// Malformed percent-encoding in a request path (maps to HTTP 400)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed percent-escape at byte {0}")]
    MalformedEscape(usize),
    #[error("percent-decoded path is not valid UTF-8")]
    InvalidUtf8,
}

/// Escapes that would turn into path, query or fragment delimiters when decoded.
const PRESERVED: [&str; 7] = ["%2F", "%2f", "%5C", "%5c", "%3F", "%3f", "%23"];

/// Percent-decodes a request pathname exactly once
///
/// `%2F` and `%5C` stay encoded so decoding can never invent new segments:
/// `/a%2Fb` is one segment both before and after decoding. `%3F` and `%23`
/// stay encoded too, so a decoded path never grows a query or fragment that a
/// later matcher would strip. Every other escape
/// is decoded, including `%2e`, which lets [`normalize_pathname`] resolve
/// encoded traversal such as `/%2e%2e/admin`.
///
/// Inputs with no `%` are returned borrowed.
///
/// [`normalize_pathname`]: super::normalize_pathname
///
/// # Examples
///
/// ```
/// use vinext_router::path::decode_pathname;
///
/// assert_eq!(decode_pathname("/%61dmin").unwrap(), "/admin");
/// assert_eq!(decode_pathname("/a%2Fb").unwrap(), "/a%2Fb");
/// assert_eq!(decode_pathname("/admin%3F").unwrap(), "/admin%3F");
/// assert!(decode_pathname("/bad%zz").is_err());
/// ```
pub fn decode_pathname(path: &str) -> Result<Cow<'_, str>, DecodeError> {
    if !path.contains('%') {
        return Ok(Cow::Borrowed(path));
    }

    validate_escapes(path)?;

    let mut decoded = String::with_capacity(path.len());
    let mut rest = path;
    while let Some((index, escape)) = next_preserved(rest) {
        decoded.push_str(&decode_chunk(&rest[..index])?);
        decoded.push_str(escape);
        rest = &rest[index + escape.len()..];
    }
    decoded.push_str(&decode_chunk(rest)?);

    Ok(Cow::Owned(decoded))
}

fn decode_chunk(chunk: &str) -> Result<Cow<'_, str>, DecodeError> {
    urlencoding::decode(chunk).map_err(|_| DecodeError::InvalidUtf8)
}

fn next_preserved(input: &str) -> Option<(usize, &'static str)> {
    PRESERVED
        .iter()
        .filter_map(|escape| input.find(escape).map(|index| (index, *escape)))
        .min_by_key(|(index, _)| *index)
}

/// Every `%` must introduce two hex digits.
fn validate_escapes(path: &str) -> Result<(), DecodeError> {
    let bytes = path.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            let valid = bytes
                .get(index + 1..index + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(DecodeError::MalformedEscape(index));
            }
            index += 3;
        } else {
            index += 1;
        }
    }
    Ok(())
}
