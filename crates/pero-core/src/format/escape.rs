//! Escaping and transform helpers behind the extension conversions.
//!
//! Each function maps raw argument bytes to the escaped fragment for one
//! conversion family: SQL quoting, path normalization, HTML/HTTP/JSON
//! safety, hexadecimal dumps, shell quoting and whitespace-token
//! encoding. All of them are byte-oriented; none consult the locale.

/// Lowercase hex digits for [`hex_encode`] and the percent-encoders.
const HEX_LOWER: &[u8; 16] = b"0123456789abcdef";

/// Uppercase hex digits for percent-encoding (`/` becomes `%2F`).
const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Doubles every occurrence of `quote` in `text`, optionally wrapping the
/// result in a pair of `quote` characters.
pub(crate) fn sql_escape(text: &[u8], quote: u8, surround: bool) -> Vec<u8> {
    let doubled = text.iter().filter(|&&b| b == quote).count();
    let mut out = Vec::with_capacity(text.len() + doubled + 2);
    if surround {
        out.push(quote);
    }
    for &b in text {
        out.push(b);
        if b == quote {
            out.push(b);
        }
    }
    if surround {
        out.push(quote);
    }
    out
}

/// Normalizes path separators: every backslash becomes a forward slash,
/// everything else passes through unchanged.
pub(crate) fn path_normalize(text: &[u8]) -> Vec<u8> {
    text.iter()
        .map(|&b| if b == b'\\' { b'/' } else { b })
        .collect()
}

/// Escapes the characters with meaning in HTML markup.
pub(crate) fn html_escape(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for &b in text {
        match b {
            b'&' => out.extend_from_slice(b"&amp;"),
            b'<' => out.extend_from_slice(b"&lt;"),
            b'>' => out.extend_from_slice(b"&gt;"),
            b'"' => out.extend_from_slice(b"&quot;"),
            b'\'' => out.extend_from_slice(b"&#39;"),
            _ => out.push(b),
        }
    }
    out
}

/// Percent-encodes bytes unsafe in a URL. Alphanumerics and `-_.~` pass
/// through; `/` passes through only when `keep_slash` is set.
pub(crate) fn http_encode(text: &[u8], keep_slash: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for &b in text {
        let safe = b.is_ascii_alphanumeric()
            || matches!(b, b'-' | b'_' | b'.' | b'~')
            || (keep_slash && b == b'/');
        if safe {
            out.push(b);
        } else {
            out.push(b'%');
            out.push(HEX_UPPER[(b >> 4) as usize]);
            out.push(HEX_UPPER[(b & 0x0f) as usize]);
        }
    }
    out
}

/// Encodes `text` as the body of a JSON string literal, optionally with
/// the surrounding double quotes.
pub(crate) fn json_string(text: &[u8], quoted: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    if quoted {
        out.push(b'"');
    }
    for &b in text {
        match b {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0c => out.extend_from_slice(b"\\f"),
            b if b < 0x20 => {
                out.extend_from_slice(b"\\u00");
                out.push(HEX_LOWER[(b >> 4) as usize]);
                out.push(HEX_LOWER[(b & 0x0f) as usize]);
            }
            _ => out.push(b),
        }
    }
    if quoted {
        out.push(b'"');
    }
    out
}

/// Encodes every byte of `text` as two lowercase hex digits.
pub(crate) fn hex_encode(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for &b in text {
        out.push(HEX_LOWER[(b >> 4) as usize]);
        out.push(HEX_LOWER[(b & 0x0f) as usize]);
    }
    out
}

/// True for bytes a POSIX shell treats as plain word characters.
fn shell_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'/' | b'.' | b'_' | b'-' | b':' | b'=' | b',')
}

/// Quotes a filename argument for use in a shell command.
///
/// Names made only of safe characters pass through unquoted. Anything
/// else is wrapped in single quotes, with embedded single quotes emitted
/// as `'\''`. When `dot_slash` is set, a name beginning with `-` gains a
/// `./` prefix so it cannot be mistaken for an option.
pub(crate) fn shell_quote(text: &[u8], dot_slash: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 4);
    if dot_slash && text.first() == Some(&b'-') {
        out.extend_from_slice(b"./");
    }
    if !text.is_empty() && text.iter().all(|&b| shell_safe(b)) {
        out.extend_from_slice(text);
        return out;
    }
    out.push(b'\'');
    for &b in text {
        if b == b'\'' {
            out.extend_from_slice(b"'\\''");
        } else {
            out.push(b);
        }
    }
    out.push(b'\'');
    out
}

/// Escapes whitespace and backslashes so the text reads as a single
/// space-delimited token.
pub(crate) fn token_escape(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for &b in text {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b' ' => out.extend_from_slice(b"\\s"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x0b => out.extend_from_slice(b"\\v"),
            0x0c => out.extend_from_slice(b"\\f"),
            0 => out.extend_from_slice(b"\\0"),
            _ => out.push(b),
        }
    }
    out
}
