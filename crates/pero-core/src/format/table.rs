//! Conversion dispatch table.
//!
//! Each conversion letter (the `d` in `%d`) is described by a static
//! [`Descriptor`] carrying the radix, sign handling, digit charset and
//! literal prefix for that conversion. The table is searched linearly with
//! first match winning, so the most frequently used conversions come
//! first.

/// Conversion paradigms. Each letter in the dispatch table maps to one of
/// these, and several letters may share a paradigm (`d`, `i`, `u`, `o`,
/// `x` and `X` are all [`ConvKind::Radix`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvKind {
    /// Integer of some radix: `%d`, `%i`, `%u`, `%o`, `%x`, `%X`
    Radix,
    /// Fixed-point floating value: `%f`
    Float,
    /// Exponential notation: `%e`, `%E`
    Exp,
    /// Floating or exponential depending on the exponent: `%g`, `%G`
    Generic,
    /// Bytes-emitted-so-far sink: `%n`
    Size,
    /// Plain string: `%s`
    Str,
    /// Dynamically allocated (owned) string: `%z`
    DynStr,
    /// Literal percent: `%%`
    Percent,
    /// Character, repeated per precision: `%c`
    Char,
    /// Raw buffer content: `%b`
    Blob,
    /// Buffer content quoted for SQL: `%B`
    BlobSql,
    /// String with `'` doubled: `%q`
    SqlEscape,
    /// As `%q`, enclosed in `'...'`, NULL input becomes `NULL`: `%Q`
    SqlEscape2,
    /// Identifier with `"` doubled: `%w`
    SqlEscape3,
    /// Pointer value: `%p`
    Pointer,
    /// Text made safe for HTML: `%h`
    Htmlize,
    /// Text made safe for HTTP, `/` encoded as `%2F`: `%t`
    Httpize,
    /// Text made safe for HTTP, `/` unchanged: `%T`
    Urlize,
    /// Whitespace-escaped single-token text: `%F`
    TokenEscape,
    /// Path text with `\` normalized to `/`: `%/`
    Path,
    /// Comment text appended verbatim: `%W`
    Passthrough,
    /// String truncated to a configured hash-prefix length: `%S`
    StringId,
    /// Configured root path string: `%R`
    Root,
    /// String encoded as a JSON string literal: `%j`
    JsonStr,
    /// Filename escaped for use in a shell command: `%$`
    ShellEsc,
    /// String encoded as hexadecimal: `%H`
    Hex,
}

/// Static metadata describing how one conversion letter is rendered.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    /// The format field code letter.
    pub letter: u8,
    /// The base for radix conversion (0 for non-numeric conversions).
    pub base: u32,
    /// True if the value to convert is signed.
    pub signed: bool,
    /// True if precision is not clamped to the scratch bound (string
    /// conversions allow unlimited precision).
    pub unlimited_precision: bool,
    /// True if the conversion is for internal use only.
    pub intern: bool,
    /// Selects the lowercase digit charset and exponent letter.
    pub lowercase: bool,
    /// Literal prefix emitted under the alternate-form flag.
    pub prefix: &'static str,
    /// Conversion paradigm.
    pub kind: ConvKind,
}

/// Uppercase digit charset for radix conversions.
pub const DIGITS_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Lowercase digit charset for radix conversions.
pub const DIGITS_LOWER: &[u8; 16] = b"0123456789abcdef";

macro_rules! conv {
    ($letter:literal, $base:literal, $signed:literal, $unlim:literal, $intern:literal,
     $lower:literal, $prefix:literal, $kind:ident) => {
        Descriptor {
            letter: $letter,
            base: $base,
            signed: $signed,
            unlimited_precision: $unlim,
            intern: $intern,
            lowercase: $lower,
            prefix: $prefix,
            kind: ConvKind::$kind,
        }
    };
}

/// The dispatch table, most frequently used conversions first. Searched
/// linearly; first match wins.
pub static TABLE: &[Descriptor] = &[
    conv!(b'd', 10, true, false, false, false, "", Radix),
    conv!(b's', 0, false, true, false, false, "", Str),
    conv!(b'g', 0, true, false, false, true, "", Generic),
    conv!(b'z', 0, false, true, true, false, "", DynStr),
    conv!(b'q', 0, false, true, false, false, "", SqlEscape),
    conv!(b'Q', 0, false, true, false, false, "", SqlEscape2),
    conv!(b'b', 0, false, false, true, false, "", Blob),
    conv!(b'B', 0, false, false, true, false, "", BlobSql),
    conv!(b'W', 0, false, false, true, false, "", Passthrough),
    conv!(b'h', 0, false, true, false, false, "", Htmlize),
    conv!(b'R', 0, false, false, false, false, "", Root),
    conv!(b't', 0, false, true, false, false, "", Httpize),
    conv!(b'T', 0, false, true, false, false, "", Urlize),
    conv!(b'w', 0, false, true, false, false, "", SqlEscape3),
    conv!(b'F', 0, false, true, false, false, "", TokenEscape),
    conv!(b'S', 0, false, true, false, false, "", StringId),
    conv!(b'j', 0, false, false, false, false, "", JsonStr),
    conv!(b'c', 0, false, false, false, false, "", Char),
    conv!(b'o', 8, false, false, false, false, "0", Radix),
    conv!(b'u', 10, false, false, false, false, "", Radix),
    conv!(b'x', 16, false, false, false, true, "0x", Radix),
    conv!(b'X', 16, false, false, false, false, "0X", Radix),
    conv!(b'f', 0, true, false, false, false, "", Float),
    conv!(b'e', 0, true, false, false, true, "", Exp),
    conv!(b'E', 0, true, false, false, false, "", Exp),
    conv!(b'G', 0, true, false, false, false, "", Generic),
    conv!(b'i', 10, true, false, false, false, "", Radix),
    conv!(b'n', 0, false, false, false, false, "", Size),
    conv!(b'%', 0, false, false, false, false, "", Percent),
    conv!(b'p', 16, false, false, false, true, "0x", Pointer),
    conv!(b'/', 0, false, false, false, false, "", Path),
    conv!(b'$', 0, false, false, false, false, "", ShellEsc),
    conv!(b'H', 0, false, false, false, false, "", Hex),
];

/// Finds the descriptor for a conversion letter. First match wins.
pub fn lookup(letter: u8) -> Option<&'static Descriptor> {
    TABLE.iter().find(|d| d.letter == letter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_letters() {
        assert_eq!(lookup(b'd').unwrap().kind, ConvKind::Radix);
        assert_eq!(lookup(b'd').unwrap().base, 10);
        assert!(lookup(b'd').unwrap().signed);
        assert_eq!(lookup(b'q').unwrap().kind, ConvKind::SqlEscape);
        assert_eq!(lookup(b'Q').unwrap().kind, ConvKind::SqlEscape2);
        assert_eq!(lookup(b'S').unwrap().kind, ConvKind::StringId);
        assert_eq!(lookup(b'/').unwrap().kind, ConvKind::Path);
        assert_eq!(lookup(b'%').unwrap().kind, ConvKind::Percent);
    }

    #[test]
    fn test_lookup_unknown_letter() {
        assert!(lookup(b'k').is_none());
        assert!(lookup(b'y').is_none());
        assert!(lookup(0).is_none());
    }

    #[test]
    fn test_hex_charsets_and_prefixes() {
        let x = lookup(b'x').unwrap();
        assert!(x.lowercase);
        assert_eq!(x.prefix, "0x");
        let upper_x = lookup(b'X').unwrap();
        assert!(!upper_x.lowercase);
        assert_eq!(upper_x.prefix, "0X");
        let o = lookup(b'o').unwrap();
        assert_eq!(o.base, 8);
        assert_eq!(o.prefix, "0");
    }

    #[test]
    fn test_letters_are_unique() {
        for (i, d) in TABLE.iter().enumerate() {
            assert!(
                TABLE[..i].iter().all(|e| e.letter != d.letter),
                "duplicate table entry for '{}'",
                d.letter as char
            );
        }
    }

    #[test]
    fn test_string_conversions_allow_unlimited_precision() {
        for letter in [b's', b'z', b'q', b'Q', b'w', b'S'] {
            assert!(lookup(letter).unwrap().unlimited_precision);
        }
        assert!(!lookup(b'd').unwrap().unlimited_precision);
    }
}
