//! Format rendering module.
//!
//! This module implements the printf-style format interpreter: it parses a
//! format string and a caller-built list of typed arguments, and writes
//! the rendered text into a [`Buffer`] without relying on any platform
//! formatting routine.
//!
//! ## Architecture
//!
//! - [`table`]: the static conversion dispatch table
//! - [`num`]: integer and floating digit extraction
//! - [`escape`]: the escaping transforms behind the extension conversions
//! - [`Renderer`]: the parse/dispatch/emit loop with width, precision and
//!   justification handling
//!
//! ## Directive grammar
//!
//! `%[flags][width][.precision][l|ll]conversion` with flags `-`, `+`,
//! space, `#`, `!`, `0` and `,`. Width and precision may be literal
//! digits or `*` to source the value from the argument list.
//!
//! ## Example
//!
//! ```
//! use pero_core::{Arg, Buffer, Renderer};
//!
//! let renderer = Renderer::new();
//! let mut out = Buffer::new();
//! let n = renderer.render_into(&mut out, "hello %s #%d", &[Arg::Text("world"), Arg::Int(7)])?;
//! assert_eq!(out.str_bytes(), b"hello world #7");
//! // The running total counts conversion output, not literal runs.
//! assert_eq!(n, 6);
//! # Ok::<(), pero_core::Error>(())
//! ```

mod escape;
mod num;
mod table;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use std::borrow::Cow;
use std::cell::Cell;
use tracing::{debug, trace};

pub use num::FloatMode;
pub use table::{lookup, ConvKind, Descriptor, DIGITS_LOWER, DIGITS_UPPER, TABLE};

/// Bound on per-directive conversion scratch; width and non-string
/// precision are clamped below it.
const SCRATCH_SIZE: usize = 500;
const WIDTH_LIMIT: usize = SCRATCH_SIZE - 10;
const PRECISION_LIMIT: i64 = (SCRATCH_SIZE - 40) as i64;
const FLOAT_PRECISION_LIMIT: i64 = (SCRATCH_SIZE / 2 - 10) as i64;

/// Space run used for width padding, appended in chunks.
const SPACES: &[u8] = b"                                                                         ";

/// Longest hash prefix: the full length of a SHA3-256 hex name.
pub const HASH_DIGITS_MAX: usize = 64;

/// Hash-prefix truncation lengths for the `%S` conversion, in two tiers:
/// a short length for human display and a longer one for URLs.
///
/// Computed once at startup and held by the [`Renderer`]; never a hidden
/// global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashDigits {
    human: usize,
    url: usize,
}

impl HashDigits {
    /// Creates the two truncation tiers from the human-display length.
    ///
    /// The human length is clamped to `6..=64`; the URL length is six
    /// more than the human length, at least 16 and at most 64.
    pub fn new(human: usize) -> Self {
        let human = human.clamp(6, HASH_DIGITS_MAX);
        let url = (human + 6).max(16).min(HASH_DIGITS_MAX);
        Self { human, url }
    }

    /// Truncation length for human display (`%S`).
    pub fn human(&self) -> usize {
        self.human
    }

    /// Truncation length for URLs (`%!S`).
    pub fn url(&self) -> usize {
        self.url
    }

    /// Selects a tier by destination.
    pub fn len_for(&self, for_url: bool) -> usize {
        if for_url {
            self.url
        } else {
            self.human
        }
    }
}

impl Default for HashDigits {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Configuration for the renderer
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    /// Hash-prefix truncation lengths for `%S`
    pub hash_digits: HashDigits,
    /// Root path string rendered by `%R` (empty by default)
    pub root: String,
}

impl RenderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hash-prefix truncation lengths
    pub fn hash_digits(mut self, digits: HashDigits) -> Self {
        self.hash_digits = digits;
        self
    }

    /// Sets the root path string rendered by `%R`
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }
}

/// A typed argument value for one conversion.
///
/// The caller builds a slice of these in directive order before invoking
/// the renderer; a letter-to-type mismatch is a checked error rendered as
/// a visible marker, never undefined behavior.
#[derive(Debug, Clone)]
pub enum Arg<'a> {
    /// Signed integer (`%d`, `%i`; fetch width selected by `l`/`ll`)
    Int(i64),
    /// Unsigned integer (`%u`, `%o`, `%x`, `%X`)
    Uint(u64),
    /// Floating value (`%f`, `%e`, `%E`, `%g`, `%G`)
    Float(f64),
    /// Character (`%c`)
    Char(char),
    /// Borrowed text (string conversions)
    Text(&'a str),
    /// Owned text; released when the argument list drops (`%z`)
    OwnedText(String),
    /// Borrowed bytes (string conversions over raw byte regions)
    Bytes(&'a [u8]),
    /// Null marker, substituted per conversion (`%q`, `%Q`, `%s`)
    Null,
    /// Buffer view (`%b`, `%B`)
    Buffer(&'a Buffer<'a>),
    /// Pointer value (`%p`)
    Ptr(usize),
    /// Destination for the bytes-emitted-so-far count (`%n`)
    Count(&'a Cell<usize>),
}

impl Arg<'_> {
    fn type_name(&self) -> &'static str {
        match self {
            Arg::Int(_) => "integer",
            Arg::Uint(_) => "unsigned integer",
            Arg::Float(_) => "float",
            Arg::Char(_) => "char",
            Arg::Text(_) => "text",
            Arg::OwnedText(_) => "owned text",
            Arg::Bytes(_) => "bytes",
            Arg::Null => "null",
            Arg::Buffer(_) => "buffer",
            Arg::Ptr(_) => "pointer",
            Arg::Count(_) => "count sink",
        }
    }
}

impl From<i64> for Arg<'_> {
    fn from(v: i64) -> Self {
        Arg::Int(v)
    }
}

impl From<u64> for Arg<'_> {
    fn from(v: u64) -> Self {
        Arg::Uint(v)
    }
}

impl From<f64> for Arg<'_> {
    fn from(v: f64) -> Self {
        Arg::Float(v)
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(v: &'a str) -> Self {
        Arg::Text(v)
    }
}

impl From<String> for Arg<'_> {
    fn from(v: String) -> Self {
        Arg::OwnedText(v)
    }
}

/// Transient parse state for one `%...` directive.
#[derive(Debug, Clone)]
struct Directive {
    left_justify: bool,
    plus_sign: bool,
    blank_sign: bool,
    alternate_form: bool,
    alt_form2: bool,
    zero_pad: bool,
    thousands: bool,
    width: usize,
    /// `-1` means unspecified.
    precision: i64,
    long_flag: bool,
    longlong_flag: bool,
}

impl Default for Directive {
    fn default() -> Self {
        Self {
            left_justify: false,
            plus_sign: false,
            blank_sign: false,
            alternate_form: false,
            alt_form2: false,
            zero_pad: false,
            thousands: false,
            width: 0,
            precision: -1,
            long_flag: false,
            longlong_flag: false,
        }
    }
}

/// The format renderer.
///
/// Holds the immutable [`RenderConfig`] and drives the parse, dispatch
/// and emit loop over a format string. A renderer is cheap to construct
/// and safe to share; each render call exclusively borrows its target
/// buffer for its duration.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    /// Creates a renderer with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer with custom configuration
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// The renderer's configuration
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders `fmt` with `args` appended to `out`, marking the buffer as
    /// holding content not trusted as SQL text.
    ///
    /// Returns the total number of bytes emitted by conversions, or the
    /// first recoverable error encountered. Processing is never aborted
    /// early: an unrecognized directive leaves a visible `%x` marker in
    /// the output and parsing continues, with the failure surfaced only
    /// through the return value.
    pub fn render_into(&self, out: &mut Buffer<'_>, fmt: &str, args: &[Arg<'_>]) -> Result<usize> {
        out.mark_not_sql();
        self.render_inner(out, fmt, args)
    }

    /// Renders SQL-trusted text: as [`Renderer::render_into`] but without
    /// marking the target buffer.
    pub fn render_sql_into(
        &self,
        out: &mut Buffer<'_>,
        fmt: &str,
        args: &[Arg<'_>],
    ) -> Result<usize> {
        self.render_inner(out, fmt, args)
    }

    /// Renders directly to an external sink such as standard output,
    /// instead of accumulating into a caller-held buffer.
    ///
    /// Returns the conversion byte count, as [`Renderer::render_into`].
    /// Sink errors are propagated.
    pub fn render_to_stream<W: std::io::Write>(
        &self,
        sink: &mut W,
        fmt: &str,
        args: &[Arg<'_>],
    ) -> Result<usize> {
        let mut out = Buffer::new();
        let rendered = self.render_inner(&mut out, fmt, args);
        sink.write_all(out.materialize())?;
        rendered
    }

    /// Renders into a fresh owned buffer and materializes it.
    ///
    /// This is the only entry point that allocates its own buffer; all
    /// other call sites supply their own.
    pub fn render_to_buffer(&self, fmt: &str, args: &[Arg<'_>]) -> Result<Buffer<'static>> {
        let mut out = Buffer::new();
        let rendered = self.render_inner(&mut out, fmt, args);
        out.mark_not_sql();
        out.materialize();
        rendered.map(|_| out)
    }

    fn render_inner(&self, out: &mut Buffer<'_>, fmt: &str, args: &[Arg<'_>]) -> Result<usize> {
        let fmt = fmt.as_bytes();
        let len = fmt.len();
        let mut i = 0;
        let mut argi = 0;
        let mut count = 0usize;
        let mut first_err: Option<Error> = None;
        debug!("rendering format string of {} bytes", len);

        while i < len {
            // Literal run up to the next '%' or end of string.
            let start = i;
            while i < len && fmt[i] != b'%' {
                i += 1;
            }
            if i > start {
                out.append(&fmt[start..i]);
            }
            if i >= len {
                break;
            }
            let directive_start = i;
            i += 1;
            if i >= len {
                // Trailing lone '%'.
                out.append(b"%");
                count += 1;
                first_err.get_or_insert(Error::TrailingPercent);
                break;
            }

            let mut dir = Directive::default();
            while i < len {
                match fmt[i] {
                    b'-' => dir.left_justify = true,
                    b'+' => dir.plus_sign = true,
                    b' ' => dir.blank_sign = true,
                    b'#' => dir.alternate_form = true,
                    b'!' => dir.alt_form2 = true,
                    b'0' => dir.zero_pad = true,
                    b',' => dir.thousands = true,
                    _ => break,
                }
                i += 1;
            }

            // Field width, literal or argument-sourced.
            if i < len && fmt[i] == b'*' {
                i += 1;
                match int_arg(args, &mut argi, '*') {
                    Ok(w) => {
                        if w < 0 {
                            dir.left_justify = true;
                            dir.width = w.unsigned_abs() as usize;
                        } else {
                            dir.width = w as usize;
                        }
                    }
                    Err(e) => {
                        first_err.get_or_insert(e);
                    }
                }
            } else {
                while i < len && fmt[i].is_ascii_digit() {
                    dir.width = dir
                        .width
                        .saturating_mul(10)
                        .saturating_add((fmt[i] - b'0') as usize);
                    i += 1;
                }
            }
            if dir.width > WIDTH_LIMIT {
                dir.width = WIDTH_LIMIT;
            }

            // Precision, literal or argument-sourced.
            if i < len && fmt[i] == b'.' {
                i += 1;
                dir.precision = 0;
                if i < len && fmt[i] == b'*' {
                    i += 1;
                    match int_arg(args, &mut argi, '*') {
                        Ok(p) => dir.precision = p.unsigned_abs() as i64,
                        Err(e) => {
                            first_err.get_or_insert(e);
                        }
                    }
                } else {
                    while i < len && fmt[i].is_ascii_digit() {
                        dir.precision = dir
                            .precision
                            .saturating_mul(10)
                            .saturating_add(i64::from(fmt[i] - b'0'));
                        i += 1;
                    }
                }
            }

            // Length modifier.
            if i < len && fmt[i] == b'l' {
                i += 1;
                dir.long_flag = true;
                if i < len && fmt[i] == b'l' {
                    i += 1;
                    dir.longlong_flag = true;
                }
            }

            if i >= len {
                out.append(b"%");
                count += 1;
                first_err.get_or_insert(Error::TrailingPercent);
                break;
            }
            let letter = fmt[i];
            i += 1;

            let Some(desc) = table::lookup(letter) else {
                // The error conversion: a visible marker, then keep going.
                trace!("unknown conversion letter '{}'", letter as char);
                out.append(&[b'%', letter]);
                count += 2;
                first_err.get_or_insert(Error::unknown_conversion(letter as char, directive_start));
                continue;
            };

            if dir.precision > PRECISION_LIMIT && !desc.unlimited_precision {
                dir.precision = PRECISION_LIMIT;
            }

            match self.dispatch(out, &mut dir, desc, args, &mut argi, count) {
                Ok(frag) => {
                    let nspace = dir.width.saturating_sub(frag.len());
                    if !dir.left_justify && nspace > 0 {
                        pad_spaces(out, nspace);
                        count += nspace;
                    }
                    if !frag.is_empty() {
                        out.append(&frag);
                        count += frag.len();
                    }
                    if dir.left_justify && nspace > 0 {
                        pad_spaces(out, nspace);
                        count += nspace;
                    }
                }
                Err(e) => {
                    out.append(&[b'%', letter]);
                    count += 2;
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }

    /// Computes one conversion's fragment. Conversions that write straight
    /// into the output (the count sink and the direct-append extensions)
    /// return an empty fragment with the field width zeroed.
    fn dispatch<'f>(
        &'f self,
        out: &mut Buffer<'_>,
        dir: &mut Directive,
        desc: &'static Descriptor,
        args: &'f [Arg<'f>],
        argi: &mut usize,
        count: usize,
    ) -> Result<Cow<'f, [u8]>> {
        let letter = desc.letter as char;
        match desc.kind {
            ConvKind::Radix | ConvKind::Pointer => {
                let (magnitude, sign) = if desc.kind == ConvKind::Pointer {
                    (ptr_arg(args, argi, letter)? as u64, None)
                } else if desc.signed {
                    let mut v = int_arg(args, argi, letter)?;
                    if !dir.long_flag && !dir.longlong_flag {
                        v = i64::from(v as i32);
                    }
                    if v < 0 {
                        (v.unsigned_abs(), Some(b'-'))
                    } else {
                        (v as u64, positive_sign(dir))
                    }
                } else {
                    let mut v = uint_arg(args, argi, letter)?;
                    if !dir.long_flag && !dir.longlong_flag {
                        v &= 0xffff_ffff;
                    }
                    (v, None)
                };
                let alt = dir.alternate_form && magnitude != 0;
                let sign_len = i64::from(sign.is_some());
                if dir.zero_pad && dir.precision < dir.width as i64 - sign_len {
                    dir.precision = dir.width as i64 - sign_len;
                }
                let charset = if desc.lowercase {
                    DIGITS_LOWER
                } else {
                    DIGITS_UPPER
                };
                let group = if dir.thousands { Some(b',') } else { None };
                let digits = num::integer_digits(
                    magnitude,
                    desc.base,
                    charset,
                    dir.precision.max(0) as usize,
                    group,
                );
                let mut frag = Vec::with_capacity(digits.len() + 3);
                let pre = desc.prefix.as_bytes();
                let lead = sign.unwrap_or(digits[0]);
                if alt && !pre.is_empty() && Some(&lead) != pre.last() {
                    frag.extend_from_slice(pre);
                }
                if let Some(s) = sign {
                    frag.push(s);
                }
                frag.extend_from_slice(&digits);
                Ok(Cow::Owned(frag))
            }
            ConvKind::Float | ConvKind::Exp | ConvKind::Generic => {
                let v = float_arg(args, argi, letter)?;
                if dir.precision < 0 {
                    dir.precision = 6;
                }
                if dir.precision > FLOAT_PRECISION_LIMIT {
                    dir.precision = FLOAT_PRECISION_LIMIT;
                }
                let (value, sign) = if v < 0.0 {
                    (-v, Some(b'-'))
                } else {
                    (v, positive_sign(dir))
                };
                let mode = match desc.kind {
                    ConvKind::Exp => FloatMode::Exp,
                    ConvKind::Generic => FloatMode::General,
                    _ => FloatMode::Plain,
                };
                let mut precision = dir.precision as i32;
                if desc.kind == ConvKind::Generic && precision > 0 {
                    precision -= 1;
                }
                let mut body = num::float_body(
                    value,
                    sign,
                    precision,
                    mode,
                    dir.alternate_form,
                    dir.alt_form2,
                    desc.lowercase,
                );
                if dir.zero_pad
                    && !dir.left_justify
                    && body.len() < dir.width
                    && body.as_slice() != b"NaN"
                {
                    // Leading zeros go between the sign and the digits.
                    let npad = dir.width - body.len();
                    let at = usize::from(sign.is_some());
                    body.splice(at..at, std::iter::repeat(b'0').take(npad));
                }
                Ok(Cow::Owned(body))
            }
            ConvKind::Size => {
                let cell = count_arg(args, argi, letter)?;
                cell.set(count);
                dir.width = 0;
                Ok(Cow::Borrowed(&[]))
            }
            ConvKind::Percent => {
                dir.width = 0;
                Ok(Cow::Borrowed(b"%"))
            }
            ConvKind::Char => {
                let c = char_arg(args, argi, letter)?;
                let mut buf = [0u8; 4];
                let encoded = c.encode_utf8(&mut buf).as_bytes();
                if dir.precision >= 0 {
                    let repeat = dir.precision.max(0) as usize;
                    let mut frag = Vec::with_capacity(encoded.len() * repeat);
                    for _ in 0..repeat {
                        frag.extend_from_slice(encoded);
                    }
                    Ok(Cow::Owned(frag))
                } else {
                    Ok(Cow::Owned(encoded.to_vec()))
                }
            }
            ConvKind::Str | ConvKind::DynStr | ConvKind::StringId => {
                let limit = explicit_limit(dir, args, argi, letter)?;
                let text = text_arg(args, argi, letter)?.unwrap_or(b"");
                if desc.kind == ConvKind::StringId {
                    dir.precision = self.config.hash_digits.len_for(dir.alt_form2) as i64;
                }
                let mut n = strnlen(text, limit);
                if dir.precision >= 0 && (dir.precision as usize) < n {
                    n = dir.precision as usize;
                }
                Ok(Cow::Borrowed(&text[..n]))
            }
            ConvKind::Blob => {
                let limit = explicit_limit(dir, args, argi, letter)?;
                let data = buffer_arg(args, argi, letter)?.as_bytes();
                let n = match limit {
                    Some(l) if l < data.len() => l,
                    _ => data.len(),
                };
                Ok(Cow::Borrowed(&data[..n]))
            }
            ConvKind::BlobSql => {
                let limit = explicit_limit(dir, args, argi, letter)?;
                let data = buffer_arg(args, argi, letter)?.as_bytes();
                let n = match limit {
                    Some(l) if l < data.len() => l,
                    _ => data.len(),
                };
                Ok(Cow::Owned(escape::sql_escape(&data[..n], b'\'', true)))
            }
            ConvKind::SqlEscape | ConvKind::SqlEscape2 | ConvKind::SqlEscape3 => {
                let limit = explicit_limit(dir, args, argi, letter)?;
                let arg = text_arg(args, argi, letter)?;
                let isnull = arg.is_none();
                let text: &[u8] = match arg {
                    Some(t) => t,
                    None if desc.kind == ConvKind::SqlEscape2 => b"NULL",
                    None => b"(NULL)",
                };
                let quote = if desc.kind == ConvKind::SqlEscape3 {
                    b'"'
                } else {
                    b'\''
                };
                let surround = !isnull && desc.kind == ConvKind::SqlEscape2;
                let n = match limit {
                    Some(l) => l.min(text.len()),
                    None => strnlen(text, None),
                };
                let mut frag = escape::sql_escape(&text[..n], quote, surround);
                truncate_to_precision(dir, &mut frag);
                Ok(Cow::Owned(frag))
            }
            ConvKind::Path => {
                let limit = explicit_limit(dir, args, argi, letter)?;
                let text = text_arg(args, argi, letter)?.unwrap_or(b"");
                let n = strnlen(text, limit);
                Ok(Cow::Owned(escape::path_normalize(&text[..n])))
            }
            ConvKind::Root => Ok(Cow::Borrowed(self.config.root.as_bytes())),
            ConvKind::Htmlize => {
                let limit = explicit_limit(dir, args, argi, letter)?;
                let text = text_arg(args, argi, letter)?.unwrap_or(b"");
                let mut frag = escape::html_escape(&text[..strnlen(text, limit)]);
                truncate_to_precision(dir, &mut frag);
                Ok(Cow::Owned(frag))
            }
            ConvKind::Httpize | ConvKind::Urlize => {
                let limit = explicit_limit(dir, args, argi, letter)?;
                let text = text_arg(args, argi, letter)?.unwrap_or(b"");
                let keep_slash = desc.kind == ConvKind::Urlize;
                let mut frag = escape::http_encode(&text[..strnlen(text, limit)], keep_slash);
                truncate_to_precision(dir, &mut frag);
                Ok(Cow::Owned(frag))
            }
            ConvKind::TokenEscape => {
                let limit = explicit_limit(dir, args, argi, letter)?;
                let text = text_arg(args, argi, letter)?.unwrap_or(b"");
                let mut frag = escape::token_escape(&text[..strnlen(text, limit)]);
                truncate_to_precision(dir, &mut frag);
                Ok(Cow::Owned(frag))
            }
            ConvKind::JsonStr => {
                // The explicit-limit argument is consumed but has no
                // effect on JSON output.
                let _ = explicit_limit(dir, args, argi, letter)?;
                let text = text_arg(args, argi, letter)?.unwrap_or(b"");
                let mut frag = escape::json_string(&text[..strnlen(text, None)], dir.alt_form2);
                truncate_to_precision(dir, &mut frag);
                Ok(Cow::Owned(frag))
            }
            ConvKind::ShellEsc => {
                let text = text_arg(args, argi, letter)?.unwrap_or(b"");
                out.append(&escape::shell_quote(text, !dir.alt_form2));
                dir.width = 0;
                Ok(Cow::Borrowed(&[]))
            }
            ConvKind::Hex => {
                let text = text_arg(args, argi, letter)?.unwrap_or(b"");
                out.append(&escape::hex_encode(&text[..strnlen(text, None)]));
                dir.width = 0;
                Ok(Cow::Borrowed(&[]))
            }
            ConvKind::Passthrough => {
                let limit = explicit_limit(dir, args, argi, letter)?;
                let text = text_arg(args, argi, letter)?.unwrap_or(b"");
                let n = match limit {
                    Some(l) => l.min(text.len()),
                    None => strnlen(text, None),
                };
                out.append(&text[..n]);
                dir.width = 0;
                Ok(Cow::Borrowed(&[]))
            }
        }
    }
}

/// Renders with a default renderer and returns the output as a `String`.
///
/// # Errors
///
/// Propagates renderer errors, and fails if the rendered bytes are not
/// valid UTF-8.
pub fn render_str(fmt: &str, args: &[Arg<'_>]) -> Result<String> {
    let mut out = Renderer::new().render_to_buffer(fmt, args)?;
    let bytes = out.materialize().to_vec();
    Ok(String::from_utf8(bytes)?)
}

fn positive_sign(dir: &Directive) -> Option<u8> {
    if dir.plus_sign {
        Some(b'+')
    } else if dir.blank_sign {
        Some(b' ')
    } else {
        None
    }
}

/// Appends `n` padding spaces in chunks.
fn pad_spaces(out: &mut Buffer<'_>, mut n: usize) {
    while n >= SPACES.len() {
        out.append(SPACES);
        n -= SPACES.len();
    }
    if n > 0 {
        out.append(&SPACES[..n]);
    }
}

/// Length of `data` up to `limit` bytes, stopping early at a NUL.
fn strnlen(data: &[u8], limit: Option<usize>) -> usize {
    let max = limit.unwrap_or(data.len()).min(data.len());
    data[..max].iter().position(|&b| b == 0).unwrap_or(max)
}

/// Consumes the explicit byte-length argument selected by the `#` flag.
/// A negative value means "measure up to the terminator".
fn explicit_limit(
    dir: &Directive,
    args: &[Arg<'_>],
    argi: &mut usize,
    letter: char,
) -> Result<Option<usize>> {
    if !dir.alternate_form {
        return Ok(None);
    }
    let v = int_arg(args, argi, letter)?;
    Ok(if v < 0 { None } else { Some(v as usize) })
}

fn truncate_to_precision(dir: &Directive, frag: &mut Vec<u8>) {
    if dir.precision >= 0 && (dir.precision as usize) < frag.len() {
        frag.truncate(dir.precision as usize);
    }
}

fn take_arg<'f>(args: &'f [Arg<'f>], argi: &mut usize, letter: char) -> Result<&'f Arg<'f>> {
    let arg = args.get(*argi).ok_or_else(|| Error::missing_arg(letter))?;
    *argi += 1;
    Ok(arg)
}

fn int_arg(args: &[Arg<'_>], argi: &mut usize, letter: char) -> Result<i64> {
    match take_arg(args, argi, letter)? {
        Arg::Int(v) => Ok(*v),
        Arg::Uint(v) => Ok(*v as i64),
        other => Err(Error::arg_mismatch(letter, "integer", other.type_name())),
    }
}

fn uint_arg(args: &[Arg<'_>], argi: &mut usize, letter: char) -> Result<u64> {
    match take_arg(args, argi, letter)? {
        Arg::Uint(v) => Ok(*v),
        Arg::Int(v) => Ok(*v as u64),
        other => Err(Error::arg_mismatch(
            letter,
            "unsigned integer",
            other.type_name(),
        )),
    }
}

fn float_arg(args: &[Arg<'_>], argi: &mut usize, letter: char) -> Result<f64> {
    match take_arg(args, argi, letter)? {
        Arg::Float(v) => Ok(*v),
        other => Err(Error::arg_mismatch(letter, "float", other.type_name())),
    }
}

fn char_arg(args: &[Arg<'_>], argi: &mut usize, letter: char) -> Result<char> {
    match take_arg(args, argi, letter)? {
        Arg::Char(c) => Ok(*c),
        other => Err(Error::arg_mismatch(letter, "char", other.type_name())),
    }
}

fn text_arg<'f>(
    args: &'f [Arg<'f>],
    argi: &mut usize,
    letter: char,
) -> Result<Option<&'f [u8]>> {
    match take_arg(args, argi, letter)? {
        Arg::Text(s) => Ok(Some(s.as_bytes())),
        Arg::OwnedText(s) => Ok(Some(s.as_bytes())),
        Arg::Bytes(b) => Ok(Some(b)),
        Arg::Null => Ok(None),
        other => Err(Error::arg_mismatch(letter, "text", other.type_name())),
    }
}

fn buffer_arg<'f>(args: &'f [Arg<'f>], argi: &mut usize, letter: char) -> Result<&'f Buffer<'f>> {
    match take_arg(args, argi, letter)? {
        Arg::Buffer(b) => Ok(b),
        other => Err(Error::arg_mismatch(letter, "buffer", other.type_name())),
    }
}

fn ptr_arg(args: &[Arg<'_>], argi: &mut usize, letter: char) -> Result<usize> {
    match take_arg(args, argi, letter)? {
        Arg::Ptr(p) => Ok(*p),
        other => Err(Error::arg_mismatch(letter, "pointer", other.type_name())),
    }
}

fn count_arg<'f>(
    args: &'f [Arg<'f>],
    argi: &mut usize,
    letter: char,
) -> Result<&'f Cell<usize>> {
    match take_arg(args, argi, letter)? {
        Arg::Count(c) => Ok(c),
        other => Err(Error::arg_mismatch(letter, "count sink", other.type_name())),
    }
}
