//! Growable, always-terminated byte buffer.
//!
//! A [`Buffer`] holds a string or a binary object of arbitrary size. The
//! size changes as necessary: appends grow the backing storage with enough
//! slack that repeated small appends amortize to constant time each.
//!
//! ## Storage strategy
//!
//! A buffer either borrows caller-supplied memory or owns heap storage:
//!
//! - **Borrowed** buffers never mutate the memory they were constructed
//!   from. The first growth (or any in-place write) copies the content to
//!   owned storage.
//! - **Owned** buffers hold their storage exclusively in a `Vec<u8>` whose
//!   length is the allocated capacity.
//!
//! ## Invariants
//!
//! - `used <= capacity` at all times.
//! - After [`Buffer::materialize`], the byte at offset `used` is a NUL
//!   terminator and `capacity > used`.
//! - Storage-growth failure and the capacity ceiling are fatal: the
//!   terminated-and-in-bounds invariants cannot be maintained past either,
//!   so the process is aborted rather than handed a recoverable error.

use crate::error::{Error, Result};
use std::io::Read;
use tracing::trace;

/// Requested capacities at or above this value abort the process.
///
/// Guards the size arithmetic against signed-overflow corruption in
/// downstream consumers that hold lengths in 32-bit integers.
const CAPACITY_CEILING: usize = 0x7fff_0000;

/// Shrink requests reduce capacity by less than this are ignored, so
/// append/resize cycles do not thrash the allocator.
const SHRINK_SLACK: usize = 4000;

/// Chunk size for [`Buffer::read_from_stream`] when reading to EOF.
const READ_CHUNK: usize = 10_000;

/// Flag bit recording that content not trusted as SQL text has been
/// appended. Set by [`crate::Renderer::render_into`] and left clear by
/// [`crate::Renderer::render_sql_into`].
pub const FLAG_NOT_SQL: u32 = 0x01;

/// Backing storage for a [`Buffer`], dispatching growth by variant.
#[derive(Debug)]
enum Storage<'a> {
    /// Caller-supplied memory, never written to. `cap` is the claimed
    /// capacity, which may exceed the slice (a buffer attached to a short
    /// literal with a larger declared length).
    Borrowed { src: &'a [u8], cap: usize },
    /// Exclusively owned storage; the vector's length is the capacity.
    Owned(Vec<u8>),
}

impl Storage<'_> {
    /// Storage is always owned at write sites; growth converts first.
    fn owned_mut(&mut self) -> &mut Vec<u8> {
        match self {
            Storage::Owned(v) => v,
            Storage::Borrowed { .. } => unreachable!("write into borrowed storage"),
        }
    }
}

/// Growable, optionally borrowed, always-terminated byte container.
#[derive(Debug)]
pub struct Buffer<'a> {
    /// Number of content bytes.
    used: usize,
    /// Next byte of input for parse-style consumers.
    cursor: usize,
    /// One or more `FLAG_*` bits.
    flags: u32,
    /// Set by `release`; cleared by `init`. Mutation while set is a
    /// contract violation checked in debug builds.
    released: bool,
    storage: Storage<'a>,
}

impl Default for Buffer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Growth failure is unrecoverable; report and terminate.
fn storage_panic() -> ! {
    eprintln!("out of memory");
    std::process::abort();
}

/// Length of `data`, or of its prefix up to the first NUL when `len == 0`.
fn measured_len(data: &[u8], len: usize) -> usize {
    if len == 0 {
        data.iter().position(|&b| b == 0).unwrap_or(data.len())
    } else {
        len
    }
}

impl<'a> Buffer<'a> {
    /// Creates an empty buffer. No storage is allocated until the first
    /// append.
    pub fn new() -> Self {
        Self {
            used: 0,
            cursor: 0,
            flags: 0,
            released: false,
            storage: Storage::Borrowed { src: b"", cap: 1 },
        }
    }

    /// Creates a buffer borrowing `data`, without copying.
    pub fn from_bytes(data: &'a [u8]) -> Self {
        let len = measured_len(data, 0);
        Self {
            used: len,
            cursor: 0,
            flags: 0,
            released: false,
            storage: Storage::Borrowed { src: data, cap: len },
        }
    }

    /// Attaches the buffer to caller-supplied memory without copying.
    ///
    /// `len == 0` measures `data` up to its first NUL; a nonzero `len` is
    /// taken as the content length even when it exceeds the slice (the
    /// unfilled remainder reads as NUL bytes once the buffer is
    /// materialized).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the buffer still owns storage;
    /// call [`Buffer::release`] first.
    pub fn init(&mut self, data: &'a [u8], len: usize) -> Result<()> {
        if matches!(self.storage, Storage::Owned(_)) {
            return Err(Error::InvalidState);
        }
        let len = measured_len(data, len);
        self.used = len;
        self.cursor = 0;
        self.flags = 0;
        self.released = false;
        self.storage = Storage::Borrowed { src: data, cap: len };
        Ok(())
    }

    /// Number of content bytes.
    pub fn len(&self) -> usize {
        self.used
    }

    /// True if the buffer holds no content.
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Allocated (or, for borrowed buffers, claimed) capacity.
    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Borrowed { cap, .. } => *cap,
            Storage::Owned(v) => v.len(),
        }
    }

    /// Content view. A borrowed buffer whose claimed length exceeds its
    /// source exposes only the real bytes until materialized.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Borrowed { src, .. } => &src[..src.len().min(self.used)],
            Storage::Owned(v) => &v[..self.used],
        }
    }

    /// Appends bytes to the end of the buffer, growing as necessary.
    ///
    /// The content is re-terminated after every append. The first growth
    /// of a borrowed buffer copies it to owned storage.
    pub fn append(&mut self, data: &[u8]) {
        debug_assert!(!self.released, "buffer mutated after release");
        if data.is_empty() {
            return;
        }
        let n = data.len();
        if self.used + n >= self.capacity() {
            let want = self.used + n + self.capacity() + 100;
            if want >= CAPACITY_CEILING {
                storage_panic();
            }
            self.grow_to(want);
        }
        let used = self.used;
        let v = self.storage.owned_mut();
        v[used..used + n].copy_from_slice(data);
        v[used + n] = 0;
        self.used = used + n;
    }

    /// Appends a single byte.
    ///
    /// Fast path for the common case where capacity headroom already
    /// exists; no termination or allocation happens then.
    pub fn push(&mut self, byte: u8) {
        debug_assert!(!self.released, "buffer mutated after release");
        if self.used + 1 >= self.capacity() {
            self.append(&[byte]);
        } else {
            let used = self.used;
            let v = self.storage.owned_mut();
            v[used] = byte;
            self.used = used + 1;
        }
    }

    /// Resizes the content to exactly `new_used` bytes, truncating if
    /// shrinking, and re-terminates.
    ///
    /// Capacity is reduced only when the shrink is large enough to be
    /// worth a reallocation.
    pub fn resize(&mut self, new_used: usize) {
        debug_assert!(!self.released, "buffer mutated after release");
        self.grow_to(new_used + 1);
        self.used = new_used;
        let v = self.storage.owned_mut();
        v[new_used] = 0;
    }

    /// Forces the buffer into owned, terminated storage and returns the
    /// full content view.
    ///
    /// The returned slice is valid until the next mutating call.
    pub fn materialize(&mut self) -> &[u8] {
        self.resize(self.used);
        let v = self.storage.owned_mut();
        &v[..self.used]
    }

    /// The "read as terminated string" view: materialized content up to
    /// the first NUL byte.
    ///
    /// This is narrower than [`Buffer::materialize`] whenever embedded NUL
    /// bytes precede the end of the content — in particular for a buffer
    /// attached to a short borrowed literal with a larger declared length,
    /// whose unfilled region reads as NUL.
    pub fn str_bytes(&mut self) -> &[u8] {
        if self.used == 0 {
            self.push(0);
            self.used = 0;
        }
        match &mut self.storage {
            Storage::Owned(v) if self.used < v.len() => v[self.used] = 0,
            _ => {
                self.materialize();
            }
        }
        let v = self.storage.owned_mut();
        let end = v[..self.used]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.used);
        &v[..end]
    }

    /// Frees owned storage and resets to the empty state.
    ///
    /// The buffer must be re-initialized (or re-created) before further
    /// mutation; `release` followed by `append` is a contract violation
    /// checked in debug builds. `release` followed by [`Buffer::init`] is
    /// the supported reuse path.
    pub fn release(&mut self) {
        self.used = 0;
        self.cursor = 0;
        self.flags = 0;
        self.released = true;
        self.storage = Storage::Borrowed { src: b"", cap: 0 };
    }

    /// Discards prior content and fills the buffer from `src`.
    ///
    /// `count == None` reads until end-of-stream in fixed-size chunks.
    /// `count == Some(n)` pre-sizes the buffer, reads at most `n` bytes
    /// (fewer if the stream ends early), then shrinks to the amount
    /// actually read. Returns the number of bytes now in the buffer.
    ///
    /// # Errors
    ///
    /// Stream errors are propagated, not interpreted.
    pub fn read_from_stream<R: Read>(&mut self, src: &mut R, count: Option<usize>) -> Result<usize> {
        self.used = 0;
        self.cursor = 0;
        self.flags = 0;
        self.released = false;
        self.storage = Storage::Borrowed { src: b"", cap: 1 };
        match count {
            None => {
                let mut chunk = [0u8; READ_CHUNK];
                loop {
                    let got = src.read(&mut chunk)?;
                    if got == 0 {
                        break;
                    }
                    self.append(&chunk[..got]);
                }
            }
            Some(n) => {
                self.resize(n);
                let mut filled = 0;
                while filled < n {
                    let v = self.storage.owned_mut();
                    let got = src.read(&mut v[filled..n])?;
                    if got == 0 {
                        break;
                    }
                    filled += got;
                }
                self.resize(filled);
            }
        }
        trace!("read {} bytes from stream", self.used);
        Ok(self.used)
    }

    /// Current read position for parse-style consumers.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the read position. Positions past the content are clamped to
    /// the content length.
    pub fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos.min(self.used);
    }

    /// Resets the read position to the start of the content.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Reads the next line from the cursor position, including its
    /// terminating newline if present, and advances the cursor. Returns
    /// `None` once the cursor has consumed all content.
    pub fn read_line(&mut self) -> Option<&[u8]> {
        if self.cursor >= self.used {
            return None;
        }
        self.materialize();
        let used = self.used;
        let start = self.cursor;
        let v = self.storage.owned_mut();
        let end = v[start..used]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| start + i + 1)
            .unwrap_or(used);
        self.cursor = end;
        Some(&v[start..end])
    }

    /// Marks the buffer as holding content not trusted as SQL text.
    pub fn mark_not_sql(&mut self) {
        self.flags |= FLAG_NOT_SQL;
    }

    /// True unless non-SQL content has been appended since the last
    /// initialization.
    pub fn is_sql_trusted(&self) -> bool {
        self.flags & FLAG_NOT_SQL == 0
    }

    /// Reallocates storage to `new_cap` bytes, converting borrowed storage
    /// to owned. Shrinks within [`SHRINK_SLACK`] of the current capacity
    /// are ignored.
    fn grow_to(&mut self, new_cap: usize) {
        match &mut self.storage {
            Storage::Owned(v) => {
                if new_cap > v.len() || new_cap + SHRINK_SLACK < v.len() {
                    trace!("reallocating owned storage to {} bytes", new_cap);
                    v.resize(new_cap, 0);
                    if self.used > new_cap {
                        self.used = new_cap;
                    }
                }
            }
            Storage::Borrowed { src, .. } => {
                if self.used > new_cap {
                    self.used = new_cap;
                }
                let mut v = vec![0u8; new_cap];
                let real = src.len().min(self.used);
                v[..real].copy_from_slice(&src[..real]);
                trace!(
                    "copied {} borrowed bytes into {} bytes of owned storage",
                    real,
                    new_cap
                );
                self.storage = Storage::Owned(v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const TESTSTR: &[u8] = b"black sheep wall";

    #[test]
    fn test_new_is_empty() {
        let b = Buffer::new();
        assert_eq!(b.len(), 0);
        assert!(b.is_empty());
        assert!(b.is_sql_trusted());
    }

    #[test]
    fn test_push_then_str() {
        let mut b = Buffer::new();
        b.push(88);
        assert_eq!(b.len(), 1);
        assert_eq!(b.str_bytes(), b"X");
    }

    #[test]
    fn test_append_concatenates() {
        let mut b = Buffer::new();
        b.append(b"black ");
        b.append(b"sheep");
        assert_eq!(b.len(), 11);
        assert_eq!(b.as_bytes(), b"black sheep");
    }

    #[test]
    fn test_append_empty_is_noop() {
        let mut b = Buffer::new();
        b.append(b"abc");
        let cap = b.capacity();
        b.append(b"");
        assert_eq!(b.len(), 3);
        assert_eq!(b.capacity(), cap);
    }

    #[test]
    fn test_append_then_str_roundtrip() {
        let mut b = Buffer::new();
        b.append(TESTSTR);
        assert_eq!(b.len(), 16);
        assert_eq!(b.str_bytes(), TESTSTR);
    }

    #[test]
    fn test_growth_preserves_content() {
        let mut b = Buffer::new();
        let mut expect = Vec::new();
        for i in 0..500u32 {
            let piece = format!("chunk-{} ", i);
            b.append(piece.as_bytes());
            expect.extend_from_slice(piece.as_bytes());
        }
        assert_eq!(b.as_bytes(), &expect[..]);
        assert_eq!(b.len(), expect.len());
    }

    #[test]
    fn test_resize_then_materialize_exact_length() {
        let mut b = Buffer::new();
        b.append(TESTSTR);
        b.resize(5);
        let view = b.materialize();
        assert_eq!(view, b"black");
        assert_eq!(view.len(), 5);
        assert!(b.capacity() > b.len());
    }

    #[test]
    fn test_resize_truncates_str() {
        let mut b = Buffer::new();
        b.append(TESTSTR);
        b.resize(5);
        assert_eq!(b.str_bytes(), b"black");
    }

    #[test]
    fn test_shrink_then_grow_roundtrips() {
        let mut b = Buffer::new();
        b.append(TESTSTR);
        let cap = b.capacity();
        // Within the hysteresis threshold no reallocation happens, and the
        // truncated content survives a later grow of the used length.
        b.resize(5);
        assert_eq!(b.capacity(), cap);
        b.append(b" sheep");
        assert_eq!(b.as_bytes(), b"black sheep");
    }

    #[test]
    fn test_large_shrink_reallocates() {
        let mut b = Buffer::new();
        b.append(&[b'x'; 9000]);
        let cap = b.capacity();
        b.resize(10);
        assert!(b.capacity() < cap);
        assert_eq!(b.len(), 10);
        assert_eq!(b.as_bytes(), &[b'x'; 10]);
    }

    #[test]
    fn test_release_then_init_is_valid() {
        let mut b = Buffer::new();
        b.append(TESTSTR);
        b.release();
        assert_eq!(b.len(), 0);
        b.init(b"hello", 0).unwrap();
        assert_eq!(b.len(), 5);
        assert_eq!(b.as_bytes(), b"hello");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "after release")]
    fn test_append_after_release_is_contract_violation() {
        let mut b = Buffer::new();
        b.append(TESTSTR);
        b.release();
        b.append(b"x");
    }

    #[test]
    fn test_init_on_owned_buffer_fails() {
        let mut b = Buffer::new();
        b.append(TESTSTR);
        assert!(matches!(b.init(b"x", 0), Err(Error::InvalidState)));
    }

    #[test]
    fn test_init_over_borrowed_is_valid() {
        let mut b = Buffer::from_bytes(b"first");
        b.init(b"second", 0).unwrap();
        assert_eq!(b.as_bytes(), b"second");
    }

    #[test]
    fn test_borrowed_claim_longer_than_source() {
        // Attaching a 100-byte claim to an empty literal: appends land
        // after the claimed region, and the terminated-string read stays
        // empty because the first byte reads as NUL.
        let mut b = Buffer::new();
        b.init(b"", 100).unwrap();
        assert_eq!(b.len(), 100);
        b.append(TESTSTR);
        assert_eq!(b.len(), 116);
        assert_eq!(b.str_bytes(), b"");
        b.resize(10);
        assert_eq!(b.len(), 10);
        assert_eq!(b.str_bytes(), b"");
    }

    #[test]
    fn test_materialize_differs_from_str_read() {
        let mut b = Buffer::new();
        b.init(b"", 4).unwrap();
        b.append(b"tail");
        assert_eq!(b.str_bytes(), b"");
        let view = b.materialize();
        assert_eq!(view.len(), 8);
        assert_eq!(&view[4..], b"tail");
    }

    #[test]
    fn test_borrowed_never_mutated() {
        let src = b"stable".to_vec();
        let mut b = Buffer::from_bytes(&src);
        b.append(b" more");
        assert_eq!(b.as_bytes(), b"stable more");
        assert_eq!(&src[..], b"stable");
    }

    #[test]
    fn test_read_from_stream_to_eof() {
        let mut b = Buffer::new();
        let data = vec![7u8; 25_000];
        let n = b.read_from_stream(&mut Cursor::new(&data), None).unwrap();
        assert_eq!(n, 25_000);
        assert_eq!(b.as_bytes(), &data[..]);
    }

    #[test]
    fn test_read_from_stream_exact() {
        let mut b = Buffer::new();
        b.append(b"old content");
        let n = b
            .read_from_stream(&mut Cursor::new(b"fresh"), Some(3))
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(b.as_bytes(), b"fre");
    }

    #[test]
    fn test_read_from_stream_short_stream_shrinks() {
        let mut b = Buffer::new();
        let n = b
            .read_from_stream(&mut Cursor::new(b"abc"), Some(10))
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(b.as_bytes(), b"abc");
    }

    #[test]
    fn test_read_line_walks_content() {
        let mut b = Buffer::new();
        b.append(b"one\ntwo\nthree");
        assert_eq!(b.read_line().unwrap(), b"one\n");
        assert_eq!(b.read_line().unwrap(), b"two\n");
        assert_eq!(b.read_line().unwrap(), b"three");
        assert!(b.read_line().is_none());
        b.rewind();
        assert_eq!(b.read_line().unwrap(), b"one\n");
    }

    #[test]
    fn test_not_sql_flag() {
        let mut b = Buffer::new();
        assert!(b.is_sql_trusted());
        b.mark_not_sql();
        assert!(!b.is_sql_trusted());
        b.release();
        assert!(b.is_sql_trusted());
    }

    #[test]
    fn test_empty_str_is_terminated() {
        let mut b = Buffer::new();
        assert_eq!(b.str_bytes(), b"");
        assert_eq!(b.len(), 0);
    }
}
