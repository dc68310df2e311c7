//! # pero-core
//!
//! A self-contained text-rendering engine: a growable, always-terminated
//! byte buffer plus a printf-style format interpreter that renders typed
//! arguments into it without relying on any platform formatting routine.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`buffer`]: the growable [`Buffer`] container
//! - [`format`]: the format [`Renderer`], conversion dispatch table,
//!   numeric converters and escaping transforms
//! - [`error`]: error types and handling
//!
//! ## Example
//!
//! ```
//! use pero_core::{Arg, Buffer, Renderer};
//!
//! let renderer = Renderer::new();
//! let mut out = Buffer::new();
//! renderer.render_into(
//!     &mut out,
//!     "INSERT INTO tag VALUES(%d, %Q);",
//!     &[Arg::Int(7), Arg::Text("it's")],
//! )?;
//! assert_eq!(out.str_bytes(), b"INSERT INTO tag VALUES(7, 'it''s');");
//! # Ok::<(), pero_core::Error>(())
//! ```
//!
//! ## Conversions
//!
//! Beyond the standard printf alphabet (`d i u o x X f e E g G s c p n
//! %`), the renderer carries the domain extensions: SQL quoting (`%q`,
//! `%Q`, `%w`, `%B`), buffer echo (`%b`), path normalization (`%/`),
//! hash-prefix truncation (`%S`, `%!S`), HTML/HTTP/URL/JSON escaping
//! (`%h`, `%t`, `%T`, `%j`), hex dumps (`%H`), shell quoting (`%$`) and
//! whitespace-token encoding (`%F`).

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod buffer;
pub mod error;
pub mod format;

// Re-export primary types for convenience
pub use buffer::{Buffer, FLAG_NOT_SQL};
pub use error::{Error, Result};
pub use format::{
    lookup, render_str, Arg, ConvKind, Descriptor, HashDigits, RenderConfig, Renderer,
    HASH_DIGITS_MAX,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
