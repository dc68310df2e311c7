//! pero - render printf-style format strings from the shell
//!
//! This tool drives the pero-core rendering engine: it renders format
//! strings with typed arguments, extracts function definitions (with
//! their leading comments) from C-like source files, and prints
//! display-truncated file hashes.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pero_core::{lookup, Arg, Buffer, ConvKind, HashDigits, RenderConfig, Renderer};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Render printf-style format strings and inspect source files
#[derive(Parser, Debug)]
#[command(name = "pero")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a format string with typed arguments
    Render(RenderArgs),
    /// Extract a function definition and its comment from source
    GrepFn(GrepFnArgs),
    /// Print a file's hash, truncated to the display prefix length
    Hash(HashArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// The format string
    format: String,

    /// Arguments, parsed to the type each directive expects
    args: Vec<String>,

    /// Human-display hash-prefix length for %S
    #[arg(long, default_value = "10")]
    hash_digits: usize,

    /// Root path string rendered by %R
    #[arg(long, default_value = "")]
    root: String,
}

#[derive(Args, Debug)]
struct GrepFnArgs {
    /// Pattern that opens the function definition, e.g. "main(void"
    pattern: String,

    #[command(flatten)]
    input: InputMode,

    /// Print the file's license header before the function
    #[arg(long)]
    with_license: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single source file to search
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of source files to search recursively
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HashArgs {
    /// File to hash
    file: PathBuf,

    /// Use the URL-safe prefix length instead of the display length
    #[arg(long)]
    url: bool,

    /// Print the full hash without truncation
    #[arg(long)]
    full: bool,

    /// Human-display hash-prefix length
    #[arg(long, default_value = "10")]
    hash_digits: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match &cli.command {
        Command::Render(args) => cmd_render(args),
        Command::GrepFn(args) => cmd_grep_fn(args),
        Command::Hash(args) => cmd_hash(args),
    }
}

// ---------------------------------------------------------------------------
// render
// ---------------------------------------------------------------------------

/// Argument type one directive expects, in consumption order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expected {
    Int,
    Uint,
    Float,
    Char,
    Text,
    Buffer,
    Ptr,
}

/// A parsed command-line argument, owned so the borrowed `Arg` list can
/// reference it.
#[derive(Debug)]
enum Slot {
    Int(i64),
    Uint(u64),
    Float(f64),
    Char(char),
    Text(String),
    Buffer(Buffer<'static>),
    Ptr(usize),
}

impl Slot {
    fn as_arg(&self) -> Arg<'_> {
        match self {
            Slot::Int(v) => Arg::Int(*v),
            Slot::Uint(v) => Arg::Uint(*v),
            Slot::Float(v) => Arg::Float(*v),
            Slot::Char(c) => Arg::Char(*c),
            Slot::Text(t) => Arg::Text(t),
            Slot::Buffer(b) => Arg::Buffer(b),
            Slot::Ptr(p) => Arg::Ptr(*p),
        }
    }
}

/// Walks the format string and lists the argument types its directives
/// consume, in order: `*`-sourced widths and precisions, `#`-sourced
/// byte limits, then the conversion's own argument.
fn expected_args(fmt: &str) -> Result<Vec<Expected>> {
    let bytes = fmt.as_bytes();
    let len = bytes.len();
    let mut out = Vec::new();
    let mut i = 0;

    while i < len {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        i += 1;
        let mut alternate = false;
        while i < len {
            match bytes[i] {
                b'#' => alternate = true,
                b'-' | b'+' | b' ' | b'!' | b'0' | b',' => {}
                _ => break,
            }
            i += 1;
        }
        if i < len && bytes[i] == b'*' {
            out.push(Expected::Int);
            i += 1;
        } else {
            while i < len && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        if i < len && bytes[i] == b'.' {
            i += 1;
            if i < len && bytes[i] == b'*' {
                out.push(Expected::Int);
                i += 1;
            } else {
                while i < len && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
        }
        if i < len && bytes[i] == b'l' {
            i += 1;
            if i < len && bytes[i] == b'l' {
                i += 1;
            }
        }
        if i >= len {
            bail!("format string ends inside a directive");
        }
        let letter = bytes[i];
        i += 1;
        let Some(desc) = lookup(letter) else {
            bail!("unknown conversion '%{}'", letter as char);
        };
        match desc.kind {
            ConvKind::Percent | ConvKind::Root => {}
            ConvKind::Size => bail!("%n is not supported from the command line"),
            ConvKind::Radix => {
                out.push(if desc.signed { Expected::Int } else { Expected::Uint });
            }
            ConvKind::Pointer => out.push(Expected::Ptr),
            ConvKind::Float | ConvKind::Exp | ConvKind::Generic => out.push(Expected::Float),
            ConvKind::Char => out.push(Expected::Char),
            ConvKind::Blob | ConvKind::BlobSql => {
                if alternate {
                    out.push(Expected::Int);
                }
                out.push(Expected::Buffer);
            }
            ConvKind::ShellEsc | ConvKind::Hex => out.push(Expected::Text),
            _ => {
                if alternate {
                    out.push(Expected::Int);
                }
                out.push(Expected::Text);
            }
        }
    }
    Ok(out)
}

/// Parses unsigned values, accepting an optional `0x` prefix.
fn parse_u64(raw: &str) -> Result<u64> {
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).with_context(|| format!("invalid hex value: {}", raw))
    } else {
        raw.parse()
            .with_context(|| format!("invalid unsigned value: {}", raw))
    }
}

fn parse_slot(expected: Expected, raw: &str) -> Result<Slot> {
    match expected {
        Expected::Int => Ok(Slot::Int(
            raw.parse()
                .with_context(|| format!("invalid integer: {}", raw))?,
        )),
        Expected::Uint => Ok(Slot::Uint(parse_u64(raw)?)),
        Expected::Float => Ok(Slot::Float(
            raw.parse()
                .with_context(|| format!("invalid float: {}", raw))?,
        )),
        Expected::Char => raw
            .chars()
            .next()
            .map(Slot::Char)
            .with_context(|| "empty character argument".to_string()),
        Expected::Text => Ok(Slot::Text(raw.to_string())),
        Expected::Buffer => {
            let mut b = Buffer::new();
            b.append(raw.as_bytes());
            Ok(Slot::Buffer(b))
        }
        Expected::Ptr => Ok(Slot::Ptr(parse_u64(raw)? as usize)),
    }
}

fn cmd_render(args: &RenderArgs) -> Result<()> {
    let expected = expected_args(&args.format)?;
    if expected.len() != args.args.len() {
        bail!(
            "format expects {} argument(s), got {}",
            expected.len(),
            args.args.len()
        );
    }
    let slots = expected
        .iter()
        .zip(&args.args)
        .map(|(&e, raw)| parse_slot(e, raw))
        .collect::<Result<Vec<_>>>()?;
    let arg_list: Vec<Arg<'_>> = slots.iter().map(Slot::as_arg).collect();

    let config = RenderConfig::new()
        .hash_digits(HashDigits::new(args.hash_digits))
        .root(args.root.clone());
    let renderer = Renderer::with_config(config);

    let mut out = Buffer::new();
    let n = renderer
        .render_into(&mut out, &args.format, &arg_list)
        .context("failed to render format string")?;
    debug!("rendered {} conversion bytes", n);

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(out.materialize())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// grep-fn
// ---------------------------------------------------------------------------

/// Extracts the first function definition matching `pattern` from
/// `source`, together with its leading comment block.
///
/// A line containing the pattern counts as a definition when it does not
/// end with `;` (a prototype). When the pattern has no type names (no
/// space before the parenthesis) and matches at the start of a line, the
/// preceding line is printed too, covering the return-type-on-its-own-line
/// style. The body runs until braces balance back to zero.
fn grep_function(pattern: &str, source: &str, with_license: bool) -> Option<String> {
    let head = &pattern[..pattern.find('(').unwrap_or(pattern.len())];
    let types_in_pattern = head.contains(' ');

    let mut out = String::new();
    let mut comment: Vec<&str> = Vec::new();
    let mut in_comment = false;
    let mut seen_first_comment = false;
    let mut prev_line: Option<&str> = None;
    let mut found = false;
    let mut depth = 0i32;

    for line in source.lines() {
        if found {
            out.push_str(line);
            out.push('\n');
            if scan_braces(line, &mut depth) {
                break;
            }
            continue;
        }

        // Comment capture. The first comment block of the file is the
        // license header: printed up front on request, never attached to
        // a function.
        if in_comment {
            if !seen_first_comment && with_license {
                out.push_str(line);
                out.push('\n');
            }
            if seen_first_comment {
                comment.push(line);
            }
            if line.trim_start().starts_with("*/") || line.trim_end().ends_with("*/") {
                in_comment = false;
                if !seen_first_comment {
                    seen_first_comment = true;
                    if with_license {
                        out.push('\n');
                    }
                }
            }
            prev_line = Some(line);
            continue;
        }
        if line.trim_start().starts_with("/*") {
            let closed = line.trim_end().ends_with("*/") && line.trim_start() != "/*";
            if !seen_first_comment && with_license {
                out.push_str(line);
                out.push('\n');
            }
            if seen_first_comment {
                comment.clear();
                comment.push(line);
            }
            if closed {
                // Single-line comment block.
                if !seen_first_comment {
                    seen_first_comment = true;
                    if with_license {
                        out.push('\n');
                    }
                }
            } else {
                in_comment = true;
            }
            prev_line = Some(line);
            continue;
        }

        if let Some(pos) = line.find(pattern) {
            if !line.trim_end().ends_with(';') {
                found = true;
                trace!("pattern matched: {}", line);
                for c in &comment {
                    out.push_str(c);
                    out.push('\n');
                }
                if !types_in_pattern && pos == 0 {
                    if let Some(p) = prev_line {
                        out.push_str(p);
                        out.push('\n');
                    }
                }
                out.push_str(line);
                out.push('\n');
                if scan_braces(&line[pos + pattern.len()..], &mut depth) {
                    break;
                }
                continue;
            }
        }

        prev_line = Some(line);
    }

    if found {
        Some(out)
    } else {
        None
    }
}

/// Updates the brace depth over `text`. Returns true when a closing brace
/// balances the function body back to zero.
fn scan_braces(text: &str, depth: &mut i32) -> bool {
    for b in text.bytes() {
        match b {
            b'{' => *depth += 1,
            b'}' => {
                *depth -= 1;
                if *depth == 0 {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Source file extensions grep-fn looks at in directory mode.
const SOURCE_EXTENSIONS: &[&str] = &["c", "h", "cc", "cpp", "hpp", "rs"];

fn grep_one_file(args: &GrepFnArgs, path: &Path) -> Result<bool> {
    trace!("searching {}", path.display());
    let mut file = fs::File::open(path)
        .with_context(|| format!("failed to open source file: {}", path.display()))?;
    let mut content = Buffer::new();
    content
        .read_from_stream(&mut file, None)
        .with_context(|| format!("failed to read source file: {}", path.display()))?;
    let source = String::from_utf8_lossy(content.materialize()).into_owned();

    match grep_function(&args.pattern, &source, args.with_license) {
        Some(text) => {
            print!("{}", text);
            Ok(true)
        }
        None => Ok(false),
    }
}

fn cmd_grep_fn(args: &GrepFnArgs) -> Result<()> {
    if let Some(ref file) = args.input.file {
        if !file.is_file() {
            bail!("input path is not a file: {}", file.display());
        }
        if !grep_one_file(args, file)? {
            bail!("pattern not found: {}", args.pattern);
        }
        return Ok(());
    }

    let Some(directory) = args.input.directory.as_ref() else {
        bail!("either --file or --directory must be specified");
    };
    if !directory.is_dir() {
        bail!("path is not a directory: {}", directory.display());
    }
    let mut matched = false;
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let wanted = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SOURCE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if !wanted {
            continue;
        }
        match grep_one_file(args, path) {
            Ok(true) => {
                matched = true;
                break;
            }
            Ok(false) => {}
            Err(e) => warn!("error searching {}: {}", path.display(), e),
        }
    }
    if !matched {
        bail!("pattern not found: {}", args.pattern);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// hash
// ---------------------------------------------------------------------------

/// Renders a hex hash through the `%S` conversion, truncating it to the
/// configured display or URL prefix length.
fn hash_display(hex: &str, digits: HashDigits, url: bool, full: bool) -> Result<String> {
    if full {
        return Ok(hex.to_string());
    }
    let renderer = Renderer::with_config(RenderConfig::new().hash_digits(digits));
    let fmt = if url { "%!S" } else { "%S" };
    let mut out = Buffer::new();
    renderer
        .render_into(&mut out, fmt, &[Arg::Text(hex)])
        .context("failed to render hash prefix")?;
    Ok(String::from_utf8_lossy(out.materialize()).into_owned())
}

fn cmd_hash(args: &HashArgs) -> Result<()> {
    let data = fs::read(&args.file)
        .with_context(|| format!("failed to read file: {}", args.file.display()))?;
    debug!("hashing {} bytes", data.len());
    let hash = blake3::hash(&data);
    let line = hash_display(
        &hash.to_hex(),
        HashDigits::new(args.hash_digits),
        args.url,
        args.full,
    )?;
    println!("{}", line);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
/*
 * Copyright notice.
 */

#include <stdio.h>

/*
** Say hello on stdout.
*/
static void say_hello(int n){
  for(int i=0; i<n; i++){
    printf(\"hello\\n\");
  }
}

void say_hello_proto(int n);

/*
** Entry point.
*/
int
main(void)
{
  say_hello(1);
  return 0;
}
";

    #[test]
    fn test_expected_args_basic() {
        assert_eq!(
            expected_args("%d %s").unwrap(),
            vec![Expected::Int, Expected::Text]
        );
        assert_eq!(
            expected_args("%u %x").unwrap(),
            vec![Expected::Uint, Expected::Uint]
        );
        assert_eq!(expected_args("no directives").unwrap(), vec![]);
        assert_eq!(expected_args("%%").unwrap(), vec![]);
    }

    #[test]
    fn test_expected_args_star_and_limit() {
        assert_eq!(
            expected_args("%*.*f").unwrap(),
            vec![Expected::Int, Expected::Int, Expected::Float]
        );
        assert_eq!(
            expected_args("%#s").unwrap(),
            vec![Expected::Int, Expected::Text]
        );
        assert_eq!(
            expected_args("%#b").unwrap(),
            vec![Expected::Int, Expected::Buffer]
        );
    }

    #[test]
    fn test_expected_args_rejects_unknown() {
        assert!(expected_args("%k").is_err());
        assert!(expected_args("%n").is_err());
        assert!(expected_args("%").is_err());
    }

    #[test]
    fn test_parse_slot_values() {
        assert!(matches!(parse_slot(Expected::Int, "-42"), Ok(Slot::Int(-42))));
        assert!(matches!(
            parse_slot(Expected::Uint, "0xff"),
            Ok(Slot::Uint(255))
        ));
        assert!(matches!(
            parse_slot(Expected::Float, "2.5"),
            Ok(Slot::Float(v)) if v == 2.5
        ));
        assert!(matches!(parse_slot(Expected::Char, "A"), Ok(Slot::Char('A'))));
        assert!(parse_slot(Expected::Int, "abc").is_err());
    }

    #[test]
    fn test_grep_function_with_comment() {
        let text = grep_function("say_hello(int", SAMPLE, false).unwrap();
        assert!(text.starts_with("/*\n** Say hello on stdout.\n*/\n"));
        assert!(text.contains("static void say_hello(int n){"));
        assert!(text.trim_end().ends_with('}'));
        // The body's inner braces are balanced; the prototype further down
        // is not included.
        assert!(!text.contains("say_hello_proto"));
    }

    #[test]
    fn test_grep_function_skips_prototype() {
        let text = grep_function("say_hello_proto(int", SAMPLE, false);
        assert!(text.is_none());
    }

    #[test]
    fn test_grep_function_head_line() {
        // A pattern without type names matching at column zero pulls in
        // the previous line, covering the return-type-on-its-own-line
        // style.
        let text = grep_function("main(void", SAMPLE, false).unwrap();
        assert!(text.contains("int\nmain(void)"));
        assert!(text.contains("/*\n** Entry point.\n*/"));
    }

    #[test]
    fn test_grep_function_license() {
        let text = grep_function("main(void", SAMPLE, true).unwrap();
        assert!(text.starts_with("/*\n * Copyright notice.\n */\n\n"));
    }

    #[test]
    fn test_grep_function_missing_pattern() {
        assert!(grep_function("nonexistent(", SAMPLE, false).is_none());
    }

    #[test]
    fn test_hash_display_truncates() {
        let hex = "0123456789abcdef0123456789abcdef";
        let digits = HashDigits::new(10);
        assert_eq!(
            hash_display(hex, digits, false, false).unwrap(),
            "0123456789"
        );
        assert_eq!(
            hash_display(hex, digits, true, false).unwrap(),
            "0123456789abcdef"
        );
        assert_eq!(hash_display(hex, digits, false, true).unwrap(), hex);
    }

    #[test]
    fn test_grep_one_file_reads_through_buffer() {
        use std::io::Write as _;
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sample.c");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(SAMPLE.as_bytes()).unwrap();
        drop(f);

        let args = GrepFnArgs {
            pattern: "say_hello(int".to_string(),
            input: InputMode {
                file: Some(path.clone()),
                directory: None,
            },
            with_license: false,
        };
        assert!(grep_one_file(&args, &path).unwrap());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
