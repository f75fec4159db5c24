//! Print an indented outline of an XML document's elements.
//!
//! Usage:
//!
//! ```sh
//! xmloutline                      # outline the built-in sample document
//! xmloutline doc.xml              # outline a file
//! cat doc.xml | xmloutline -      # outline standard input
//! RUST_LOG=trace xmloutline --chunk-size 4 doc.xml
//! ```

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use log::debug;
use xmloutline::{outline_document, outline_reader, DriverOptions, Encoding, Error, DEFAULT_CHUNK_SIZE, SAMPLE_DOCUMENT};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "memory_tracking")]
mod tracking {
    use std::alloc::{GlobalAlloc, Layout};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    pub static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

    pub struct TrackingAllocator;

    #[cfg(feature = "mimalloc")]
    static UNDERLYING: mimalloc::MiMalloc = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    static UNDERLYING: std::alloc::System = std::alloc::System;

    unsafe impl GlobalAlloc for TrackingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let ptr = UNDERLYING.alloc(layout);
            if !ptr.is_null() {
                let current = ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
                PEAK_ALLOCATED.fetch_max(current, Ordering::Relaxed);
            }
            ptr
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
            UNDERLYING.dealloc(ptr, layout)
        }
    }

    /// (current, peak) heap bytes
    pub fn stats() -> (usize, usize) {
        (
            ALLOCATED.load(Ordering::SeqCst),
            PEAK_ALLOCATED.load(Ordering::SeqCst),
        )
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: tracking::TrackingAllocator = tracking::TrackingAllocator;

#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Command Line
// ============================================================================

/// Feed an XML document to a push parser a few bytes at a time and print an
/// indented outline of its elements and attributes.
#[derive(FromArgs)]
struct Cli {
    /// maximum number of bytes per feed (default 10)
    #[argh(option, default = "DEFAULT_CHUNK_SIZE", from_str_fn(parse_chunk_size))]
    chunk_size: usize,

    /// input encoding: UTF-8 or ISO-8859-1 (default UTF-8)
    #[argh(option, default = "Encoding::Utf8")]
    encoding: Encoding,

    /// spaces per nesting level (default 2)
    #[argh(option, default = "2")]
    indent: usize,

    /// document to read, `-` for standard input; the built-in sample when omitted
    #[argh(positional)]
    input: Option<PathBuf>,
}

fn parse_chunk_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("chunk size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid chunk size `{}`: {}", value, e)),
    }
}

fn execute<W: Write>(cli: &Cli, out: W) -> Result<(), Error> {
    let options = DriverOptions::new()
        .chunk_size(cli.chunk_size)
        .encoding(cli.encoding)
        .indent(cli.indent);

    let mut out = match cli.input.as_deref() {
        None => {
            debug!("no input given, using the sample document");
            outline_document(SAMPLE_DOCUMENT.as_bytes(), out, &options)?
        }
        Some(path) if path.as_os_str() == "-" => outline_reader(io::stdin().lock(), out, &options)?,
        Some(path) => {
            debug!("reading {}", path.display());
            let file = File::open(path).map_err(Error::Read)?;
            outline_reader(file, out, &options)?
        }
    };
    out.flush().map_err(Error::Output)
}

/// Print the diagnostic for a failed run and pick the exit code
fn report<E: Write>(result: Result<(), Error>, stderr: &mut E) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            // nothing left to report a failing stderr to
            let _ = writeln!(stderr, "{}", err);
            err.exit_code()
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli: Cli = argh::from_env();
    let result = execute(&cli, io::stdout().lock());

    #[cfg(feature = "memory_tracking")]
    {
        let (current, peak) = tracking::stats();
        debug!("heap: {} bytes in use, {} bytes peak", current, peak);
    }

    ExitCode::from(report(result, &mut io::stderr().lock()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_size_flag() {
        assert_eq!(parse_chunk_size("10"), Ok(10));
        assert_eq!(parse_chunk_size("1"), Ok(1));
        assert!(parse_chunk_size("0").is_err());
        assert!(parse_chunk_size("ten").unwrap_err().contains("ten"));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::from_args(&["xmloutline"], &[]).unwrap();
        assert_eq!(cli.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cli.encoding, Encoding::Utf8);
        assert_eq!(cli.indent, 2);
        assert!(cli.input.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::from_args(
            &["xmloutline"],
            &["--chunk-size", "4", "--encoding", "ISO-8859-1", "doc.xml"],
        )
        .unwrap();
        assert_eq!(cli.chunk_size, 4);
        assert_eq!(cli.encoding, Encoding::Latin1);
        assert_eq!(cli.input, Some(PathBuf::from("doc.xml")));

        assert!(Cli::from_args(&["xmloutline"], &["--chunk-size", "0"]).is_err());
    }

    /// Run the binary's logic on `document` written to a scratch file
    fn run_on(name: &str, document: &[u8], flags: &[&str]) -> (u8, String, String) {
        let path = std::env::temp_dir().join(format!("xmloutline-{}-{}.xml", std::process::id(), name));
        std::fs::write(&path, document).unwrap();

        let path_arg = path.to_str().unwrap().to_string();
        let mut args: Vec<&str> = flags.to_vec();
        args.push(&path_arg);
        let cli = Cli::from_args(&["xmloutline"], &args).unwrap();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = report(execute(&cli, &mut stdout), &mut stderr);
        std::fs::remove_file(&path).unwrap();

        (code, String::from_utf8(stdout).unwrap(), String::from_utf8(stderr).unwrap())
    }

    #[test]
    fn test_parse_error_exit() {
        let (code, stdout, stderr) = run_on("mismatch", b"<a><b></a>", &[]);
        assert_eq!(code, 1);
        assert_eq!(stdout, "a ()\n  b ()\n");
        assert_eq!(stderr, "Parse error at line 1:\nmismatched tag\n");
    }

    #[test]
    fn test_success_exit() {
        let (code, stdout, stderr) = run_on("ok", br#"<a x="1"><b/></a>"#, &["--chunk-size", "3"]);
        assert_eq!(code, 0);
        assert_eq!(stdout, "a (x: 1)\n  b ()\n");
        assert!(stderr.is_empty());
    }

    #[test]
    fn test_missing_file_exit() {
        let cli = Cli::from_args(&["xmloutline"], &["/nonexistent/xmloutline/input.xml"]).unwrap();
        let mut stderr = Vec::new();
        let code = report(execute(&cli, Vec::new()), &mut stderr);
        assert_eq!(code, 1);
        assert!(String::from_utf8(stderr).unwrap().starts_with("Couldn't read input: "));
    }

    #[test]
    fn test_sample_document_by_default() {
        let cli = Cli::from_args(&["xmloutline"], &[]).unwrap();
        let mut stdout = Vec::new();
        assert_eq!(report(execute(&cli, &mut stdout), &mut Vec::new()), 0);
        assert!(String::from_utf8(stdout).unwrap().starts_with("abc (a: 1, b: \u{30a1})\n"));
    }
}
