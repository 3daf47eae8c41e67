//! # ptyterm ANSI scanner
//!
//! Streaming, UTF-8-safe stripping of terminal escape sequences into a
//! line-oriented plain-text view, plus structural OSC and SGR parsers for
//! hosts that want more than plain text.
//!
//! ```
//! use ptyterm_ansi::{LineBuffer, OutputScanner};
//!
//! let mut scanner = OutputScanner::new();
//! let mut lines = LineBuffer::new(100);
//! scanner.feed(b"\x1b]0;build\x07\x1b[32mok\x1b[0m\r\ndone", &mut lines);
//! assert_eq!(lines.title(), "build");
//! assert_eq!(lines.to_vec(), vec!["ok", "done"]);
//! ```

pub mod color;
pub mod line_buffer;
pub mod osc;
pub mod scanner;
pub mod sgr;

pub use color::{palette_rgb, Rgb, COLOR_PALETTE};
pub use line_buffer::{LineBuffer, DEFAULT_MAX_LINES, DEFAULT_TITLE};
pub use osc::{OscCommand, OscParser, OscTerminator, MAX_OSC_LEN};
pub use scanner::{CsiSequence, ErrorCallback, LineSink, OutputScanner, ScanError, ScannerStats};
pub use sgr::{Color, SgrAttribute, SgrParser, UnderlineStyle};
