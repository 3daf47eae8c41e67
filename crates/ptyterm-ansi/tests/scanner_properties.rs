//! Property tests for the scanner and line buffer.

use ptyterm_ansi::{LineBuffer, LineSink, OutputScanner};
use proptest::prelude::*;

#[derive(Default, Debug, PartialEq)]
struct Recorder {
    text: String,
    title: Option<String>,
}

impl LineSink for Recorder {
    fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }
    fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }
}

fn scan_chunks(input: &[u8], chunk: usize) -> Recorder {
    let mut scanner = OutputScanner::new();
    let mut rec = Recorder::default();
    for piece in input.chunks(chunk.max(1)) {
        scanner.feed(piece, &mut rec);
    }
    scanner.flush(&mut rec);
    rec
}

// Bytes biased towards escape-sequence structure
fn arb_terminal_bytes() -> impl Strategy<Value = Vec<u8>> {
    let token = prop_oneof![
        "[a-z ]{1,8}".prop_map(|s| s.into_bytes()),
        Just(b"\x1b[".to_vec()),
        Just(b"\x1b]0;".to_vec()),
        Just(b"\x07".to_vec()),
        Just(b"\x1b\\".to_vec()),
        Just(b"\r\n".to_vec()),
        Just("\u{e9}\u{1F600}".as_bytes().to_vec()),
        (0x30u8..0x7f).prop_map(|b| vec![b]),
        any::<u8>().prop_map(|b| vec![b]),
    ];
    prop::collection::vec(token, 0..40).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn chunking_never_changes_output(input in arb_terminal_bytes(), chunk in 1usize..17) {
        let whole = scan_chunks(&input, input.len().max(1));
        let split = scan_chunks(&input, chunk);
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn visible_text_never_contains_escape_introducers(text in "[ -~]{0,64}") {
        // printable ASCII with every ESC removed stays intact
        let wrapped = format!("\x1b[1m{}\x1b[0m\x1b]0;t\x07", text);
        let rec = scan_chunks(wrapped.as_bytes(), 3);
        prop_assert_eq!(rec.text, text);
        prop_assert_eq!(rec.title.as_deref(), Some("t"));
    }

    #[test]
    fn line_buffer_respects_cap(lines in prop::collection::vec("[a-z]{0,5}", 1..50), cap in 1usize..10) {
        let mut buf = LineBuffer::new(cap);
        buf.ingest(&lines.join("\n"));
        prop_assert!(buf.len() <= cap);
        prop_assert!(buf.len() >= 1);
        prop_assert_eq!(buf.last(), lines.last().map(String::as_str).unwrap_or(""));
    }

    #[test]
    fn line_buffer_never_stores_controls(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut buf = LineBuffer::default();
        buf.ingest_bytes(&bytes);
        for line in buf.lines() {
            prop_assert!(!line.chars().any(|c| c.is_control() && c != '\t'));
        }
    }
}
