// tests/line_preview_tests.rs
//! Integration tests for realistic terminal output scenarios

use ptyterm::ansi::{CsiSequence, LineBuffer, LineSink, OscCommand, OutputScanner, DEFAULT_TITLE};
use rand::Rng;

fn preview(bytes: &[u8], max_lines: usize) -> LineBuffer {
    let mut scanner = OutputScanner::new();
    let mut lines = LineBuffer::new(max_lines);
    scanner.feed(bytes, &mut lines);
    scanner.flush(&mut lines);
    lines
}

/// Records everything a host could care about besides plain text
#[derive(Default)]
struct RecordingSink {
    lines: LineBuffer,
    osc: Vec<OscCommand>,
    csi: Vec<String>,
}

impl LineSink for RecordingSink {
    fn push_str(&mut self, text: &str) {
        self.lines.ingest(text);
    }

    fn set_title(&mut self, title: &str) {
        self.lines.set_title(title);
    }

    fn osc(&mut self, command: &OscCommand) {
        self.osc.push(command.clone());
    }

    fn csi(&mut self, sequence: &CsiSequence) {
        self.csi.push(sequence.to_string());
    }
}

#[test]
fn test_plain_lines() {
    let lines = preview(b"a\nb\nc", 100);
    assert_eq!(lines.to_vec(), vec!["a", "b", "c"]);
}

#[test]
fn test_carriage_return_overwrites() {
    let lines = preview(b"abc\r def", 100);
    assert_eq!(lines.to_vec(), vec![" def"]);
}

#[test]
fn test_backspace_edits() {
    let lines = preview(b"abc\x08\x08d", 100);
    assert_eq!(lines.to_vec(), vec!["ad"]);
}

#[test]
fn test_shell_prompt_session() {
    // colored prompt, a command, its output and a fresh prompt
    let transcript = b"\x1b]0;user@host: ~\x07\x1b[01;32muser@host\x1b[00m:\x1b[01;34m~\x1b[00m$ ls\r\n\
        \x1b[0m\x1b[01;34mdocs\x1b[0m  notes.txt\r\n\
        \x1b]0;user@host: ~\x07\x1b[01;32muser@host\x1b[00m:\x1b[01;34m~\x1b[00m$ ";
    let lines = preview(transcript, 100);
    assert_eq!(lines.to_vec(), vec!["user@host:~$ ls", "docs  notes.txt", "user@host:~$ "]);
    assert_eq!(lines.title(), "user@host: ~");
}

#[test]
fn test_progress_bar_keeps_last_frame() {
    let mut transcript = Vec::new();
    for pct in (0..=100).step_by(25) {
        transcript.extend_from_slice(format!("\r\x1b[2Kdownloading {pct:>3}%").as_bytes());
    }
    transcript.extend_from_slice(b"\r\ndone\r\n");
    let lines = preview(&transcript, 100);
    assert_eq!(lines.to_vec(), vec!["downloading 100%", "done", ""]);
}

#[test]
fn test_title_only_output() {
    let lines = preview(b"\x1b]2;first\x07\x1b]0;second\x1b\\", 100);
    assert_eq!(lines.title(), "second");
    assert_eq!(lines.to_vec(), vec![""]);
}

#[test]
fn test_default_title() {
    assert_eq!(preview(b"text", 10).title(), DEFAULT_TITLE);
}

#[test]
fn test_cursor_movement_is_stripped() {
    let lines = preview(b"\x1b[H\x1b[2J\x1b[?25l\x1b[10;5Hmenu\x1b[?25h", 100);
    assert_eq!(lines.to_vec(), vec!["menu"]);
}

#[test]
fn test_line_cap_evicts_oldest() {
    let text: String = (0..50).map(|i| format!("line {i}\n")).collect();
    let lines = preview(text.as_bytes(), 10);
    assert_eq!(lines.len(), 10);
    assert_eq!(lines.first(), "line 41");
    assert_eq!(lines.last(), "");
}

#[test]
fn test_wide_and_combining_text() {
    let lines = preview("日本語 e\u{301} 🦀\r\n".as_bytes(), 100);
    assert_eq!(lines.first(), "日本語 e\u{301} 🦀");
}

#[test]
fn test_host_sees_structured_sequences() {
    let mut scanner = OutputScanner::new();
    let mut sink = RecordingSink::default();
    scanner.feed(
        b"\x1b]7;file://host/tmp\x07\x1b]8;;https://example.com\x07link\x1b]8;;\x07 \x1b[?2004h",
        &mut sink,
    );

    assert_eq!(sink.lines.to_vec(), vec!["link "]);
    assert!(matches!(&sink.osc[0], OscCommand::CurrentDirectory(_)));
    assert!(matches!(&sink.osc[1], OscCommand::Hyperlink { .. }));
    assert_eq!(sink.csi, vec!["ESC[?2004h"]);
}

#[test]
fn test_random_chunking_matches_single_feed() {
    let transcript = "\x1b]0;build\x07\x1b[1;32mCompiling\x1b[0m ptyterm v0.1.0\r\n\
        warning: unused import: `std::io` \u{2192} café\r\n\
        \x1b[1m\x1b[31merror\x1b[0m: aborting\r\n"
        .as_bytes();
    let expected = preview(transcript, 100);

    let mut rng = rand::rng();
    for _ in 0..200 {
        let mut scanner = OutputScanner::new();
        let mut lines = LineBuffer::new(100);
        let mut rest = transcript;
        while !rest.is_empty() {
            let n = rng.random_range(1..=rest.len().min(7));
            scanner.feed(&rest[..n], &mut lines);
            rest = &rest[n..];
        }
        scanner.flush(&mut lines);
        assert_eq!(lines.to_vec(), expected.to_vec());
        assert_eq!(lines.title(), "build");
    }
}
