//! Capped, line-oriented plain-text view of terminal output.

use std::collections::VecDeque;

use crate::scanner::LineSink;

/// Title reported until the output sets one.
pub const DEFAULT_TITLE: &str = "Terminal";

/// Line cap used by [`LineBuffer::default`].
pub const DEFAULT_MAX_LINES: usize = 1000;

/// Ordered list of text lines, newest at the tail, plus a window title.
///
/// The buffer is never empty: a fresh or cleared buffer holds a single empty
/// line. Every mutation bumps [`revision`](LineBuffer::revision), so observers
/// can cheaply tell whether anything changed since they last looked.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    lines: VecDeque<String>,
    title: String,
    max_lines: usize,
    revision: u64,
    // content a CR cleared; restored when the CR turns out to be half of CRLF
    cr_saved: Option<String>,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl LineBuffer {
    /// Create a buffer holding at most `max_lines` lines (at least one).
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::from([String::new()]),
            title: DEFAULT_TITLE.to_string(),
            max_lines: max_lines.max(1),
            revision: 0,
            cr_saved: None,
        }
    }

    /// Append already-scanned text.
    ///
    /// Printable characters go to the last line, `\n` starts a new line, `\r`
    /// clears the last line and backspace removes its last character. Tab is
    /// kept; every other control character is dropped.
    pub fn ingest(&mut self, text: &str) {
        for ch in text.chars() {
            let saved = self.cr_saved.take();
            match ch {
                '\n' => {
                    if let Some(saved) = saved {
                        *self.current_mut() = saved;
                    }
                    self.lines.push_back(String::new());
                }
                '\r' => {
                    let cleared = std::mem::take(self.current_mut());
                    self.cr_saved = Some(saved.unwrap_or(cleared));
                }
                '\x08' => {
                    self.current_mut().pop();
                }
                '\t' => self.current_mut().push('\t'),
                c if c.is_control() => {}
                c => self.current_mut().push(c),
            }
        }

        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
        self.revision += 1;
    }

    /// Decode bytes permissively and ingest them. Invalid sequences become
    /// U+FFFD.
    pub fn ingest_bytes(&mut self, bytes: &[u8]) {
        self.ingest(&String::from_utf8_lossy(bytes));
    }

    pub fn set_title(&mut self, title: &str) {
        self.title.clear();
        self.title.push_str(title);
        self.revision += 1;
    }

    /// Drop all lines, keeping the title.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.lines.push_back(String::new());
        self.cr_saved = None;
        self.revision += 1;
    }

    /// Return to the freshly constructed state. The revision keeps counting
    /// up so observers still see a change.
    pub fn reset(&mut self) {
        self.clear();
        self.title = DEFAULT_TITLE.to_string();
    }

    pub fn lines(&self) -> impl ExactSizeIterator<Item = &str> + DoubleEndedIterator + '_ {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn first(&self) -> &str {
        self.lines.front().map(String::as_str).unwrap_or_default()
    }

    pub fn last(&self) -> &str {
        self.lines.back().map(String::as_str).unwrap_or_default()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    /// All lines joined with `\n`.
    pub fn text(&self) -> String {
        self.to_vec().join("\n")
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    fn current_mut(&mut self) -> &mut String {
        if self.lines.is_empty() {
            self.lines.push_back(String::new());
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }
}

impl LineSink for LineBuffer {
    fn push_str(&mut self, text: &str) {
        self.ingest(text);
    }

    fn set_title(&mut self, title: &str) {
        LineBuffer::set_title(self, title);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingested(text: &str) -> Vec<String> {
        let mut buf = LineBuffer::default();
        buf.ingest(text);
        buf.to_vec()
    }

    #[test]
    fn newlines_split_lines() {
        assert_eq!(ingested("a\nb\nc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn carriage_return_clears_line() {
        assert_eq!(ingested("abc\r def"), vec![" def"]);
        assert_eq!(ingested("abc\r"), vec![""]);
    }

    #[test]
    fn crlf_is_a_line_break() {
        assert_eq!(ingested("one\r\ntwo\r\n"), vec!["one", "two", ""]);
    }

    #[test]
    fn crlf_split_across_calls() {
        let mut buf = LineBuffer::default();
        buf.ingest("one\r");
        assert_eq!(buf.last(), "");
        buf.ingest("\ntwo");
        assert_eq!(buf.to_vec(), vec!["one", "two"]);
    }

    #[test]
    fn repeated_cr_before_lf_keeps_line() {
        assert_eq!(ingested("abc\r\r\nx"), vec!["abc", "x"]);
        assert_eq!(ingested("abc\rxy\r\n"), vec!["xy", ""]);
    }

    #[test]
    fn backspace_removes_last_char() {
        assert_eq!(ingested("abc\x08\x08d"), vec!["ad"]);
        assert_eq!(ingested("\x08\x08x"), vec!["x"]);
    }

    #[test]
    fn backspace_removes_whole_character() {
        assert_eq!(ingested("h\u{e9}\x08"), vec!["h"]);
    }

    #[test]
    fn controls_are_dropped_but_tab_kept() {
        assert_eq!(ingested("a\x07b\x1bc\x7fd\u{9b}e\tf"), vec!["abcde\tf"]);
    }

    #[test]
    fn eviction_keeps_newest_lines() {
        let mut buf = LineBuffer::new(5);
        buf.ingest("1\n2\n3\n4\n5\n6\n7\n8");
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.first(), "4");
        assert_eq!(buf.last(), "8");
    }

    #[test]
    fn zero_max_lines_is_clamped() {
        let mut buf = LineBuffer::new(0);
        assert_eq!(buf.max_lines(), 1);
        buf.ingest("a\nb");
        assert_eq!(buf.to_vec(), vec!["b"]);
    }

    #[test]
    fn revision_counts_every_mutation() {
        let mut buf = LineBuffer::default();
        assert_eq!(buf.revision(), 0);
        buf.ingest("");
        buf.set_title("t");
        buf.clear();
        buf.reset();
        assert_eq!(buf.revision(), 4);
    }

    #[test]
    fn clear_keeps_title_reset_does_not() {
        let mut buf = LineBuffer::default();
        buf.ingest("x\ny");
        buf.set_title("vim");
        buf.clear();
        assert_eq!(buf.to_vec(), vec![""]);
        assert_eq!(buf.title(), "vim");
        buf.reset();
        assert_eq!(buf.title(), DEFAULT_TITLE);
    }

    #[test]
    fn ingest_bytes_replaces_invalid_utf8() {
        let mut buf = LineBuffer::default();
        buf.ingest_bytes(b"ok\xffok");
        assert_eq!(buf.last(), "ok\u{fffd}ok");
    }

    #[test]
    fn text_joins_lines() {
        let mut buf = LineBuffer::default();
        buf.ingest("a\nb");
        assert_eq!(buf.text(), "a\nb");
        assert_eq!(buf.lines().rev().next(), Some("b"));
    }
}
