//! Paste safety checks for text headed to a child process.
//!
//! A paste is considered unsafe when it could execute something the user did
//! not mean to run: a line feed submits the current command line, and an
//! embedded bracketed-paste marker lets the pasted text break out of a
//! bracketed paste. The classifier is advisory; callers decide what to do
//! with an unsafe paste.

use std::ops::Range;

use memchr::{memchr, memchr_iter};

/// Returns `false` when `text` contains a line feed or a bracketed-paste
/// class marker (`ESC [ 2 0 <digits> ~`).
///
/// # Examples
/// ```
/// use ptyterm_core::security::is_paste_safe;
///
/// assert!(is_paste_safe("ls -la"));
/// assert!(!is_paste_safe("rm -rf ~\n"));
/// assert!(!is_paste_safe("x\x1b[201~; reboot"));
/// ```
pub fn is_paste_safe(text: &str) -> bool {
    is_paste_safe_bytes(text.as_bytes())
}

/// Byte-level form of [`is_paste_safe`]; works on arbitrary, possibly
/// invalid UTF-8.
pub fn is_paste_safe_bytes(bytes: &[u8]) -> bool {
    memchr(b'\n', bytes).is_none() && find_paste_marker(bytes).is_none()
}

/// Location of the first `ESC [ 2 0 <digits> ~` marker in `bytes`.
pub fn find_paste_marker(bytes: &[u8]) -> Option<Range<usize>> {
    memchr_iter(0x1b, bytes).find_map(|start| {
        let rest = &bytes[start + 1..];
        if !rest.starts_with(b"[20") {
            return None;
        }
        let digits = rest[3..].iter().take_while(|b| b.is_ascii_digit()).count();
        let end = start + 1 + 3 + digits;
        (bytes.get(end) == Some(&b'~')).then(|| start..end + 1)
    })
}

/// Wrap `text` for an application that enabled bracketed paste (DEC mode
/// 2004). Embedded paste markers are removed first so the paste cannot end
/// early.
///
/// # Examples
/// ```
/// use ptyterm_core::security::bracket_paste;
///
/// assert_eq!(bracket_paste("echo hi\n"), "\x1b[200~echo hi\n\x1b[201~");
/// assert_eq!(bracket_paste("a\x1b[201~b"), "\x1b[200~ab\x1b[201~");
/// ```
pub fn bracket_paste(text: &str) -> String {
    format!("\x1b[200~{}\x1b[201~", strip_paste_markers(text))
}

/// Remove every bracketed-paste class marker from `text`, including
/// markers spliced together from the pieces around a removed one.
///
/// Runs in a single pass: a marker can only end at the `~` just appended,
/// so only the tail of the output is checked.
pub fn strip_paste_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for piece in text.split_inclusive('~') {
        out.push_str(piece);
        if let Some(start) = marker_at_tail(out.as_bytes()) {
            // markers are pure ASCII, so `start` is a char boundary
            out.truncate(start);
        }
    }
    out
}

/// Start of the marker that ends `bytes`, if any.
fn marker_at_tail(bytes: &[u8]) -> Option<usize> {
    let body = bytes.strip_suffix(b"~")?;
    let digits = body.iter().rev().take_while(|b| b.is_ascii_digit()).count();
    let (head, number) = body.split_at(body.len() - digits);
    (head.ends_with(b"\x1b[") && number.starts_with(b"20")).then(|| head.len() - 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_plain_text_are_safe() {
        assert!(is_paste_safe(""));
        assert!(is_paste_safe("echo 'hello'; ls"));
        assert!(is_paste_safe("tab\tand\rcarriage return"));
    }

    #[test]
    fn line_feed_is_unsafe() {
        assert!(!is_paste_safe("\n"));
        assert!(!is_paste_safe("line one\nline two"));
    }

    #[test]
    fn paste_markers_are_unsafe() {
        assert!(!is_paste_safe("\x1b[200~"));
        assert!(!is_paste_safe("abc\x1b[201~def"));
        assert!(!is_paste_safe("\x1b[20~"));
        assert!(!is_paste_safe("\x1b[2099~"));
    }

    #[test]
    fn other_sequences_are_safe() {
        assert!(is_paste_safe("\x1b[2~"));
        assert!(is_paste_safe("\x1b[21~"));
        assert!(is_paste_safe("\x1b[200"));
        assert!(is_paste_safe("\x1b[31mred\x1b[0m"));
        assert!(is_paste_safe("\x1b"));
    }

    #[test]
    fn invalid_utf8_is_classified() {
        assert!(is_paste_safe_bytes(b"\xff\xfe"));
        assert!(!is_paste_safe_bytes(b"\xff\x1b[201~"));
    }

    #[test]
    fn marker_location() {
        assert_eq!(find_paste_marker(b"ab\x1b[201~cd"), Some(2..9));
        assert_eq!(find_paste_marker(b"\x1b\x1b[20~"), Some(1..6));
        assert_eq!(find_paste_marker(b"\x1b[2x~"), None);
    }

    #[test]
    fn bracketing_strips_nested_markers() {
        assert_eq!(strip_paste_markers("a\x1b[20\x1b[201~1~b"), "ab");
        let wrapped = bracket_paste("x\x1b[200~y");
        assert_eq!(wrapped, "\x1b[200~xy\x1b[201~");
    }

    #[test]
    fn stripping_keeps_other_text() {
        assert_eq!(strip_paste_markers("~~a~\x1b[2~\x1b[21~"), "~~a~\x1b[2~\x1b[21~");
        assert_eq!(strip_paste_markers("\u{e9}\x1b[2099~\u{1f980}~"), "\u{e9}\u{1f980}~");
        assert_eq!(strip_paste_markers("5\x1b[200~~"), "5~");
    }

    #[test]
    fn deeply_nested_markers_strip_in_linear_time() {
        let depth = 200_000;
        let text = format!("a{}\x1b[201~{}b", "\x1b[20".repeat(depth), "1~".repeat(depth));

        let started = std::time::Instant::now();
        let stripped = strip_paste_markers(&text);
        assert_eq!(stripped, "ab");
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert_eq!(bracket_paste(&text), "\x1b[200~ab\x1b[201~");
    }
}
