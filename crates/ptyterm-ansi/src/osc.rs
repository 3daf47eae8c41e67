//! Structural OSC (Operating System Command) parsing.
//!
//! An [`OscParser`] accumulates the payload between `ESC ]` and its
//! terminator, then [`OscParser::end`] turns `<code>;<data>` into an
//! [`OscCommand`]. The scanner drives one of these per sequence; it can also
//! be used standalone by hosts that extract OSC payloads themselves.

use base64::prelude::*;

/// Maximum accumulated payload, in bytes. Longer payloads are truncated and
/// the resulting command is reported as [`OscCommand::Oversized`].
pub const MAX_OSC_LEN: usize = 2048;

/// How an OSC sequence was terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OscTerminator {
    /// BEL (0x07), the xterm convention
    Bel,
    /// ST (`ESC \`)
    St,
}

impl OscTerminator {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            OscTerminator::Bel => b"\x07",
            OscTerminator::St => b"\x1b\\",
        }
    }
}

/// A decoded OSC command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OscCommand {
    /// OSC 0 or OSC 2
    WindowTitle(String),
    /// OSC 1
    IconName(String),
    /// OSC 7, usually a `file://host/path` URI
    CurrentDirectory(String),
    /// OSC 8; an empty `uri` closes the active link
    Hyperlink { params: Option<String>, uri: String },
    /// OSC 52 with its payload already base64-decoded
    Clipboard { selection: String, data: Vec<u8> },
    /// OSC 52 query (`?` payload)
    ClipboardQuery { selection: String },
    /// Payload exceeded [`MAX_OSC_LEN`]
    Oversized { length: usize },
    /// Anything else, including malformed payloads
    Unknown { code: Option<u16>, data: String },
}

impl OscCommand {
    /// Parse a complete `<code>;<data>` payload.
    pub fn parse(payload: &[u8]) -> Self {
        let text = String::from_utf8_lossy(payload);
        let (code_str, data) = match text.split_once(';') {
            Some((code, data)) => (code, data),
            None => (text.as_ref(), ""),
        };

        let code = if !code_str.is_empty() && code_str.bytes().all(|b| b.is_ascii_digit()) {
            code_str.parse::<u16>().ok()
        } else {
            None
        };

        match code {
            Some(0) | Some(2) => OscCommand::WindowTitle(data.to_string()),
            Some(1) => OscCommand::IconName(data.to_string()),
            Some(7) => OscCommand::CurrentDirectory(data.to_string()),
            Some(8) => match data.split_once(';') {
                Some((params, uri)) => OscCommand::Hyperlink {
                    params: (!params.is_empty()).then(|| params.to_string()),
                    uri: uri.to_string(),
                },
                None => OscCommand::Unknown { code, data: data.to_string() },
            },
            Some(52) => parse_clipboard(data)
                .unwrap_or_else(|| OscCommand::Unknown { code, data: data.to_string() }),
            _ => OscCommand::Unknown { code, data: data.to_string() },
        }
    }

    /// The title carried by this command, if it should update the window
    /// title. Empty titles are ignored.
    pub fn window_title(&self) -> Option<&str> {
        match self {
            OscCommand::WindowTitle(title) if !title.is_empty() => Some(title),
            _ => None,
        }
    }
}

fn parse_clipboard(data: &str) -> Option<OscCommand> {
    let (selection, payload) = data.split_once(';')?;
    let selection = if selection.is_empty() { "c" } else { selection };
    if payload == "?" {
        return Some(OscCommand::ClipboardQuery { selection: selection.to_string() });
    }
    let decoded = BASE64_STANDARD.decode(payload).ok()?;
    Some(OscCommand::Clipboard { selection: selection.to_string(), data: decoded })
}

/// Incremental OSC payload accumulator.
#[derive(Debug, Default, Clone)]
pub struct OscParser {
    buffer: Vec<u8>,
    overflowed: usize,
    last_terminator: Option<OscTerminator>,
}

impl OscParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append payload bytes. Bytes beyond [`MAX_OSC_LEN`] are counted but
    /// not stored.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        let room = MAX_OSC_LEN.saturating_sub(self.buffer.len());
        let take = room.min(bytes.len());
        self.buffer.extend_from_slice(&bytes[..take]);
        self.overflowed += bytes.len() - take;
    }

    pub fn add_byte(&mut self, byte: u8) {
        self.add_bytes(std::slice::from_ref(&byte));
    }

    /// Bytes seen so far, including any that overflowed.
    pub fn len(&self) -> usize {
        self.buffer.len() + self.overflowed
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflowed > 0
    }

    /// Finish the sequence and reset the parser for reuse.
    pub fn end(&mut self, terminator: OscTerminator) -> OscCommand {
        self.last_terminator = Some(terminator);
        let command = if self.is_overflowed() {
            OscCommand::Oversized { length: self.len() }
        } else {
            OscCommand::parse(&self.buffer)
        };
        self.reset();
        command
    }

    /// Terminator of the most recently finished sequence. Replies to OSC
    /// queries are expected to use the same one.
    pub fn last_terminator(&self) -> Option<OscTerminator> {
        self.last_terminator
    }

    /// Drop any accumulated payload.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.overflowed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(payload: &[u8]) -> OscCommand {
        let mut parser = OscParser::new();
        parser.add_bytes(payload);
        parser.end(OscTerminator::Bel)
    }

    #[test]
    fn window_title_codes() {
        assert_eq!(parse_all(b"0;My Title").window_title(), Some("My Title"));
        assert_eq!(parse_all(b"2;Other").window_title(), Some("Other"));
        assert_eq!(parse_all(b"1;icon"), OscCommand::IconName("icon".into()));
    }

    #[test]
    fn empty_title_is_not_a_title_update() {
        assert_eq!(parse_all(b"0;").window_title(), None);
        assert_eq!(parse_all(b"0").window_title(), None);
    }

    #[test]
    fn title_keeps_semicolons() {
        assert_eq!(parse_all(b"2;a;b;c").window_title(), Some("a;b;c"));
    }

    #[test]
    fn current_directory() {
        assert_eq!(
            parse_all(b"7;file:///home/user"),
            OscCommand::CurrentDirectory("file:///home/user".into())
        );
    }

    #[test]
    fn hyperlink_open_and_close() {
        assert_eq!(
            parse_all(b"8;id=1;https://example.com"),
            OscCommand::Hyperlink { params: Some("id=1".into()), uri: "https://example.com".into() }
        );
        assert_eq!(
            parse_all(b"8;;"),
            OscCommand::Hyperlink { params: None, uri: String::new() }
        );
    }

    #[test]
    fn clipboard_decodes_base64() {
        assert_eq!(
            parse_all(b"52;c;SGVsbG8="),
            OscCommand::Clipboard { selection: "c".into(), data: b"Hello".to_vec() }
        );
        assert_eq!(
            parse_all(b"52;p;?"),
            OscCommand::ClipboardQuery { selection: "p".into() }
        );
    }

    #[test]
    fn clipboard_with_invalid_base64_is_unknown() {
        assert!(matches!(parse_all(b"52;c;not base64!"), OscCommand::Unknown { code: Some(52), .. }));
    }

    #[test]
    fn non_numeric_code_is_unknown() {
        assert_eq!(
            parse_all(b"abc;def"),
            OscCommand::Unknown { code: None, data: "def".into() }
        );
    }

    #[test]
    fn oversized_payload_is_reported() {
        let mut parser = OscParser::new();
        parser.add_bytes(b"0;");
        parser.add_bytes(&vec![b'x'; MAX_OSC_LEN * 2]);
        assert!(parser.is_overflowed());
        let command = parser.end(OscTerminator::St);
        assert_eq!(command, OscCommand::Oversized { length: MAX_OSC_LEN * 2 + 2 });
        assert!(parser.is_empty());
    }

    #[test]
    fn parser_is_reusable_after_end() {
        let mut parser = OscParser::new();
        parser.add_bytes(b"0;first");
        assert_eq!(parser.end(OscTerminator::Bel).window_title(), Some("first"));
        parser.add_bytes(b"2;second");
        assert_eq!(parser.end(OscTerminator::St).window_title(), Some("second"));
        assert_eq!(parser.last_terminator(), Some(OscTerminator::St));
    }
}
