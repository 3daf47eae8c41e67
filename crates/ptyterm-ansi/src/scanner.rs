use std::fmt;

use crate::osc::{OscCommand, OscParser, OscTerminator, MAX_OSC_LEN};

/// Errors that can occur while scanning terminal output.
///
/// None of these are fatal: the offending span is dropped or passed through
/// and scanning continues. They are reported through the optional error
/// callback and counted in [`ScannerStats`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// Too many parameters in a CSI sequence (exceeded MAX_PARAMS)
    TooManyParams { count: usize },
    /// OSC payload exceeded MAX_OSC_LEN
    OscTooLong { length: usize },
    /// CSI sequence exceeded MAX_CSI_LEN
    CsiTooLong { length: usize },
    /// Sequence aborted by a byte outside its grammar
    MalformedSequence { context: String },
    /// Bytes that do not form valid UTF-8
    InvalidUtf8 { length: usize },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::TooManyParams { count } => {
                write!(f, "Too many parameters ({}) in CSI sequence (max {})", count, MAX_PARAMS)
            }
            ScanError::OscTooLong { length } => {
                write!(f, "OSC sequence too long: {} bytes (max {})", length, MAX_OSC_LEN)
            }
            ScanError::CsiTooLong { length } => {
                write!(f, "CSI sequence too long: {} bytes (max {})", length, MAX_CSI_LEN)
            }
            ScanError::MalformedSequence { context } => {
                write!(f, "Malformed escape sequence: {}", context)
            }
            ScanError::InvalidUtf8 { length } => {
                write!(f, "Invalid UTF-8: {} byte(s) replaced", length)
            }
        }
    }
}

impl std::error::Error for ScanError {}

/// Optional callback for reporting non-fatal scanning errors
pub type ErrorCallback = Box<dyn FnMut(ScanError) + Send>;

// ---------- safety constants ----------
pub const MAX_PARAMS: usize = 32;
pub const MAX_CSI_LEN: usize = 256;
pub const MAX_PARAM_VALUE: u16 = 9999;

const ESC: u8 = 0x1B;
const BEL: u8 = 0x07;
const CAN: u8 = 0x18;
const SUB: u8 = 0x1A;

/// Receiver of scanned output.
///
/// Only `push_str` and `set_title` are required; the structural callbacks
/// default to no-ops so plain-text consumers can ignore them.
pub trait LineSink {
    /// Visible text, escape sequences already removed.
    fn push_str(&mut self, text: &str);
    /// Non-empty title from OSC 0 or OSC 2.
    fn set_title(&mut self, title: &str);
    /// Every completed OSC command, including titles.
    fn osc(&mut self, _command: &OscCommand) {}
    /// Every completed CSI sequence.
    fn csi(&mut self, _sequence: &CsiSequence) {}
}

/// A complete `ESC [ ... <final>` sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsiSequence {
    params: String,
    intermediates: Vec<u8>,
    final_byte: u8,
}

impl CsiSequence {
    /// `params` holds the raw parameter bytes including any private marker,
    /// e.g. `"?2004"`.
    pub fn new(params: &str, intermediates: &[u8], final_byte: u8) -> Self {
        Self {
            params: params.to_string(),
            intermediates: intermediates.to_vec(),
            final_byte,
        }
    }

    pub fn raw_params(&self) -> &str {
        &self.params
    }

    /// Private marker (`<`, `=`, `>` or `?`) leading the parameters.
    pub fn marker(&self) -> Option<u8> {
        match self.params.as_bytes().first() {
            Some(&b @ (b'<' | b'=' | b'>' | b'?')) => Some(b),
            _ => None,
        }
    }

    /// Parameter text without the private marker.
    pub fn param_text(&self) -> &str {
        if self.marker().is_some() {
            &self.params[1..]
        } else {
            &self.params
        }
    }

    /// Number of `;`-separated fields.
    pub fn param_count(&self) -> usize {
        let text = self.param_text();
        if text.is_empty() {
            0
        } else {
            text.split(';').count()
        }
    }

    /// Numeric parameters. Empty fields read as 0, colon sub-parameters are
    /// ignored and values are capped at `MAX_PARAM_VALUE`.
    pub fn params(&self) -> Vec<u16> {
        let text = self.param_text();
        if text.is_empty() {
            return Vec::new();
        }
        text.split(';')
            .take(MAX_PARAMS)
            .map(|field| {
                let head = field.split(':').next().unwrap_or("");
                head.bytes()
                    .filter(u8::is_ascii_digit)
                    .fold(0u16, |acc, b| acc.saturating_mul(10).saturating_add((b - b'0') as u16))
                    .min(MAX_PARAM_VALUE)
            })
            .collect()
    }

    /// Parameter at `idx`, or `default` when missing or zero.
    pub fn param(&self, idx: usize, default: u16) -> u16 {
        match self.params().get(idx) {
            Some(&0) | None => default,
            Some(&v) => v,
        }
    }

    pub fn intermediates(&self) -> &[u8] {
        &self.intermediates
    }

    pub fn final_byte(&self) -> u8 {
        self.final_byte
    }

    /// True for a plain `CSI ... m` graphic rendition sequence.
    pub fn is_sgr(&self) -> bool {
        self.final_byte == b'm' && self.marker().is_none() && self.intermediates.is_empty()
    }
}

impl fmt::Display for CsiSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ESC[{}", self.params)?;
        for &b in &self.intermediates {
            write!(f, "{}", b as char)?;
        }
        write!(f, "{}", self.final_byte as char)
    }
}

/// Scanner state
#[derive(PartialEq, Clone, Copy, Debug)]
enum ScanState {
    Ground,
    Escape,
    Csi,
    Osc,
    OscEscape,
}

/// Statistics about scanner behavior (useful for debugging and monitoring)
#[derive(Debug, Default, Clone)]
pub struct ScannerStats {
    pub bytes_processed: u64,
    pub sequences_processed: u64,
    pub errors_encountered: u64,
    pub max_params_seen: usize,
    pub max_osc_length_seen: usize,
}

impl ScannerStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

enum Step {
    Consumed,
    Reprocess,
}

/// Streaming escape-sequence stripper.
///
/// Feeds may split sequences and UTF-8 characters anywhere; the partial
/// state is carried to the next call, so any chunking of a stream produces
/// the same sink calls as feeding it whole.
pub struct OutputScanner {
    state: ScanState,
    // pending visible bytes, possibly ending in an incomplete UTF-8 sequence
    text: Vec<u8>,
    csi: Vec<u8>,
    csi_intermediates: bool,
    csi_overflow: bool,
    osc: OscParser,
    error_callback: Option<ErrorCallback>,
    stats: ScannerStats,
}

impl Default for OutputScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OutputScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputScanner")
            .field("state", &self.state)
            .field("pending_text", &self.text.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl OutputScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Ground,
            text: Vec::new(),
            csi: Vec::new(),
            csi_intermediates: false,
            csi_overflow: false,
            osc: OscParser::new(),
            error_callback: None,
            stats: ScannerStats::default(),
        }
    }

    /// Create a scanner with an error callback for diagnostics
    pub fn with_error_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(ScanError) + Send + 'static,
    {
        self.error_callback = Some(Box::new(callback));
        self
    }

    /// Get current scanner statistics
    pub fn stats(&self) -> &ScannerStats {
        &self.stats
    }

    /// Reset statistics counters
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// True when no partial sequence or character is carried over.
    pub fn is_idle(&self) -> bool {
        self.state == ScanState::Ground && self.text.is_empty()
    }

    /// Drop any carried-over partial state.
    pub fn reset(&mut self) {
        self.state = ScanState::Ground;
        self.text.clear();
        self.csi.clear();
        self.csi_intermediates = false;
        self.csi_overflow = false;
        self.osc.reset();
    }

    pub fn feed_str(&mut self, s: &str, sink: &mut dyn LineSink) {
        self.feed(s.as_bytes(), sink)
    }

    /// Scan one chunk of output.
    pub fn feed(&mut self, bytes: &[u8], sink: &mut dyn LineSink) {
        self.stats.bytes_processed += bytes.len() as u64;

        let mut i = 0;
        while i < bytes.len() {
            if self.state == ScanState::Ground {
                // fast skip until next escape
                let esc_pos = memchr::memchr(ESC, &bytes[i..])
                    .map(|p| i + p)
                    .unwrap_or(bytes.len());
                self.text.extend_from_slice(&bytes[i..esc_pos]);
                i = esc_pos;
                if i >= bytes.len() {
                    break;
                }
                self.emit_text(sink, true);
                self.state = ScanState::Escape;
                i += 1;
                continue;
            }

            match self.step(bytes[i], sink) {
                Step::Consumed => i += 1,
                Step::Reprocess => {}
            }
        }

        self.emit_text(sink, false);
    }

    /// Emit any carried partial UTF-8 sequence as U+FFFD. Partial escape
    /// sequences stay pending.
    pub fn flush(&mut self, sink: &mut dyn LineSink) {
        self.emit_text(sink, true);
    }

    /// Report an error through the callback if set
    fn report_error(&mut self, error: ScanError) {
        self.stats.errors_encountered += 1;
        if let Some(ref mut callback) = self.error_callback {
            callback(error);
        }
    }

    fn step(&mut self, byte: u8, sink: &mut dyn LineSink) -> Step {
        match self.state {
            ScanState::Ground => {
                self.text.push(byte);
                Step::Consumed
            }
            ScanState::Escape => self.escape_byte(byte, sink),
            ScanState::Csi => self.csi_byte(byte, sink),
            ScanState::Osc => self.osc_byte(byte, sink),
            ScanState::OscEscape => self.osc_escape_byte(byte, sink),
        }
    }

    fn escape_byte(&mut self, byte: u8, sink: &mut dyn LineSink) -> Step {
        match byte {
            b'[' => {
                self.state = ScanState::Csi;
                self.csi.clear();
                self.csi_intermediates = false;
                self.csi_overflow = false;
            }
            b']' => {
                self.state = ScanState::Osc;
                self.osc.reset();
            }
            CAN | SUB => self.state = ScanState::Ground,
            ESC => {
                // the previous ESC started nothing
                self.text.push(ESC);
                self.emit_text(sink, true);
            }
            0x40..=0x5A | 0x5C..=0x5F => {
                self.stats.sequences_processed += 1;
                self.state = ScanState::Ground;
            }
            _ => {
                self.text.push(ESC);
                self.state = ScanState::Ground;
                return Step::Reprocess;
            }
        }
        Step::Consumed
    }

    fn csi_byte(&mut self, byte: u8, sink: &mut dyn LineSink) -> Step {
        match byte {
            0x30..=0x3F if !self.csi_intermediates => self.push_csi(byte),
            0x20..=0x2F => {
                self.csi_intermediates = true;
                self.push_csi(byte);
            }
            0x40..=0x7E => {
                self.finish_csi(byte, sink);
                self.state = ScanState::Ground;
            }
            CAN | SUB => self.state = ScanState::Ground,
            _ => {
                self.report_error(ScanError::MalformedSequence {
                    context: format!("byte 0x{:02x} inside CSI", byte),
                });
                self.state = ScanState::Ground;
                return Step::Reprocess;
            }
        }
        Step::Consumed
    }

    fn push_csi(&mut self, byte: u8) {
        if self.csi.len() >= MAX_CSI_LEN {
            if !self.csi_overflow {
                self.csi_overflow = true;
                self.report_error(ScanError::CsiTooLong { length: self.csi.len() + 1 });
            }
        } else {
            self.csi.push(byte);
        }
    }

    fn finish_csi(&mut self, final_byte: u8, sink: &mut dyn LineSink) {
        if self.csi_overflow {
            return;
        }

        let split = self
            .csi
            .iter()
            .position(|b| (0x20..=0x2F).contains(b))
            .unwrap_or(self.csi.len());
        // parameter bytes are all ASCII
        let params = String::from_utf8_lossy(&self.csi[..split]);
        let sequence = CsiSequence::new(&params, &self.csi[split..], final_byte);

        let count = sequence.param_count();
        if count > MAX_PARAMS {
            self.report_error(ScanError::TooManyParams { count });
        }
        self.stats.sequences_processed += 1;
        self.stats.max_params_seen = self.stats.max_params_seen.max(count);

        sink.csi(&sequence);
    }

    fn osc_byte(&mut self, byte: u8, sink: &mut dyn LineSink) -> Step {
        match byte {
            BEL => self.finish_osc(OscTerminator::Bel, sink),
            ESC => self.state = ScanState::OscEscape,
            CAN | SUB => {
                self.osc.reset();
                self.state = ScanState::Ground;
            }
            _ => self.osc.add_byte(byte),
        }
        Step::Consumed
    }

    fn osc_escape_byte(&mut self, byte: u8, sink: &mut dyn LineSink) -> Step {
        match byte {
            b'\\' => {
                self.finish_osc(OscTerminator::St, sink);
                Step::Consumed
            }
            CAN | SUB => {
                self.osc.reset();
                self.state = ScanState::Ground;
                Step::Consumed
            }
            _ => {
                // unterminated OSC; the ESC starts a new sequence
                self.report_error(ScanError::MalformedSequence {
                    context: "OSC interrupted by escape".to_string(),
                });
                self.osc.reset();
                self.state = ScanState::Escape;
                Step::Reprocess
            }
        }
    }

    fn finish_osc(&mut self, terminator: OscTerminator, sink: &mut dyn LineSink) {
        self.state = ScanState::Ground;
        let length = self.osc.len();
        self.stats.sequences_processed += 1;
        self.stats.max_osc_length_seen = self.stats.max_osc_length_seen.max(length);

        match self.osc.end(terminator) {
            OscCommand::Oversized { length } => {
                self.report_error(ScanError::OscTooLong { length });
            }
            command => {
                sink.osc(&command);
                if let Some(title) = command.window_title() {
                    sink.set_title(title);
                }
            }
        }
    }

    /// Hand pending visible bytes to the sink. Unless `final_`, an incomplete
    /// UTF-8 sequence at the end is kept for the next feed.
    fn emit_text(&mut self, sink: &mut dyn LineSink, final_: bool) {
        if self.text.is_empty() {
            return;
        }

        let mut out = String::with_capacity(self.text.len());
        let mut rest: &[u8] = &self.text;
        let mut invalid = 0;
        let mut carry = 0;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    // from_utf8 guarantees this prefix is valid
                    out.push_str(std::str::from_utf8(&rest[..valid_up_to]).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            invalid += len;
                            rest = &rest[valid_up_to + len..];
                        }
                        None if !final_ => {
                            carry = rest.len() - valid_up_to;
                            break;
                        }
                        None => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            invalid += rest.len() - valid_up_to;
                            break;
                        }
                    }
                }
            }
        }

        let keep_from = self.text.len() - carry;
        self.text.drain(..keep_from);

        if invalid > 0 {
            self.report_error(ScanError::InvalidUtf8 { length: invalid });
        }
        if !out.is_empty() {
            sink.push_str(&out);
        }
    }
}
