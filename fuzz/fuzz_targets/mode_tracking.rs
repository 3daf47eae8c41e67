//! Arbitrary output must never make the mode tracker misbehave.

#![no_main]
use libfuzzer_sys::fuzz_target;

use ptyterm::ansi::{CsiSequence, LineBuffer, LineSink, OutputScanner};
use ptyterm::{KeyEncoder, KeyEncoderConfig, ModeTracker};

struct Tracking {
    lines: LineBuffer,
    modes: ModeTracker,
    encoder: KeyEncoder,
}

impl LineSink for Tracking {
    fn push_str(&mut self, text: &str) {
        self.lines.ingest(text);
    }

    fn set_title(&mut self, title: &str) {
        self.lines.set_title(title);
    }

    fn csi(&mut self, sequence: &CsiSequence) {
        let _ = self.modes.apply(sequence, &mut self.encoder);
    }
}

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 10000 { &data[..10000] } else { data };

    let mut scanner = OutputScanner::new();
    let mut sink = Tracking {
        lines: LineBuffer::new(16),
        modes: ModeTracker::new(),
        encoder: KeyEncoder::new(),
    };
    scanner.feed(data, &mut sink);
    scanner.flush(&mut sink);

    assert!(sink.modes.kitty_stack_depth() <= 16);

    sink.modes.reset(&mut sink.encoder);
    assert_eq!(sink.encoder.config(), &KeyEncoderConfig::default());
    assert!(!sink.modes.bracketed_paste());
});
