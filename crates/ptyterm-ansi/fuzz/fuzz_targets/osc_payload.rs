#![no_main]
use libfuzzer_sys::fuzz_target;
use ptyterm_ansi::{OscCommand, OscParser, OscTerminator, MAX_OSC_LEN};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    for terminator in [OscTerminator::Bel, OscTerminator::St] {
        let mut parser = OscParser::new();
        parser.add_bytes(data);
        assert_eq!(parser.len(), data.len());
        assert_eq!(parser.is_overflowed(), data.len() > MAX_OSC_LEN);

        let command = parser.end(terminator);
        if data.len() > MAX_OSC_LEN {
            assert!(matches!(command, OscCommand::Oversized { .. }));
        }
        assert!(parser.is_empty());
        assert_eq!(parser.last_terminator(), Some(terminator));
    }
});
