#![no_main]
use libfuzzer_sys::fuzz_target;
use ptyterm_ansi::SgrParser;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > 50 {
        return;
    }

    let parser = SgrParser::new();

    let params: Vec<u16> = data.iter().take(11).map(|&b| u16::from(b) % 300).collect();
    let _ = parser.parse_params(&params);

    // colon sub-parameters through the text form
    let text: String = data.iter().map(|&b| match b % 12 {
        10 => ';',
        11 => ':',
        d => char::from(b'0' + d % 10),
    }).collect();
    let _ = parser.parse_str(&text);
});
