#![no_main]
use libfuzzer_sys::fuzz_target;

use ptyterm::security::{bracket_paste, find_paste_marker, is_paste_safe, is_paste_safe_bytes};

fuzz_target!(|data: &[u8]| {
    let safe = is_paste_safe_bytes(data);
    assert_eq!(safe, !data.contains(&b'\n') && find_paste_marker(data).is_none());

    if let Ok(text) = std::str::from_utf8(data) {
        assert_eq!(safe, is_paste_safe(text));

        // bracketed content can never close the bracket early
        let wrapped = bracket_paste(text);
        let body = &wrapped.as_bytes()[6..wrapped.len() - 6];
        assert!(find_paste_marker(body).is_none());
    }
});
