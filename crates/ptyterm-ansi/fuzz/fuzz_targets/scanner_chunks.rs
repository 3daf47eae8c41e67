//! Splitting a stream at arbitrary points must not change the line view.

#![no_main]
use libfuzzer_sys::fuzz_target;

use ptyterm_ansi::{LineBuffer, OutputScanner, MAX_OSC_LEN};

fn scan<'a>(chunks: impl Iterator<Item = &'a [u8]>) -> (LineBuffer, OutputScanner) {
    let mut scanner = OutputScanner::new();
    let mut lines = LineBuffer::new(64);
    for chunk in chunks {
        scanner.feed(chunk, &mut lines);
    }
    scanner.flush(&mut lines);
    (lines, scanner)
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Limit input size to prevent timeouts
    let data = if data.len() > 10000 { &data[..10000] } else { data };

    // first byte picks the chunk size for the split run
    let chunk = usize::from(data[0] % 16) + 1;
    let data = &data[1..];

    let (whole, scanner) = scan(std::iter::once(data));
    let (split, _) = scan(data.chunks(chunk));

    assert_eq!(whole.to_vec(), split.to_vec(), "chunking changed the lines");
    assert_eq!(whole.title(), split.title(), "chunking changed the title");
    assert!(whole.len() <= 64);
    assert!(whole.lines().all(|line| !line.contains('\n')));

    let stats = scanner.stats();
    assert!(stats.max_params_seen <= 32, "max_params_seen too large");
    assert!(stats.max_osc_length_seen <= MAX_OSC_LEN, "osc length too large");
});
