//! Streaming scanner example
//!
//! Pipe any program's output through this to see the plain-text view:
//!
//! ```text
//! ls --color=always | cargo run -p ptyterm-ansi --example streaming_scanner
//! ```

use std::io::{self, Read};

use ptyterm_ansi::{LineBuffer, OutputScanner};

fn main() -> io::Result<()> {
    let mut scanner = OutputScanner::new().with_error_callback(|e| eprintln!("scanner: {}", e));
    let mut lines = LineBuffer::new(200);
    // small chunks on purpose; sequences split across reads are reassembled
    let mut buffer = [0u8; 64];

    let mut stdin = io::stdin().lock();
    loop {
        match stdin.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => scanner.feed(&buffer[..n], &mut lines),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    scanner.flush(&mut lines);

    println!("title: {}", lines.title());
    for line in lines.lines() {
        println!("| {}", line);
    }

    let stats = scanner.stats();
    println!("\nScanner stats:");
    println!("  - Bytes processed: {}", stats.bytes_processed);
    println!("  - Sequences stripped: {}", stats.sequences_processed);
    println!("  - Errors: {}", stats.errors_encountered);
    println!("  - Max OSC length: {}", stats.max_osc_length_seen);
    Ok(())
}
