use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ptyterm_ansi::{LineBuffer, LineSink, OutputScanner, SgrParser};

/// Sink that only counts, so the bench measures the scanner alone
#[derive(Default)]
struct CountingSink {
    chars: usize,
    titles: usize,
}

impl LineSink for CountingSink {
    fn push_str(&mut self, text: &str) {
        self.chars += text.len();
    }
    fn set_title(&mut self, _title: &str) {
        self.titles += 1;
    }
}

fn bench_plain_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("plain_text");

    for size in [100, 1000, 10000] {
        let text = "a".repeat(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| {
                let mut scanner = OutputScanner::new();
                let mut sink = CountingSink::default();
                scanner.feed_str(black_box(text), &mut sink);
            });
        });
    }
    group.finish();
}

fn bench_colored_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("colored_output");

    // Simulate ls --color output
    let ls_line = "\x1B[0m\x1B[01;34mdir\x1B[0m  \x1B[01;32mexec.sh\x1B[0m  \x1B[0mfile.txt\x1B[0m\r\n";

    for count in [10, 100, 1000] {
        let text = ls_line.repeat(count);
        let size = text.len();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &text, |b, text| {
            b.iter(|| {
                let mut scanner = OutputScanner::new();
                let mut sink = CountingSink::default();
                scanner.feed_str(black_box(text), &mut sink);
            });
        });
    }
    group.finish();
}

fn bench_osc_titles(c: &mut Criterion) {
    let text = "\x1B]0;user@host: ~/src\x07$ ls\r\n".repeat(200);
    c.bench_function("osc_titles", |b| {
        b.iter(|| {
            let mut scanner = OutputScanner::new();
            let mut sink = CountingSink::default();
            scanner.feed_str(black_box(&text), &mut sink);
        });
    });
}

fn bench_line_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_buffer");

    let text = format!("{}\r\n", "Hello world ".repeat(8)).repeat(2000);
    for max_lines in [100, 1000, 10000] {
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(max_lines), &max_lines, |b, &max_lines| {
            b.iter(|| {
                let mut scanner = OutputScanner::new();
                let mut lines = LineBuffer::new(max_lines);
                scanner.feed_str(black_box(&text), &mut lines);
            });
        });
    }
    group.finish();
}

fn bench_streaming_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("streaming_chunks");

    let full_text = "Hello \u{1F600} \x1B[1mWorld\x1B[0m! ".repeat(1000);

    for chunk_size in [7, 100, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut scanner = OutputScanner::new();
                    let mut sink = CountingSink::default();

                    // chunks may split escapes and characters
                    for chunk in full_text.as_bytes().chunks(chunk_size) {
                        scanner.feed(black_box(chunk), &mut sink);
                    }
                    scanner.flush(&mut sink);
                });
            },
        );
    }
    group.finish();
}

fn bench_sgr_parse(c: &mut Criterion) {
    let parser = SgrParser::new();
    c.bench_function("sgr_parse", |b| {
        b.iter(|| {
            black_box(parser.parse_params(black_box(&[1, 4, 38, 2, 255, 128, 0, 48, 5, 236])));
            black_box(parser.parse_str(black_box("4:3;58:2::10:20:30")));
        });
    });
}

criterion_group!(
    benches,
    bench_plain_text,
    bench_colored_output,
    bench_osc_titles,
    bench_line_buffer,
    bench_streaming_chunks,
    bench_sgr_parse,
);
criterion_main!(benches);
