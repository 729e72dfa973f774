//! Decoder and session benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use vdu_terminal::parser::Decoder;
use vdu_terminal::{NullBackend, Recorder, Session};

fn plot_stream(count: usize) -> Vec<u8> {
    let mut stream = Vec::with_capacity(count * 12);
    for i in 0..count {
        let x = (i % 1280) as u16;
        let y = (i % 960) as u16;
        let [xl, xh] = x.to_le_bytes();
        let [yl, yh] = y.to_le_bytes();
        stream.extend_from_slice(&[25, 4, 0, 0, 0, 0, 25, 5, xl, xh, yl, yh]);
    }
    stream
}

fn bench_decode_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoder");

    let text = "Hello, World!\r\n".repeat(1000);
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("plain_text", |b| {
        b.iter(|| {
            let mut decoder = Decoder::new();
            let actions = decoder.parse(black_box(text.as_bytes()));
            black_box(actions)
        })
    });

    group.finish();
}

fn bench_decode_plots(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoder");

    let stream = plot_stream(1000);
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("plot_commands", |b| {
        b.iter(|| {
            let mut decoder = Decoder::new();
            let count = decoder.feed(black_box(&stream)).count();
            black_box(count)
        })
    });

    group.finish();
}

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");

    let mut stream = vec![22, 28];
    stream.extend(plot_stream(1000));
    stream.extend_from_slice("Some text in between\r\n".repeat(100).as_bytes());
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("null_backend", |b| {
        b.iter(|| {
            let mut session = Session::new(NullBackend);
            black_box(session.write(black_box(&stream)))
        })
    });

    group.bench_function("recording_backend", |b| {
        b.iter(|| {
            let mut session = Session::new(Recorder::new());
            session.write(black_box(&stream));
            black_box(session.backend().calls.len())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_decode_text, bench_decode_plots, bench_session);
criterion_main!(benches);
