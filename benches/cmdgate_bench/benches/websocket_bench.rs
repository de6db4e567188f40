//! WebSocket framing throughput benchmarks
//!
//! Measures decoding of masked client frames and encoding of server replies.

use cmdgate_ws::format::{FormatAdapter, JsonFormat, RawFormat};
use cmdgate_ws::{encode_frame, Command, DecodeState, FrameDecoder, Reply};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Build a masked client text frame
fn client_frame(payload: &[u8], fin: bool) -> Vec<u8> {
    let mask_key: [u8; 4] = [0x12, 0x34, 0x56, 0x78];
    let mut frame = Vec::with_capacity(14 + payload.len());

    frame.push(if fin { 0x81 } else { 0x01 });
    let len = payload.len();
    if len < 126 {
        frame.push(0x80 | len as u8);
    } else if len < 65536 {
        frame.push(0x80 | 126);
        frame.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        frame.push(0x80 | 127);
        frame.extend_from_slice(&(len as u64).to_be_bytes());
    }

    frame.extend_from_slice(&mask_key);
    frame.extend(payload.iter().enumerate().map(|(i, b)| b ^ mask_key[i % 4]));
    frame
}

fn decode_all(buf: &[u8]) -> usize {
    let mut decoder = FrameDecoder::new();
    let mut offset = 0;
    let mut messages = 0;
    while let Ok(DecodeState::MessageComplete(message)) = decoder.decode(&buf[offset..]) {
        offset += message.consumed();
        messages += 1;
    }
    messages
}

/// Benchmark decoding single-frame messages
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("websocket_decode");

    let payloads: Vec<(&str, Vec<u8>)> = vec![
        ("tiny", b"[\"PING\"]".to_vec()),
        ("medium_125", vec![b'x'; 125]),
        ("medium_126", vec![b'x'; 126]),
        ("large", vec![b'x'; 64 * 1024]),
    ];

    for (name, payload) in payloads.iter() {
        let frame = client_frame(payload, true);
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("single", name), &frame, |b, frame| {
            b.iter(|| decode_all(black_box(frame)))
        });
    }

    group.finish();
}

/// Benchmark decoding fragmented and pipelined input
fn bench_decode_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("websocket_decode_stream");

    let chunk = vec![b'x'; 1024];
    for fragments in [2usize, 16, 64].iter() {
        let mut buf = Vec::new();
        for i in 0..*fragments {
            buf.extend_from_slice(&client_frame(&chunk, i + 1 == *fragments));
        }
        group.throughput(Throughput::Bytes(buf.len() as u64));
        group.bench_with_input(BenchmarkId::new("fragmented", fragments), &buf, |b, buf| {
            b.iter(|| decode_all(black_box(buf)))
        });
    }

    let mut pipelined = Vec::new();
    for _ in 0..100 {
        pipelined.extend_from_slice(&client_frame(br#"["GET","key"]"#, true));
    }
    group.throughput(Throughput::Bytes(pipelined.len() as u64));
    group.bench_function("pipelined_100", |b| {
        b.iter(|| decode_all(black_box(&pipelined)))
    });

    group.finish();
}

/// Benchmark reply framing
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("websocket_encode");

    let payloads: Vec<(&str, Vec<u8>)> = vec![
        ("tiny", b"{\"PING\":[true,\"PONG\"]}".to_vec()),
        ("medium_125", vec![0u8; 125]),
        ("medium_126", vec![0u8; 126]),
        ("large_65535", vec![0u8; 65535]),
        ("large_65536", vec![0u8; 65536]),
    ];

    for (name, payload) in payloads.iter() {
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::new("frame", name), payload, |b, payload| {
            b.iter(|| encode_frame(black_box(payload)))
        });
    }

    group.finish();
}

/// Benchmark message extraction and reply formatting per format
fn bench_formats(c: &mut Criterion) {
    let mut group = c.benchmark_group("websocket_format");

    let json = JsonFormat;
    let raw = RawFormat;
    let reply = Reply::Array(vec![Reply::bulk("a"), Reply::Integer(42), Reply::nil()]);
    let command = Command::new(["MGET"]);

    group.bench_function("json_extract", |b| {
        b.iter(|| json.extract(black_box(br#"["SET","key","value"]"#)))
    });
    group.bench_function("raw_extract", |b| {
        b.iter(|| raw.extract(black_box(b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n")))
    });
    group.bench_function("json_reply", |b| {
        b.iter(|| json.format_reply(&command, black_box(&reply)))
    });
    group.bench_function("raw_reply", |b| {
        b.iter(|| raw.format_reply(&command, black_box(&reply)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decode,
    bench_decode_stream,
    bench_encode,
    bench_formats
);
criterion_main!(benches);
