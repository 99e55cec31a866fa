// ABOUTME: Benchmark suite for the SMPP codec and text encodings
// ABOUTME: Measures frame checking, parsing, serialization and long message splitting

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use smpp::Frame;
use smpp::codec::Encodable;
use smpp::datatypes::*;
use smpp::encoding::{Encoding, gsm7};
use smpp::sequence::SequenceNumber;
use std::io::Cursor;
use std::time::Duration;

fn sample_submit_sm(text: &str) -> SubmitSm {
    let mut submit_sm = SubmitSm::new(
        1,
        Address::international("447700900123").unwrap(),
        Address::international("447700900456").unwrap(),
        ShortMessage::long(text),
    );
    submit_sm.registered_delivery = 1;
    submit_sm
        .tlvs
        .set_u16(tags::USER_MESSAGE_REFERENCE, 42)
        .unwrap();
    submit_sm
}

fn sample_deliver_sm() -> DeliverSm {
    DeliverSm::new(
        1,
        Address::international("447700900456").unwrap(),
        Address::international("447700900123").unwrap(),
        ShortMessage::new("Hello World").unwrap(),
    )
}

fn sample_bind() -> BindRequest {
    BindRequest::new(
        BindingType::Transceiver,
        1,
        "test_system".parse().unwrap(),
        "password".parse().unwrap(),
    )
}

fn frame_bytes(frame: impl Into<Frame>) -> Vec<u8> {
    frame.into().to_bytes().unwrap().to_vec()
}

fn bench_frame_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_check");
    group.measurement_time(Duration::from_secs(10));

    let submit_bytes = frame_bytes(sample_submit_sm("Hello World"));
    group.bench_function("submit_sm", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(submit_bytes.as_slice()));
            Frame::check(&mut cursor)
        })
    });

    let enquire_bytes = frame_bytes(EnquireLink::new(1));
    group.bench_function("enquire_link", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(enquire_bytes.as_slice()));
            Frame::check(&mut cursor)
        })
    });

    group.finish();
}

fn bench_frame_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_parse");
    group.measurement_time(Duration::from_secs(10));

    let cases = [
        ("submit_sm", frame_bytes(sample_submit_sm("Hello World"))),
        ("deliver_sm", frame_bytes(sample_deliver_sm())),
        ("bind_transceiver", frame_bytes(sample_bind())),
        ("enquire_link", frame_bytes(EnquireLink::new(1))),
    ];

    for (name, bytes) in &cases {
        group.bench_function(*name, |b| {
            b.iter(|| {
                let mut cursor = Cursor::new(black_box(bytes.as_slice()));
                Frame::parse(&mut cursor).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    group.measurement_time(Duration::from_secs(10));

    let submit_sm = Frame::from(sample_submit_sm("Hello World"));
    group.bench_function("submit_sm", |b| b.iter(|| black_box(&submit_sm).to_bytes()));

    let deliver_sm = Frame::from(sample_deliver_sm());
    group.bench_function("deliver_sm", |b| b.iter(|| black_box(&deliver_sm).to_bytes()));

    let bind = Frame::from(sample_bind());
    group.bench_function("bind_transceiver", |b| b.iter(|| black_box(&bind).to_bytes()));

    let enquire_link = Frame::from(EnquireLink::new(1));
    group.bench_function("enquire_link", |b| {
        b.iter(|| black_box(&enquire_link).to_bytes())
    });

    group.finish();
}

fn bench_message_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_sizes");
    group.measurement_time(Duration::from_secs(10));

    for size in [10, 50, 100, 160, 254] {
        let bytes = frame_bytes(sample_submit_sm(&"A".repeat(size)));

        group.bench_with_input(BenchmarkId::new("submit_sm_parse", size), &bytes, |b, bytes| {
            b.iter(|| {
                let mut cursor = Cursor::new(black_box(bytes.as_slice()));
                Frame::parse(&mut cursor).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_encodings(c: &mut Criterion) {
    let mut group = c.benchmark_group("encodings");

    let text = "Hello World, this is a GSM 7-bit message with {braces} and [brackets]";
    group.bench_function("gsm7_encode", |b| b.iter(|| gsm7::encode(black_box(text))));
    group.bench_function("gsm7_encode_packed", |b| {
        b.iter(|| gsm7::encode_packed(black_box(text)))
    });

    let packed = gsm7::encode_packed(text);
    group.bench_function("gsm7_decode_packed", |b| {
        b.iter(|| gsm7::decode_packed(black_box(&packed)).unwrap())
    });

    let ucs2 = "Привет, мир! こんにちは";
    group.bench_function("ucs2_encode", |b| {
        b.iter(|| Encoding::Ucs2.encode(black_box(ucs2)))
    });

    group.finish();
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");
    let sequence = SequenceNumber::new();

    for size in [160, 480, 1600] {
        let submit_sm = sample_submit_sm(&"B".repeat(size));
        group.bench_with_input(BenchmarkId::new("submit_sm", size), &submit_sm, |b, submit_sm| {
            b.iter(|| black_box(submit_sm).split(&sequence).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_check,
    bench_frame_parse,
    bench_serialization,
    bench_message_sizes,
    bench_encodings,
    bench_split
);
criterion_main!(benches);
