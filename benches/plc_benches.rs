use std::hint::black_box;
use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use melsec_mc::{
    build_multi_request, build_single_request, read_payload, read_response_header, Block, Command,
    ConnectionOptions, DeviceAddress,
};

fn bench_address_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("address_parse");
    for text in ["D100", "X1A0", "LSTN12", "ZR123456"] {
        group.bench_function(text, |b| {
            b.iter(|| DeviceAddress::parse(black_box(text)).unwrap())
        });
    }
    group.finish();
}

fn bench_frame_build(c: &mut Criterion) {
    let options = ConnectionOptions::default();
    let d100: DeviceAddress = "D100".parse().unwrap();
    let values = vec![0x55u8; 960 * 2];

    c.bench_function("batch_read_frame", |b| {
        b.iter(|| build_single_request(&options, Command::BatchRead, black_box(&d100), 10, None))
    });

    c.bench_function("batch_write_frame_960_words", |b| {
        b.iter(|| {
            build_single_request(
                &options,
                Command::BatchWrite,
                &d100,
                960,
                Some(black_box(values.as_slice())),
            )
        })
    });

    let blocks: Vec<Block> = (0..32u32)
        .map(|i| Block::new(DeviceAddress::parse(&format!("D{}", i * 100)).unwrap(), 4))
        .collect();
    c.bench_function("multi_block_read_frame_32", |b| {
        b.iter(|| build_multi_request(&options, Command::MultiBlockRead, black_box(&blocks), None))
    });
}

fn bench_response_parse(c: &mut Criterion) {
    let mut response = vec![0xD0, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00];
    response.extend_from_slice(&(2u16 + 200).to_le_bytes());
    response.extend_from_slice(&[0x00, 0x00]);
    response.extend_from_slice(&[0xAB; 200]);

    c.bench_function("response_100_words", |b| {
        b.iter(|| {
            let mut stream = Cursor::new(black_box(response.as_slice()));
            read_response_header(&mut stream).unwrap();
            read_payload(&mut stream, 200).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_address_parse,
    bench_frame_build,
    bench_response_parse
);
criterion_main!(benches);
