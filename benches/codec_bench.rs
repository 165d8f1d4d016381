//! HEIF 配置层性能基准测试.
//!
//! 覆盖 hvcC 解析/写出, SPS 参数提取, 辅助图像 SEI 解析.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use heif::codec::parsers::h265::{
    HvccBox, decode_hevc_aux_sei_messages, extract_hvcc_configuration, write_length_prefixed,
};

const SPS_1080P: [u8; 31] = [
    0x42, 0x01, 0x01, 0x01, 0x60, 0x00, 0x00, 0x03, 0x00, 0x90, 0x00, 0x00, 0x03, 0x00, 0x00, 0x03,
    0x00, 0x3C, 0xA0, 0x03, 0xC0, 0x80, 0x11, 0x07, 0xCB, 0x96, 0x57, 0x92, 0x44, 0x8A, 0xC8,
];

/// z_near=1.0, z_far=-2.5
const DEPTH_Z_PAYLOAD: [u8; 5] = [0xC8, 0xF8, 0x14, 0x01, 0x60];

fn make_hvcc() -> Vec<u8> {
    let mut hvcc = HvccBox::with_configuration(
        extract_hvcc_configuration(&SPS_1080P).unwrap().configuration,
    );
    hvcc.append_nal(&[0x40, 0x01, 0x0C, 0x01, 0xFF, 0xFF]).unwrap();
    hvcc.append_nal(&SPS_1080P).unwrap();
    for i in 0..16u8 {
        hvcc.append_nal(&[0x44, 0x01, 0xC1, i]).unwrap();
    }
    hvcc.to_bytes().unwrap()
}

fn bench_hvcc_parse(c: &mut Criterion) {
    let data = make_hvcc();
    c.bench_function("hvcc_parse", |b| {
        b.iter(|| HvccBox::parse(black_box(&data)).unwrap());
    });
}

fn bench_hvcc_write(c: &mut Criterion) {
    let hvcc = HvccBox::parse(&make_hvcc()).unwrap();
    c.bench_function("hvcc_write", |b| {
        b.iter(|| black_box(&hvcc).to_bytes().unwrap());
    });
}

fn bench_sps_extract(c: &mut Criterion) {
    c.bench_function("sps_extract_1080p", |b| {
        b.iter(|| extract_hvcc_configuration(black_box(&SPS_1080P)).unwrap());
    });
}

fn bench_sei_decode(c: &mut Criterion) {
    // 64 个 SEI NAL 夹在图像数据之间
    let mut stream = Vec::new();
    for _ in 0..64 {
        let mut sei = vec![0x4E, 0x01, 177, DEPTH_Z_PAYLOAD.len() as u8];
        sei.extend_from_slice(&DEPTH_Z_PAYLOAD);
        sei.push(0x80);
        write_length_prefixed(&mut stream, &sei, 4).unwrap();
        write_length_prefixed(&mut stream, &[0x26, 0x01, 0xAF, 0x1D, 0x80], 4).unwrap();
    }
    c.bench_function("sei_decode_64", |b| {
        b.iter(|| decode_hevc_aux_sei_messages(black_box(&stream)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_hvcc_parse,
    bench_hvcc_write,
    bench_sps_extract,
    bench_sei_decode
);
criterion_main!(benches);
