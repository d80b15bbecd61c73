use cbordelta::cbor::{collect_tokens, get_cbor_tokens};
use cbordelta::diff::apply_diff;
use cbordelta::engine::{self, DiffOptions};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::fs;
use std::path::Path;

fn next(s: &mut u64) -> u64 {
    *s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
    *s >> 33
}

fn push_header(out: &mut Vec<u8>, major: u8, value: u64) {
    let major = major << 5;
    match value {
        0..=23 => out.push(major | value as u8),
        24..=0xFF => out.extend_from_slice(&[major | 24, value as u8]),
        0x100..=0xFFFF => {
            out.push(major | 25);
            out.extend_from_slice(&(value as u16).to_be_bytes());
        }
        _ => {
            out.push(major | 26);
            out.extend_from_slice(&(value as u32).to_be_bytes());
        }
    }
}

fn push_text(out: &mut Vec<u8>, text: &str) {
    push_header(out, 3, text.len() as u64);
    out.extend_from_slice(text.as_bytes());
}

/// A record: {"id": n, "name": "...", "score": n, "tags": [..]}.
fn push_record(out: &mut Vec<u8>, id: u64, s: &mut u64) {
    push_header(out, 5, 4);
    push_text(out, "id");
    push_header(out, 0, id);
    push_text(out, "name");
    push_text(out, &format!("user-{:08x}", next(s)));
    push_text(out, "score");
    push_header(out, 0, next(s) % 100_000);
    push_text(out, "tags");
    let n = next(s) % 4;
    push_header(out, 4, n);
    for _ in 0..n {
        push_text(out, &format!("t{}", next(s) % 16));
    }
}

/// An array of `records` records.
fn gen_document(records: usize, seed: u64) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(records * 48);
    push_header(&mut out, 4, records as u64);
    for id in 0..records as u64 {
        push_record(&mut out, id, &mut s);
    }
    out
}

/// The same document with every `stride`-th record regenerated.
fn mutate(records: usize, seed: u64, stride: usize) -> Vec<u8> {
    let mut s = seed;
    let mut alt = seed ^ 0x9E37_79B9;
    let mut out = Vec::with_capacity(records * 48);
    push_header(&mut out, 4, records as u64);
    for id in 0..records as u64 {
        if (id as usize).is_multiple_of(stride.max(1)) {
            // Keep the base generator in step with the original.
            push_record(&mut Vec::new(), id, &mut s);
            push_record(&mut out, id, &mut alt);
        } else {
            push_record(&mut out, id, &mut s);
        }
    }
    out
}

/// The document wrapped as tag-24 embedded CBOR inside an outer array.
fn embed(doc: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(doc.len() + 16);
    push_header(&mut out, 4, 2);
    push_header(&mut out, 6, 24);
    push_header(&mut out, 2, doc.len() as u64);
    out.extend_from_slice(doc);
    push_text(&mut out, "envelope");
    out
}

fn write_ratio_snapshot() {
    let mut csv = String::from("records,stride,delta_bytes,target_bytes,ratio\n");
    for stride in [16usize, 64, 256, 1024] {
        let records = 8192;
        let original = gen_document(records, 7);
        let target = mutate(records, 7, stride);
        let delta = engine::make_diff(&original, &target, &DiffOptions::default()).unwrap();
        let ratio = delta.len() as f64 / target.len() as f64;
        csv.push_str(&format!(
            "{records},{stride},{},{},{}\n",
            delta.len(),
            target.len(),
            ratio
        ));
    }
    let out_dir = Path::new("target/criterion/custom_reports");
    let _ = fs::create_dir_all(out_dir);
    let _ = fs::write(out_dir.join("ratio_snapshot.csv"), csv);
}

fn bench_tokenize(c: &mut Criterion) {
    let mut g = c.benchmark_group("tokenize_mb_s");
    for records in [1024usize, 8192, 65536] {
        let doc = gen_document(records, 1);
        let embedded = embed(&doc);
        g.throughput(Throughput::Bytes(doc.len() as u64));
        g.bench_with_input(BenchmarkId::new("flat", records), &doc, |b, doc| {
            b.iter(|| black_box(collect_tokens(black_box(doc), false).unwrap()));
        });
        g.bench_with_input(BenchmarkId::new("embedded", records), &embedded, |b, buf| {
            b.iter(|| black_box(get_cbor_tokens(black_box(buf)).unwrap()));
        });
    }
    g.finish();
}

fn bench_diff(c: &mut Criterion) {
    let mut g = c.benchmark_group("diff_speed");
    g.sample_size(20);
    for records in [1024usize, 8192, 32768] {
        let original = gen_document(records, 2);
        let target = mutate(records, 2, 128);
        g.throughput(Throughput::Bytes(target.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(records), &records, |b, _| {
            b.iter(|| {
                let diff = engine::diff(
                    black_box(&original),
                    black_box(&target),
                    &DiffOptions::default(),
                )
                .unwrap();
                black_box(diff);
            });
        });
    }
    g.finish();
}

fn bench_apply(c: &mut Criterion) {
    let mut g = c.benchmark_group("apply_speed");
    for records in [1024usize, 8192, 65536] {
        let original = gen_document(records, 3);
        let target = mutate(records, 3, 64);
        let diff = engine::diff(&original, &target, &DiffOptions::default()).unwrap();
        let delta = diff.to_bytes().unwrap();
        g.throughput(Throughput::Bytes(target.len() as u64));
        g.bench_with_input(BenchmarkId::new("decoded", records), &records, |b, _| {
            b.iter(|| black_box(apply_diff(black_box(&original), black_box(&diff)).unwrap()));
        });
        g.bench_with_input(BenchmarkId::new("envelope", records), &records, |b, _| {
            b.iter(|| black_box(engine::patch(black_box(&original), black_box(&delta)).unwrap()));
        });
    }
    g.finish();
}

fn bench_ratio_vs_stride(c: &mut Criterion) {
    write_ratio_snapshot();
    let mut g = c.benchmark_group("delta_ratio_vs_stride");
    g.sample_size(10);
    let original = gen_document(4096, 4);
    for stride in [8usize, 64, 512] {
        let target = mutate(4096, 4, stride);
        g.bench_with_input(BenchmarkId::from_parameter(stride), &stride, |b, _| {
            b.iter(|| {
                let delta =
                    engine::make_diff(&original, &target, &DiffOptions::default()).unwrap();
                black_box(delta.len() as f64 / target.len() as f64);
            });
        });
    }
    g.finish();
}

fn bench_embedded_roundtrip(c: &mut Criterion) {
    let mut g = c.benchmark_group("embedded_roundtrip");
    g.sample_size(20);
    let original = embed(&gen_document(4096, 5));
    let target = embed(&mutate(4096, 5, 256));
    g.throughput(Throughput::Bytes(target.len() as u64));
    g.bench_function("diff_patch", |b| {
        b.iter(|| {
            let delta = engine::make_diff(&original, &target, &DiffOptions::default()).unwrap();
            let out = engine::patch(&original, &delta).unwrap();
            black_box(out);
        });
    });
    g.finish();
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_diff,
    bench_apply,
    bench_ratio_vs_stride,
    bench_embedded_roundtrip
);
criterion_main!(benches);
