//! Performance benchmarks for xchan
//!
//! Run with: cargo bench --package xchan-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use xchan_core::{Channel, Frame};

fn unique_name(tag: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("/xchan_bench_{}_{}", tag, ts)
}

fn bench_attach(c: &mut Criterion) {
    c.bench_function("attach_create", |b| {
        b.iter(|| {
            let channel: Channel<u64> = Channel::attach(&unique_name("create")).unwrap();
            black_box(channel)
        });
    });

    let name = unique_name("open");
    let keeper: Channel<u64> = Channel::attach(&name).unwrap();
    c.bench_function("attach_open", |b| {
        b.iter(|| {
            let mut channel: Channel<u64> = Channel::attach(&name).unwrap();
            // Detach so the iteration does not remove the shared object.
            channel.detach();
            black_box(channel)
        });
    });
    drop(keeper);
}

fn bench_write_read_u64(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_read");
    group.throughput(Throughput::Bytes(std::mem::size_of::<u64>() as u64));

    let channel: Channel<u64> = Channel::attach(&unique_name("u64")).unwrap();
    group.bench_function("u64", |b| {
        b.iter(|| {
            channel.write(black_box(&42));
            black_box(channel.read().unwrap())
        });
    });

    group.finish();
}

fn bench_write_read_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_read_frame");
    group.sample_size(50);

    {
        const ELEMS: usize = 64 * 64;
        let channel: Channel<Frame<u8, ELEMS>> = Channel::attach(&unique_name("gray")).unwrap();
        let frame = Frame::<u8, ELEMS>::filled(64, 64, 1, 42);
        group.throughput(Throughput::Bytes(ELEMS as u64));
        group.bench_with_input(BenchmarkId::from_parameter(ELEMS), &frame, |b, frame| {
            b.iter(|| {
                channel.write(black_box(frame));
                black_box(channel.read().unwrap())
            });
        });
    }

    {
        const ELEMS: usize = 100 * 100 * 3;
        let channel: Channel<Frame<u8, ELEMS>> = Channel::attach(&unique_name("rgb")).unwrap();
        let frame = Frame::<u8, ELEMS>::filled(100, 100, 3, 42);
        group.throughput(Throughput::Bytes(ELEMS as u64));
        group.bench_with_input(BenchmarkId::from_parameter(ELEMS), &frame, |b, frame| {
            b.iter(|| {
                channel.write(black_box(frame));
                black_box(channel.read().unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_attach,
    bench_write_read_u64,
    bench_write_read_frames
);
criterion_main!(benches);
