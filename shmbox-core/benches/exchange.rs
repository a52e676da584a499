// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Record exchange benchmarks.
//!
//! Measures the guarded write+read round-trip through a shared slot and
//! compares it against a Unix domain socket echo for the same payload.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shmbox_core::{RecordSize, SharedSlot};
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::time::Duration;
use tempfile::TempDir;

/// Record sizes for exchange benchmarks.
const RECORD_SIZES: &[usize] = &[64, 1024, 4096, 16384];

/// Benchmark the guarded slot round-trip.
fn bench_slot_exchange(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange_slot");
    group.measurement_time(Duration::from_secs(5));

    for &size in RECORD_SIZES {
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let dir = TempDir::new().expect("Failed to create temp dir");
            let slot = SharedSlot::open(
                dir.path().join("bench.shm"),
                RecordSize::new(size).expect("Invalid record size"),
            )
            .expect("Failed to open slot");

            let record = vec![0xABu8; size];
            let mut out = vec![0u8; size];
            let timeout = Duration::from_millis(100);

            b.iter(|| {
                assert!(slot
                    .try_write(black_box(&record), timeout)
                    .expect("Write failed"));
                assert!(slot
                    .try_read(black_box(&mut out), timeout)
                    .expect("Read failed"));
            });
        });
    }

    group.finish();
}

/// Benchmark a Unix domain socket echo round-trip for comparison.
fn bench_unix_socket_exchange(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange_unix_socket");
    group.measurement_time(Duration::from_secs(5));

    for &size in RECORD_SIZES {
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let dir = TempDir::new().expect("Failed to create temp dir");
            let socket_path = dir.path().join("bench.sock");

            let listener = UnixListener::bind(&socket_path).expect("Failed to bind");

            let server = std::thread::spawn(move || {
                let (mut stream, _) = listener.accept().expect("Accept failed");
                let mut buf = vec![0u8; 65536];
                loop {
                    match stream.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            stream.write_all(&buf[..n]).ok();
                        }
                        Err(_) => break,
                    }
                }
            });

            let mut stream = UnixStream::connect(&socket_path).expect("Connect failed");
            let record = vec![0xABu8; size];
            let mut out = vec![0u8; size];

            b.iter(|| {
                stream.write_all(black_box(&record)).expect("Write failed");
                stream.read_exact(black_box(&mut out)).expect("Read failed");
            });

            drop(stream);
            server.join().expect("Server thread panicked");
        });
    }

    group.finish();
}

criterion_group!(benches, bench_slot_exchange, bench_unix_socket_exchange);
criterion_main!(benches);
