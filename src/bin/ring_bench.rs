//! Bounded ring throughput benchmark.
//!
//! Usage:
//!     cargo run --release --bin ring_bench
//!
//! Environment variables:
//!     PRODUCER_CPU=0  Pin producer to CPU 0 (default: 0)
//!     CONSUMER_CPU=2  Pin consumer to CPU 2 (default: 2)

use std::env;
use std::hint;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use gyre::BoundedRing;

const RING_CAPACITY: usize = 1024;
const ITERATIONS: usize = 1 << 20;
const BATCH: usize = 64;

type Payload = u64;

fn get_cpu_affinity() -> (Option<usize>, Option<usize>) {
    let producer_cpu = env::var("PRODUCER_CPU")
        .ok()
        .and_then(|s| s.parse().ok())
        .or(Some(0));
    let consumer_cpu = env::var("CONSUMER_CPU")
        .ok()
        .and_then(|s| s.parse().ok())
        .or(Some(2));
    (producer_cpu, consumer_cpu)
}

fn pin_to_cpu(cpu: Option<usize>) {
    if let Some(id) = cpu {
        core_affinity::set_for_current(core_affinity::CoreId { id });
    }
}

/// Writes with retry against one consumer popping single elements.
fn bench_single_reads(producer_cpu: Option<usize>, consumer_cpu: Option<usize>) {
    let ring = Arc::new(BoundedRing::<Payload>::new(RING_CAPACITY).unwrap());

    let ready = Arc::new(AtomicBool::new(false));
    let ready_clone = Arc::clone(&ready);
    let consumer_ring = Arc::clone(&ring);

    let consumer = std::thread::spawn(move || {
        pin_to_cpu(consumer_cpu);
        ready_clone.store(true, Ordering::Release);

        let mut received = 0usize;
        while received < ITERATIONS {
            if consumer_ring.read().is_some() {
                received += 1;
            } else {
                hint::spin_loop();
            }
        }
    });

    while !ready.load(Ordering::Acquire) {
        hint::spin_loop();
    }
    pin_to_cpu(producer_cpu);

    let start = Instant::now();
    for i in 0..ITERATIONS as Payload {
        let mut item = i;
        loop {
            match ring.write(item) {
                Ok(()) => break,
                Err(returned) => {
                    item = returned;
                    hint::spin_loop();
                }
            }
        }
    }
    consumer.join().unwrap();
    let elapsed = start.elapsed();

    let ops_per_ms = ITERATIONS as u128 * 1_000_000 / elapsed.as_nanos();
    println!("{} ops/ms single reads", ops_per_ms);
}

/// Same contention pattern, but the consumer drains in batches.
fn bench_batch_reads(producer_cpu: Option<usize>, consumer_cpu: Option<usize>) {
    let ring = Arc::new(BoundedRing::<Payload>::new(RING_CAPACITY).unwrap());

    let ready = Arc::new(AtomicBool::new(false));
    let ready_clone = Arc::clone(&ready);
    let consumer_ring = Arc::clone(&ring);

    let consumer = std::thread::spawn(move || {
        pin_to_cpu(consumer_cpu);
        ready_clone.store(true, Ordering::Release);

        let mut received = 0usize;
        while received < ITERATIONS {
            let batch = consumer_ring.read_batch(BATCH);
            if batch.is_empty() {
                hint::spin_loop();
            } else {
                received += batch.len();
            }
        }
    });

    while !ready.load(Ordering::Acquire) {
        hint::spin_loop();
    }
    pin_to_cpu(producer_cpu);

    let start = Instant::now();
    for i in 0..ITERATIONS as Payload {
        let mut item = i;
        loop {
            match ring.write(item) {
                Ok(()) => break,
                Err(returned) => {
                    item = returned;
                    hint::spin_loop();
                }
            }
        }
    }
    consumer.join().unwrap();
    let elapsed = start.elapsed();

    let ops_per_ms = ITERATIONS as u128 * 1_000_000 / elapsed.as_nanos();
    println!("{} ops/ms batched reads (batch={})", ops_per_ms, BATCH);
}

/// Uncontended drop-oldest writes: the cost of the lossy path.
fn bench_lossy_writes(producer_cpu: Option<usize>) {
    let ring = BoundedRing::<Payload>::new(RING_CAPACITY).unwrap();

    pin_to_cpu(producer_cpu);

    let start = Instant::now();
    for i in 0..ITERATIONS as Payload {
        ring.must_write(i);
    }
    let elapsed = start.elapsed();

    let ops_per_ms = ITERATIONS as u128 * 1_000_000 / elapsed.as_nanos();
    println!("{} ops/ms lossy writes", ops_per_ms);
}

fn main() {
    let (producer_cpu, consumer_cpu) = get_cpu_affinity();

    println!(
        "gyre bounded ring (capacity={}, iters={}):",
        RING_CAPACITY, ITERATIONS
    );
    bench_single_reads(producer_cpu, consumer_cpu);
    bench_batch_reads(producer_cpu, consumer_cpu);
    bench_lossy_writes(producer_cpu);
}
