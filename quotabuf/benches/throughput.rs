use std::hint::black_box;
use std::thread;

use quotabuf::{BoundedBuffer, BufferConfig};

fn main() {
    divan::main();
}

const QUOTA: u64 = 10_000;

fn run_line(buffer: &BoundedBuffer, producers: usize, consumers: usize) {
    thread::scope(|s| {
        let makers: Vec<_> = (0..producers)
            .map(|producer| {
                s.spawn(move || {
                    while let Some(reservation) = buffer.reserve_slot(producer) {
                        let _ = black_box(buffer.enqueue(reservation));
                    }
                })
            })
            .collect();
        let packers: Vec<_> = (0..consumers)
            .map(|consumer| {
                s.spawn(move || {
                    while let Some(delivery) = buffer.dequeue(consumer) {
                        black_box(delivery);
                    }
                })
            })
            .collect();

        for maker in makers {
            maker.join().unwrap();
        }
        buffer.mark_production_finished();
        for packer in packers {
            packer.join().unwrap();
        }
    });
}

#[divan::bench(args = [(1, 1), (2, 2), (4, 4), (8, 2), (2, 8)])]
fn bench_line(bencher: divan::Bencher, (producers, consumers): (usize, usize)) {
    bencher
        .with_inputs(|| {
            BoundedBuffer::new(BufferConfig {
                quota: QUOTA,
                capacity: 16,
                producers,
                consumers,
            })
            .unwrap()
        })
        .bench_refs(|buffer| run_line(buffer, producers, consumers));
}

#[divan::bench(args = [1, 4, 64, 1024])]
fn bench_capacity(bencher: divan::Bencher, capacity: usize) {
    bencher
        .with_inputs(|| {
            BoundedBuffer::new(BufferConfig {
                quota: QUOTA,
                capacity,
                producers: 2,
                consumers: 2,
            })
            .unwrap()
        })
        .bench_refs(|buffer| run_line(buffer, 2, 2));
}
