#[cfg(all(test, feature = "loom"))]
mod tests {
    use crate::{BoundedBuffer, BufferConfig};
    use loom::{model::Builder, sync::Arc, thread};

    fn builder() -> Builder {
        let mut builder = Builder::new();
        if builder.preemption_bound.is_none() {
            builder.preemption_bound = Some(3);
        }
        builder
    }

    #[test]
    fn test_two_producers_single_slot() {
        builder().check(|| {
            let buffer = Arc::new(
                BoundedBuffer::new(BufferConfig {
                    quota: 3,
                    capacity: 1,
                    producers: 2,
                    consumers: 1,
                })
                .unwrap(),
            );

            let makers: Vec<_> = (0..2)
                .map(|producer| {
                    let buffer = buffer.clone();
                    thread::spawn(move || {
                        while let Some(reservation) = buffer.reserve_slot(producer) {
                            buffer.enqueue(reservation).unwrap();
                        }
                    })
                })
                .collect();

            let packer = {
                let buffer = buffer.clone();
                thread::spawn(move || {
                    let mut ids = Vec::new();
                    while let Some(delivery) = buffer.dequeue(0) {
                        ids.push(delivery.unit.sequence_id);
                    }
                    ids
                })
            };

            for maker in makers {
                maker.join().unwrap();
            }
            buffer.mark_production_finished();

            let ids = packer.join().unwrap();
            assert_eq!(ids, vec![1, 2, 3]);

            let tallies = buffer.tallies();
            assert_eq!(tallies.total_made(), 3);
            assert_eq!(tallies.packed, vec![3]);
            assert!(buffer.stats().peak_occupied <= 1);
        });
    }

    #[test]
    fn test_finish_broadcast_releases_consumers() {
        builder().check(|| {
            let buffer = Arc::new(
                BoundedBuffer::new(BufferConfig {
                    quota: 2,
                    capacity: 1,
                    producers: 1,
                    consumers: 2,
                })
                .unwrap(),
            );

            let maker = {
                let buffer = buffer.clone();
                thread::spawn(move || {
                    let reservation = buffer.reserve_slot(0).unwrap();
                    buffer.enqueue(reservation).unwrap();
                })
            };

            let packers: Vec<_> = (0..2)
                .map(|consumer| {
                    let buffer = buffer.clone();
                    thread::spawn(move || {
                        let mut count = 0;
                        while buffer.dequeue(consumer).is_some() {
                            count += 1;
                        }
                        count
                    })
                })
                .collect();

            maker.join().unwrap();
            // Only one of the two units was ever produced, so the consumers
            // can only leave through the finish broadcast.
            buffer.mark_production_finished();

            let consumed: u64 = packers.into_iter().map(|p| p.join().unwrap()).sum();
            assert_eq!(consumed, 1);
            assert_eq!(buffer.stats().consumed, 1);
        });
    }

    #[test]
    fn test_abort_wakes_both_sides() {
        builder().check(|| {
            let buffer = Arc::new(
                BoundedBuffer::new(BufferConfig {
                    quota: 3,
                    capacity: 1,
                    producers: 2,
                    consumers: 1,
                })
                .unwrap(),
            );

            // Producer 1 holds id 2 and must wait for id 1, which producer 0
            // abandons.
            let maker = {
                let buffer = buffer.clone();
                thread::spawn(move || {
                    let first = buffer.reserve_slot(0).unwrap();
                    let second = buffer.reserve_slot(1).unwrap();
                    drop(first);
                    buffer.enqueue(second).is_err()
                })
            };

            let packer = {
                let buffer = buffer.clone();
                thread::spawn(move || buffer.dequeue(0).is_none())
            };

            assert!(maker.join().unwrap());
            assert!(packer.join().unwrap());
            assert!(buffer.stats().aborted);
            assert_eq!(buffer.stats().committed, 0);
        });
    }
}
