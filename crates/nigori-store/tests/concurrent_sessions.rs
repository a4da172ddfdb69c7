//! Multi-threaded behaviour of the in-memory substrate.

use std::sync::Arc;
use std::thread;

use nigori_store::{InMemoryKvStore, KvStore, StoreError};

fn read_counter(store: &InMemoryKvStore) -> u64 {
    store
        .get_committed(b"counter")
        .unwrap()
        .map(|b| u64::from_be_bytes(b.try_into().unwrap()))
        .unwrap_or(0)
}

/// Read-modify-write with retry on conflict.
fn increment(store: &InMemoryKvStore) -> u32 {
    let mut retries = 0;
    loop {
        let mut session = store.session().unwrap();
        let current = session
            .get(b"counter")
            .unwrap()
            .map(|b| u64::from_be_bytes(b.try_into().unwrap()))
            .unwrap_or(0);
        session
            .put(b"counter", (current + 1).to_be_bytes().to_vec())
            .unwrap();
        match session.commit() {
            Ok(()) => return retries,
            Err(StoreError::Conflict { .. }) => retries += 1,
            Err(e) => panic!("unexpected store error: {e}"),
        }
    }
}

#[test]
fn concurrent_increments_are_serialized() {
    let store = Arc::new(InMemoryKvStore::new());
    let threads = 8;
    let per_thread = 50;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..per_thread {
                    increment(&store);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("thread should not panic");
    }

    assert_eq!(read_counter(&store), threads * per_thread);
    assert_eq!(store.stats().commits, threads * per_thread);
}

#[test]
fn exactly_one_first_writer_wins() {
    let store = Arc::new(InMemoryKvStore::new());
    let barrier = Arc::new(std::sync::Barrier::new(6));

    let handles: Vec<_> = (0..6u8)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut session = store.session().unwrap();
                let existing = session.get(b"slot").unwrap();
                barrier.wait();
                if existing.is_some() {
                    return false;
                }
                session.put(b"slot", vec![i]).unwrap();
                session.commit().is_ok()
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 1);
    assert!(store.get_committed(b"slot").unwrap().is_some());
}
