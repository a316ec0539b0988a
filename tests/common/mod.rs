//! Shared helpers for integration tests.

use std::sync::{Arc, Barrier};
use std::thread;

use keygate::KeyGate;

/// Release `callers` threads at once, each making one check on `key`.
/// Returns how many were allowed.
pub fn race_single_key(gate: Arc<dyn KeyGate>, callers: usize, key: &str) -> usize {
    let barrier = Arc::new(Barrier::new(callers));
    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let gate = gate.clone();
            let barrier = barrier.clone();
            let key = key.to_string();
            thread::spawn(move || {
                barrier.wait();
                gate.allow(&key)
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().expect("caller thread panicked"))
        .filter(|allowed| *allowed)
        .count()
}

/// Each of `threads` threads checks every key in `keys` `rounds` times.
/// Returns allowed counts per key, in the order of `keys`.
#[allow(dead_code)]
pub fn spread_over_keys(gate: Arc<dyn KeyGate>, threads: usize, rounds: usize, keys: &[&str]) -> Vec<usize> {
    let keys: Arc<Vec<String>> = Arc::new(keys.iter().map(|k| k.to_string()).collect());
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let gate = gate.clone();
            let keys = keys.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let mut allowed = vec![0usize; keys.len()];
                for _ in 0..rounds {
                    for (i, key) in keys.iter().enumerate() {
                        if gate.allow(key) {
                            allowed[i] += 1;
                        }
                    }
                }
                allowed
            })
        })
        .collect();

    let mut totals = vec![0usize; keys.len()];
    for handle in handles {
        let allowed = handle.join().expect("caller thread panicked");
        for (total, count) in totals.iter_mut().zip(allowed) {
            *total += count;
        }
    }
    totals
}
