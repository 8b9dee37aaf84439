//! Bounded worker pool for CPU-bound crypto/hash work.
//!
//! Per-field operations are independent and may complete in any order; the
//! caller re-assembles results deterministically. Worker count comes from
//! `CoreConfig::worker_threads()`. I/O never runs on this pool.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Applies `f` to every item on up to `workers` scoped threads, preserving
/// input order in the output.
pub(crate) fn par_map<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if workers <= 1 || items.len() <= 1 {
        return items.iter().map(&f).collect();
    }

    let results: Vec<Mutex<Option<R>>> = items.iter().map(|_| Mutex::new(None)).collect();
    let next = AtomicUsize::new(0);
    let threads = workers.min(items.len());

    std::thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    if i >= items.len() {
                        break;
                    }
                    let out = f(&items[i]);
                    *results[i].lock().unwrap_or_else(|e| e.into_inner()) = Some(out);
                }
            });
        }
    });

    results
        .into_iter()
        .map(|slot| {
            slot.into_inner()
                .unwrap_or_else(|e| e.into_inner())
                .expect("worker completed every claimed slot")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order() {
        let items: Vec<usize> = (0..100).collect();
        let out = par_map(&items, 4, |n| n * 2);
        assert_eq!(out, (0..100).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn single_worker_is_sequential() {
        let items = vec![1, 2, 3];
        assert_eq!(par_map(&items, 1, |n| n + 1), vec![2, 3, 4]);
    }

    #[test]
    fn empty_input() {
        let items: Vec<u8> = vec![];
        assert!(par_map(&items, 4, |n| *n).is_empty());
    }

    #[test]
    fn more_workers_than_items() {
        let items = vec![10, 20];
        assert_eq!(par_map(&items, 16, |n| n / 10), vec![1, 2]);
    }
}
