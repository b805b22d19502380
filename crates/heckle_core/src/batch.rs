//! Bounded-concurrency batch execution.
//!
//! At most `workers` items are in flight at once. Workers pull the next
//! index from a shared cursor, so a slow item never stalls a whole chunk.
//! The first error wins: no new items are started after it, items already
//! running finish, and the error is returned.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Apply `f` to every item with at most `workers` concurrent invocations.
///
/// `f` receives the item and its index. `workers == 0` is treated as 1.
pub fn batch<T, E, F>(items: &[T], workers: usize, f: F) -> Result<(), E>
where
    T: Sync,
    E: Send,
    F: Fn(&T, usize) -> Result<(), E> + Sync,
{
    if items.is_empty() {
        return Ok(());
    }

    let workers = workers.clamp(1, items.len());
    let cursor = AtomicUsize::new(0);
    let has_error = AtomicBool::new(false);
    let first_error: Mutex<Option<E>> = Mutex::new(None);

    let run = || {
        while !has_error.load(Ordering::Relaxed) {
            let index = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(item) = items.get(index) else {
                break;
            };
            if let Err(e) = f(item, index) {
                has_error.store(true, Ordering::Relaxed);
                first_error.lock().get_or_insert(e);
                break;
            }
        }
    };

    if workers == 1 {
        run();
    } else {
        rayon::scope(|s| {
            for _ in 0..workers {
                s.spawn(|_| run());
            }
        });
    }

    match first_error.into_inner() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_visits_every_item() {
        let items: Vec<usize> = (0..100).collect();
        let seen = Mutex::new(Vec::new());
        batch(&items, 8, |item, index| {
            assert_eq!(*item, index);
            seen.lock().push(*item);
            Ok::<_, ()>(())
        })
        .unwrap();

        let mut seen = seen.into_inner();
        seen.sort_unstable();
        assert_eq!(seen, items);
    }

    #[test]
    fn test_batch_empty() {
        let items: Vec<u8> = Vec::new();
        batch(&items, 4, |_, _| Err("never called")).unwrap();
    }

    #[test]
    fn test_batch_respects_worker_bound() {
        let items: Vec<usize> = (0..64).collect();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        batch(&items, 3, |_, _| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(1));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, ()>(())
        })
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_batch_first_error_stops_new_work() {
        let items: Vec<usize> = (0..1000).collect();
        let started = AtomicUsize::new(0);

        let result = batch(&items, 1, |item, _| {
            started.fetch_add(1, Ordering::SeqCst);
            if *item == 10 { Err(*item) } else { Ok(()) }
        });

        assert_eq!(result, Err(10));
        assert_eq!(started.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_batch_parallel_error_propagates() {
        let items: Vec<usize> = (0..200).collect();
        let result = batch(&items, 16, |item, _| {
            if item % 50 == 49 { Err("boom") } else { Ok(()) }
        });
        assert_eq!(result, Err("boom"));
    }
}
