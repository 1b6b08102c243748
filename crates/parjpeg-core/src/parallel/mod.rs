//! Fan-out/fan-in worker threads.
//!
//! A [`WorkerPool`] is only a thread count. Each parallel operation spawns its
//! workers inside a [`std::thread::scope`] and joins them before returning, so
//! there is never a background pool or deferred completion.
//!
//! Two distribution modes are offered:
//! - [`WorkerPool::for_each_range_mut`]: static contiguous row ranges, one per
//!   worker, over a mutable buffer split into disjoint pieces
//! - [`WorkerPool::run_indexed`]: dynamic claiming of work items through one
//!   shared atomic counter, for items of uneven cost such as tiles

mod tiler;

pub use tiler::{Tile, TileGrid};

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Worker count used when hardware parallelism cannot be detected.
pub const FALLBACK_THREADS: usize = 4;

/// Number of hardware threads, or [`FALLBACK_THREADS`] if detection fails.
pub fn detected_parallelism() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_THREADS)
}

/// A fixed worker count for parallel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    threads: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::detect()
    }
}

impl WorkerPool {
    /// Pool with an explicit thread count; `None` or `Some(0)` detects.
    pub fn new(threads: Option<usize>) -> Self {
        match threads {
            Some(n) if n > 0 => Self { threads: n },
            _ => Self::detect(),
        }
    }

    /// Pool sized to the detected hardware parallelism.
    pub fn detect() -> Self {
        Self {
            threads: detected_parallelism().max(1),
        }
    }

    /// Pool that runs everything inline on the calling thread.
    pub fn single() -> Self {
        Self { threads: 1 }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Split `total` rows into one contiguous range per worker.
    ///
    /// Worker `t` of `n` starts at `floor(total * t / n)`; the last worker
    /// runs to `total` so rounding never drops rows. The number of ranges is
    /// capped at `total`, and is zero when `total` is zero.
    pub fn row_ranges(&self, total: usize) -> Vec<Range<usize>> {
        if total == 0 {
            return Vec::new();
        }

        let n = self.threads.min(total).max(1);
        (0..n)
            .map(|t| {
                let start = total * t / n;
                let end = if t == n - 1 { total } else { total * (t + 1) / n };
                start..end
            })
            .collect()
    }

    /// Run `f` over disjoint row ranges of `items` in parallel.
    ///
    /// `items` is treated as rows of `unit` elements each. `f` receives the
    /// row range and the mutable slice holding exactly those rows. With a
    /// single range the call runs inline without spawning.
    pub fn for_each_range_mut<T, F>(&self, items: &mut [T], unit: usize, f: F)
    where
        T: Send,
        F: Fn(Range<usize>, &mut [T]) + Sync,
    {
        if unit == 0 {
            return;
        }

        let mut ranges = self.row_ranges(items.len() / unit);
        if ranges.len() <= 1 {
            if let Some(range) = ranges.pop() {
                let len = range.len() * unit;
                f(range, &mut items[..len]);
            }
            return;
        }

        let f = &f;
        thread::scope(|scope| {
            let mut rest = items;
            for range in ranges {
                let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * unit);
                rest = tail;
                scope.spawn(move || f(range, head));
            }
        });
    }

    /// Process work items `0..total`, claimed one at a time from a shared counter.
    ///
    /// Each worker repeatedly claims `index = counter.fetch_add(1)` and runs
    /// `f(index)` until the index reaches `total`. Results are returned in
    /// index order. Cheap and expensive items balance out automatically.
    pub fn run_indexed<R, F>(&self, total: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync,
    {
        let workers = self.threads.min(total);
        if workers <= 1 {
            return (0..total).map(f).collect();
        }

        let next = AtomicUsize::new(0);
        let next = &next;
        let f = &f;

        let mut claimed: Vec<(usize, R)> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            if index >= total {
                                break;
                            }
                            done.push((index, f(index)));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(done) => done,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        });

        claimed.sort_unstable_by_key(|(index, _)| *index);
        claimed.into_iter().map(|(_, result)| result).collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: row ranges are contiguous, ordered and cover every row.
        #[test]
        fn prop_row_ranges_cover_all_rows(total in 0usize..5000, threads in 1usize..64) {
            let ranges = WorkerPool::new(Some(threads)).row_ranges(total);

            let mut expected_start = 0;
            for range in &ranges {
                prop_assert_eq!(range.start, expected_start);
                prop_assert!(range.end > range.start, "ranges must not be empty");
                expected_start = range.end;
            }
            prop_assert_eq!(expected_start, total);
            prop_assert!(ranges.len() <= threads);
        }
    }
}
