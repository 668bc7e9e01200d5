//! Fan per-document work out over worker threads and join the results in input order.

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub workers: usize,
    /// Longest time one item may run before it is degraded.
    pub item_timeout: Duration,
}

impl BatchOptions {
    /// `workers == 0` selects the available parallelism.
    pub fn new(workers: usize, item_timeout: Duration) -> Self {
        let workers = if workers == 0 {
            thread::available_parallelism().map_or(4, NonZeroUsize::get)
        } else {
            workers
        };
        Self {
            workers,
            item_timeout,
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::new(0, DEFAULT_ITEM_TIMEOUT)
    }
}

/// Run `work` on every item and return the outcomes in input order.
///
/// Workers are detached. Each item gets `item_timeout` from the moment a worker picks it
/// up; past that it resolves to `fallback` and a fresh worker takes over the rest of the
/// queue, so one stuck item never degrades the items behind it. A panicking item also
/// resolves to `fallback`.
pub fn join_all<T, R, F>(items: Vec<T>, options: BatchOptions, fallback: R, work: F) -> Vec<R>
where
    T: Send + Sync + 'static,
    R: Clone + Send + 'static,
    F: Fn(&T) -> R + Send + Sync + 'static,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let (tx, rx) = mpsc::channel::<Report<R>>();
    let pool = Pool {
        items: Arc::new(items),
        work: Arc::new(work),
        next: Arc::new(AtomicUsize::new(0)),
        tx,
    };
    for _ in 0..options.workers.clamp(1, total) {
        pool.spawn_worker();
    }

    let mut results: Vec<Option<R>> = (0..total).map(|_| None).collect();
    let mut started: Vec<Option<Instant>> = vec![None; total];
    let mut resolved = 0;

    while resolved < total {
        let next_deadline = started
            .iter()
            .zip(&results)
            .filter_map(|(start, result)| match (start, result) {
                (Some(start), None) => Some(*start + options.item_timeout),
                _ => None,
            })
            .min();
        let wait = next_deadline.map_or(options.item_timeout, |deadline| {
            deadline.saturating_duration_since(Instant::now())
        });

        match rx.recv_timeout(wait) {
            Ok(Report::Started(idx)) => started[idx] = Some(Instant::now()),
            Ok(Report::Finished(idx, outcome)) => {
                if results[idx].is_some() {
                    continue;
                }
                if outcome.is_none() {
                    tracing::warn!("batch item {idx} panicked, degrading it");
                }
                results[idx] = Some(outcome.unwrap_or_else(|| fallback.clone()));
                resolved += 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                for idx in 0..total {
                    let expired = results[idx].is_none()
                        && started[idx]
                            .is_some_and(|start| now.duration_since(start) >= options.item_timeout);
                    if expired {
                        tracing::warn!(
                            "batch item {idx} stalled for {:?}, degrading it",
                            options.item_timeout
                        );
                        results[idx] = Some(fallback.clone());
                        resolved += 1;
                        pool.spawn_worker();
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!(pending = total - resolved, "batch workers exited early");
                break;
            }
        }
    }

    results
        .into_iter()
        .map(|outcome| outcome.unwrap_or_else(|| fallback.clone()))
        .collect()
}

enum Report<R> {
    Started(usize),
    /// `None` when the item panicked.
    Finished(usize, Option<R>),
}

struct Pool<T, R, F> {
    items: Arc<Vec<T>>,
    work: Arc<F>,
    next: Arc<AtomicUsize>,
    tx: mpsc::Sender<Report<R>>,
}

impl<T, R, F> Pool<T, R, F>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(&T) -> R + Send + Sync + 'static,
{
    fn spawn_worker(&self) {
        let items = Arc::clone(&self.items);
        let work = Arc::clone(&self.work);
        let next = Arc::clone(&self.next);
        let tx = self.tx.clone();
        thread::spawn(move || {
            loop {
                let idx = next.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(idx) else {
                    break;
                };
                if tx.send(Report::Started(idx)).is_err() {
                    break;
                }
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(item))).ok();
                if tx.send(Report::Finished(idx, outcome)).is_err() {
                    break;
                }
            }
        });
    }
}
