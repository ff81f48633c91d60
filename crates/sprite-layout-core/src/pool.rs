//! The data-parallel worker substrate used by the metadata provider and
//! the packing driver. Built directly on `rayon`: work items are pure and
//! stateless, so there is nothing here beyond "run these closures on a
//! bounded thread pool and reassemble by index".

use rayon::prelude::*;
use rayon::ThreadPool;

/// A bounded worker pool sized to `options.threads`. Owned by the run
/// that created it and torn down with it — there is no process-wide
/// singleton.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// Builds a pool with `threads` worker threads (clamped to at least 1).
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .expect("failed to build worker pool");
        Self { pool }
    }

    /// Applies `f` to every item, running on the pool, and returns results
    /// in the same order as `items` regardless of completion order.
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        F: Fn(T) -> R + Sync,
        T: Send,
        R: Send,
    {
        self.pool.install(|| items.into_par_iter().map(f).collect())
    }
}
