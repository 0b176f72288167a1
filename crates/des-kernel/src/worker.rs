//! Worker pools: how a batch of same-tick events is executed.
//!
//! The logical process is written once against the [`WorkerPool`] trait and
//! the pool is picked at construction:
//!
//! | Pool            | Behaviour                                          |
//! |-----------------|----------------------------------------------------|
//! | [`SingleWorker`]| runs tasks in order on the calling thread          |
//! | `MultiWorker`   | runs tasks concurrently on a Rayon thread pool     |
//!
//! `run_batch` returns only after every task has finished, which is what
//! gives the tick loop its drain barrier.

use crate::KernelResult;

/// One unit of work handed to a pool.
pub type Task<'a> = Box<dyn FnOnce() + Send + 'a>;

pub trait WorkerPool: Send + Sync {
    /// Number of threads tasks may run on.
    fn workers(&self) -> usize;

    /// Run every task and return once all of them are done.
    fn run_batch<'a>(&self, tasks: Vec<Task<'a>>);

    /// Release pool threads.  Called once when the logical process ends.
    fn shutdown(&self) {}
}

// ── SingleWorker ──────────────────────────────────────────────────────────────

/// Fully sequential, deterministic pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleWorker;

impl WorkerPool for SingleWorker {
    fn workers(&self) -> usize {
        1
    }

    fn run_batch<'a>(&self, tasks: Vec<Task<'a>>) {
        for task in tasks {
            task();
        }
    }
}

// ── MultiWorker ───────────────────────────────────────────────────────────────

#[cfg(feature = "parallel")]
pub use multi::MultiWorker;

#[cfg(feature = "parallel")]
mod multi {
    use super::{Task, WorkerPool};
    use crate::{KernelError, KernelResult};

    /// Pool backed by a dedicated Rayon thread pool.
    pub struct MultiWorker {
        pool:    rayon::ThreadPool,
        workers: usize,
    }

    impl MultiWorker {
        /// `None` uses all logical cores.
        pub fn new(workers: Option<usize>) -> KernelResult<Self> {
            let mut builder = rayon::ThreadPoolBuilder::new()
                .thread_name(|i| format!("des-worker-{i}"));
            if let Some(n) = workers {
                builder = builder.num_threads(n);
            }
            let pool = builder
                .build()
                .map_err(|e| KernelError::WorkerPool(e.to_string()))?;
            Ok(Self { workers: pool.current_num_threads(), pool })
        }
    }

    impl WorkerPool for MultiWorker {
        fn workers(&self) -> usize {
            self.workers
        }

        fn run_batch<'a>(&self, mut tasks: Vec<Task<'a>>) {
            // A lone task runs on the calling thread.
            if tasks.len() == 1 {
                if let Some(task) = tasks.pop() {
                    task();
                }
                return;
            }
            self.pool.scope(|s| {
                for task in tasks {
                    s.spawn(move |_| task());
                }
            });
        }
    }
}

// ── Factory ───────────────────────────────────────────────────────────────────

/// Pick a pool for `workers` threads (`None` = all logical cores).
///
/// Without the `parallel` feature every request gets the [`SingleWorker`].
pub fn worker_pool(workers: Option<usize>) -> KernelResult<Box<dyn WorkerPool>> {
    if workers == Some(1) {
        return Ok(Box::new(SingleWorker));
    }

    #[cfg(feature = "parallel")]
    {
        Ok(Box::new(MultiWorker::new(workers)?))
    }

    #[cfg(not(feature = "parallel"))]
    {
        tracing::warn!(?workers, "built without the `parallel` feature; using a single worker");
        Ok(Box::new(SingleWorker))
    }
}
