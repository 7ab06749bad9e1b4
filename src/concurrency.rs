//! Worker pools: submit a group of independent units of work and wait for all of them.

use anyhow::{Context, Result};
use rayon::prelude::*;

/// "Submit group, await all" execution substrate.
///
/// Results come back in submission order regardless of completion order.
/// Implementations must not return before every unit has finished.
pub trait WorkerPool: Send + Sync {
    fn submit_batch<I, T, F>(&self, items: &[I], unit: F) -> Vec<T>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send;

    /// Upper bound on units running at the same time.
    fn width(&self) -> usize;
}

/// Runs units on a rayon thread pool.
pub struct RayonPool {
    pool: Option<rayon::ThreadPool>, // None: the global pool
}

impl RayonPool {
    /// Dedicated pool with `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("xetl-worker-{}", i))
            .build()
            .context("build worker thread pool")?;
        Ok(Self { pool: Some(pool) })
    }

    /// Share rayon's global pool.
    pub fn global() -> Self {
        Self { pool: None }
    }
}

impl WorkerPool for RayonPool {
    fn submit_batch<I, T, F>(&self, items: &[I], unit: F) -> Vec<T>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send,
    {
        let run = || items.par_iter().map(|item| unit(item)).collect::<Vec<T>>();
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn width(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

/// Runs units one after the other on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlinePool;

impl WorkerPool for InlinePool {
    fn submit_batch<I, T, F>(&self, items: &[I], unit: F) -> Vec<T>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send,
    {
        items.iter().map(unit).collect()
    }

    fn width(&self) -> usize {
        1
    }
}

/// Pool for a configured parallelism: sequential for 1, dedicated for N, global otherwise.
pub enum AnyPool {
    Inline(InlinePool),
    Rayon(RayonPool),
}

impl AnyPool {
    pub fn for_parallelism(parallelism: Option<usize>) -> Result<Self> {
        Ok(match parallelism {
            Some(n) if n <= 1 => AnyPool::Inline(InlinePool),
            Some(n) => AnyPool::Rayon(RayonPool::with_threads(n)?),
            None => AnyPool::Rayon(RayonPool::global()),
        })
    }
}

impl WorkerPool for AnyPool {
    fn submit_batch<I, T, F>(&self, items: &[I], unit: F) -> Vec<T>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send,
    {
        match self {
            AnyPool::Inline(p) => p.submit_batch(items, unit),
            AnyPool::Rayon(p) => p.submit_batch(items, unit),
        }
    }

    fn width(&self) -> usize {
        match self {
            AnyPool::Inline(p) => p.width(),
            AnyPool::Rayon(p) => p.width(),
        }
    }
}
