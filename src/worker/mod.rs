use rayon::ThreadPool;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker pool could not be built: {0}")]
    Build(String),

    #[error("worker task panicked")]
    Panicked,
}

/// Shared thread pool for CPU-bound tasks. Password hashing runs here so
/// bcrypt never stalls the reactor.
#[derive(Clone)]
pub struct WorkerPool {
    pool: Arc<ThreadPool>,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> Result<Self, WorkerError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| WorkerError::Build(e.to_string()))?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn with_default_threads() -> Result<Self, WorkerError> {
        Self::new(num_cpus::get())
    }

    /// Execute a CPU-bound task in the thread pool and return its result
    /// asynchronously.
    pub async fn execute<F, R>(&self, f: F) -> Result<R, WorkerError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            let result = f();
            let _ = tx.send(result);
        });

        rx.await.map_err(|_| WorkerError::Panicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn executes_off_thread() {
        let pool = WorkerPool::new(2).unwrap();
        let result = pool.execute(|| 21 * 2).await.unwrap();
        assert_eq!(result, 42);
    }
}
