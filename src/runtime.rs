//! Runtime abstraction layer for async operations
//!
//! Tile fetches are spawned through [`AsyncSpawner`] so the grid engine does
//! not depend on a particular executor. Two spawners ship with the crate:
//! a Tokio-backed one for real applications and [`ManualSpawner`], which only
//! makes progress when polled explicitly and so gives a deterministic,
//! single-threaded event loop.

use crate::prelude::{Arc, Future, Mutex, Pin};
use crate::{GridError, Result};

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Result<Box<dyn AsyncHandle>>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Convenience function for spawning on the global spawner
pub fn spawn<F>(future: F) -> Result<Box<dyn AsyncHandle>>
where
    F: Future<Output = ()> + Send + 'static,
{
    runtime()?.spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;
    use futures::future::{abortable, AbortHandle};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::runtime::Handle;
        use ::tokio::task::JoinHandle;

        /// Tokio-based async spawner; spawns onto the runtime of the caller
        pub struct TokioSpawner;

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Result<Box<dyn AsyncHandle>> {
                let runtime = Handle::try_current()
                    .map_err(|e| GridError::Runtime(format!("no tokio runtime: {}", e)))?;
                Ok(Box::new(TokioHandle(runtime.spawn(future))))
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }
        }
    }

    type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

    /// Spawner whose tasks only run inside [`ManualSpawner::run_until_stalled`]
    #[derive(Clone, Default)]
    pub struct ManualSpawner {
        tasks: Arc<Mutex<Vec<Task>>>,
    }

    impl ManualSpawner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of spawned tasks that have not completed yet
        pub fn pending(&self) -> usize {
            self.tasks.lock().map(|tasks| tasks.len()).unwrap_or(0)
        }

        /// Polls queued tasks until a full pass completes none of them and
        /// spawns nothing new. Returns how many tasks completed.
        pub fn run_until_stalled(&self) -> usize {
            let mut cx = Context::from_waker(futures::task::noop_waker_ref());
            let mut completed = 0;

            loop {
                let batch = match self.tasks.lock() {
                    Ok(mut tasks) => std::mem::take(&mut *tasks),
                    Err(_) => return completed,
                };
                if batch.is_empty() {
                    break;
                }

                let mut progressed = false;
                let mut still_pending = Vec::with_capacity(batch.len());
                for mut task in batch {
                    match task.as_mut().poll(&mut cx) {
                        Poll::Ready(()) => {
                            completed += 1;
                            progressed = true;
                        }
                        Poll::Pending => still_pending.push(task),
                    }
                }

                let spawned = match self.tasks.lock() {
                    Ok(mut tasks) => {
                        let spawned = !tasks.is_empty();
                        still_pending.append(&mut tasks);
                        *tasks = still_pending;
                        spawned
                    }
                    Err(_) => return completed,
                };

                if !progressed && !spawned {
                    break;
                }
            }

            completed
        }
    }

    impl AsyncSpawner for ManualSpawner {
        fn spawn_boxed(
            &self,
            future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
        ) -> Result<Box<dyn AsyncHandle>> {
            let (future, abort) = abortable(future);
            let finished = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&finished);

            let task: Task = Box::pin(async move {
                let _ = future.await;
                flag.store(true, Ordering::SeqCst);
            });

            self.tasks
                .lock()
                .map_err(|_| GridError::Runtime("manual spawner poisoned".to_string()))?
                .push(task);

            Ok(Box::new(ManualHandle { abort, finished }))
        }
    }

    struct ManualHandle {
        abort: AbortHandle,
        finished: Arc<AtomicBool>,
    }

    impl AsyncHandle for ManualHandle {
        fn is_finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst) || self.abort.is_aborted()
        }

        fn cancel(&self) {
            self.abort.abort();
        }
    }
}

pub use spawners::ManualSpawner;

#[cfg(feature = "tokio-runtime")]
pub use spawners::tokio_impl::TokioSpawner;

/// Global runtime instance
static RUNTIME: std::sync::OnceLock<Arc<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Initialize the runtime with a specific spawner
pub fn init_runtime(spawner: Arc<dyn AsyncSpawner>) {
    if RUNTIME.set(spawner).is_err() {
        log::debug!("runtime already initialised, keeping the existing spawner");
    }
}

/// Get the global runtime spawner
pub fn runtime() -> Result<Arc<dyn AsyncSpawner>> {
    if let Some(spawner) = RUNTIME.get() {
        return Ok(Arc::clone(spawner));
    }

    #[cfg(feature = "tokio-runtime")]
    {
        Ok(Arc::clone(
            RUNTIME.get_or_init(|| Arc::new(spawners::tokio_impl::TokioSpawner)),
        ))
    }

    #[cfg(not(feature = "tokio-runtime"))]
    {
        Err(GridError::Runtime(
            "no async runtime available; enable 'tokio-runtime' or call init_runtime".to_string(),
        )
        .into())
    }
}
