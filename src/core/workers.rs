//! Background thread pool (frame decoding, upload processing hand-off).
//!
//! A single crossbeam `Injector` feeds all threads. Jobs are fire-and-forget;
//! results travel back over channels owned by the caller.

use crossbeam::deque::{Injector, Steal};
use log::{error, trace};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// How long `Drop` waits for threads before leaving them to the OS.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Fixed-size worker pool.
pub struct Workers {
    injector: Arc<Injector<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl std::fmt::Debug for Workers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workers").field("threads", &self.handles.len()).finish()
    }
}

impl Workers {
    /// Spawn `num_threads` workers (at least one is attempted).
    pub fn new(num_threads: usize) -> Self {
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();

        for worker_id in 0..num_threads.max(1) {
            let injector = Arc::clone(&injector);
            let shutdown = Arc::clone(&shutdown);

            let spawned = thread::Builder::new()
                .name(format!("spritedeck-worker-{}", worker_id))
                .spawn(move || {
                    trace!("Worker {} started", worker_id);
                    loop {
                        match injector.steal() {
                            Steal::Success(job) => job(),
                            Steal::Retry => continue,
                            Steal::Empty => {
                                if shutdown.load(Ordering::Relaxed) {
                                    break;
                                }
                                thread::sleep(Duration::from_millis(1));
                            }
                        }
                    }
                    trace!("Worker {} stopped", worker_id);
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => error!("Failed to spawn worker {}: {}", worker_id, e),
            }
        }

        trace!("Workers initialized: {} threads", handles.len());
        Self {
            injector,
            handles,
            shutdown,
        }
    }

    /// Default pool size: 3/4 of the cores, the rest stays with the UI thread.
    pub fn default_size() -> usize {
        (num_cpus::get() * 3 / 4).max(1)
    }

    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }

    /// Run closure on a worker thread. Runs inline if no thread could be spawned.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.handles.is_empty() {
            f();
            return;
        }
        self.injector.push(Box::new(f));
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        let num_threads = self.handles.len();
        trace!("Workers shutting down ({} threads)...", num_threads);
        self.shutdown.store(true, Ordering::SeqCst);

        let deadline = Instant::now() + SHUTDOWN_TIMEOUT;
        for handle in std::mem::take(&mut self.handles) {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    trace!("Shutdown timeout reached, detaching remaining workers");
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            let _ = handle.join();
        }
        trace!("All {} workers stopped", num_threads);
    }
}
