//! Worker pool controller for synthetic CPU load.
//!
//! The pool is either stopped (no workers) or running the exact count
//! requested at start time. Start and stop serialize on an internal mutex;
//! status reads go through an atomic counter and never contend with a
//! transition in progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Errors from pool state transitions.
#[derive(Error, Debug)]
pub enum StressError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Outcome of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The pool transitioned from stopped to running with this many workers.
    Started(usize),
    /// The pool was already running; the existing count is reported
    /// unchanged. This is an observable outcome, not an error.
    AlreadyRunning(usize),
}

/// Outcome of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyStopped,
}

/// Busy-work iterations between stop-flag checks. Small enough that a stop
/// request lands within milliseconds, not between long uninterruptible
/// bursts.
const SPIN_BATCH: u32 = 50_000;

/// How often a stop waits between acknowledgement checks.
const DRAIN_POLL: Duration = Duration::from_millis(5);

struct StressWorker {
    stop: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
    thread: std::thread::JoinHandle<()>,
}

impl StressWorker {
    fn spawn(index: usize) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));
        let thread = std::thread::Builder::new()
            .name(format!("stress-{index}"))
            .spawn({
                let stop = stop.clone();
                let done = done.clone();
                move || busy_loop(&stop, &done)
            })?;
        Ok(Self { stop, done, thread })
    }

    fn signal_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Continuous floating-point busy-work; each worker occupies one scheduling
/// unit until its stop flag is raised. No I/O, no yielding.
fn busy_loop(stop: &AtomicBool, done: &AtomicBool) {
    let mut rng = rand::rng();
    let mut sink = 0.0f64;
    while !stop.load(Ordering::Relaxed) {
        for _ in 0..SPIN_BATCH {
            sink += rng.random::<f64>().sqrt();
        }
        std::hint::black_box(sink);
    }
    done.store(true, Ordering::Release);
}

/// Owner of this instance's stress workers.
///
/// Pool size is a target set at start time: crashed workers are not
/// detected or restarted.
pub struct StressPool {
    workers: Mutex<Vec<StressWorker>>,
    observed: AtomicUsize,
    shutdown_grace: Duration,
}

impl StressPool {
    pub fn new(shutdown_grace: Duration) -> Self {
        Self {
            workers: Mutex::new(Vec::new()),
            observed: AtomicUsize::new(0),
            shutdown_grace,
        }
    }

    /// Current worker count, without taking the pool lock. May be transient
    /// while a start or stop is in progress.
    pub fn worker_count(&self) -> usize {
        self.observed.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.worker_count() > 0
    }

    /// Start `requested` workers.
    ///
    /// A running pool is left untouched and its count reported back. On a
    /// spawn failure the already-spawned workers are torn down first, so
    /// the pool is never left partially started.
    pub async fn start(&self, requested: usize) -> Result<StartOutcome, StressError> {
        let mut workers = self.workers.lock().await;
        if !workers.is_empty() {
            debug!(
                workers = workers.len(),
                "start ignored, pool already running"
            );
            return Ok(StartOutcome::AlreadyRunning(workers.len()));
        }

        for index in 0..requested {
            match StressWorker::spawn(index) {
                Ok(worker) => {
                    workers.push(worker);
                    self.observed.store(workers.len(), Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(spawned = workers.len(), "worker spawn failed: {}", e);
                    drain(&mut workers, &self.observed, self.shutdown_grace).await;
                    return Err(StressError::Spawn(e));
                }
            }
        }

        info!(workers = requested, "stress pool started");
        Ok(StartOutcome::Started(requested))
    }

    /// Stop all workers.
    ///
    /// Signals every worker, waits up to the configured grace period for
    /// acknowledgements, then detaches stragglers rather than waiting
    /// indefinitely. The pool always ends up stopped.
    pub async fn stop(&self) -> StopOutcome {
        let mut workers = self.workers.lock().await;
        if workers.is_empty() {
            debug!("stop ignored, pool already stopped");
            return StopOutcome::AlreadyStopped;
        }

        drain(&mut workers, &self.observed, self.shutdown_grace).await;
        info!("stress pool stopped");
        StopOutcome::Stopped
    }
}

async fn drain(workers: &mut Vec<StressWorker>, observed: &AtomicUsize, grace: Duration) {
    for worker in workers.iter() {
        worker.signal_stop();
    }

    let deadline = Instant::now() + grace;
    for worker in workers.drain(..) {
        let StressWorker { done, thread, .. } = worker;

        let mut acknowledged = done.load(Ordering::Acquire);
        while !acknowledged && Instant::now() < deadline {
            tokio::time::sleep(DRAIN_POLL).await;
            acknowledged = done.load(Ordering::Acquire);
        }

        if acknowledged {
            if thread.join().is_err() {
                warn!("stress worker panicked before exit");
            }
        } else {
            // Threads cannot be force-killed; dropping the handle detaches
            // the worker, which exits at its next flag check.
            warn!(
                thread = thread.thread().name().unwrap_or("stress"),
                "worker missed the shutdown grace period, detaching"
            );
        }
    }

    observed.store(0, Ordering::Relaxed);
}
