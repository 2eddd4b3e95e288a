//! Bounded worker pool for tile writes.
//!
//! [`Dispatcher::submit`] hands a job to one of a fixed number of worker threads over a
//! rendezvous channel, so it blocks while every worker is busy. An in-flight counter guarded
//! by a mutex and condition variable lets the caller wait for outstanding jobs with
//! [`Dispatcher::drain`]. A drain that times out only logs; the jobs keep running. A job that
//! panics is counted as failed and its worker moves on to the next job.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::{RetileError, RetileResult};

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 32;

/// Default time [`Dispatcher::drain`] waits for outstanding jobs.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

type Job = Box<dyn FnOnce() -> RetileResult<()> + Send + 'static>;

/// Count of submitted jobs that have not finished yet.
#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn increment(&self) {
        *self.lock() += 1;
    }

    fn decrement(&self) {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn get(&self) -> usize {
        *self.lock()
    }

    /// Waits until the count reaches zero. Returns `false` on timeout.
    fn wait_idle(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (count, result) = self
            .idle
            .wait_timeout_while(guard, timeout, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
        !result.timed_out() || *count == 0
    }
}

/// Decrements the in-flight count when a job finishes, even if it panics.
struct InFlightGuard<'a>(&'a InFlight);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// A fixed-size pool of worker threads fed through a blocking channel.
pub struct Dispatcher {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    in_flight: Arc<InFlight>,
    counters: Arc<Counters>,
}

impl Dispatcher {
    /// Starts `workers` threads (at least one).
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn new(workers: usize) -> RetileResult<Self> {
        let workers = workers.max(1);
        let (sender, receiver) = bounded::<Job>(0);
        let in_flight = Arc::new(InFlight::default());
        let counters = Arc::new(Counters::default());

        let handles = (0..workers)
            .map(|i| {
                let receiver = receiver.clone();
                let in_flight = Arc::clone(&in_flight);
                let counters = Arc::clone(&counters);
                thread::Builder::new()
                    .name(format!("retile-worker-{i}"))
                    .spawn(move || worker_loop(&receiver, &in_flight, &counters))
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("Started {workers} dispatcher workers");

        Ok(Self {
            sender: Some(sender),
            workers: handles,
            in_flight,
            counters,
        })
    }

    /// Hands `job` to a worker, blocking until one is free.
    ///
    /// # Errors
    ///
    /// Returns [`RetileError::DispatcherClosed`] if no worker is left to run the job.
    pub fn submit(&self, job: impl FnOnce() -> RetileResult<()> + Send + 'static) -> RetileResult<()> {
        let sender = self.sender.as_ref().ok_or(RetileError::DispatcherClosed)?;
        self.in_flight.increment();
        if sender.send(Box::new(job)).is_err() {
            self.in_flight.decrement();
            return Err(RetileError::DispatcherClosed);
        }
        Ok(())
    }

    /// Waits up to `timeout` for every submitted job to finish.
    ///
    /// Returns `false` and logs a warning if jobs are still running when the timeout passes.
    /// Those jobs are not cancelled.
    pub fn drain(&self, timeout: Duration) -> bool {
        if self.in_flight.wait_idle(timeout) {
            return true;
        }
        log::warn!(
            "Timed out after {timeout:?} with {} writes still in flight; continuing",
            self.in_flight.get()
        );
        false
    }

    /// Jobs submitted but not finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    /// Jobs that returned `Ok`.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.counters.completed.load(Ordering::Acquire)
    }

    /// Jobs that returned an error.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.counters.failed.load(Ordering::Acquire)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Stops accepting jobs and waits for every worker to exit.
    pub fn join(mut self) {
        self.sender = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::warn!("A dispatcher worker panicked");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Closing the channel lets idle workers exit; busy ones finish their job first.
        self.sender = None;
    }
}

fn worker_loop(receiver: &Receiver<Job>, in_flight: &InFlight, counters: &Counters) {
    for job in receiver {
        let _guard = InFlightGuard(in_flight);
        match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(Ok(())) => {
                counters.completed.fetch_add(1, Ordering::AcqRel);
            }
            Ok(Err(e)) => {
                counters.failed.fetch_add(1, Ordering::AcqRel);
                log::warn!("Tile job failed: {e}");
            }
            Err(_) => {
                counters.failed.fetch_add(1, Ordering::AcqRel);
                log::warn!("Tile job panicked");
            }
        }
    }
}
