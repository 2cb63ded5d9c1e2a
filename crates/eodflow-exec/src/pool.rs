//! Bounded worker pool.
//!
//! A pool owns `N` named threads that pull `Job`s from one bounded
//! `crossbeam-channel` queue of capacity `queue_factor * N` and hand each item
//! to a shared handler. Senders block while the queue is full. Every blocking
//! point also watches the run's `CancelToken`, and senders additionally watch
//! the batch `Deadline`, so a stalled stage can never wedge the batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, never, select, Receiver, Sender};

use eodflow_core::id::WorkerId;

use crate::error::ExecError;

/// Unit of work on a pool queue. `Stop` terminates exactly one worker.
#[derive(Debug)]
pub enum Job<T> {
    Work(T),
    Stop,
}

/// Shared cancellation flag.
///
/// Cancelling drops the token's inner sender, which disconnects every clone of
/// `receiver()`. A disconnected receiver is always ready, so it can sit in a
/// `select!` next to the work queue.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

struct CancelInner {
    flag: AtomicBool,
    tx: Mutex<Option<Sender<()>>>,
    rx: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            inner: Arc::new(CancelInner {
                flag: AtomicBool::new(false),
                tx: Mutex::new(Some(tx)),
                rx,
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::Release);
        let mut tx = self.inner.tx.lock().unwrap_or_else(PoisonError::into_inner);
        tx.take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    /// Becomes ready (disconnected) once the token is cancelled.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.rx
    }
}

/// Absolute point in time after which the batch gives up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(timeout: Option<Duration>) -> Self {
        Self(timeout.map(|d| Instant::now() + d))
    }

    /// One-shot receiver that fires at the deadline (never, without one).
    pub fn receiver(&self) -> Receiver<Instant> {
        match self.0 {
            Some(d) => crossbeam_channel::at(d),
            None => never(),
        }
    }
}

const ABORT_POLL: Duration = Duration::from_millis(5);

/// Why a send did not enqueue its item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    Cancelled,
    DeadlineExceeded,
    /// Every worker of the target pool is gone.
    Disconnected,
}

/// Cloneable handle for enqueueing into a pool.
pub struct StageSender<T> {
    pool: Arc<str>,
    tx: Sender<Job<T>>,
    cancel: CancelToken,
    deadline: Deadline,
}

impl<T> Clone for StageSender<T> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
            deadline: self.deadline,
        }
    }
}

impl<T> StageSender<T> {
    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// Blocking enqueue; returns early on cancellation or deadline.
    pub fn send(&self, item: T) -> Result<(), SendError> {
        self.send_job(Job::Work(item))
    }

    fn send_job(&self, job: Job<T>) -> Result<(), SendError> {
        if self.cancel.is_cancelled() {
            return Err(SendError::Cancelled);
        }
        let deadline = self.deadline.receiver();
        select! {
            send(self.tx, job) -> res => res.map_err(|_| SendError::Disconnected),
            recv(self.cancel.receiver()) -> _ => Err(SendError::Cancelled),
            recv(deadline) -> _ => Err(SendError::DeadlineExceeded),
        }
    }
}

pub struct WorkerPool<T> {
    sender: StageSender<T>,
    handles: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Start `workers` threads named `<name>-<id>` (ids from 1).
    pub fn spawn<F>(
        name: &str,
        workers: usize,
        queue_factor: usize,
        cancel: CancelToken,
        deadline: Deadline,
        handler: F,
    ) -> Result<Self, ExecError>
    where
        F: Fn(WorkerId, T) + Send + Sync + 'static,
    {
        let workers = workers.max(1);
        let (tx, rx) = bounded::<Job<T>>(workers.saturating_mul(queue_factor.max(1)));
        let handler = Arc::new(handler);
        let mut handles = Vec::with_capacity(workers);

        for i in 1..=workers {
            let worker = WorkerId::new(i as u64);
            let rx = rx.clone();
            let cancel_w = cancel.clone();
            let handler = Arc::clone(&handler);
            let spawned = thread::Builder::new()
                .name(format!("{name}-{i}"))
                .spawn(move || worker_loop(worker, &rx, &cancel_w, handler.as_ref()));
            match spawned {
                Ok(h) => handles.push(h),
                Err(source) => {
                    cancel.cancel();
                    for h in handles {
                        let _ = h.join();
                    }
                    return Err(ExecError::Spawn {
                        pool: name.to_string(),
                        source,
                    });
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(pool = name, workers, "worker pool started");

        Ok(Self {
            sender: StageSender {
                pool: Arc::from(name),
                tx,
                cancel,
                deadline,
            },
            handles,
        })
    }
}

impl<T> WorkerPool<T> {
    pub fn name(&self) -> &str {
        self.sender.pool()
    }

    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    pub fn sender(&self) -> StageSender<T> {
        self.sender.clone()
    }

    /// Graceful stop: one `Stop` per worker, then join. Items queued before
    /// the sentinels are still processed.
    pub fn shutdown(self) -> Result<(), ExecError> {
        for _ in 0..self.handles.len() {
            match self.sender.send_job(Job::Stop) {
                Ok(()) | Err(SendError::Disconnected) => {}
                Err(SendError::Cancelled) => break,
                Err(SendError::DeadlineExceeded) => {
                    self.sender.cancel.cancel();
                    break;
                }
            }
        }
        self.join()
    }

    /// Send a single sentinel; exactly one worker exits on receiving it.
    pub(crate) fn stop_one(&self) -> Result<(), SendError> {
        self.sender.send_job(Job::Stop)
    }

    /// Cancel the run's token and join the workers that stop before `until`.
    /// A worker still inside its handler after that is detached, never
    /// waited on. Returns the number of detached workers.
    pub fn abort(self, until: Instant) -> usize {
        self.sender.cancel.cancel();
        let mut busy = self.handles;
        loop {
            let (done, rest): (Vec<_>, Vec<_>) =
                busy.into_iter().partition(|h| h.is_finished());
            for h in done {
                let _ = h.join();
            }
            busy = rest;
            if busy.is_empty() || Instant::now() >= until {
                break;
            }
            thread::sleep(ABORT_POLL);
        }

        #[cfg(feature = "tracing")]
        if !busy.is_empty() {
            tracing::warn!(pool = %self.sender.pool, detached = busy.len(), "workers still busy after cancel");
        }

        busy.len()
    }

    fn join(self) -> Result<(), ExecError> {
        let name = self.sender.pool.clone();
        let mut panicked = 0usize;
        for h in self.handles {
            if h.join().is_err() {
                panicked += 1;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(pool = %name, panicked, "worker pool stopped");

        if panicked > 0 {
            return Err(ExecError::Invariant(format!(
                "{panicked} worker(s) of pool '{name}' panicked"
            )));
        }
        Ok(())
    }
}

fn worker_loop<T, F>(worker: WorkerId, rx: &Receiver<Job<T>>, cancel: &CancelToken, handler: &F)
where
    F: Fn(WorkerId, T),
{
    loop {
        if cancel.is_cancelled() {
            break;
        }
        select! {
            recv(rx) -> msg => match msg {
                Ok(Job::Work(item)) => handler(worker, item),
                Ok(Job::Stop) | Err(_) => break,
            },
            recv(cancel.receiver()) -> _ => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn every_item_is_handled_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_w = Arc::clone(&seen);
        let pool = WorkerPool::spawn(
            "test",
            4,
            3,
            CancelToken::new(),
            Deadline::none(),
            move |_, item: usize| seen_w.lock().unwrap().push(item),
        )
        .unwrap();
        assert_eq!(pool.workers(), 4);

        let tx = pool.sender();
        for i in 0..500 {
            tx.send(i).unwrap();
        }
        pool.shutdown().unwrap();

        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn worker_ids_are_one_based() {
        let ids = Arc::new(Mutex::new(HashSet::new()));
        let ids_w = Arc::clone(&ids);
        let pool = WorkerPool::spawn(
            "ids",
            3,
            1,
            CancelToken::new(),
            Deadline::none(),
            move |w: WorkerId, _: u8| {
                thread::sleep(Duration::from_millis(2));
                ids_w.lock().unwrap().insert(w.get());
            },
        )
        .unwrap();
        let tx = pool.sender();
        for _ in 0..60 {
            tx.send(0).unwrap();
        }
        pool.shutdown().unwrap();
        let ids = ids.lock().unwrap();
        assert!(!ids.contains(&0));
        assert!(ids.iter().all(|id| (1..=3).contains(id)));
    }

    #[test]
    fn full_queue_send_gives_up_at_deadline() {
        let cancel = CancelToken::new();
        let release = Arc::new(AtomicBool::new(false));
        let release_w = Arc::clone(&release);
        let pool = WorkerPool::spawn(
            "stuck",
            1,
            1,
            cancel.clone(),
            Deadline::after(Some(Duration::from_millis(100))),
            move |_, _: u8| {
                while !release_w.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(5));
                }
            },
        )
        .unwrap();
        let tx = pool.sender();
        let mut outcome = Ok(());
        for _ in 0..10 {
            outcome = tx.send(0);
            if outcome.is_err() {
                break;
            }
        }
        assert_eq!(outcome, Err(SendError::DeadlineExceeded));
        release.store(true, Ordering::Release);
        assert_eq!(pool.abort(Instant::now() + Duration::from_secs(2)), 0);
    }

    #[test]
    fn cancel_stops_idle_workers() {
        let cancel = CancelToken::new();
        let handled = Arc::new(AtomicUsize::new(0));
        let handled_w = Arc::clone(&handled);
        let pool = WorkerPool::spawn(
            "idle",
            2,
            3,
            cancel.clone(),
            Deadline::none(),
            move |_, _: u8| {
                handled_w.fetch_add(1, Ordering::Relaxed);
            },
        )
        .unwrap();
        let tx = pool.sender();
        cancel.cancel();
        assert!(cancel.is_cancelled());
        assert_eq!(tx.send(1), Err(SendError::Cancelled));
        assert_eq!(pool.abort(Instant::now() + Duration::from_secs(2)), 0);
        assert_eq!(handled.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn threads_are_named_after_pool() {
        let names = Arc::new(Mutex::new(Vec::new()));
        let names_w = Arc::clone(&names);
        let pool = WorkerPool::spawn(
            "bonus",
            1,
            3,
            CancelToken::new(),
            Deadline::none(),
            move |_, _: u8| {
                let n = thread::current().name().map(str::to_string);
                names_w.lock().unwrap().push(n);
            },
        )
        .unwrap();
        pool.sender().send(0).unwrap();
        pool.shutdown().unwrap();
        assert_eq!(names.lock().unwrap()[0].as_deref(), Some("bonus-1"));
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let until = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < until, "condition not reached in time");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn one_sentinel_stops_exactly_one_worker() {
        let names = Arc::new(Mutex::new(HashSet::new()));
        let names_w = Arc::clone(&names);
        let pool = WorkerPool::spawn(
            "stop",
            3,
            3,
            CancelToken::new(),
            Deadline::none(),
            move |_, _: u8| {
                thread::sleep(Duration::from_millis(1));
                let n = thread::current().name().map(str::to_string);
                names_w.lock().unwrap().insert(n);
            },
        )
        .unwrap();

        pool.stop_one().unwrap();
        wait_for(|| pool.handles.iter().filter(|h| h.is_finished()).count() == 1);
        let stopped: Vec<Option<String>> = pool
            .handles
            .iter()
            .filter(|h| h.is_finished())
            .map(|h| h.thread().name().map(str::to_string))
            .collect();

        let tx = pool.sender();
        for _ in 0..60 {
            tx.send(0).unwrap();
        }
        wait_for(|| names.lock().unwrap().len() == 2);
        assert_eq!(pool.handles.iter().filter(|h| h.is_finished()).count(), 1);
        assert!(!names.lock().unwrap().contains(&stopped[0]));
        pool.shutdown().unwrap();
    }

    #[test]
    fn queue_holds_factor_times_workers() {
        let started = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(AtomicBool::new(false));
        let (started_w, release_w) = (Arc::clone(&started), Arc::clone(&release));
        let pool = WorkerPool::spawn(
            "cap",
            2,
            3,
            CancelToken::new(),
            Deadline::none(),
            move |_, _: u8| {
                started_w.fetch_add(1, Ordering::AcqRel);
                while !release_w.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(2));
                }
            },
        )
        .unwrap();

        let tx = pool.sender();
        tx.send(0).unwrap();
        tx.send(0).unwrap();
        wait_for(|| started.load(Ordering::Acquire) == 2);

        let mut queued = 0;
        while pool.sender.tx.try_send(Job::Work(0)).is_ok() {
            queued += 1;
            assert!(queued <= 100);
        }
        assert_eq!(queued, 3 * 2);

        release.store(true, Ordering::Release);
        pool.shutdown().unwrap();
        assert_eq!(started.load(Ordering::Acquire), 2 + 6);
    }

    #[test]
    fn abort_detaches_workers_stuck_in_handler() {
        let pool = WorkerPool::spawn(
            "slow",
            1,
            1,
            CancelToken::new(),
            Deadline::none(),
            |_, _: u8| thread::sleep(Duration::from_secs(3)),
        )
        .unwrap();
        pool.sender().send(0).unwrap();
        wait_for(|| pool.sender.tx.is_empty());

        let started = Instant::now();
        let detached = pool.abort(Instant::now() + Duration::from_millis(50));
        assert_eq!(detached, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
