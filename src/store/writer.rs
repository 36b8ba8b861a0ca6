use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use crate::storage::{KeyValueStorage, BUDGETS_KEY, TRANSACTIONS_KEY};

/// A fully encoded ledger, tagged with the order it was issued in.
pub(crate) struct Snapshot {
    pub(crate) generation: u64,
    pub(crate) transactions: String,
    pub(crate) budgets: String,
}

enum Job {
    Write(Snapshot),
    /// A snapshot that could not be encoded; completes in order like any write.
    Reject(WriteFailure),
}

impl Job {
    fn generation(&self) -> u64 {
        match self {
            Self::Write(snapshot) => snapshot.generation,
            Self::Reject(failure) => failure.generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub generation: u64,
    pub key: String,
    pub reason: String,
}

impl std::fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "write #{} of '{}' failed: {}",
            self.generation, self.key, self.reason
        )
    }
}

/// Progress of background persistence, as seen from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistStatus {
    /// Snapshots handed to the writer so far.
    pub issued: u64,
    /// Highest generation the writer has finished with, successfully or not.
    pub completed: u64,
    pub failures: u64,
    pub last_success: Option<u64>,
    pub last_failure: Option<WriteFailure>,
}

impl PersistStatus {
    pub fn is_idle(&self) -> bool {
        self.completed >= self.issued
    }

    /// The failure of the most recently completed write, if it failed.
    pub fn current_failure(&self) -> Option<&WriteFailure> {
        self.last_failure
            .as_ref()
            .filter(|f| self.last_success.map_or(true, |ok| ok < f.generation))
    }
}

struct Shared {
    status: Mutex<PersistStatus>,
    idle: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PersistStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, generation: u64, outcome: Result<(), WriteFailure>) {
        let mut status = self.lock();
        status.completed = status.completed.max(generation);
        match outcome {
            Ok(()) => status.last_success = Some(generation),
            Err(failure) => {
                status.failures += 1;
                status.last_failure = Some(failure);
            }
        }
        self.idle.notify_all();
    }
}

/// Owns the background thread that writes snapshots to storage in issue order.
pub(crate) struct Writer {
    sender: Option<Sender<Job>>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Writer {
    pub(crate) fn spawn(storage: Arc<dyn KeyValueStorage>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(Shared {
            status: Mutex::new(PersistStatus::default()),
            idle: Condvar::new(),
        });
        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || run(storage.as_ref(), receiver, &thread_shared));
        Self {
            sender: Some(sender),
            shared,
            handle: Some(handle),
        }
    }

    /// Queue a snapshot and return its generation. Never blocks on I/O.
    pub(crate) fn submit(&self, transactions: String, budgets: String) -> u64 {
        let generation = self.next_generation();
        self.send(Job::Write(Snapshot {
            generation,
            transactions,
            budgets,
        }));
        generation
    }

    /// Record a snapshot that could not even be built.
    pub(crate) fn reject(&self, key: &str, reason: String) -> u64 {
        let generation = self.next_generation();
        self.send(Job::Reject(WriteFailure {
            generation,
            key: key.to_string(),
            reason,
        }));
        generation
    }

    fn send(&self, job: Job) {
        let generation = job.generation();
        let sent = self
            .sender
            .as_ref()
            .map(|sender| sender.send(job).is_ok())
            .unwrap_or(false);
        if !sent {
            tracing::error!(generation, "ledger writer is gone; snapshot dropped");
            self.shared.finish(
                generation,
                Err(WriteFailure {
                    generation,
                    key: TRANSACTIONS_KEY.to_string(),
                    reason: "writer thread is not running".to_string(),
                }),
            );
        }
    }

    pub(crate) fn status(&self) -> PersistStatus {
        self.shared.lock().clone()
    }

    /// Block until every issued snapshot has been handled.
    pub(crate) fn wait_idle(&self) -> PersistStatus {
        let mut status = self.shared.lock();
        while !status.is_idle() {
            status = self
                .shared
                .idle
                .wait(status)
                .unwrap_or_else(PoisonError::into_inner);
        }
        status.clone()
    }

    fn next_generation(&self) -> u64 {
        let mut status = self.shared.lock();
        status.issued += 1;
        status.issued
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain what is queued and exit.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("ledger writer thread panicked");
            }
        }
    }
}

fn run(storage: &dyn KeyValueStorage, receiver: Receiver<Job>, shared: &Shared) {
    while let Ok(mut job) = receiver.recv() {
        // Only the newest queued job matters; older snapshots would be overwritten anyway.
        while let Ok(newer) = receiver.try_recv() {
            job = newer;
        }
        let generation = job.generation();
        let outcome = match job {
            Job::Write(snapshot) => {
                panic::catch_unwind(AssertUnwindSafe(|| write_snapshot(storage, &snapshot)))
                    .unwrap_or_else(|payload| {
                        Err(WriteFailure {
                            generation,
                            key: TRANSACTIONS_KEY.to_string(),
                            reason: format!("storage backend panicked: {}", panic_message(&*payload)),
                        })
                    })
            }
            Job::Reject(failure) => Err(failure),
        };
        match &outcome {
            Ok(()) => tracing::debug!(generation, "ledger saved"),
            Err(failure) => tracing::error!(
                generation = failure.generation,
                key = %failure.key,
                reason = %failure.reason,
                "failed to save ledger"
            ),
        }
        shared.finish(generation, outcome);
    }
    tracing::debug!("ledger writer stopped");
}

fn write_snapshot(storage: &dyn KeyValueStorage, snapshot: &Snapshot) -> Result<(), WriteFailure> {
    for (key, value) in [
        (TRANSACTIONS_KEY, &snapshot.transactions),
        (BUDGETS_KEY, &snapshot.budgets),
    ] {
        storage.set(key, value).map_err(|e| WriteFailure {
            generation: snapshot.generation,
            key: key.to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
