//! Fan-in load coordinator
//!
//! Joins N independently failing fetches into one `loading` flag. Each
//! fetch settles on success, failure or panic alike; a failed fetch logs
//! and reports its own error and degrades only its own panel.
//!
//! A [`LoadTicket`] tracks one load cycle. Re-arming replaces the ticket,
//! and completions belonging to an older ticket, or arriving after
//! teardown, are dropped without touching any state.

use crate::error::Result;
use crate::ui::{Notification, Notifier};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

type Apply = Box<dyn FnOnce() + Send>;

/// One fetch plus the step that publishes its result
pub struct FetchTask {
    label: String,
    future: BoxFuture<'static, Result<Apply>>,
}

impl FetchTask {
    /// `apply` runs only if the fetch succeeds and its load cycle is still
    /// current.
    pub fn new<T, F, A>(label: impl Into<String>, fetch: F, apply: A) -> Self
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
        A: FnOnce(T) + Send + 'static,
    {
        let future = async move {
            let value = fetch.await?;
            Ok(Box::new(move || apply(value)) as Apply)
        }
        .boxed();

        Self {
            label: label.into(),
            future,
        }
    }

    /// Fetch straight into a panel
    pub fn fill<T, F>(label: impl Into<String>, fetch: F, panel: Panel<T>) -> Self
    where
        T: Send + Sync + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self::new(label, fetch, move |value| panel.set(value))
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Settlement counter for one load cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub expected: usize,
    pub settled: usize,
}

/// Observable slot holding one fetch's latest good result.
///
/// Starts empty; a failed refresh leaves the previous value in place.
pub struct Panel<T> {
    tx: Arc<watch::Sender<Option<T>>>,
}

impl<T> Clone for Panel<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }
}

impl<T> Panel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(Some(value));
    }

    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.tx.subscribe()
    }

    /// Read the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.tx.borrow().as_ref())
    }
}

impl<T: Clone> Panel<T> {
    pub fn get(&self) -> Option<T> {
        self.tx.borrow().clone()
    }
}

struct Inner {
    loading: watch::Sender<bool>,
    ticket: Mutex<Option<LoadTicket>>,
    next_generation: AtomicU64,
    torn_down: AtomicBool,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Inner {
    /// Publish one completion and count it.
    ///
    /// The ticket lock is held from the generation check through `apply`
    /// and the `loading` flip, so a re-arm or teardown either happens
    /// before (and the result is dropped) or after (and sees it settled).
    async fn run(self: Arc<Self>, generation: u64, task: FetchTask) {
        let FetchTask { label, future } = task;
        let outcome = AssertUnwindSafe(future).catch_unwind().await;

        let mut ticket = self.ticket.lock().unwrap_or_else(PoisonError::into_inner);
        let current = match ticket.as_mut() {
            Some(t) if t.generation == generation && !self.torn_down.load(Ordering::Acquire) => t,
            _ => {
                debug!(task = %label, generation, "discarding late fetch result");
                return;
            }
        };

        match outcome {
            Ok(Ok(apply)) => {
                if std::panic::catch_unwind(AssertUnwindSafe(apply)).is_err() {
                    warn!(task = %label, "publishing fetch result panicked");
                }
            }
            Ok(Err(e)) => {
                warn!(task = %label, "fetch failed: {}", e);
                if let Some(notifier) = &self.notifier {
                    notifier.notify(Notification::error(format!("Error loading {}", label)));
                }
            }
            Err(_) => warn!(task = %label, "fetch panicked"),
        }

        current.settled += 1;
        if current.settled >= current.expected {
            *ticket = None;
            debug!(generation, "load cycle settled");
            self.loading.send_replace(false);
        }
    }
}

/// Joins a set of fetch tasks into a single `loading` flag.
///
/// Dropping the coordinator tears it down: in-flight requests keep running
/// but their results are discarded.
///
/// # Example
///
/// ```rust,ignore
/// let coordinator = LoadCoordinator::new();
/// let groups = Panel::new();
///
/// coordinator.arm(vec![
///     FetchTask::fill("groups", { let api = api.clone(); async move { api.list_groups().await } }, groups.clone()),
/// ]);
/// coordinator.wait_settled().await;
/// ```
pub struct LoadCoordinator {
    inner: Arc<Inner>,
}

impl Default for LoadCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadCoordinator {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Report each failed fetch as an error notification
    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self::build(Some(notifier))
    }

    fn build(notifier: Option<Arc<dyn Notifier>>) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                loading,
                ticket: Mutex::new(None),
                next_generation: AtomicU64::new(0),
                torn_down: AtomicBool::new(false),
                notifier,
            }),
        }
    }

    /// Start a fresh load cycle with `tasks`, all running concurrently.
    ///
    /// Resets the counter and flips `loading` to true. Results from any
    /// earlier cycle still in flight are discarded. An empty task set
    /// settles immediately. Must be called from within a Tokio runtime.
    pub fn arm(&self, tasks: Vec<FetchTask>) -> u64 {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let expected = tasks.len();

        if self.inner.torn_down.load(Ordering::Acquire) {
            debug!("arm after teardown ignored");
            return generation;
        }

        {
            // The flag flips under the lock so it never lags behind the ticket
            let mut ticket = self.inner.ticket.lock().unwrap_or_else(PoisonError::into_inner);
            if expected == 0 {
                *ticket = None;
                self.inner.loading.send_replace(false);
                return generation;
            }
            *ticket = Some(LoadTicket {
                generation,
                expected,
                settled: 0,
            });
            self.inner.loading.send_replace(true);
        }
        debug!(generation, expected, "load cycle armed");

        for task in tasks {
            let inner = self.inner.clone();
            tokio::spawn(inner.run(generation, task));
        }

        generation
    }

    /// Observable `loading` flag
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    /// Counter of the cycle in progress, `None` when idle
    pub fn ticket(&self) -> Option<LoadTicket> {
        *self.inner.ticket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until the current cycle has settled. Returns at once when idle
    /// or torn down.
    pub async fn wait_settled(&self) {
        if self.is_torn_down() {
            return;
        }
        let mut loading = self.loading();
        let _ = loading.wait_for(|loading| !*loading).await;
    }

    /// Stop publishing results. Late completions become no-ops.
    pub fn teardown(&self) {
        self.inner.torn_down.store(true, Ordering::Release);
        self.inner
            .ticket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::Acquire)
    }
}

impl Drop for LoadCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}
