//! Cooperative cancellation scope.
//!
//! A `Cancel` is set explicitly, by its deadline passing, or by its parent being set.  Nothing is
//! interrupted on your behalf: a task is expected to check `is_set` before it starts I/O and to
//! race `wait` against any I/O that may outlive the scope.

use std::future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::Notify;
use tokio::time::{self, Instant};

#[derive(Clone, Debug, Default)]
pub struct Cancel(Arc<Scope>);

#[derive(Debug, Default)]
struct Scope {
    flag: AtomicBool,
    notify: Notify,
    deadline: Option<Instant>,
    parent: Option<Cancel>,
}

impl Cancel {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self::make(Some(deadline), None)
    }

    /// Derives a scope that is set whenever `self` is set.
    ///
    /// Setting the child does not set `self`.
    pub fn child(&self) -> Self {
        Self::make(None, Some(self.clone()))
    }

    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.child_with_deadline(Instant::now() + timeout)
    }

    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        Self::make(Some(deadline), Some(self.clone()))
    }

    fn make(deadline: Option<Instant>, parent: Option<Cancel>) -> Self {
        Self(Arc::new(Scope {
            deadline,
            parent,
            ..Default::default()
        }))
    }

    /// Returns the earliest deadline along the parent chain.
    pub fn deadline(&self) -> Option<Instant> {
        let parent = self.0.parent.as_ref().and_then(Cancel::deadline);
        match (self.0.deadline, parent) {
            (Some(x), Some(y)) => Some(x.min(y)),
            (x, y) => x.or(y),
        }
    }

    pub fn is_set(&self) -> bool {
        self.0.flag.load(Ordering::SeqCst)
            || self.0.deadline.is_some_and(|deadline| Instant::now() >= deadline)
            || self.0.parent.as_ref().is_some_and(Cancel::is_set)
    }

    pub fn set(&self) {
        self.0.flag.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn wait(&self) -> BoxFuture<'_, ()> {
        async move {
            tokio::select! {
                () = self.wait_flag() => {}
                () = wait_deadline(self.0.deadline) => {}
                () = wait_parent(self.0.parent.as_ref()) => {}
            }
        }
        .boxed()
    }

    async fn wait_flag(&self) {
        tokio::pin! { let notified = self.0.notify.notified(); }
        notified.as_mut().enable();
        if !self.0.flag.load(Ordering::SeqCst) {
            notified.as_mut().await;
        }
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

async fn wait_parent(parent: Option<&Cancel>) {
    match parent {
        Some(parent) => parent.wait().await,
        None => future::pending().await,
    }
}
