//! Single-slot result holder.

use std::sync::OnceLock;

use tokio::sync::Notify;

/// A cell that accepts at most one value.
///
/// Writers never block: `try_put` on an occupied slot discards the value.  Readers block in
/// `wait` until the first value arrives.
#[derive(Debug)]
pub struct Slot<T> {
    value: OnceLock<T>,
    notify: Notify,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self {
            value: OnceLock::new(),
            notify: Notify::new(),
        }
    }

    /// Deposits `value` if the slot is empty.
    ///
    /// Returns false, and drops `value`, if the slot is already occupied.
    pub fn try_put(&self, value: T) -> bool {
        let put = self.value.set(value).is_ok();
        if put {
            self.notify.notify_waiters();
        }
        put
    }

    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn is_empty(&self) -> bool {
        self.value.get().is_none()
    }

    pub async fn wait(&self) -> &T {
        loop {
            tokio::pin! { let notified = self.notify.notified(); }
            notified.as_mut().enable();
            if let Some(value) = self.value.get() {
                return value;
            }
            notified.as_mut().await;
        }
    }
}
