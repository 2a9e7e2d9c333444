use std::future::Future;
use std::panic;

use tokio::task::{JoinError, JoinSet};

/// Tracks every task it spawns so that the owner can join them all before it finishes.
///
/// Dropping the group aborts whatever is still running.
#[derive(Debug, Default)]
pub(crate) struct TaskGroup {
    tasks: JoinSet<()>,
    num_spawned: usize,
}

impl TaskGroup {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    /// Number of tasks that have not been reaped yet.
    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn num_spawned(&self) -> usize {
        self.num_spawned
    }

    pub(crate) fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
        self.num_spawned += 1;
    }

    /// Removes finished tasks without waiting for the rest.
    pub(crate) fn reap(&mut self) {
        while let Some(join_result) = self.tasks.try_join_next() {
            resume_panic(join_result);
        }
    }

    pub(crate) async fn join_all(&mut self) {
        while let Some(join_result) = self.tasks.join_next().await {
            resume_panic(join_result);
        }
    }
}

pub(crate) fn resume_panic<T>(join_result: Result<T, JoinError>) -> Option<T> {
    match join_result {
        Ok(value) => Some(value),
        Err(join_error) => {
            if join_error.is_panic() {
                panic::resume_unwind(join_error.into_panic());
            }
            assert!(join_error.is_cancelled());
            None
        }
    }
}
