//! Race engine.
//!
//! Each `get_healthy` call runs probe rounds in a coordinator task until either a dial succeeds
//! or the caller's scope is set.  A round spawns one dial per endpoint and then waits for the
//! probe interval; it does not wait for its own dials, so rounds may overlap.  The first
//! successful dial, from any round, fills the result slot and wins.  The call does not return
//! until the coordinator and every dial it spawned have finished.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;

use crate::cancel::Cancel;
use crate::dial::{Dial, TcpDialer};
use crate::endpoint::{Endpoint, Registry};
use crate::error::{Error, NoHealthyEndpointSnafu};
use crate::group::{self, TaskGroup};
use crate::slot::Slot;

pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct Manager<D = TcpDialer> {
    registry: Registry,
    probe_interval: Duration,
    connect_timeout: Duration,
    dialer: Arc<D>,
}

/// `Some(index)` names the winner; `None` means that the scope was set before any dial succeeded.
type Winner = Arc<Slot<Option<usize>>>;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct RaceStats {
    num_rounds: usize,
    num_attempts: usize,
}

#[derive(Debug)]
struct Coordinator<D> {
    cancel: Cancel,
    winner: Winner,
    targets: Arc<[(usize, Endpoint)]>,
    dialer: Arc<D>,
    probe_interval: Duration,
    connect_timeout: Duration,
}

/// Sets the race scope and aborts the coordinator if `get_healthy` is dropped mid-race.
#[derive(Debug)]
struct RaceGuard {
    cancel: Cancel,
    handle: Option<JoinHandle<RaceStats>>,
}

impl Manager {
    pub fn new(registry: Registry, probe_interval: Duration) -> Self {
        Self::with_dialer(registry, probe_interval, CONNECT_TIMEOUT, TcpDialer)
    }
}

impl<D> Manager<D>
where
    D: Dial,
{
    pub fn with_dialer(
        registry: Registry,
        probe_interval: Duration,
        connect_timeout: Duration,
        dialer: D,
    ) -> Self {
        // A zero interval would spawn rounds back to back without ever sleeping.
        assert!(!probe_interval.is_zero());
        Self {
            registry,
            probe_interval,
            connect_timeout,
            dialer: Arc::new(dialer),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn add(&mut self, endpoint: Endpoint) {
        self.registry.add(endpoint);
    }

    pub fn probe_interval(&self) -> Duration {
        self.probe_interval
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the first endpoint that accepts a TCP connection before `parent` is set.
    ///
    /// `parent` usually carries the caller's deadline (see `Cancel::with_timeout`).  It is never
    /// set by this method; the race runs under a child scope of its own.
    pub async fn get_healthy(&self, parent: &Cancel) -> Result<&Endpoint, Error> {
        let cancel = parent.child();
        let winner = Winner::default();
        let mut guard = RaceGuard::spawn(
            cancel.clone(),
            Coordinator {
                cancel: cancel.clone(),
                winner: winner.clone(),
                targets: self.registry.targets().into(),
                dialer: self.dialer.clone(),
                probe_interval: self.probe_interval,
                connect_timeout: self.connect_timeout,
            }
            .run(),
        );

        let outcome = *winner.wait().await;
        cancel.set();
        let stats = guard.join().await;

        match outcome {
            Some(index) => {
                let endpoint = &self.registry[index];
                tracing::debug!(
                    %endpoint,
                    num_rounds = stats.num_rounds,
                    num_attempts = stats.num_attempts,
                    "healthy endpoint"
                );
                Ok(endpoint)
            }
            None => {
                tracing::debug!(
                    num_rounds = stats.num_rounds,
                    num_attempts = stats.num_attempts,
                    "no healthy endpoint"
                );
                NoHealthyEndpointSnafu.fail()
            }
        }
    }
}

impl<D> Coordinator<D>
where
    D: Dial,
{
    async fn run(self) -> RaceStats {
        let mut attempts = TaskGroup::new();
        let mut num_rounds = 0;
        loop {
            num_rounds += 1;
            self.launch(&mut attempts);
            tracing::trace!(
                round = num_rounds,
                num_in_flight = attempts.len(),
                "probe round"
            );

            tokio::select! {
                () = self.cancel.wait() => break,
                () = time::sleep(self.probe_interval) => {}
            }
            attempts.reap();
        }

        // Unblock the caller if no dial has ever succeeded.
        self.winner.try_put(None);
        attempts.join_all().await;

        RaceStats {
            num_rounds,
            num_attempts: attempts.num_spawned(),
        }
    }

    fn launch(&self, attempts: &mut TaskGroup) {
        for (index, endpoint) in self.targets.iter() {
            attempts.spawn(attempt(
                self.dialer.clone(),
                *index,
                endpoint.clone(),
                self.connect_timeout,
                self.cancel.clone(),
                self.winner.clone(),
            ));
        }
    }
}

async fn attempt<D>(
    dialer: Arc<D>,
    index: usize,
    endpoint: Endpoint,
    connect_timeout: Duration,
    cancel: Cancel,
    winner: Winner,
) where
    D: Dial,
{
    if cancel.is_set() {
        return;
    }
    match dialer
        .dial(endpoint.address(), connect_timeout, &cancel)
        .await
    {
        Ok(()) => {
            if winner.try_put(Some(index)) {
                tracing::trace!(%endpoint, "dial succeeded first");
            }
        }
        Err(error) => tracing::trace!(%endpoint, %error, "dial failed"),
    }
}

impl RaceGuard {
    fn spawn<F>(cancel: Cancel, coordinator: F) -> Self
    where
        F: Future<Output = RaceStats> + Send + 'static,
    {
        Self {
            cancel,
            handle: Some(tokio::spawn(coordinator)),
        }
    }

    async fn join(&mut self) -> RaceStats {
        let handle = self.handle.as_mut().expect("race was joined");
        let stats = group::resume_panic(handle.await).unwrap_or_default();
        self.handle = None;
        stats
    }
}

impl Drop for RaceGuard {
    fn drop(&mut self) {
        self.cancel.set();
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}
