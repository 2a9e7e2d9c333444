use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{self, Instant};

use tcpprobe_probe::{
    CONNECT_TIMEOUT, Cancel, Dial, DialError, Endpoint, Error, Manager, Registry, TcpDialer,
};

const INTERVAL: Duration = Duration::from_millis(100);

async fn open() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    (listener, address)
}

async fn closed() -> String {
    let (listener, address) = open().await;
    drop(listener);
    address
}

fn registry<A>(addresses: &[A]) -> Registry
where
    A: AsRef<str>,
{
    let mut registry = Registry::with_capacity(addresses.len());
    for address in addresses {
        registry.add(Endpoint::from(address.as_ref()));
    }
    registry
}

#[derive(Clone, Debug, Default)]
struct CountingDialer {
    num_dials: Arc<AtomicUsize>,
    num_in_flight: Arc<AtomicUsize>,
}

#[async_trait]
impl Dial for CountingDialer {
    async fn dial(
        &self,
        address: &str,
        timeout: Duration,
        cancel: &Cancel,
    ) -> Result<(), DialError> {
        self.num_dials.fetch_add(1, Ordering::SeqCst);
        self.num_in_flight.fetch_add(1, Ordering::SeqCst);
        scopeguard::defer! {
            self.num_in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        TcpDialer.dial(address, timeout, cancel).await
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_and_open() {
    let (_listener, open_address) = open().await;
    let closed_address = closed().await;
    let manager = Manager::new(registry(&[&closed_address, &open_address]), INTERVAL);

    let start = Instant::now();
    let endpoint = manager
        .get_healthy(&Cancel::with_timeout(Duration::from_secs(2)))
        .await
        .unwrap();
    assert_eq!(endpoint.address(), open_address);
    assert!(start.elapsed() < Duration::from_millis(500));

    // The winner is actually reachable.
    TcpStream::connect(endpoint.address()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn winner_is_reachable() {
    let (_listener_1, open_1) = open().await;
    let (_listener_2, open_2) = open().await;
    let closed_address = closed().await;
    let manager = Manager::new(registry(&[&open_1, &closed_address, &open_2]), INTERVAL);

    let reachable: HashSet<_> = [open_1.as_str(), open_2.as_str()].into_iter().collect();
    for _ in 0..5 {
        let endpoint = manager
            .get_healthy(&Cancel::with_timeout(Duration::from_secs(2)))
            .await
            .unwrap();
        assert!(reachable.contains(endpoint.address()));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_registry() {
    let manager = Manager::new("".split(',').map(Endpoint::from).collect(), INTERVAL);

    let start = Instant::now();
    assert!(matches!(
        manager
            .get_healthy(&Cancel::with_timeout(Duration::from_millis(500)))
            .await,
        Err(Error::NoHealthyEndpoint),
    ));
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert!(start.elapsed() < Duration::from_millis(900));
}

#[tokio::test(flavor = "multi_thread")]
async fn all_closed() {
    let manager = Manager::new(registry(&[closed().await, closed().await]), INTERVAL);

    let start = Instant::now();
    assert!(matches!(
        manager
            .get_healthy(&Cancel::with_timeout(Duration::from_millis(500)))
            .await,
        Err(Error::NoHealthyEndpoint),
    ));
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert!(start.elapsed() < Duration::from_millis(900));
}

#[tokio::test(flavor = "multi_thread")]
async fn black_hole() {
    let manager = Manager::new(registry(&["10.255.255.1:9"]), Duration::from_secs(1));
    assert_eq!(manager.connect_timeout(), CONNECT_TIMEOUT);

    // The deadline preempts the 1s connect timeout of the in-flight dial.
    let start = Instant::now();
    assert!(matches!(
        manager
            .get_healthy(&Cancel::with_timeout(Duration::from_millis(300)))
            .await,
        Err(Error::NoHealthyEndpoint),
    ));
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert!(start.elapsed() < Duration::from_millis(800));
}

#[tokio::test(flavor = "multi_thread")]
async fn sequential_calls() {
    let (_listener, open_address) = open().await;
    let dialer = CountingDialer::default();
    let manager = Manager::with_dialer(
        registry(&[open_address.clone(), closed().await]),
        INTERVAL,
        CONNECT_TIMEOUT,
        dialer.clone(),
    );

    for _ in 0..2 {
        let endpoint = manager
            .get_healthy(&Cancel::with_timeout(Duration::from_secs(2)))
            .await
            .unwrap();
        assert_eq!(endpoint.address(), open_address);
        assert_eq!(dialer.num_in_flight.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn no_dial_after_return() {
    let dialer = CountingDialer::default();
    let manager = Manager::with_dialer(
        registry(&[closed().await.as_str(), "10.255.255.1:9"]),
        INTERVAL,
        CONNECT_TIMEOUT,
        dialer.clone(),
    );

    assert!(matches!(
        manager
            .get_healthy(&Cancel::with_timeout(Duration::from_millis(350)))
            .await,
        Err(Error::NoHealthyEndpoint),
    ));
    assert_eq!(dialer.num_in_flight.load(Ordering::SeqCst), 0);
    let num_dials = dialer.num_dials.load(Ordering::SeqCst);
    assert!(num_dials >= 2);

    time::sleep(INTERVAL * 3).await;
    assert_eq!(dialer.num_dials.load(Ordering::SeqCst), num_dials);
    assert_eq!(dialer.num_in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn caller_cancel() {
    let manager = Manager::new(registry(&["10.255.255.1:9"]), INTERVAL);

    let cancel = Cancel::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(100)).await;
            cancel.set();
        });
    }
    let start = Instant::now();
    assert!(matches!(
        manager.get_healthy(&cancel).await,
        Err(Error::NoHealthyEndpoint),
    ));
    assert!(start.elapsed() < Duration::from_millis(600));
}
