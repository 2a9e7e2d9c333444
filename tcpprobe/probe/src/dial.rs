use std::time::Duration;

use async_trait::async_trait;
use snafu::prelude::*;
use tokio::net::TcpStream;
use tokio::time;

use crate::cancel::Cancel;
use crate::error::{CancelledSnafu, ConnectSnafu, DialError, TimeoutSnafu};

/// Connect-only probe of an address.
///
/// Implementations must return promptly once `cancel` is set; the engine joins every dial before
/// `get_healthy` returns, so a dial that ignores `cancel` holds the caller past its deadline.
#[async_trait]
pub trait Dial: Send + Sync + 'static {
    async fn dial(
        &self,
        address: &str,
        timeout: Duration,
        cancel: &Cancel,
    ) -> Result<(), DialError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dial for TcpDialer {
    async fn dial(
        &self,
        address: &str,
        timeout: Duration,
        cancel: &Cancel,
    ) -> Result<(), DialError> {
        let stream = tokio::select! {
            biased;
            () = cancel.wait() => return CancelledSnafu.fail(),
            result = time::timeout(timeout, TcpStream::connect(address)) => {
                result.map_err(|_| TimeoutSnafu.build())?.context(ConnectSnafu)?
            }
        };
        // We only need to know that the connection was accepted.
        drop(stream);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn dial() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let cancel = Cancel::new();

        assert!(matches!(
            TcpDialer
                .dial(&address, Duration::from_secs(1), &cancel)
                .await,
            Ok(()),
        ));

        drop(listener);
        assert!(matches!(
            TcpDialer
                .dial(&address, Duration::from_secs(1), &cancel)
                .await,
            Err(DialError::Connect { .. }),
        ));
    }

    #[tokio::test]
    async fn dial_cancelled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let cancel = Cancel::new();
        cancel.set();

        assert!(matches!(
            TcpDialer
                .dial(&address, Duration::from_secs(1), &cancel)
                .await,
            Err(DialError::Cancelled),
        ));
    }

    #[tokio::test]
    async fn dial_invalid_address() {
        let cancel = Cancel::new();
        assert!(matches!(
            TcpDialer
                .dial("no port here", Duration::from_secs(1), &cancel)
                .await,
            Err(DialError::Connect { .. }),
        ));
    }
}
