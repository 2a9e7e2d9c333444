//! Picks the first reachable endpoint out of a candidate pool by racing TCP connects.
//!
//! ```no_run
//! # async fn example() -> Result<(), tcpprobe_probe::Error> {
//! use std::time::Duration;
//!
//! use tcpprobe_probe::{Cancel, Endpoint, Manager, Registry};
//!
//! let mut registry = Registry::with_capacity(2);
//! registry.add(Endpoint::from("10.0.0.1:5432"));
//! registry.add(Endpoint::from("10.0.0.2:5432"));
//!
//! let manager = Manager::new(registry, Duration::from_secs(1));
//! let endpoint = manager
//!     .get_healthy(&Cancel::with_timeout(Duration::from_secs(5)))
//!     .await?;
//! println!("{endpoint}");
//! # Ok(())
//! # }
//! ```

mod cancel;
mod config;
mod dial;
mod endpoint;
mod error;
mod group;
mod race;
mod slot;

pub use crate::cancel::Cancel;
pub use crate::config::{ManagerBuilder, parse_duration};
pub use crate::dial::{Dial, TcpDialer};
pub use crate::endpoint::{Endpoint, Registry};
pub use crate::error::{ConfigError, DialError, Error};
pub use crate::race::{CONNECT_TIMEOUT, Manager, PROBE_INTERVAL};
pub use crate::slot::Slot;
