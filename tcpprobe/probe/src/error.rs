use std::io;

use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("no healthy connection"))]
    NoHealthyEndpoint,
}

// A dial error never leaves the engine; it only shows up in trace output.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DialError {
    #[snafu(display("dial cancelled"))]
    Cancelled,
    #[snafu(display("dial timeout"))]
    Timeout,
    #[snafu(display("dial error: {source}"))]
    Connect { source: io::Error },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("invalid duration: {duration:?}"))]
    InvalidDuration { duration: String },
    #[snafu(display("expect probe interval > 0"))]
    ZeroProbeInterval,
    #[snafu(display("expect connect timeout > 0"))]
    ZeroConnectTimeout,
}
