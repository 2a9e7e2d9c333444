use std::time::Duration;

use lazy_regex::regex;
use serde::Deserialize;
use snafu::prelude::*;

use crate::dial::{Dial, TcpDialer};
use crate::endpoint::Registry;
use crate::error::{
    ConfigError, InvalidDurationSnafu, ZeroConnectTimeoutSnafu, ZeroProbeIntervalSnafu,
};
use crate::race::{CONNECT_TIMEOUT, Manager, PROBE_INTERVAL};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerBuilder {
    #[serde(deserialize_with = "de::duration")]
    pub probe_interval: Duration,
    #[serde(deserialize_with = "de::duration")]
    pub connect_timeout: Duration,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self {
            probe_interval: PROBE_INTERVAL,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

impl ManagerBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn probe_interval(&mut self, probe_interval: Duration) -> &mut Self {
        self.probe_interval = probe_interval;
        self
    }

    pub fn connect_timeout(&mut self, connect_timeout: Duration) -> &mut Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn build(&self, registry: Registry) -> Result<Manager, ConfigError> {
        self.build_with_dialer(registry, TcpDialer)
    }

    pub fn build_with_dialer<D>(
        &self,
        registry: Registry,
        dialer: D,
    ) -> Result<Manager<D>, ConfigError>
    where
        D: Dial,
    {
        ensure!(!self.probe_interval.is_zero(), ZeroProbeIntervalSnafu);
        ensure!(!self.connect_timeout.is_zero(), ZeroConnectTimeoutSnafu);
        Ok(Manager::with_dialer(
            registry,
            self.probe_interval,
            self.connect_timeout,
            dialer,
        ))
    }
}

/// Parses durations like `1s`, `100ms`, or `1m 30s`.
///
/// Amounts are non-negative integers; units are `h`, `m`, `s`, `ms`, `us`, and `ns`, in any case.
pub fn parse_duration(duration: &str) -> Result<Duration, ConfigError> {
    try_parse_duration(duration).context(InvalidDurationSnafu { duration })
}

fn try_parse_duration(duration: &str) -> Option<Duration> {
    // `ms` must precede `m` in the alternation.
    if !regex!(r"(?i)^\s*(?:\d+\s*(?:ms|us|ns|h|m|s)\s*)+$").is_match(duration) {
        return None;
    }
    let mut acc = Duration::ZERO;
    for (_, [amount, unit]) in regex!(r"(?i)\s*(\d+)\s*(ms|us|ns|h|m|s)\s*")
        .captures_iter(duration)
        .map(|c| c.extract())
    {
        let amount = amount.parse::<u64>().ok()?;
        let unit = unit.to_ascii_lowercase();
        acc = acc.checked_add(match unit.as_str() {
            "h" => Duration::from_secs(amount.checked_mul(3600)?),
            "m" => Duration::from_secs(amount.checked_mul(60)?),
            "s" => Duration::from_secs(amount),
            "ms" => Duration::from_millis(amount),
            "us" => Duration::from_micros(amount),
            "ns" => Duration::from_nanos(amount),
            _ => std::unreachable!(),
        })?;
    }
    Some(acc)
}

mod de {
    use std::time::Duration;

    use serde::de::{Deserializer, Error};
    use serde::Deserialize;

    pub(super) fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        super::parse_duration(&<String>::deserialize(deserializer)?).map_err(D::Error::custom)
    }
}
