mod trace;

use std::fs;
use std::io::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use tokio::signal;

use tcpprobe_probe::{Cancel, Endpoint, ManagerBuilder, Registry};

use crate::trace::TracingConfig;

#[derive(Debug, Parser)]
#[command(version, about = "Print the first node that accepts a TCP connection")]
struct Tcpprobe {
    #[command(flatten)]
    tracing: TracingConfig,

    #[arg(long, default_value = "", help = "Comma-separated list of node addresses")]
    nodes: String,
    #[arg(
        long,
        value_parser = tcpprobe_probe::parse_duration,
        help = "Duration between probes [default: 1s]",
    )]
    probe_interval: Option<Duration>,
    #[arg(
        long,
        value_parser = tcpprobe_probe::parse_duration,
        help = "Timeout of each connection attempt [default: 1s]",
    )]
    connect_timeout: Option<Duration>,
    #[arg(
        long,
        value_parser = tcpprobe_probe::parse_duration,
        default_value = "5s",
        help = "Timeout",
    )]
    timeout: Duration,
    #[arg(long, help = "Load probe settings from a YAML file")]
    config: Option<PathBuf>,
}

impl Tcpprobe {
    fn builder(&self) -> Result<ManagerBuilder, Error> {
        let mut builder = match &self.config {
            Some(path) => load(path)?,
            None => ManagerBuilder::new(),
        };
        if let Some(probe_interval) = self.probe_interval {
            builder.probe_interval(probe_interval);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            builder.connect_timeout(connect_timeout);
        }
        Ok(builder)
    }

    fn registry(&self) -> Registry {
        let addresses: Vec<_> = self.nodes.split(',').collect();
        let mut registry = Registry::with_capacity(addresses.len());
        for address in addresses {
            registry.add(Endpoint::from(address));
        }
        registry
    }

    async fn execute(&self) -> Result<(), Error> {
        let manager = self.builder()?.build(self.registry()).map_err(Error::other)?;
        tracing::info!(
            num_nodes = manager.registry().len(),
            probe_interval = ?manager.probe_interval(),
            timeout = ?self.timeout,
            "probe nodes"
        );

        let cancel = Cancel::with_timeout(self.timeout);
        let race = manager.get_healthy(&cancel);
        tokio::pin!(race);
        let result = tokio::select! {
            result = &mut race => result,
            result = recv_signal() => {
                result?;
                tracing::info!("signal received!");
                cancel.set();
                race.await
            }
        };

        match result {
            Ok(endpoint) => println!("{endpoint}"),
            Err(error) => tracing::error!("{error}"),
        }
        Ok(())
    }
}

fn load(path: &Path) -> Result<ManagerBuilder, Error> {
    serde_yaml::from_str(&fs::read_to_string(path)?).map_err(Error::other)
}

async fn recv_signal() -> Result<(), Error> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{self, SignalKind};

        let mut terminate = unix::signal(SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        signal::ctrl_c().await
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let tcpprobe = Tcpprobe::parse();
    tcpprobe.tracing.init();
    tcpprobe.execute().await
}
