use std::io::{self, Stderr};

use clap::{ArgAction, Args};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{self, format::FmtSpan},
    prelude::*,
};

#[derive(Args, Clone, Debug)]
pub(crate) struct TracingConfig {
    #[arg(
        long,
        short = 'v',
        action = ArgAction::Count,
        global = true,
        help = "Make tracing output more verbose",
    )]
    verbose: u8,
    #[arg(
        long,
        action = ArgAction::Count,
        global = true,
        help = "Make tracing output less verbose",
    )]
    silent: u8,

    #[arg(long, global = true, help = "Enable colored tracing output")]
    color: bool,
}

const WRITER: fn() -> Stderr = io::stderr;

impl TracingConfig {
    pub(crate) fn init(&self) {
        let layer = fmt::layer()
            .compact()
            .with_ansi(self.color)
            .with_file(self.level_filter() >= LevelFilter::TRACE)
            .with_line_number(true)
            .with_span_events(FmtSpan::NONE)
            .with_target(self.level_filter() >= LevelFilter::DEBUG)
            .with_writer(WRITER)
            .with_filter(self.env_filter());
        tracing_subscriber::registry().with(layer).init();
    }

    fn level(&self) -> i16 {
        i16::from(self.verbose).saturating_sub(i16::from(self.silent))
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level_filter().into())
            .from_env_lossy()
    }

    // Without flags, a failed race is still reported at `ERROR` and the progress at `INFO`.
    fn level_filter(&self) -> LevelFilter {
        match self.level() {
            ..=-3 => LevelFilter::OFF,
            -2 => LevelFilter::ERROR,
            -1 => LevelFilter::WARN,
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            2.. => LevelFilter::TRACE,
        }
    }
}
