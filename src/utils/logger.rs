use std::fmt::Display;

use anyhow::{Context, Result};
use tracing::{error, level_filters::LevelFilter, warn};
use tracing_subscriber::{prelude::*, EnvFilter, Layer, Registry};

use super::conf::Conf;

/// Logs an error on its way up a `?` chain, wrapped in `context_msg`.
pub trait LogMe<T> {
    fn log_warn<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T>;
    fn log_error<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T>;
}

// WARN {context_msg}: {cause}
impl<T, E: Into<anyhow::Error> + Display + Send + Sync + 'static> LogMe<T> for Result<T, E> {
    fn log_warn<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T> {
        self.map_err(|e| {
            let wrapped = e.into().context(context_msg);
            warn!("{:#}", wrapped);
            wrapped
        })
    }

    fn log_error<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T> {
        self.map_err(|e| {
            let wrapped = e.into().context(context_msg);
            error!("{:#}", wrapped);
            wrapped
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingMode {
    /// Multi-line human readable output with targets and timestamps
    Full,
    /// One line per event, for operators tailing a terminal
    Compact,
    /// One JSON object per event, for log collectors
    Json,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer(mode: TracingMode) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer();
    match mode {
        TracingMode::Full => layer.boxed(),
        TracingMode::Compact => layer.compact().boxed(),
        TracingMode::Json => layer.json().boxed(),
    }
}

/// INFO unless `rust_log` says otherwise. sled is held at INFO unless `rust_log` names it,
/// its debug output drowns the ledger's.
fn ledger_filter(rust_log: &str) -> Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse(rust_log)
        .with_context(|| format!("parsing log directives {rust_log:?}"))?;
    if !rust_log.contains("sled") {
        filter = filter.add_directive("sled=info".parse()?);
    }
    Ok(filter)
}

/// Installs the global stdout subscriber described by `conf`, filtered by `RUST_LOG`.
pub fn setup_tracing(conf: &Conf) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();
    let filter = ledger_filter(&rust_log)?;
    tracing_subscriber::registry()
        .with(fmt_layer(conf.tracing_mode()).with_filter(filter))
        .try_init()
        .context("installing the global tracing subscriber")
}
