//! Dashboard entry-point: loads settings, selects the gateway, renders a page.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use dashboard::config::DashboardSettings;
use dashboard::domain::query_cache::QueryCache;
use dashboard::inbound::cli::{CliArgs, run};
use dashboard::outbound::connect_gateway;
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = DashboardSettings::load_from_iter([OsString::from("dashboard")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;
    let mode = settings
        .gateway_mode()
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let gateway = connect_gateway(mode, settings.request_timeout(), Arc::clone(&clock))
        .map_err(|error| io::Error::other(format!("create data gateway: {error}")))?;
    let cache = QueryCache::new(gateway, Arc::clone(&clock), settings.retention());

    let output = run(args.command, &cache, settings.fetch_options(), clock.utc())
        .await
        .map_err(io::Error::other)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")
}
