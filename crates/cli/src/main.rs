// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mindroidd`: the process that hosts one Mindroid node. Loads the
//! node's configured topology, brings up its transport plugins, and
//! blocks until shutdown is requested — ported from the original's
//! `main.cpp`/`Runtime::start` process bootstrap. The Service/Intent/
//! PackageManager lifecycle framework the original also boots here is
//! out of scope (spec.md's Non-goals); this binary only owns the
//! Binder/Proxy/Promise/transport core.

mod env;
mod exit_error;

use std::path::Path;
use std::sync::Arc;

use mindroid_runtime::{Runtime, RuntimeConfiguration, MINDROID_SCHEME};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use exit_error::ExitError;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("mindroidd: {error:#}");
            let code = error.downcast_ref::<ExitError>().map_or(1, |e| e.code);
            std::process::ExitCode::from(code as u8)
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let log_dir = env::log_dir()?;
    let _log_guard = init_logging(&log_dir)?;

    let node_id = env::node_id()?;
    let configuration = load_configuration()?;

    info!(node_id = node_id.get(), "starting mindroidd");

    let runtime = Runtime::new(node_id, configuration)?;
    runtime.install_plugin(MINDROID_SCHEME, Arc::new(mindroid_plugin_tcp::TcpPlugin::new()));

    runtime.start().await.map_err(|error| ExitError::start_failure(error.to_string()))?;
    info!("mindroidd started");

    wait_for_shutdown_signal().await;

    info!("mindroidd shutting down");
    runtime.shutdown().await.map_err(|error| ExitError::start_failure(error.to_string()))?;
    info!("mindroidd stopped cleanly");
    Ok(())
}

fn init_logging(log_dir: &Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(log_dir).map_err(|error| ExitError::config(format!("creating log directory {}: {error}", log_dir.display())))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "mindroidd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn load_configuration() -> anyhow::Result<Option<RuntimeConfiguration>> {
    let Some(path) = env::config_path() else {
        warn!(var = env::CONFIG_PATH_VAR, "not set; starting with no configured topology");
        return Ok(None);
    };
    read_configuration_file(&path).map(Some)
}

fn read_configuration_file(path: &Path) -> anyhow::Result<RuntimeConfiguration> {
    let contents = std::fs::read_to_string(path).map_err(|error| ExitError::config(format!("reading {}: {error}", path.display())))?;
    let configuration = toml::from_str(&contents).map_err(|error| ExitError::config(format!("parsing {}: {error}", path.display())))?;
    Ok(configuration)
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(error) => {
            warn!(%error, "failed to install SIGTERM handler, falling back to ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = tokio::signal::ctrl_c() => info!("received ctrl-c"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
