// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use anyhow::Context;
use clap::Parser;
use compute_farm_core::config::{default_directory_addr, WorkerConfig};
use compute_farm_core::function_table::StandardFunctions;
use compute_farm_core::worker_behaviour::ThreadDraws;
use compute_farm_core::worker_runner::WorkerRunner;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

/// Evaluates operation batches for a dispatcher
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Largest batch accepted without risk of an overload refusal
    capacity: usize,

    /// Probability in [0, 1] of answering with a fabricated result
    malicious_rate: f64,

    /// Listening port
    port: u16,

    /// Host name published to the directory
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = default_directory_addr())]
    directory: SocketAddr,

    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = WorkerConfig::new(cli.capacity, cli.malicious_rate, cli.port);
    config.advertise_host = cli.host;
    config.directory_addr = cli.directory;
    config.validate()?;

    let mut runner = WorkerRunner::bind(config, StandardFunctions, ThreadDraws)
        .await
        .with_context(|| format!("cannot listen on port {}", cli.port))?;

    // a worker nobody can discover is useless
    runner
        .register()
        .await
        .with_context(|| format!("cannot register with directory {}", cli.directory))?;

    let cancel = CancellationToken::new();
    let worker_task = tokio::spawn(runner.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("received Ctrl+C, shutting down");
    cancel.cancel();
    worker_task.await?;

    Ok(())
}
