// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use anyhow::Context;
use clap::Parser;
use compute_farm_core::directory_registry::DirectoryRegistry;
use compute_farm_core::directory_server::DirectoryServer;
use compute_farm_core::DIRECTORY_PORT;
use std::net::{Ipv4Addr, SocketAddr};
use tokio_util::sync::CancellationToken;

/// Registry of workers and of the dispatcher credential
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
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

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, DIRECTORY_PORT));
    let server = DirectoryServer::bind(addr, DirectoryRegistry::new())
        .await
        .with_context(|| format!("cannot listen on {}", addr))?;

    let cancel = CancellationToken::new();
    let server_task = tokio::spawn(server.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("received Ctrl+C, shutting down");
    cancel.cancel();
    server_task.await?;

    Ok(())
}
