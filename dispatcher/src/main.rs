// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use anyhow::Context;
use clap::Parser;
use compute_farm_core::config::DispatcherConfig;
use compute_farm_core::directory_client::DirectoryClient;
use compute_farm_core::dispatch_policy::PolicyKind;
use compute_farm_core::dispatcher::Dispatcher;
use compute_farm_core::operation::ParsePolicy;
use compute_farm_core::operation_backlog::OperationBacklog;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Distributes operations across registered workers and prints their modular sum
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Newline-delimited `<kind> <parameter>` operations
    operations: PathBuf,

    /// Trust every worker's answer instead of requiring two that agree
    #[arg(short = 's', long = "secure")]
    secure: bool,

    /// JSON dispatcher configuration
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    directory: Option<SocketAddr>,

    /// Abort on the first malformed operation instead of skipping it
    #[arg(long)]
    strict: bool,

    #[arg(long)]
    seed: Option<u64>,

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

    let mut config = match &cli.config {
        Some(path) => DispatcherConfig::load(path)?,
        None => DispatcherConfig::default(),
    };
    if let Some(directory) = cli.directory {
        config.directory_addr = directory;
    }
    if cli.strict {
        config.parse_policy = ParsePolicy::Strict;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let mut backlog = OperationBacklog::load(&cli.operations, config.parse_policy)?;

    let directory = DirectoryClient::new(config.directory_addr).with_timeout(config.call_timeout());
    let mut dispatcher = Dispatcher::bootstrap(config, &directory)
        .await
        .with_context(|| format!("bootstrap against directory {} failed", directory.addr()))?;

    let kind = if cli.secure {
        PolicyKind::Secure
    } else {
        PolicyKind::Agreement
    };
    let mut policy = dispatcher.policy(kind);
    let report = dispatcher.run(policy.as_mut(), &mut backlog).await?;

    println!("{}", report.aggregate);
    Ok(())
}
