// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::config::WorkerConfig;
use crate::directory_client::DirectoryClient;
use crate::function_table::FunctionTable;
use crate::transport::{serve, TransportError};
use crate::worker_behaviour::{BehaviourProfile, DrawSource};
use crate::worker_descriptor::WorkerDescriptor;
use crate::worker_service::WorkerService;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Unregistered,
    Registered,
}

/// Owns a worker's listening socket and its registration with the directory.
/// The endpoint answers as soon as it is bound, but dispatchers only find it
/// once `register` has succeeded.
pub struct WorkerRunner<T, D> {
    config: WorkerConfig,
    listener: TcpListener,
    service: Arc<WorkerService<T, D>>,
    directory: DirectoryClient,
    state: WorkerState,
}

impl<T, D> WorkerRunner<T, D>
where
    T: FunctionTable + 'static,
    D: DrawSource + 'static,
{
    pub async fn bind(config: WorkerConfig, table: T, draws: D) -> std::io::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port))).await?;
        let directory = DirectoryClient::new(config.directory_addr);
        let profile = BehaviourProfile {
            capacity: config.capacity,
            malicious_rate: config.malicious_rate,
        };
        let service = Arc::new(WorkerService::new(profile, table, draws, directory.clone()));

        Ok(Self {
            config,
            listener,
            service,
            directory,
            state: WorkerState::Unregistered,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Descriptor published to the directory, carrying the actual bound port
    pub fn descriptor(&self) -> std::io::Result<WorkerDescriptor> {
        let port = self.local_addr()?.port();
        Ok(
            WorkerDescriptor::new(self.config.advertise_host.clone(), port, self.config.capacity)
                .with_malicious_rate(self.config.malicious_rate),
        )
    }

    pub async fn register(&mut self) -> Result<(), TransportError> {
        let descriptor = self.descriptor()?;
        self.directory.register_worker(&descriptor).await?;
        self.state = WorkerState::Registered;
        tracing::info!(
            endpoint = %descriptor.endpoint(),
            capacity = descriptor.capacity,
            malicious_rate = self.config.malicious_rate,
            "worker registered with directory {}",
            self.directory.addr()
        );
        Ok(())
    }

    /// Serves requests until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        if self.state == WorkerState::Unregistered {
            tracing::warn!("serving without directory registration");
        }
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "worker ready");
        }
        serve(self.listener, self.service, cancel).await;
        tracing::info!("worker stopped");
    }
}
