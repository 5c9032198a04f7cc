// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::directory_registry::DirectoryRegistry;
use crate::protocol::{DirectoryRequest, DirectoryResponse};
use crate::transport::{serve, RequestHandler};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

struct DirectoryHandler {
    registry: DirectoryRegistry,
}

#[async_trait]
impl RequestHandler for DirectoryHandler {
    type Request = DirectoryRequest;
    type Response = DirectoryResponse;

    async fn handle(&self, request: DirectoryRequest, peer: SocketAddr) -> DirectoryResponse {
        tracing::debug!(%peer, ?request, "directory request");
        match request {
            DirectoryRequest::RegisterDispatcher { credentials } => {
                self.registry.register_dispatcher(credentials).await;
                DirectoryResponse::Registered
            }
            DirectoryRequest::RegisterWorker { descriptor } => {
                self.registry.register_worker(descriptor).await;
                DirectoryResponse::Registered
            }
            DirectoryRequest::Authenticate { credentials } => {
                DirectoryResponse::Authenticated(self.registry.authenticate(&credentials).await)
            }
            DirectoryRequest::ListWorkers => {
                DirectoryResponse::Workers(self.registry.list_workers().await)
            }
        }
    }
}

/// Directory service bound to a listening socket
pub struct DirectoryServer {
    listener: TcpListener,
    registry: DirectoryRegistry,
}

impl DirectoryServer {
    pub async fn bind(addr: SocketAddr, registry: DirectoryRegistry) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, registry })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "directory service ready");
        }
        let handler = Arc::new(DirectoryHandler {
            registry: self.registry,
        });
        serve(self.listener, handler, cancel).await;
        tracing::info!("directory service stopped");
    }
}
