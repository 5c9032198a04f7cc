// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::credentials::Credentials;
use crate::protocol::{DirectoryRequest, DirectoryResponse};
use crate::transport::{call, TransportError};
use crate::worker_descriptor::WorkerDescriptor;
use std::net::SocketAddr;
use std::time::Duration;

/// Client stub for the directory service
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    addr: SocketAddr,
    timeout: Option<Duration>,
}

impl DirectoryClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn register_dispatcher(&self, credentials: &Credentials) -> Result<(), TransportError> {
        let request = DirectoryRequest::RegisterDispatcher {
            credentials: credentials.clone(),
        };
        match self.request(&request).await? {
            DirectoryResponse::Registered => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn register_worker(&self, descriptor: &WorkerDescriptor) -> Result<(), TransportError> {
        let request = DirectoryRequest::RegisterWorker {
            descriptor: descriptor.clone(),
        };
        match self.request(&request).await? {
            DirectoryResponse::Registered => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> Result<bool, TransportError> {
        let request = DirectoryRequest::Authenticate {
            credentials: credentials.clone(),
        };
        match self.request(&request).await? {
            DirectoryResponse::Authenticated(accepted) => Ok(accepted),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list_workers(&self) -> Result<Vec<WorkerDescriptor>, TransportError> {
        match self.request(&DirectoryRequest::ListWorkers).await? {
            DirectoryResponse::Workers(workers) => Ok(workers),
            other => Err(unexpected(other)),
        }
    }

    async fn request(&self, request: &DirectoryRequest) -> Result<DirectoryResponse, TransportError> {
        call(self.addr, request, self.timeout).await
    }
}

fn unexpected(response: DirectoryResponse) -> TransportError {
    TransportError::UnexpectedResponse(format!("{:?}", response))
}
