// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::compute_node::ComputeNode;
use crate::credentials::Credentials;
use crate::dispatch_error::CallError;
use crate::operation::Operation;
use crate::protocol::{WorkerRequest, WorkerResponse};
use crate::transport::call;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;

/// Worker reached over the socket transport
#[derive(Debug, Clone)]
pub struct RemoteNode {
    addr: SocketAddr,
    timeout: Option<Duration>,
}

impl RemoteNode {
    pub fn new(addr: SocketAddr, timeout: Option<Duration>) -> Self {
        Self { addr, timeout }
    }

    async fn request(&self, request: &WorkerRequest) -> Result<WorkerResponse, CallError> {
        Ok(call(self.addr, request, self.timeout).await?)
    }
}

#[async_trait]
impl ComputeNode for RemoteNode {
    async fn authenticate(&self, credentials: &Credentials) -> Result<bool, CallError> {
        let request = WorkerRequest::Authenticate {
            credentials: credentials.clone(),
        };
        match self.request(&request).await? {
            WorkerResponse::Authenticated(accepted) => Ok(accepted),
            other => Err(CallError::Unreachable(format!(
                "unexpected response to authenticate: {:?}",
                other
            ))),
        }
    }

    async fn calculate(&self, batch: &[Operation]) -> Result<u32, CallError> {
        let request = WorkerRequest::Calculate {
            operations: batch.iter().map(|op| op.to_string()).collect(),
        };
        match self.request(&request).await? {
            WorkerResponse::Result(value) => Ok(value),
            WorkerResponse::Overloaded => Err(CallError::Overloaded),
            WorkerResponse::Rejected(reason) => Err(CallError::Unreachable(format!(
                "worker rejected the batch: {}",
                reason
            ))),
            WorkerResponse::Authenticated(_) => Err(CallError::Unreachable(
                "unexpected response to calculate".to_string(),
            )),
        }
    }
}
