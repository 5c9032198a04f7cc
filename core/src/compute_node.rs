// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::credentials::Credentials;
use crate::dispatch_error::CallError;
use crate::operation::Operation;
use async_trait::async_trait;

/// A worker as seen from the dispatcher.
/// Abstracts the transport so policies can run against in-memory nodes.
#[async_trait]
pub trait ComputeNode: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<bool, CallError>;

    /// Modular sum of the batch, as claimed by the worker
    async fn calculate(&self, batch: &[Operation]) -> Result<u32, CallError>;
}
