// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::dispatch_error::CallError;
use crate::operation::Operation;
use crate::operation_backlog::{Batch, OperationBacklog};
use crate::worker_pool::WorkerHandle;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Which trust protocol a run uses, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Any single worker's answer is accepted
    Secure,
    /// Answers are accepted once two workers agree
    Agreement,
}

/// What one round produced. The orchestrator applies it to the backlog and
/// the worker pool; tasks never touch either.
#[derive(Debug, Default)]
pub struct RoundReport {
    pub accepted: Vec<u32>,
    /// Batches that must go back to the backlog
    pub returned: Vec<Batch>,
    /// Workers to drop for the rest of the run
    pub unreachable: Vec<usize>,
    pub calls: usize,
}

impl RoundReport {
    pub fn mark_unreachable(&mut self, worker: usize) {
        if !self.unreachable.contains(&worker) {
            self.unreachable.push(worker);
        }
    }
}

/// Drains the backlog into concurrent submissions and reports their outcome.
/// A round must not return before every task it spawned has finished.
#[async_trait]
pub trait DispatchPolicy: Send {
    fn name(&self) -> &'static str;

    async fn run_round(
        &mut self,
        backlog: &mut OperationBacklog,
        workers: &[WorkerHandle],
        limiter: &Arc<Semaphore>,
    ) -> RoundReport;
}

/// One `calculate` call, holding a permit of `limiter` for its duration
pub async fn submit_batch(
    handle: &WorkerHandle,
    batch: &[Operation],
    limiter: &Semaphore,
) -> Result<u32, CallError> {
    let _permit = limiter.acquire().await.ok();
    let outcome = handle.node.calculate(batch).await;
    match &outcome {
        Ok(value) => tracing::debug!(worker = handle.id, operations = batch.len(), value, "batch answered"),
        Err(CallError::Overloaded) => {
            tracing::warn!(worker = handle.id, operations = batch.len(), "worker overloaded")
        }
        Err(CallError::Unreachable(reason)) => {
            tracing::warn!(worker = handle.id, %reason, "worker unreachable")
        }
    }
    outcome
}
