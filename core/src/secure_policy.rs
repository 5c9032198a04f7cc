// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::dispatch_error::CallError;
use crate::dispatch_policy::{submit_batch, DispatchPolicy, RoundReport};
use crate::operation_backlog::{Batch, OperationBacklog};
use crate::worker_pool::WorkerHandle;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Trusts every worker: one capacity-sized batch per live worker per round,
/// each answer accepted as-is.
///
/// Rounds resume the rotation where the previous one stopped, so a short
/// tail of the backlog is not always offered to the same worker.
#[derive(Debug, Default)]
pub struct SecurePolicy {
    next: usize,
}

impl SecurePolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DispatchPolicy for SecurePolicy {
    fn name(&self) -> &'static str {
        "secure"
    }

    async fn run_round(
        &mut self,
        backlog: &mut OperationBacklog,
        workers: &[WorkerHandle],
        limiter: &Arc<Semaphore>,
    ) -> RoundReport {
        let mut tasks = JoinSet::new();
        // slot -> (worker, batch) until the slot's task reports back
        let mut in_flight: Vec<Option<(usize, Batch)>> = Vec::new();

        let count = workers.len();
        let start = if count == 0 { 0 } else { self.next % count };

        for offset in 0..count {
            if backlog.is_empty() {
                break;
            }
            let handle = &workers[(start + offset) % count];
            let batch = backlog.take_batch(handle.capacity());
            let slot = in_flight.len();
            in_flight.push(Some((handle.id, batch.clone())));

            let handle = handle.clone();
            let limiter = limiter.clone();
            tasks.spawn(async move {
                let outcome = submit_batch(&handle, &batch, &limiter).await;
                (slot, outcome)
            });
        }

        if count > 0 {
            self.next = (start + in_flight.len()) % count;
        }

        let mut report = RoundReport::default();

        while let Some(joined) = tasks.join_next().await {
            let (slot, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "batch submission task failed");
                    continue;
                }
            };
            let Some((worker, batch)) = in_flight[slot].take() else {
                continue;
            };
            report.calls += 1;

            match outcome {
                Ok(value) => report.accepted.push(value),
                Err(CallError::Overloaded) => report.returned.push(batch),
                Err(CallError::Unreachable(_)) => {
                    report.returned.push(batch);
                    report.mark_unreachable(worker);
                }
            }
        }

        // a task that died without reporting loses nothing: its batch goes back
        for (worker, batch) in in_flight.into_iter().flatten() {
            report.returned.push(batch);
            report.mark_unreachable(worker);
        }

        report
    }
}
