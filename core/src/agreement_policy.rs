// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Dispatch for untrusted workers.
//!
//! Each batch is sent to workers picked at random without replacement until
//! two of them return the same value. When the candidates run out first, the
//! earliest value obtained is accepted. Two colluding workers that agree are
//! therefore accepted as well; this is a latency-oriented heuristic, not a
//! quorum.

use crate::dispatch_error::CallError;
use crate::dispatch_policy::{submit_batch, DispatchPolicy, RoundReport};
use crate::operation::Operation;
use crate::operation_backlog::{Batch, OperationBacklog};
use crate::worker_pool::WorkerHandle;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Two distinct workers returned this value
    Agreed(u32),
    /// No pair agreed; the first value obtained is kept
    FirstResult(u32),
}

impl Acceptance {
    pub fn value(&self) -> u32 {
        match self {
            Acceptance::Agreed(value) | Acceptance::FirstResult(value) => *value,
        }
    }
}

/// Outcome of validating one batch
#[derive(Debug, Default)]
pub struct Validation {
    /// `None` when every attempt failed; the batch must be retried
    pub accepted: Option<Acceptance>,
    pub unreachable: Vec<usize>,
    pub calls: usize,
}

/// Tries `candidates` in order until two results match.
/// Failed attempts contribute no candidate value.
pub async fn validate_batch(
    batch: &[Operation],
    candidates: &[WorkerHandle],
    limiter: &Semaphore,
) -> Validation {
    let mut validation = Validation::default();
    let mut seen: Vec<u32> = Vec::new();

    for handle in candidates {
        validation.calls += 1;
        match submit_batch(handle, batch, limiter).await {
            Ok(value) => {
                if seen.contains(&value) {
                    validation.accepted = Some(Acceptance::Agreed(value));
                    return validation;
                }
                seen.push(value);
            }
            Err(CallError::Overloaded) => {}
            Err(CallError::Unreachable(_)) => validation.unreachable.push(handle.id),
        }
    }

    if let Some(&first) = seen.first() {
        if seen.len() > 1 {
            tracing::warn!(
                operations = batch.len(),
                ?seen,
                "no two workers agreed, keeping the first result"
            );
        }
        validation.accepted = Some(Acceptance::FirstResult(first));
    }
    validation
}

pub struct AgreementPolicy {
    batch_ceiling: usize,
    rng: StdRng,
}

impl AgreementPolicy {
    /// `batch_ceiling` is the smallest capacity among the run's initial
    /// workers and is not revised when workers drop out.
    pub fn new(batch_ceiling: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            batch_ceiling: batch_ceiling.max(1),
            rng,
        }
    }
}

#[async_trait]
impl DispatchPolicy for AgreementPolicy {
    fn name(&self) -> &'static str {
        "agreement"
    }

    async fn run_round(
        &mut self,
        backlog: &mut OperationBacklog,
        workers: &[WorkerHandle],
        limiter: &Arc<Semaphore>,
    ) -> RoundReport {
        let mut tasks = JoinSet::new();
        let mut in_flight: Vec<Option<Batch>> = Vec::new();

        while !backlog.is_empty() {
            let batch = backlog.take_batch(self.batch_ceiling);
            let mut candidates = workers.to_vec();
            candidates.shuffle(&mut self.rng);

            let slot = in_flight.len();
            in_flight.push(Some(batch.clone()));

            let limiter = limiter.clone();
            tasks.spawn(async move {
                let validation = validate_batch(&batch, &candidates, &limiter).await;
                (slot, validation)
            });
        }

        let mut report = RoundReport::default();

        while let Some(joined) = tasks.join_next().await {
            let (slot, validation) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "validation task failed");
                    continue;
                }
            };
            let Some(batch) = in_flight[slot].take() else {
                continue;
            };

            report.calls += validation.calls;
            for worker in validation.unreachable {
                report.mark_unreachable(worker);
            }
            match validation.accepted {
                Some(acceptance) => report.accepted.push(acceptance.value()),
                None => report.returned.push(batch),
            }
        }

        report.returned.extend(in_flight.into_iter().flatten());
        report
    }
}
