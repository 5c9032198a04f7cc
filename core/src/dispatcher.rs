// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::agreement_policy::AgreementPolicy;
use crate::compute_node::ComputeNode;
use crate::config::DispatcherConfig;
use crate::directory_client::DirectoryClient;
use crate::dispatch_error::DispatchError;
use crate::dispatch_policy::{DispatchPolicy, PolicyKind};
use crate::operation_backlog::OperationBacklog;
use crate::remote_node::RemoteNode;
use crate::secure_policy::SecurePolicy;
use crate::worker_pool::{WorkerHandle, WorkerPool};
use crate::MODULUS;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Summary of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunReport {
    pub aggregate: u32,
    pub rounds: usize,
    pub batches_accepted: usize,
    pub calls_made: usize,
    pub workers_lost: usize,
}

/// Orchestrator of a run. The backlog and the worker pool are only mutated
/// here, between rounds; policy tasks report back through their own results.
pub struct Dispatcher {
    config: DispatcherConfig,
    pool: WorkerPool,
    limiter: Arc<Semaphore>,
    initial_min_capacity: usize,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig, pool: WorkerPool) -> Self {
        let initial_min_capacity = pool.min_capacity().unwrap_or(1);
        let limiter = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        Self {
            config,
            pool,
            limiter,
            initial_min_capacity,
        }
    }

    /// Authenticates with the directory (fatal on failure), then keeps every
    /// listed worker that accepts the same credential.
    pub async fn bootstrap(
        config: DispatcherConfig,
        directory: &DirectoryClient,
    ) -> Result<Self, DispatchError> {
        let credentials = &config.credentials;

        directory.register_dispatcher(credentials).await?;
        if !directory.authenticate(credentials).await? {
            return Err(DispatchError::Authentication(credentials.username.clone()));
        }

        let descriptors = directory.list_workers().await?;
        tracing::info!(count = descriptors.len(), "workers listed by directory");

        let mut pool = WorkerPool::default();
        for (id, descriptor) in descriptors.into_iter().enumerate() {
            let endpoint = descriptor.endpoint();
            if descriptor.capacity == 0 {
                tracing::warn!(%endpoint, "ignoring worker declaring zero capacity");
                continue;
            }
            let addr = match descriptor.addr().await {
                Ok(addr) => addr,
                Err(e) => {
                    tracing::warn!(%endpoint, error = %e, "ignoring unresolvable worker");
                    continue;
                }
            };

            let node = Arc::new(RemoteNode::new(addr, config.call_timeout()));
            match node.authenticate(credentials).await {
                Ok(true) => {
                    tracing::info!(%endpoint, capacity = descriptor.capacity, "worker joined the run");
                    pool.push(WorkerHandle::new(id, descriptor, node));
                }
                Ok(false) => tracing::warn!(%endpoint, "worker rejected the credentials, excluded"),
                Err(e) => tracing::warn!(%endpoint, error = %e, "worker unreachable, excluded"),
            }
        }

        Ok(Self::new(config, pool))
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn policy(&self, kind: PolicyKind) -> Box<dyn DispatchPolicy> {
        match kind {
            PolicyKind::Secure => Box::new(SecurePolicy::new()),
            PolicyKind::Agreement => {
                Box::new(AgreementPolicy::new(self.initial_min_capacity, self.config.seed))
            }
        }
    }

    /// Runs rounds until the backlog is drained.
    pub async fn run(
        &mut self,
        policy: &mut dyn DispatchPolicy,
        backlog: &mut OperationBacklog,
    ) -> Result<RunReport, DispatchError> {
        let mut report = RunReport::default();
        let mut stalled_rounds = 0;

        tracing::info!(
            policy = policy.name(),
            operations = backlog.len(),
            workers = self.pool.len(),
            "run started"
        );

        while !backlog.is_empty() {
            if self.pool.is_empty() {
                return Err(DispatchError::NoWorkersAvailable {
                    remaining: backlog.len(),
                });
            }

            report.rounds += 1;
            let round = policy
                .run_round(backlog, self.pool.handles(), &self.limiter)
                .await;

            report.calls_made += round.calls;
            for batch in round.returned {
                backlog.requeue(batch);
            }
            for worker in round.unreachable {
                if let Some(handle) = self.pool.remove(worker) {
                    report.workers_lost += 1;
                    tracing::warn!(
                        worker,
                        endpoint = %handle.descriptor.endpoint(),
                        "worker removed from the run"
                    );
                }
            }

            if round.accepted.is_empty() && !self.pool.is_empty() {
                stalled_rounds += 1;
                if stalled_rounds >= self.config.stall_round_limit {
                    return Err(DispatchError::Stalled {
                        rounds: stalled_rounds,
                    });
                }
            } else {
                stalled_rounds = 0;
            }

            for value in round.accepted {
                report.aggregate = (report.aggregate + value % MODULUS) % MODULUS;
                report.batches_accepted += 1;
            }

            tracing::debug!(
                round = report.rounds,
                remaining = backlog.len(),
                workers = self.pool.len(),
                "round finished"
            );
        }

        tracing::info!(
            aggregate = report.aggregate,
            rounds = report.rounds,
            batches = report.batches_accepted,
            calls = report.calls_made,
            workers_lost = report.workers_lost,
            "run complete"
        );
        Ok(report)
    }
}
