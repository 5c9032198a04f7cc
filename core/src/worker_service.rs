// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::credentials::Credentials;
use crate::directory_client::DirectoryClient;
use crate::function_table::FunctionTable;
use crate::operation::Operation;
use crate::protocol::{WorkerRequest, WorkerResponse};
use crate::transport::RequestHandler;
use crate::worker_behaviour::{decide, BehaviourProfile, DrawSource, Verdict};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Request handling of a worker: authentication relay plus batch evaluation
/// wrapped in simulated overload and dishonesty.
pub struct WorkerService<T, D> {
    profile: BehaviourProfile,
    table: Arc<T>,
    draws: Mutex<D>,
    directory: DirectoryClient,
}

impl<T, D> WorkerService<T, D>
where
    T: FunctionTable + 'static,
    D: DrawSource,
{
    pub fn new(profile: BehaviourProfile, table: T, draws: D, directory: DirectoryClient) -> Self {
        Self {
            profile,
            table: Arc::new(table),
            draws: Mutex::new(draws),
            directory,
        }
    }

    /// Delegates to the directory's stored dispatcher credential.
    /// An unreachable directory counts as a rejection.
    pub async fn authenticate(&self, credentials: &Credentials) -> bool {
        match self.directory.authenticate(credentials).await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "directory unreachable during authentication");
                false
            }
        }
    }

    pub async fn calculate(&self, lines: &[String]) -> WorkerResponse {
        let batch = match lines
            .iter()
            .map(|line| line.parse::<Operation>())
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(batch) => batch,
            Err(e) => return WorkerResponse::Rejected(e.reason),
        };

        let verdict = {
            let mut draws = match self.draws.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            decide(batch.len(), &self.profile, &mut *draws)
        };

        match verdict {
            Verdict::Overloaded => {
                tracing::info!(
                    operations = batch.len(),
                    capacity = self.profile.capacity,
                    "refusing batch: overloaded"
                );
                WorkerResponse::Overloaded
            }
            Verdict::Dishonest(value) => {
                tracing::info!(operations = batch.len(), value, "answering dishonestly");
                WorkerResponse::Result(value)
            }
            Verdict::Honest => {
                let table = self.table.clone();
                let operations = batch.len();
                match tokio::task::spawn_blocking(move || table.evaluate_batch(&batch)).await {
                    Ok(value) => {
                        tracing::debug!(operations, value, "batch evaluated");
                        WorkerResponse::Result(value)
                    }
                    Err(e) => WorkerResponse::Rejected(format!("evaluation failed: {}", e)),
                }
            }
        }
    }
}

#[async_trait]
impl<T, D> RequestHandler for WorkerService<T, D>
where
    T: FunctionTable + 'static,
    D: DrawSource + 'static,
{
    type Request = WorkerRequest;
    type Response = WorkerResponse;

    async fn handle(&self, request: WorkerRequest, peer: SocketAddr) -> WorkerResponse {
        match request {
            WorkerRequest::Authenticate { credentials } => {
                let accepted = self.authenticate(&credentials).await;
                tracing::info!(%peer, username = %credentials.username, accepted, "authentication");
                WorkerResponse::Authenticated(accepted)
            }
            WorkerRequest::Calculate { operations } => self.calculate(&operations).await,
        }
    }
}
