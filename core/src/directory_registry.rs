// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::credentials::Credentials;
use crate::worker_descriptor::WorkerDescriptor;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct RegistryState {
    dispatcher: Option<Credentials>,
    workers: Vec<WorkerDescriptor>,
}

/// In-memory bookkeeping of the dispatcher credential and known workers
#[derive(Clone, Default)]
pub struct DirectoryRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl DirectoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previously registered dispatcher credential
    pub async fn register_dispatcher(&self, credentials: Credentials) {
        let mut state = self.state.lock().await;
        tracing::info!(username = %credentials.username, "dispatcher registered");
        state.dispatcher = Some(credentials);
    }

    /// A worker re-registering on the same `host:port` replaces its old entry
    pub async fn register_worker(&self, descriptor: WorkerDescriptor) {
        let mut state = self.state.lock().await;
        let endpoint = descriptor.endpoint();

        match state.workers.iter_mut().find(|w| w.endpoint() == endpoint) {
            Some(existing) => {
                tracing::info!(%endpoint, capacity = descriptor.capacity, "worker re-registered");
                *existing = descriptor;
            }
            None => {
                tracing::info!(%endpoint, capacity = descriptor.capacity, "worker registered");
                state.workers.push(descriptor);
            }
        }
    }

    /// Always false until a dispatcher has registered
    pub async fn authenticate(&self, credentials: &Credentials) -> bool {
        let state = self.state.lock().await;
        state
            .dispatcher
            .as_ref()
            .is_some_and(|registered| registered == credentials)
    }

    /// Workers in registration order
    pub async fn list_workers(&self) -> Vec<WorkerDescriptor> {
        self.state.lock().await.workers.clone()
    }
}
