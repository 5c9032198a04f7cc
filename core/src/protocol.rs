// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::credentials::Credentials;
use crate::worker_descriptor::WorkerDescriptor;
use serde::{Deserialize, Serialize};

/// Messages accepted by the directory service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DirectoryRequest {
    RegisterDispatcher { credentials: Credentials },
    RegisterWorker { descriptor: WorkerDescriptor },
    Authenticate { credentials: Credentials },
    ListWorkers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DirectoryResponse {
    Registered,
    Authenticated(bool),
    Workers(Vec<WorkerDescriptor>),
}

/// Messages accepted by a worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkerRequest {
    Authenticate { credentials: Credentials },
    /// Operations in wire form, `<kind> <parameter>`
    Calculate { operations: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkerResponse {
    Authenticated(bool),
    Result(u32),
    Overloaded,
    /// The batch could not be parsed
    Rejected(String),
}
