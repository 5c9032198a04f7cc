// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod agreement_policy;
pub mod compute_node;
pub mod config;
pub mod credentials;
pub mod directory_client;
pub mod directory_registry;
pub mod directory_server;
pub mod dispatch_error;
pub mod dispatch_policy;
pub mod dispatcher;
pub mod function_table;
pub mod operation;
pub mod operation_backlog;
pub mod protocol;
pub mod remote_node;
pub mod secure_policy;
pub mod transport;
pub mod worker_behaviour;
pub mod worker_descriptor;
pub mod worker_pool;
pub mod worker_runner;
pub mod worker_service;

/// Every partial result and the final aggregate live in `[0, MODULUS)`.
pub const MODULUS: u32 = 4000;

/// Well-known port of the Directory Service.
pub const DIRECTORY_PORT: u16 = 5000;
