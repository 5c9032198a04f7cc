// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::operation::MalformedOperation;
use crate::transport::TransportError;
use std::path::PathBuf;
use thiserror::Error;

/// Outcome of a single failed `calculate` call against one worker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The worker refused the batch. It stays eligible.
    #[error("worker overloaded")]
    Overloaded,

    /// Transport failure or protocol violation. The worker is dropped for the run.
    #[error("worker unreachable: {0}")]
    Unreachable(String),
}

impl From<TransportError> for CallError {
    fn from(e: TransportError) -> Self {
        CallError::Unreachable(e.to_string())
    }
}

/// Run-level failures. Each one terminates the run without an aggregate.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no workers available ({remaining} operations left in the backlog)")]
    NoWorkersAvailable { remaining: usize },

    #[error("directory service rejected the credentials of '{0}'")]
    Authentication(String),

    #[error("directory service unavailable: {0}")]
    Directory(#[from] TransportError),

    #[error("no batch accepted in {rounds} consecutive rounds")]
    Stalled { rounds: usize },

    #[error(transparent)]
    Malformed(#[from] MalformedOperation),

    #[error("cannot read operations file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
