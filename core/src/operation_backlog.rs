// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::dispatch_error::DispatchError;
use crate::operation::{parse_operations, Operation, ParsePolicy};
use std::collections::VecDeque;
use std::path::Path;

/// Ordered slice of the backlog handed to one worker invocation
pub type Batch = Vec<Operation>;

/// Pending operations of a run. Owned by the dispatcher's control loop and
/// never shared with in-flight tasks.
#[derive(Debug, Default, Clone)]
pub struct OperationBacklog {
    pending: VecDeque<Operation>,
}

impl OperationBacklog {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            pending: operations.into(),
        }
    }

    pub fn load(path: &Path, policy: ParsePolicy) -> Result<Self, DispatchError> {
        let text = std::fs::read_to_string(path).map_err(|source| DispatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let operations = parse_operations(&text, policy)?;
        tracing::info!(count = operations.len(), path = %path.display(), "loaded operations");
        Ok(Self::new(operations))
    }

    /// Removes up to `max` operations from the front
    pub fn take_batch(&mut self, max: usize) -> Batch {
        let count = max.min(self.pending.len());
        self.pending.drain(..count).collect()
    }

    /// Returns a failed batch. Position is irrelevant to the aggregate.
    pub fn requeue(&mut self, batch: Batch) {
        self.pending.extend(batch);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
