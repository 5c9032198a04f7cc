// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::compute_node::ComputeNode;
use crate::worker_descriptor::WorkerDescriptor;
use std::sync::Arc;

/// Binding of a registered worker to a live node
#[derive(Clone)]
pub struct WorkerHandle {
    pub id: usize,
    pub descriptor: WorkerDescriptor,
    pub node: Arc<dyn ComputeNode>,
}

impl WorkerHandle {
    pub fn new(id: usize, descriptor: WorkerDescriptor, node: Arc<dyn ComputeNode>) -> Self {
        Self {
            id,
            descriptor,
            node,
        }
    }

    pub fn capacity(&self) -> usize {
        self.descriptor.capacity
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("endpoint", &self.descriptor.endpoint())
            .field("capacity", &self.descriptor.capacity)
            .finish()
    }
}

/// Live workers of a run, in a fixed order. Handles are only ever removed.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    handles: Vec<WorkerHandle>,
}

impl WorkerPool {
    pub fn new(handles: Vec<WorkerHandle>) -> Self {
        Self { handles }
    }

    pub fn push(&mut self, handle: WorkerHandle) {
        self.handles.push(handle);
    }

    /// Returns the removed handle, `None` if it was already gone
    pub fn remove(&mut self, id: usize) -> Option<WorkerHandle> {
        let position = self.handles.iter().position(|h| h.id == id)?;
        Some(self.handles.remove(position))
    }

    pub fn handles(&self) -> &[WorkerHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn min_capacity(&self) -> Option<usize> {
        self.handles.iter().map(WorkerHandle::capacity).min()
    }
}
