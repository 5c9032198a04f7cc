// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use compute_farm_core::compute_node::ComputeNode;
use compute_farm_core::function_table::{FunctionTable, StandardFunctions};
use compute_farm_core::operation::{Operation, OperationKind};
use compute_farm_core::worker_descriptor::WorkerDescriptor;
use compute_farm_core::worker_pool::{WorkerHandle, WorkerPool};
use std::sync::Arc;

/// Builds a pool whose ids follow the order of `nodes`
pub fn pool_of(nodes: Vec<(usize, Arc<dyn ComputeNode>)>) -> WorkerPool {
    let handles = nodes
        .into_iter()
        .enumerate()
        .map(|(id, (capacity, node))| {
            let descriptor = WorkerDescriptor::new("127.0.0.1", 6000 + id as u16, capacity);
            WorkerHandle::new(id, descriptor, node)
        })
        .collect();
    WorkerPool::new(handles)
}

/// `count` operations alternating between `pell` and `prime`
pub fn sample_operations(count: usize) -> Vec<Operation> {
    (0..count)
        .map(|i| {
            let kind = if i % 2 == 0 {
                OperationKind::Pell
            } else {
                OperationKind::Prime
            };
            Operation::new(kind, (i as u32 * 7) % 50 + 1)
        })
        .collect()
}

/// Aggregate a fully honest run must produce
pub fn expected_aggregate(operations: &[Operation]) -> u32 {
    StandardFunctions.evaluate_batch(operations)
}
