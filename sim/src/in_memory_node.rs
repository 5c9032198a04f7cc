// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use compute_farm_core::compute_node::ComputeNode;
use compute_farm_core::credentials::Credentials;
use compute_farm_core::dispatch_error::CallError;
use compute_farm_core::function_table::{FunctionTable, StandardFunctions};
use compute_farm_core::operation::Operation;
use compute_farm_core::worker_behaviour::{decide, BehaviourProfile, DrawSource, Verdict};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// How an in-memory node answers `calculate`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeBehaviour {
    Honest,
    /// Always answers this value, whatever the batch
    Constant(u32),
    /// Refuses every non-empty batch
    AlwaysOverloaded,
    /// Refuses the first `n` calls, then answers honestly
    OverloadedFor(usize),
    /// Every call fails at the transport level
    Unreachable,
    /// Answers honestly for `n` calls, then becomes unreachable
    UnreachableAfter(usize),
}

/// Worker double living in the test process
pub struct InMemoryNode {
    behaviour: NodeBehaviour,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl InMemoryNode {
    pub fn new(behaviour: NodeBehaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Sizes of every batch this node received, in call order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComputeNode for InMemoryNode {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<bool, CallError> {
        match self.behaviour {
            NodeBehaviour::Unreachable => Err(CallError::Unreachable("in-memory node down".into())),
            _ => Ok(true),
        }
    }

    async fn calculate(&self, batch: &[Operation]) -> Result<u32, CallError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(batch.len());
        tokio::task::yield_now().await;

        let honest = || Ok(StandardFunctions.evaluate_batch(batch));
        match self.behaviour {
            NodeBehaviour::Honest => honest(),
            NodeBehaviour::Constant(value) => Ok(value),
            NodeBehaviour::AlwaysOverloaded if !batch.is_empty() => Err(CallError::Overloaded),
            NodeBehaviour::AlwaysOverloaded => honest(),
            NodeBehaviour::OverloadedFor(n) if call < n => Err(CallError::Overloaded),
            NodeBehaviour::OverloadedFor(_) => honest(),
            NodeBehaviour::Unreachable => Err(CallError::Unreachable("in-memory node down".into())),
            NodeBehaviour::UnreachableAfter(n) if call >= n => {
                Err(CallError::Unreachable("in-memory node crashed".into()))
            }
            NodeBehaviour::UnreachableAfter(_) => honest(),
        }
    }
}

/// Applies the worker's overload / dishonesty decision in-process, the way a
/// real worker does, with an injected draw source.
pub struct SimulatedNode<D> {
    profile: BehaviourProfile,
    draws: Mutex<D>,
}

impl<D: DrawSource> SimulatedNode<D> {
    pub fn new(profile: BehaviourProfile, draws: D) -> Self {
        Self {
            profile,
            draws: Mutex::new(draws),
        }
    }
}

#[async_trait]
impl<D: DrawSource + 'static> ComputeNode for SimulatedNode<D> {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<bool, CallError> {
        Ok(true)
    }

    async fn calculate(&self, batch: &[Operation]) -> Result<u32, CallError> {
        let verdict = {
            let mut draws = self.draws.lock().unwrap();
            decide(batch.len(), &self.profile, &mut *draws)
        };
        match verdict {
            Verdict::Overloaded => Err(CallError::Overloaded),
            Verdict::Dishonest(value) => Ok(value),
            Verdict::Honest => Ok(StandardFunctions.evaluate_batch(batch)),
        }
    }
}
