// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use compute_farm_core::agreement_policy::{validate_batch, Acceptance};
use compute_farm_core::compute_node::ComputeNode;
use compute_farm_core::config::DispatcherConfig;
use compute_farm_core::dispatch_error::DispatchError;
use compute_farm_core::dispatch_policy::PolicyKind;
use compute_farm_core::dispatcher::Dispatcher;
use compute_farm_core::operation::{Operation, OperationKind};
use compute_farm_core::operation_backlog::OperationBacklog;
use compute_farm_sim::in_memory_node::{InMemoryNode, NodeBehaviour};
use compute_farm_sim::test_pool::{expected_aggregate, pool_of, sample_operations};
use std::sync::Arc;
use tokio::sync::Semaphore;

// pell(3) = 5, so any other value marks a fabricated answer
const FABRICATED: u32 = 4001;

fn node(behaviour: NodeBehaviour) -> Arc<InMemoryNode> {
    Arc::new(InMemoryNode::new(behaviour))
}

fn as_compute(node: &Arc<InMemoryNode>) -> Arc<dyn ComputeNode> {
    node.clone()
}

fn pell_three() -> Vec<Operation> {
    vec![Operation::new(OperationKind::Pell, 3)]
}

fn seeded_config(seed: u64) -> DispatcherConfig {
    DispatcherConfig {
        seed: Some(seed),
        ..DispatcherConfig::default()
    }
}

#[tokio::test]
async fn test_agreement_reached_after_dishonest_first_answer() {
    // Arrange
    let dishonest = node(NodeBehaviour::Constant(FABRICATED));
    let pool = pool_of(vec![
        (5, as_compute(&dishonest)),
        (5, as_compute(&node(NodeBehaviour::Honest))),
        (5, as_compute(&node(NodeBehaviour::Honest))),
    ]);
    let limiter = Semaphore::new(8);

    // Act
    let validation = validate_batch(&pell_three(), pool.handles(), &limiter).await;

    // Assert
    assert_eq!(validation.accepted, Some(Acceptance::Agreed(5)));
    assert_eq!(validation.calls, 3);
    assert_eq!(dishonest.calls(), 1);
    assert!(validation.unreachable.is_empty());
}

#[tokio::test]
async fn test_agreement_stops_at_first_matching_pair() {
    // Arrange
    let dishonest = node(NodeBehaviour::Constant(FABRICATED));
    let pool = pool_of(vec![
        (5, as_compute(&node(NodeBehaviour::Honest))),
        (5, as_compute(&node(NodeBehaviour::Honest))),
        (5, as_compute(&dishonest)),
    ]);
    let limiter = Semaphore::new(8);

    // Act
    let validation = validate_batch(&pell_three(), pool.handles(), &limiter).await;

    // Assert
    assert_eq!(validation.accepted, Some(Acceptance::Agreed(5)));
    assert_eq!(validation.calls, 2);
    assert_eq!(dishonest.calls(), 0);
}

#[tokio::test]
async fn test_single_worker_result_is_accepted_unconfirmed() {
    // Arrange
    let pool = pool_of(vec![(5, as_compute(&node(NodeBehaviour::Constant(FABRICATED))))]);
    let limiter = Semaphore::new(8);

    // Act
    let validation = validate_batch(&pell_three(), pool.handles(), &limiter).await;

    // Assert
    assert_eq!(validation.accepted, Some(Acceptance::FirstResult(FABRICATED)));
    assert_eq!(validation.calls, 1);
}

#[tokio::test]
async fn test_total_disagreement_keeps_first_value() {
    // Arrange
    let pool = pool_of(vec![
        (5, as_compute(&node(NodeBehaviour::Constant(1)))),
        (5, as_compute(&node(NodeBehaviour::Constant(2)))),
        (5, as_compute(&node(NodeBehaviour::Constant(3)))),
    ]);
    let limiter = Semaphore::new(8);

    // Act
    let validation = validate_batch(&pell_three(), pool.handles(), &limiter).await;

    // Assert
    assert_eq!(validation.accepted, Some(Acceptance::FirstResult(1)));
    assert_eq!(validation.calls, 3);
}

#[tokio::test]
async fn test_failed_attempts_contribute_no_value() {
    // Arrange
    let pool = pool_of(vec![
        (5, as_compute(&node(NodeBehaviour::Unreachable))),
        (5, as_compute(&node(NodeBehaviour::AlwaysOverloaded))),
        (5, as_compute(&node(NodeBehaviour::Honest))),
    ]);
    let limiter = Semaphore::new(8);

    // Act
    let validation = validate_batch(&pell_three(), pool.handles(), &limiter).await;

    // Assert
    assert_eq!(validation.accepted, Some(Acceptance::FirstResult(5)));
    assert_eq!(validation.unreachable, vec![0]);
    assert_eq!(validation.calls, 3);
}

#[tokio::test]
async fn test_every_attempt_failing_accepts_nothing() {
    // Arrange
    let pool = pool_of(vec![
        (5, as_compute(&node(NodeBehaviour::Unreachable))),
        (5, as_compute(&node(NodeBehaviour::AlwaysOverloaded))),
    ]);
    let limiter = Semaphore::new(8);

    // Act
    let validation = validate_batch(&pell_three(), pool.handles(), &limiter).await;

    // Assert
    assert_eq!(validation.accepted, None);
    assert_eq!(validation.unreachable, vec![0]);
}

#[tokio::test]
async fn test_honest_majority_outvotes_dishonest_worker() {
    // Arrange
    let operations = sample_operations(30);
    let expected = expected_aggregate(&operations);
    let first = node(NodeBehaviour::Honest);
    let dishonest = node(NodeBehaviour::Constant(FABRICATED));
    let second = node(NodeBehaviour::Honest);
    let pool = pool_of(vec![
        (4, as_compute(&first)),
        (6, as_compute(&dishonest)),
        (5, as_compute(&second)),
    ]);
    let mut backlog = OperationBacklog::new(operations);
    let mut dispatcher = Dispatcher::new(seeded_config(7), pool);
    let mut policy = dispatcher.policy(PolicyKind::Agreement);

    // Act
    let report = dispatcher.run(policy.as_mut(), &mut backlog).await.unwrap();

    // Assert: batches are capped by the smallest declared capacity
    assert_eq!(report.aggregate, expected);
    assert_eq!(report.batches_accepted, 8);
    for worker in [&first, &dishonest, &second] {
        assert!(worker.batch_sizes().iter().all(|&size| size <= 4));
    }
}

#[tokio::test]
async fn test_unreachable_worker_is_removed() {
    // Arrange: with two workers both are always consulted
    let operations = sample_operations(12);
    let expected = expected_aggregate(&operations);
    let down = node(NodeBehaviour::Unreachable);
    let pool = pool_of(vec![
        (3, as_compute(&down)),
        (3, as_compute(&node(NodeBehaviour::Honest))),
    ]);
    let mut backlog = OperationBacklog::new(operations);
    let mut dispatcher = Dispatcher::new(seeded_config(1), pool);
    let mut policy = dispatcher.policy(PolicyKind::Agreement);

    // Act
    let report = dispatcher.run(policy.as_mut(), &mut backlog).await.unwrap();

    // Assert
    assert_eq!(report.aggregate, expected);
    assert_eq!(report.workers_lost, 1);
    assert_eq!(dispatcher.workers().len(), 1);
    assert_eq!(down.calls(), 4);
}

#[tokio::test]
async fn test_permanently_overloaded_pool_stalls() {
    // Arrange
    let config = DispatcherConfig {
        stall_round_limit: 2,
        ..seeded_config(3)
    };
    let pool = pool_of(vec![(2, as_compute(&node(NodeBehaviour::AlwaysOverloaded)))]);
    let mut backlog = OperationBacklog::new(sample_operations(5));
    let mut dispatcher = Dispatcher::new(config, pool);
    let mut policy = dispatcher.policy(PolicyKind::Agreement);

    // Act
    let result = dispatcher.run(policy.as_mut(), &mut backlog).await;

    // Assert
    assert!(matches!(result, Err(DispatchError::Stalled { rounds: 2 })));
    assert_eq!(backlog.len(), 5);
}

#[tokio::test]
async fn test_batch_ceiling_survives_worker_loss() {
    // Arrange
    let honest = node(NodeBehaviour::Honest);
    let pool = pool_of(vec![
        (2, as_compute(&node(NodeBehaviour::Unreachable))),
        (6, as_compute(&honest)),
    ]);
    let mut dispatcher = Dispatcher::new(seeded_config(11), pool);
    let mut first_backlog = OperationBacklog::new(sample_operations(6));
    let mut policy = dispatcher.policy(PolicyKind::Agreement);
    dispatcher
        .run(policy.as_mut(), &mut first_backlog)
        .await
        .unwrap();

    // Act
    let mut second_backlog = OperationBacklog::new(sample_operations(6));
    let mut policy = dispatcher.policy(PolicyKind::Agreement);
    dispatcher
        .run(policy.as_mut(), &mut second_backlog)
        .await
        .unwrap();

    // Assert
    assert_eq!(dispatcher.workers().len(), 1);
    assert_eq!(honest.batch_sizes().len(), 6);
    assert!(honest.batch_sizes().iter().all(|&size| size == 2));
}
