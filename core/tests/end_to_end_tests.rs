// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use compute_farm_core::config::{DispatcherConfig, WorkerConfig};
use compute_farm_core::credentials::Credentials;
use compute_farm_core::directory_client::DirectoryClient;
use compute_farm_core::directory_registry::DirectoryRegistry;
use compute_farm_core::directory_server::DirectoryServer;
use compute_farm_core::dispatch_error::DispatchError;
use compute_farm_core::dispatch_policy::PolicyKind;
use compute_farm_core::dispatcher::Dispatcher;
use compute_farm_core::function_table::StandardFunctions;
use compute_farm_core::operation::{parse_operations, ParsePolicy};
use compute_farm_core::operation_backlog::OperationBacklog;
use compute_farm_core::protocol::{WorkerRequest, WorkerResponse};
use compute_farm_core::transport::call;
use compute_farm_core::worker_behaviour::ThreadDraws;
use compute_farm_core::worker_descriptor::WorkerDescriptor;
use compute_farm_core::worker_runner::{WorkerRunner, WorkerState};
use compute_farm_core::MODULUS;
use std::net::{Ipv4Addr, SocketAddr};
use tokio_util::sync::CancellationToken;

const EXAMPLE: &str = "pell 3\nprime 7\npell 5\n";

async fn start_directory(cancel: &CancellationToken) -> SocketAddr {
    let server = DirectoryServer::bind(
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        DirectoryRegistry::new(),
    )
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run(cancel.clone()));
    addr
}

/// Binds a worker on an ephemeral port and registers it with `directory`
async fn start_worker(
    directory: SocketAddr,
    capacity: usize,
    cancel: &CancellationToken,
) -> SocketAddr {
    let mut config = WorkerConfig::new(capacity, 0.0, 0);
    config.directory_addr = directory;
    let mut runner = WorkerRunner::bind(config, StandardFunctions, ThreadDraws)
        .await
        .unwrap();
    runner.register().await.unwrap();
    let port = runner.local_addr().unwrap().port();
    tokio::spawn(runner.run(cancel.clone()));
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

fn dispatcher_config(directory: SocketAddr) -> DispatcherConfig {
    DispatcherConfig {
        directory_addr: directory,
        seed: Some(5),
        ..DispatcherConfig::default()
    }
}

async fn run_example(kind: PolicyKind, workers: usize) -> u32 {
    let cancel = CancellationToken::new();
    let directory = start_directory(&cancel).await;
    for _ in 0..workers {
        start_worker(directory, 10, &cancel).await;
    }

    let config = dispatcher_config(directory);
    let client = DirectoryClient::new(directory);
    let mut dispatcher = Dispatcher::bootstrap(config, &client).await.unwrap();
    assert_eq!(dispatcher.workers().len(), workers);

    let mut backlog =
        OperationBacklog::new(parse_operations(EXAMPLE, ParsePolicy::Strict).unwrap());
    let mut policy = dispatcher.policy(kind);
    let report = dispatcher
        .run(policy.as_mut(), &mut backlog)
        .await
        .unwrap();

    cancel.cancel();
    report.aggregate
}

#[tokio::test]
async fn test_secure_run_over_loopback() {
    // Act
    let aggregate = run_example(PolicyKind::Secure, 1).await;

    // Assert
    assert_eq!(aggregate, 41);
}

#[tokio::test]
async fn test_agreement_run_over_loopback() {
    // Act
    let aggregate = run_example(PolicyKind::Agreement, 3).await;

    // Assert
    assert_eq!(aggregate, 41);
}

#[tokio::test]
async fn test_bootstrap_fails_without_directory() {
    // Arrange
    let addr = {
        let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        listener.local_addr().unwrap()
    };

    // Act
    let result = Dispatcher::bootstrap(dispatcher_config(addr), &DirectoryClient::new(addr)).await;

    // Assert
    assert!(matches!(result, Err(DispatchError::Directory(_))));
}

#[tokio::test]
async fn test_worker_from_foreign_directory_is_excluded() {
    // Arrange: the second worker checks credentials against another directory
    let cancel = CancellationToken::new();
    let home = start_directory(&cancel).await;
    let foreign = start_directory(&cancel).await;
    start_worker(home, 4, &cancel).await;
    let stranger = start_worker(foreign, 4, &cancel).await;

    let descriptor = WorkerDescriptor::new(
        "127.0.0.1",
        stranger.port(),
        4,
    );
    DirectoryClient::new(home)
        .register_worker(&descriptor)
        .await
        .unwrap();

    // Act
    let dispatcher =
        Dispatcher::bootstrap(dispatcher_config(home), &DirectoryClient::new(home)).await;

    // Assert
    let dispatcher = dispatcher.unwrap();
    assert_eq!(dispatcher.workers().len(), 1);
    cancel.cancel();
}

#[tokio::test]
async fn test_worker_state_follows_registration() {
    // Arrange
    let cancel = CancellationToken::new();
    let directory = start_directory(&cancel).await;
    let mut config = WorkerConfig::new(3, 0.0, 0);
    config.directory_addr = directory;
    let mut runner = WorkerRunner::bind(config, StandardFunctions, ThreadDraws)
        .await
        .unwrap();
    assert_eq!(runner.state(), WorkerState::Unregistered);

    // Act
    runner.register().await.unwrap();

    // Assert
    assert_eq!(runner.state(), WorkerState::Registered);
    let listed = DirectoryClient::new(directory).list_workers().await.unwrap();
    assert_eq!(listed, vec![runner.descriptor().unwrap()]);
    cancel.cancel();
}

#[tokio::test]
async fn test_worker_rejects_malformed_batch() {
    // Arrange
    let cancel = CancellationToken::new();
    let directory = start_directory(&cancel).await;
    let worker = start_worker(directory, 10, &cancel).await;
    let request = WorkerRequest::Calculate {
        operations: vec!["pell 3".to_string(), "sqrt 9".to_string()],
    };

    // Act
    let response: WorkerResponse = call(worker, &request, None).await.unwrap();

    // Assert
    assert!(matches!(response, WorkerResponse::Rejected(_)));
    cancel.cancel();
}

#[tokio::test]
async fn test_worker_refuses_batch_beyond_hard_ceiling() {
    // Arrange
    let cancel = CancellationToken::new();
    let directory = start_directory(&cancel).await;
    let worker = start_worker(directory, 10, &cancel).await;
    let request = WorkerRequest::Calculate {
        operations: vec!["pell 1".to_string(); 51],
    };

    // Act
    let response: WorkerResponse = call(worker, &request, None).await.unwrap();

    // Assert
    assert_eq!(response, WorkerResponse::Overloaded);
    cancel.cancel();
}

#[tokio::test]
async fn test_worker_relays_authentication_to_directory() {
    // Arrange
    let cancel = CancellationToken::new();
    let directory = start_directory(&cancel).await;
    let worker = start_worker(directory, 10, &cancel).await;
    let credentials = Credentials::new("dispatcher", "secret");
    DirectoryClient::new(directory)
        .register_dispatcher(&credentials)
        .await
        .unwrap();

    // Act
    let good: WorkerResponse = call(
        worker,
        &WorkerRequest::Authenticate {
            credentials: credentials.clone(),
        },
        None,
    )
    .await
    .unwrap();
    let bad: WorkerResponse = call(
        worker,
        &WorkerRequest::Authenticate {
            credentials: Credentials::new("dispatcher", "guess"),
        },
        None,
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(good, WorkerResponse::Authenticated(true));
    assert_eq!(bad, WorkerResponse::Authenticated(false));
    cancel.cancel();
}

#[tokio::test]
async fn test_honest_worker_answers_repeated_batch_identically() {
    // Arrange
    let cancel = CancellationToken::new();
    let directory = start_directory(&cancel).await;
    let worker = start_worker(directory, 10, &cancel).await;
    let request = WorkerRequest::Calculate {
        operations: vec![
            "pell 40".to_string(),
            "prime 9000".to_string(),
            "pell 3".to_string(),
            "prime 7".to_string(),
        ],
    };

    // Act
    let mut responses = Vec::new();
    for _ in 0..5 {
        let response: WorkerResponse = call(worker, &request, None).await.unwrap();
        responses.push(response);
    }

    // Assert
    let WorkerResponse::Result(first) = responses[0] else {
        panic!("expected a result, got {:?}", responses[0]);
    };
    assert!(first < MODULUS);
    assert!(responses.iter().all(|r| *r == WorkerResponse::Result(first)));
    cancel.cancel();
}
