//! Integration Tests for Load Generation
//!
//! Runs short load phases over real HTTP against a server bound to an
//! ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use stampede_cache::api::create_router;
use stampede_cache::loadgen::{run_phase, KeyPattern, LoadClient, Phase};
use stampede_cache::{AppState, Config, Mode};

// == Helper Functions ==

async fn spawn_server(mode: Mode, latency_ms: u64) -> Arc<LoadClient> {
    let config = Config {
        mode,
        capacity: 1_000,
        ttl_millis: 60_000,
        backend_latency_ms: latency_ms,
        refresh_workers: 8,
        server_port: 0,
    };
    let app = create_router(AppState::from_config(&config).unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Arc::new(LoadClient::new(format!("http://{addr}")).unwrap())
}

// == Scenario Tests ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_herd_under_coalescing_reaches_backend_once() {
    let client = spawn_server(Mode::M2, 50).await;
    let pattern = Arc::new(KeyPattern::single("hot-key-stampede"));

    let report = run_phase(
        Arc::clone(&client),
        pattern,
        Phase::new(16, Duration::from_millis(300)),
    )
    .await;

    assert_eq!(report.errors(), 0);
    assert!(report.requests() >= 16);
    assert_eq!(client.backend_requests().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bypass_mode_sends_every_request_to_backend() {
    let client = spawn_server(Mode::M1, 0).await;
    let message = client.configure(Mode::M0, 100, 1_000, 0).await.unwrap();
    assert!(message.contains("M0"));

    let pattern = Arc::new(KeyPattern::hot_cold(1_000, 10, 0.8).unwrap());
    let report = run_phase(
        Arc::clone(&client),
        pattern,
        Phase::new(4, Duration::from_millis(200)),
    )
    .await;

    assert_eq!(report.errors(), 0);
    assert!(report.requests() > 0);
    assert_eq!(client.backend_requests().await.unwrap(), report.requests());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reset_zeroes_backend_counter() {
    let client = spawn_server(Mode::M4, 0).await;
    let pattern = Arc::new(KeyPattern::scan_mix(5, 0.5).unwrap());

    run_phase(
        Arc::clone(&client),
        pattern,
        Phase::new(2, Duration::from_millis(100)),
    )
    .await;
    assert!(client.backend_requests().await.unwrap() > 0);

    client.reset().await.unwrap();
    assert_eq!(client.backend_requests().await.unwrap(), 0);
}

#[tokio::test]
async fn test_configure_rejects_zero_capacity() {
    let client = spawn_server(Mode::M1, 0).await;
    assert!(client.configure(Mode::M2, 0, 1_000, 0).await.is_err());
}

#[tokio::test]
async fn test_unreachable_server_counts_errors() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Arc::new(LoadClient::new(format!("http://{addr}")).unwrap());
    let report = run_phase(
        client,
        Arc::new(KeyPattern::single("k")),
        Phase::new(2, Duration::from_millis(50)),
    )
    .await;

    assert_eq!(report.requests(), 0);
    assert!(report.errors() > 0);
}
