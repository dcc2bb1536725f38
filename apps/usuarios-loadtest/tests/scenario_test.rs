//! Runs the load scenario against the real users router on an ephemeral port

use axum::Router;
use domain_users::{InMemoryUserRepository, UserService, handlers};
use reqwest::Client;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use usuarios_loadtest::metrics;
use usuarios_loadtest::scenario::{GROUP_CREATE, GROUP_LIST, GROUP_VERIFY_DELETED, Scenario};
use usuarios_loadtest::{LoadConfig, Stage, Thresholds, executor};

async fn spawn_server() -> String {
    let service = UserService::new(InMemoryUserRepository::new());
    let app = Router::new().nest("/usuarios", handlers::router(service));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_single_iteration_passes_every_check() {
    let base_url = spawn_server().await;
    let (tx, rx) = mpsc::unbounded_channel();
    let collector = tokio::spawn(metrics::collect(rx));

    let scenario = Scenario::new(Client::new(), &base_url, Some("it".to_string()), 0.0, tx);
    scenario.iteration(1, 0).await;
    scenario.iteration(1, 1).await;
    drop(scenario);

    let summary = collector.await.unwrap().summarize(
        chrono::Utc::now(),
        Duration::from_secs(1),
        &[],
        &Thresholds::default(),
    );

    // create, get, update, list, delete, verify
    assert_eq!(summary.http_reqs, 12);
    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.http_req_failed.hits, 0);
    assert_eq!(summary.checks.hits, summary.checks.total);
    assert_eq!(summary.groups.len(), 6);
    assert_eq!(summary.groups[0].name, GROUP_CREATE);
    assert_eq!(summary.groups[5].name, GROUP_VERIFY_DELETED);
    assert!(summary.passed());
}

#[tokio::test]
async fn test_unreachable_server_fails_checks_and_thresholds() {
    // Bind then drop so nothing listens on the port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let (tx, rx) = mpsc::unbounded_channel();
    let collector = tokio::spawn(metrics::collect(rx));

    let scenario = Scenario::new(Client::new(), &base_url, None, 0.0, tx);
    scenario.iteration(1, 0).await;
    drop(scenario);

    let summary = collector.await.unwrap().summarize(
        chrono::Utc::now(),
        Duration::from_secs(1),
        &[],
        &Thresholds::default(),
    );

    // Only create and list run when no user id comes back
    assert_eq!(summary.http_reqs, 2);
    assert_eq!(summary.http_req_failed.hits, 2);
    assert_eq!(summary.checks.hits, 0);
    let groups: Vec<_> = summary.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(groups, vec![GROUP_CREATE, GROUP_LIST]);
    assert!(!summary.passed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_short_ramp_against_live_server() {
    let base_url = spawn_server().await;
    let config = LoadConfig {
        base_url,
        stages: vec![
            Stage::new(Duration::from_millis(300), 3),
            Stage::new(Duration::from_millis(300), 3),
            Stage::new(Duration::from_millis(200), 0),
        ],
        think_scale: 0.0,
        thresholds: Thresholds::default(),
        run_tag: Some("ramp".to_string()),
    };

    let summary = executor::run(&config).await.unwrap();

    assert!(summary.iterations > 0);
    assert!(summary.vus_max <= 3);
    assert_eq!(summary.http_req_failed.hits, 0);
    assert_eq!(summary.checks.hits, summary.checks.total);
    assert!(summary.duration_secs >= 0.8);
    assert_eq!(summary.stages.len(), 3);
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_running() {
    let config = LoadConfig {
        stages: Vec::new(),
        ..LoadConfig::default()
    };
    assert!(executor::run(&config).await.is_err());
}
