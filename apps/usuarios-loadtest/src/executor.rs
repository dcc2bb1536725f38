//! Ramping-VU executor
//!
//! One tokio task per VU up to the highest stage target. A controller ticks
//! every [`TICK`], recomputes the target from the stage profile and publishes
//! it on a `watch` channel. VU `n` runs iterations while the target is at
//! least `n`; when the target drops below it the VU finishes its current
//! iteration and parks.

use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{LoadConfig, target_at};
use crate::error::LoadTestResult;
use crate::metrics::{self, Sample, Summary};
use crate::scenario::Scenario;

pub const TICK: Duration = Duration::from_millis(100);

/// How long running iterations may take to finish after the last stage ends
pub const GRACEFUL_STOP: Duration = Duration::from_secs(30);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs the whole stage profile against `config.base_url`.
pub async fn run(config: &LoadConfig) -> LoadTestResult<Summary> {
    config.validate()?;

    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let (sample_tx, sample_rx) = mpsc::unbounded_channel();
    let collector = tokio::spawn(metrics::collect(sample_rx));

    let scenario = Arc::new(Scenario::new(
        client,
        &config.base_url,
        config.run_tag.clone(),
        config.think_scale,
        sample_tx.clone(),
    ));

    let vus_max = config.max_vus();
    let (target_tx, target_rx) = watch::channel(0u32);
    let active = Arc::new(AtomicU32::new(0));

    info!(
        base_url = %config.base_url,
        vus_max,
        duration = ?config.total_duration(),
        run_tag = config.run_tag.as_deref().unwrap_or("-"),
        "Starting load test"
    );

    let mut handles: Vec<JoinHandle<()>> = (1..=vus_max)
        .map(|vu| {
            tokio::spawn(vu_loop(
                vu,
                scenario.clone(),
                target_rx.clone(),
                active.clone(),
            ))
        })
        .collect();
    drop(target_rx);
    drop(scenario);

    let started_at = Utc::now();
    let started = Instant::now();
    let mut ticker = tokio::time::interval(TICK);

    loop {
        ticker.tick().await;
        let Some(target) = target_at(&config.stages, started.elapsed()) else {
            break;
        };

        target_tx.send_if_modified(|current| {
            if *current == target {
                return false;
            }
            debug!(from = *current, to = target, "Adjusting VUs");
            *current = target;
            true
        });
        let _ = sample_tx.send(Sample::Vus(active.load(Ordering::Relaxed)));
    }

    info!("All stages complete, waiting for running iterations");
    target_tx.send_replace(0);
    drop(target_tx);

    let drained = tokio::time::timeout(GRACEFUL_STOP, async {
        for handle in handles.iter_mut() {
            let _ = handle.await;
        }
    })
    .await;
    if drained.is_err() {
        warn!(
            "Iterations still running after {:?}, interrupting",
            GRACEFUL_STOP
        );
        for handle in &handles {
            handle.abort();
        }
    }

    let elapsed = started.elapsed();
    drop(sample_tx);
    let metrics = collector.await?;

    info!(elapsed = ?elapsed, "Load test finished");
    Ok(metrics.summarize(started_at, elapsed, &config.stages, &config.thresholds))
}

/// Runs iterations for VU `vu` (1-based) for as long as the target allows.
async fn vu_loop(
    vu: u32,
    scenario: Arc<Scenario>,
    mut target: watch::Receiver<u32>,
    active: Arc<AtomicU32>,
) {
    let mut iter = 0u64;

    loop {
        loop {
            let current = *target.borrow_and_update();
            if current >= vu {
                break;
            }
            if target.changed().await.is_err() {
                return;
            }
        }

        active.fetch_add(1, Ordering::Relaxed);
        scenario.iteration(vu, iter).await;
        active.fetch_sub(1, Ordering::Relaxed);
        iter += 1;
    }
}
