//! Sample collection, aggregation and the end-of-test summary

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::{Stage, Thresholds};

/// A single measurement emitted by a VU or by the executor
#[derive(Clone, Debug)]
pub enum Sample {
    /// One HTTP request; `failed` when the transport failed or the status was unexpected
    Request { duration: Duration, failed: bool },
    Check {
        group: &'static str,
        name: &'static str,
        passed: bool,
    },
    Iteration { duration: Duration },
    /// Number of VUs currently running an iteration
    Vus(u32),
}

/// Raw values of a trend metric, in milliseconds
#[derive(Clone, Debug, Default)]
pub struct Trend {
    values: Vec<f64>,
}

impl Trend {
    pub fn add(&mut self, duration: Duration) {
        self.values.push(duration.as_secs_f64() * 1000.0);
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn stats(&self) -> TrendStats {
        if self.values.is_empty() {
            return TrendStats::default();
        }

        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);

        TrendStats {
            avg: sorted.iter().sum::<f64>() / sorted.len() as f64,
            min: sorted[0],
            med: percentile(&sorted, 50.0),
            max: sorted[sorted.len() - 1],
            p90: percentile(&sorted, 90.0),
            p95: percentile(&sorted, 95.0),
        }
    }
}

/// Linear interpolation between the closest ranks; `sorted` must be non-empty.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TrendStats {
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub max: f64,
    pub p90: f64,
    pub p95: f64,
}

/// Fraction of samples that were "true" (a passed check, a failed request)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Rate {
    pub hits: u64,
    pub total: u64,
}

impl Rate {
    pub fn add(&mut self, hit: bool) {
        self.total += 1;
        if hit {
            self.hits += 1;
        }
    }

    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }
}

/// Aggregated state of a run, built by [`collect`]
#[derive(Debug, Default)]
pub struct Metrics {
    pub http_req_duration: Trend,
    pub http_req_failed: Rate,
    pub checks: Rate,
    pub iteration_duration: Trend,
    pub vus: u32,
    pub vus_max: u32,
    /// Per-group check tallies in first-seen order
    groups: Vec<(&'static str, Vec<(&'static str, Rate)>)>,
}

impl Metrics {
    pub fn record(&mut self, sample: Sample) {
        match sample {
            Sample::Request { duration, failed } => {
                self.http_req_duration.add(duration);
                self.http_req_failed.add(failed);
            }
            Sample::Check {
                group,
                name,
                passed,
            } => {
                self.checks.add(passed);
                self.check_rate(group, name).add(passed);
            }
            Sample::Iteration { duration } => self.iteration_duration.add(duration),
            Sample::Vus(active) => {
                self.vus = active;
                self.vus_max = self.vus_max.max(active);
            }
        }
    }

    fn check_rate(&mut self, group: &'static str, name: &'static str) -> &mut Rate {
        let group_index = match self.groups.iter().position(|(g, _)| *g == group) {
            Some(index) => index,
            None => {
                self.groups.push((group, Vec::new()));
                self.groups.len() - 1
            }
        };
        let checks = &mut self.groups[group_index].1;

        let check_index = match checks.iter().position(|(n, _)| *n == name) {
            Some(index) => index,
            None => {
                checks.push((name, Rate::default()));
                checks.len() - 1
            }
        };
        &mut checks[check_index].1
    }

    pub fn summarize(
        &self,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        stages: &[Stage],
        thresholds: &Thresholds,
    ) -> Summary {
        let http_req_duration = self.http_req_duration.stats();
        let http_reqs = self.http_req_duration.count() as u64;
        let elapsed_secs = elapsed.as_secs_f64();

        Summary {
            started_at,
            duration_secs: elapsed_secs,
            stages: stages.to_vec(),
            http_reqs,
            http_reqs_per_sec: if elapsed_secs > 0.0 {
                http_reqs as f64 / elapsed_secs
            } else {
                0.0
            },
            thresholds: thresholds.evaluate(
                &http_req_duration,
                self.http_req_failed.rate(),
                self.checks.rate(),
            ),
            http_req_duration,
            http_req_failed: self.http_req_failed,
            checks: self.checks,
            iterations: self.iteration_duration.count() as u64,
            iteration_duration: self.iteration_duration.stats(),
            vus_max: self.vus_max,
            groups: self
                .groups
                .iter()
                .map(|(group, checks)| GroupSummary {
                    name: group.to_string(),
                    checks: checks
                        .iter()
                        .map(|(name, rate)| CheckSummary {
                            name: name.to_string(),
                            passes: rate.hits,
                            fails: rate.total - rate.hits,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Drains samples until every sender is dropped
pub async fn collect(mut samples: mpsc::UnboundedReceiver<Sample>) -> Metrics {
    let mut metrics = Metrics::default();
    while let Some(sample) = samples.recv().await {
        metrics.record(sample);
    }
    metrics
}

impl Thresholds {
    pub fn evaluate(
        &self,
        http_req_duration: &TrendStats,
        failed_rate: f64,
        checks_rate: f64,
    ) -> Vec<ThresholdResult> {
        vec![
            ThresholdResult {
                metric: "http_req_duration".to_string(),
                condition: format!("p(95)<{}", self.p95_ms),
                observed: http_req_duration.p95,
                passed: http_req_duration.p95 < self.p95_ms,
            },
            ThresholdResult {
                metric: "http_req_failed".to_string(),
                condition: format!("rate<{}", self.max_failed_rate),
                observed: failed_rate,
                passed: failed_rate < self.max_failed_rate,
            },
            ThresholdResult {
                metric: "checks".to_string(),
                condition: format!("rate>{}", self.min_checks_rate),
                observed: checks_rate,
                passed: checks_rate > self.min_checks_rate,
            },
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub condition: String,
    pub observed: f64,
    pub passed: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub checks: Vec<CheckSummary>,
}

/// End-of-test report, printed to stdout and optionally exported as JSON
#[derive(Clone, Debug, Serialize)]
pub struct Summary {
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub stages: Vec<Stage>,
    pub groups: Vec<GroupSummary>,
    pub checks: Rate,
    pub http_reqs: u64,
    pub http_reqs_per_sec: f64,
    pub http_req_duration: TrendStats,
    pub http_req_failed: Rate,
    pub iterations: u64,
    pub iteration_duration: TrendStats,
    pub vus_max: u32,
    pub thresholds: Vec<ThresholdResult>,
}

impl Summary {
    /// Whether every threshold held
    pub fn passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.thresholds.iter().filter(|t| !t.passed)
    }

    pub fn export(&self, path: &Path) -> eyre::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn mark(passed: bool) -> char {
    if passed { '✓' } else { '✗' }
}

fn fmt_trend(f: &mut fmt::Formatter<'_>, name: &str, stats: &TrendStats) -> fmt::Result {
    writeln!(
        f,
        "     {:<22} avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms",
        name, stats.avg, stats.min, stats.med, stats.max, stats.p90, stats.p95
    )
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<String> = self.stages.iter().map(Stage::to_string).collect();
        writeln!(f)?;
        writeln!(
            f,
            "  started {} | {:.1}s | stages {}",
            self.started_at.to_rfc3339(),
            self.duration_secs,
            stages.join(", ")
        )?;
        writeln!(f)?;

        for group in &self.groups {
            writeln!(f, "     █ {}", group.name)?;
            for check in &group.checks {
                let total = check.passes + check.fails;
                writeln!(f, "       {} {}", mark(check.fails == 0), check.name)?;
                if check.fails > 0 {
                    writeln!(
                        f,
                        "        ↳ {:.0}% - ✓ {} / ✗ {}",
                        check.passes as f64 / total as f64 * 100.0,
                        check.passes,
                        check.fails
                    )?;
                }
            }
            writeln!(f)?;
        }

        writeln!(
            f,
            "     {:<22} {:.2}% ✓ {} ✗ {}",
            "checks",
            self.checks.rate() * 100.0,
            self.checks.hits,
            self.checks.total - self.checks.hits
        )?;
        fmt_trend(f, "http_req_duration", &self.http_req_duration)?;
        writeln!(
            f,
            "     {:<22} {:.2}% ✓ {} ✗ {}",
            "http_req_failed",
            self.http_req_failed.rate() * 100.0,
            self.http_req_failed.hits,
            self.http_req_failed.total - self.http_req_failed.hits
        )?;
        writeln!(
            f,
            "     {:<22} {} {:.2}/s",
            "http_reqs", self.http_reqs, self.http_reqs_per_sec
        )?;
        fmt_trend(f, "iteration_duration", &self.iteration_duration)?;
        writeln!(f, "     {:<22} {}", "iterations", self.iterations)?;
        writeln!(f, "     {:<22} {}", "vus_max", self.vus_max)?;
        writeln!(f)?;

        for threshold in &self.thresholds {
            writeln!(
                f,
                "     {} {} {} (observed {:.4})",
                mark(threshold.passed),
                threshold.metric,
                threshold.condition,
                threshold.observed
            )?;
        }
        Ok(())
    }
}
