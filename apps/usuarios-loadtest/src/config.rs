//! Load profile: stages, think-time scaling and pass/fail thresholds

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{LoadTestError, LoadTestResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// One step of the ramping profile: move linearly to `target` VUs over `duration`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

impl FromStr for Stage {
    type Err = LoadTestError;

    /// Parses `<duration>:<target>`, e.g. `30s:10` or `1m30s:25`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (duration, target) = raw
            .trim()
            .split_once(':')
            .ok_or_else(|| LoadTestError::InvalidStage(raw.to_string()))?;

        let target = target
            .trim()
            .parse()
            .map_err(|_| LoadTestError::InvalidStage(raw.to_string()))?;

        Ok(Self::new(parse_duration(duration)?, target))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.duration.as_millis();
        if millis % 1000 != 0 {
            write!(f, "{}ms:{}", millis, self.target)
        } else if millis >= 60_000 && millis % 60_000 == 0 {
            write!(f, "{}m:{}", millis / 60_000, self.target)
        } else {
            write!(f, "{}s:{}", millis / 1000, self.target)
        }
    }
}

impl Serialize for Stage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parses durations written as a sequence of `<number><unit>` pairs.
///
/// Units: `ms`, `s`, `m`, `h`. Examples: `500ms`, `30s`, `1m30s`, `1.5m`.
pub fn parse_duration(raw: &str) -> LoadTestResult<Duration> {
    let invalid = || LoadTestError::InvalidDuration(raw.to_string());

    let mut rest = raw.trim();
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds = match &rest[..unit_len] {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        let step = Duration::try_from_secs_f64(seconds).map_err(|_| invalid())?;
        total = total.checked_add(step).ok_or_else(invalid)?;
    }

    Ok(total)
}

/// 30s ramp to 10 VUs, hold 1m, ramp to 30 over 20s, hold 1m, ramp down over 10s.
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new(Duration::from_secs(30), 10),
        Stage::new(Duration::from_secs(60), 10),
        Stage::new(Duration::from_secs(20), 30),
        Stage::new(Duration::from_secs(60), 30),
        Stage::new(Duration::from_secs(10), 0),
    ]
}

/// Number of VUs that should be active `elapsed` into the run.
///
/// Each stage interpolates linearly from the previous stage's target (0 for
/// the first stage). Returns `None` once every stage has elapsed.
pub fn target_at(stages: &[Stage], elapsed: Duration) -> Option<u32> {
    let mut from = 0u32;
    let mut stage_start = Duration::ZERO;

    for stage in stages {
        let stage_end = stage_start.saturating_add(stage.duration);
        if elapsed < stage_end {
            let progress =
                (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
            let target = f64::from(from) + (f64::from(stage.target) - f64::from(from)) * progress;
            return Some(target.round() as u32);
        }
        from = stage.target;
        stage_start = stage_end;
    }

    None
}

/// Pass/fail criteria evaluated at the end of the run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Thresholds {
    /// `http_req_duration` p(95) must stay below this many milliseconds
    pub p95_ms: f64,
    /// `http_req_failed` rate must stay below this fraction
    pub max_failed_rate: f64,
    /// `checks` pass rate must stay above this fraction
    pub min_checks_rate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            p95_ms: 500.0,
            max_failed_rate: 0.01,
            min_checks_rate: 0.99,
        }
    }
}

/// Everything a load run needs
#[derive(Clone, Debug)]
pub struct LoadConfig {
    pub base_url: String,
    pub stages: Vec<Stage>,
    /// Multiplies every think time; `0.0` disables sleeping
    pub think_scale: f64,
    pub thresholds: Thresholds,
    /// Prefix for generated emails so reruns against one server don't collide
    pub run_tag: Option<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stages: default_stages(),
            think_scale: 1.0,
            thresholds: Thresholds::default(),
            run_tag: Some(new_run_tag()),
        }
    }
}

impl LoadConfig {
    pub fn validate(&self) -> LoadTestResult<()> {
        if self.stages.is_empty() {
            return Err(LoadTestError::InvalidConfig(
                "at least one stage is required".to_string(),
            ));
        }
        if !self.think_scale.is_finite() || self.think_scale < 0.0 {
            return Err(LoadTestError::InvalidConfig(format!(
                "think scale must be a non-negative number, got {}",
                self.think_scale
            )));
        }
        if Duration::try_from_secs_f64(self.think_scale).is_err() {
            return Err(LoadTestError::InvalidConfig(format!(
                "think scale {} is too large",
                self.think_scale
            )));
        }
        if self
            .stages
            .iter()
            .try_fold(Duration::ZERO, |total, s| total.checked_add(s.duration))
            .is_none()
        {
            return Err(LoadTestError::InvalidConfig(
                "total stage duration is too large".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(LoadTestError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Highest VU count any stage ramps to
    pub fn max_vus(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .fold(Duration::ZERO, |total, s| total.saturating_add(s.duration))
    }
}

/// Short lowercase tag unique to one run
pub fn new_run_tag() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}
