//! Usuarios load test
//!
//! Drives ramping virtual users against a running usuarios API and exits
//! non-zero when any threshold is crossed.

use clap::Parser;
use core_config::Environment;
use core_config::tracing::{init_tracing, install_color_eyre};
use eyre::Result;
use std::path::PathBuf;
use tracing::info;
use usuarios_loadtest::config::{DEFAULT_BASE_URL, default_stages, new_run_tag};
use usuarios_loadtest::{LoadConfig, Stage, Thresholds, executor};

#[derive(Parser)]
#[command(name = "usuarios-loadtest")]
#[command(about = "Drive ramping virtual users against the /usuarios API")]
struct Cli {
    /// Base URL of the API under test
    #[arg(long, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Load stage as <duration>:<target VUs>, repeatable. Defaults to 30s:10 1m:10 20s:30 1m:30 10s:0
    #[arg(short, long = "stage", value_name = "DURATION:VUS")]
    stages: Vec<Stage>,

    /// Multiplier for think times between requests (0 disables sleeping)
    #[arg(long, default_value_t = 1.0)]
    think_scale: f64,

    /// Fail when p(95) of http_req_duration reaches this many milliseconds
    #[arg(long, default_value_t = 500.0)]
    p95_ms: f64,

    /// Fail when the http_req_failed rate reaches this fraction
    #[arg(long, default_value_t = 0.01)]
    max_failed_rate: f64,

    /// Fail when the checks pass rate drops to this fraction
    #[arg(long, default_value_t = 0.99)]
    min_checks_rate: f64,

    /// Write the end-of-test summary as JSON to this file
    #[arg(long, value_name = "PATH")]
    summary_export: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> LoadConfig {
        LoadConfig {
            base_url: self.base_url.clone(),
            stages: if self.stages.is_empty() {
                default_stages()
            } else {
                self.stages.clone()
            },
            think_scale: self.think_scale,
            thresholds: Thresholds {
                p95_ms: self.p95_ms,
                max_failed_rate: self.max_failed_rate,
                min_checks_rate: self.min_checks_rate,
            },
            run_tag: Some(new_run_tag()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();
    init_tracing(&Environment::from_env());

    let cli = Cli::parse();
    let config = cli.load_config();

    let summary = executor::run(&config).await?;
    println!("{summary}");

    if let Some(path) = &cli.summary_export {
        summary.export(path)?;
        info!("Summary written to {}", path.display());
    }

    if !summary.passed() {
        let crossed: Vec<String> = summary
            .failed_thresholds()
            .map(|t| format!("{} {}", t.metric, t.condition))
            .collect();
        return Err(eyre::eyre!("Thresholds crossed: {}", crossed.join(", ")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["usuarios-loadtest"]).unwrap();
        let config = cli.load_config();

        assert_eq!(config.stages, default_stages());
        assert_eq!(config.think_scale, 1.0);
        assert_eq!(config.thresholds, Thresholds::default());
        assert!(config.run_tag.is_some());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "usuarios-loadtest",
            "--base-url",
            "http://127.0.0.1:8080",
            "--stage",
            "5s:2",
            "-s",
            "1m:0",
            "--think-scale",
            "0",
            "--p95-ms",
            "250",
            "--summary-export",
            "summary.json",
        ])
        .unwrap();
        let config = cli.load_config();

        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(
            config.stages,
            vec![
                Stage::new(Duration::from_secs(5), 2),
                Stage::new(Duration::from_secs(60), 0)
            ]
        );
        assert_eq!(config.think_scale, 0.0);
        assert_eq!(config.thresholds.p95_ms, 250.0);
        assert_eq!(cli.summary_export, Some(PathBuf::from("summary.json")));
    }

    #[test]
    fn test_cli_rejects_malformed_stage() {
        assert!(Cli::try_parse_from(["usuarios-loadtest", "--stage", "ten:5"]).is_err());
    }
}
