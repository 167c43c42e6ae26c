//! Interject - replay interruption scenarios
//!
//! Usage: interject [--config <file>] [scenario.toml ...]
//!
//! Without scenario files the bundled scenarios are run.

use anyhow::{bail, Context, Result};
use interject::scenario::{Scenario, ScenarioRunner, BUILTIN_SCENARIOS};
use interject::SessionConfig;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interject=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config_path: Option<PathBuf> = None;
    let mut scenario_paths = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config requires a file path")?;
                config_path = Some(PathBuf::from(path));
            }
            _ => scenario_paths.push(PathBuf::from(arg)),
        }
    }

    let config = match &config_path {
        Some(path) => {
            SessionConfig::load(path).inspect_err(|e| error!("{}", e.user_message()))?
        }
        None => SessionConfig::default(),
    };
    info!(
        "Keywords: filler={:?} interrupt={:?}",
        config.keywords.filler, config.keywords.interrupt
    );

    let scenarios = if scenario_paths.is_empty() {
        info!("No scenario files given, running {} bundled scenarios", BUILTIN_SCENARIOS.len());
        BUILTIN_SCENARIOS
            .iter()
            .map(|(name, content)| {
                Scenario::parse(content).with_context(|| format!("bundled scenario {}", name))
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        scenario_paths
            .iter()
            .map(|path| {
                Scenario::load(path)
                    .inspect_err(|e| error!("{}", e.user_message()))
                    .map_err(anyhow::Error::from)
            })
            .collect::<Result<Vec<_>>>()?
    };

    let mut failed = 0;
    for scenario in scenarios {
        let report = ScenarioRunner::new(scenario, config.clone())?.run();
        println!("{}", report.summary());
        for failure in &report.failures {
            println!("  - {}", failure);
        }
        if !report.passed {
            failed += 1;
        }
    }

    if failed > 0 {
        error!("{} scenario(s) failed", failed);
        bail!("{} scenario(s) failed", failed);
    }
    Ok(())
}
