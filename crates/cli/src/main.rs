mod cli;
mod plan;
mod sink;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use lanepool_core::SchedulerConfig;
use lanepool_scheduler::{RunSummary, Scheduler};

use crate::cli::CliArgs;
use crate::plan::RunPlan;
use crate::sink::{LoggingSink, ResultCounts};

#[derive(Serialize)]
struct Report<'a> {
    summary: &'a RunSummary,
    results: ResultCounts,
    error: Option<String>,
}

fn load_config(path: Option<&str>) -> Result<SchedulerConfig> {
    match path {
        Some(p) => SchedulerConfig::from_file(p)
            .with_context(|| format!("failed to load config: {}", p)),
        None => {
            let mut config = SchedulerConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }
}

fn main() -> Result<()> {
    lanepool_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = load_config(args.config.as_deref())?;
    config.log_summary();

    let plan = RunPlan::from_file(&args.plan)?;
    info!(
        workers = plan.workers.len(),
        items = plan.items.len(),
        "Loaded run plan {}",
        args.plan
    );

    let sink = Arc::new(LoggingSink::default());
    let scheduler = Scheduler::new(config, sink.clone());
    let outcome = scheduler.execute(plan.build_items()?, plan.build_workers()?);

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Scheduler could not start");
            return Err(e.into());
        }
    };
    let run_error = summary.error();
    if let Some(ref e) = run_error {
        error!(error = %e, "Run finished with errors");
    }

    let report = Report {
        summary: &summary,
        results: sink.counts(),
        error: run_error.as_ref().map(|e| e.to_string()),
    };
    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{json}");

    if let Some(e) = run_error {
        return Err(e.into());
    }
    Ok(())
}
