// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

//! Subcommand execution.

use amac_core::{CancellationToken, CheckpointPolicy, PolicyCheckpoint, TrainingOptions};
use amac_types::{AmacSettings, Approach, UseCase};
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use super::args::{Cli, Commands, ControlArgs, EvaluateArgs, ScheduleArgs};
use super::data_loaders::{
    CsvPowerLoader, CsvPriceLoader, DataLoader, PriceLoader, ScenarioPriceLoader, SyntheticLoader,
};
use super::formatters::{CsvFormatter, TableFormatter};
use crate::config::load_settings;
use crate::jobs::{JobStatus, evaluate_file};
use crate::price_scenarios::PriceScenario;
use crate::pv_profiles::PvProfile;
use crate::simulation::{run_controller, run_scheduler};

/// Output targets chosen with `--output` / `--csv-path`
struct OutputPlan<'a> {
    table: bool,
    csv: Option<&'a Path>,
}

impl<'a> OutputPlan<'a> {
    fn new(output: &str, csv_path: Option<&'a Path>) -> Result<Self> {
        let wants_csv = matches!(output, "csv" | "both");
        if wants_csv && csv_path.is_none() {
            bail!("--csv-path is required when --output is '{output}'");
        }
        Ok(Self {
            table: matches!(output, "table" | "both"),
            csv: if wants_csv { csv_path } else { None },
        })
    }
}

/// Load settings and run the selected subcommand
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Control(args) => {
            let settings = load_settings(cli.config.as_deref())?;
            run_control(&args, &settings)
        }
        Commands::Schedule(args) => {
            let settings = load_settings(cli.config.as_deref())?;
            run_schedule(&args, settings)
        }
        Commands::Evaluate(args) => run_evaluate(&args),
    }
}

pub fn run_control(args: &ControlArgs, settings: &AmacSettings) -> Result<()> {
    let output = OutputPlan::new(&args.output, args.csv_path.as_deref())?;

    let samples = match &args.input {
        Some(path) => CsvPowerLoader::new(path).load()?,
        None => {
            let profile = PvProfile::from_id(&args.profile)?;
            SyntheticLoader::new(profile, args.samples, settings.controller.pv_rated_power_kw)
                .with_seed(args.seed)
                .load()?
        }
    };

    let run = run_controller(settings, &samples, args.initial_soc)?;

    if output.table {
        println!("{}", TableFormatter::format_control_summary(&run.summary));
    }
    if let Some(path) = output.csv {
        CsvFormatter::write_ticks(&run.ticks, path)?;
        info!("Wrote {} ticks to {}", run.ticks.len(), path.display());
    }
    Ok(())
}

pub fn run_schedule(args: &ScheduleArgs, mut settings: AmacSettings) -> Result<()> {
    let output = OutputPlan::new(&args.output, args.csv_path.as_deref())?;

    let scheduler = &mut settings.scheduler;
    if let Some(iterations) = args.iterations {
        scheduler.learning.iterations = iterations;
    }
    if args.seed.is_some() {
        scheduler.learning.seed = args.seed;
    }
    if let Some(approach) = &args.approach {
        scheduler.approach = parse_choice::<Approach>(approach)?;
    }
    if let Some(use_case) = &args.use_case {
        scheduler.use_case = parse_choice::<UseCase>(use_case)?;
    }

    let prices = match &args.prices {
        Some(path) => CsvPriceLoader::new(path).load()?,
        None => ScenarioPriceLoader {
            scenario: PriceScenario::from_id(&args.scenario)?,
            steps: args.steps,
            seed: scheduler.learning.seed,
        }
        .load()?,
    };

    let mut options = TrainingOptions::default();
    if let Some(path) = &args.checkpoint {
        options = options.with_checkpoint(CheckpointPolicy::new(path, args.checkpoint_every));
    }
    if let Some(path) = &args.resume {
        let checkpoint = PolicyCheckpoint::load(path)
            .with_context(|| format!("Failed to load checkpoint {}", path.display()))?;
        info!(
            "Resuming from {} ({} episodes)",
            path.display(),
            checkpoint.episodes_completed
        );
        options = options.resume_from(checkpoint);
    }
    if let Some(secs) = args.time_limit {
        options = options.with_cancellation(cancel_after(Duration::from_secs(secs)));
    }

    let run = run_scheduler(&settings.scheduler, prices, options)?;
    if run.report.cancelled {
        warn!(
            "Training stopped by the time limit after {} episodes",
            run.report.episodes_completed
        );
    }

    if output.table {
        println!("{}", TableFormatter::format_schedule(&run));
    }
    if let Some(path) = output.csv {
        CsvFormatter::write_schedule(&run, path)?;
        info!("Wrote plan to {}", path.display());
    }
    Ok(())
}

pub fn run_evaluate(args: &EvaluateArgs) -> Result<()> {
    let report = evaluate_file(&args.input, &args.output)?;
    if report.status == JobStatus::Succeeded {
        println!("Job succeeded, result written to {}", args.output.display());
    }
    Ok(())
}

/// Token cancelled by a background thread once `limit` has passed
fn cancel_after(limit: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let timer = token.clone();
    std::thread::spawn(move || {
        std::thread::sleep(limit);
        timer.cancel();
    });
    token
}

/// Parse a snake_case CLI choice through the type's serde names
fn parse_choice<T: serde::de::DeserializeOwned>(value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_owned()))
        .with_context(|| format!("Unknown choice '{value}'"))
}
