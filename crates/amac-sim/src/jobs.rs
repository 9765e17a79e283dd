// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

//! JSON job files: one replay or training run in, one result document out.
//!
//! ```json
//! { "job": "control", "power_kw": [51.2, 49.8, ...], "interval_secs": 1 }
//! { "job": "schedule", "prices": [0.12, 0.35, ...], "settings": { ... } }
//! ```

use amac_core::{TickStatus, TrainingOptions};
use amac_types::{AmacSettings, Sample};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info};

use crate::simulation::{ControlSummary, run_controller, run_scheduler};

#[derive(Debug, Clone, Deserialize)]
pub struct JobInput {
    /// Settings for this job; omitted sections use defaults
    #[serde(default)]
    pub settings: AmacSettings,

    #[serde(flatten)]
    pub task: JobTask,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum JobTask {
    Control {
        power_kw: Vec<f64>,
        /// Timestamp of the first sample, now if omitted
        #[serde(default)]
        start: Option<DateTime<Utc>>,
        /// Seconds between samples, the controller's data interval if omitted
        #[serde(default)]
        interval_secs: Option<f64>,
        #[serde(default)]
        initial_soc_pct: Option<f64>,
    },
    Schedule {
        prices: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum JobOutput {
    Control {
        summary: ControlSummary,
        setpoint_kw: Vec<f64>,
        soc_pct: Vec<f64>,
        status: Vec<TickStatus>,
    },
    Schedule {
        policy_value: f64,
        power_kw: Vec<f64>,
        soc_pct: Vec<f64>,
        episodes_completed: usize,
        final_epsilon: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
}

/// Document written to the output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    pub status: JobStatus,
    pub finished_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run a parsed job
pub fn run_job(input: JobInput) -> Result<JobOutput> {
    input.settings.validate().context("Invalid job settings")?;

    match input.task {
        JobTask::Control {
            power_kw,
            start,
            interval_secs,
            initial_soc_pct,
        } => {
            let interval = interval_secs.unwrap_or(input.settings.controller.data_interval_secs);
            let samples = timestamped(&power_kw, start.unwrap_or_else(Utc::now), interval)?;
            let run = run_controller(&input.settings, &samples, initial_soc_pct)?;

            Ok(JobOutput::Control {
                summary: run.summary,
                setpoint_kw: run.ticks.iter().map(|t| t.setpoint_kw).collect(),
                soc_pct: run.ticks.iter().map(|t| t.soc_pct).collect(),
                status: run.ticks.iter().map(|t| t.status).collect(),
            })
        }
        JobTask::Schedule { prices } => {
            let run = run_scheduler(
                &input.settings.scheduler,
                prices,
                TrainingOptions::default(),
            )?;

            Ok(JobOutput::Schedule {
                policy_value: run.plan.total_cost,
                power_kw: run.plan.power_kw,
                soc_pct: run.plan.soc_pct,
                episodes_completed: run.report.episodes_completed,
                final_epsilon: run.report.final_epsilon,
            })
        }
    }
}

#[expect(clippy::cast_possible_truncation)]
fn timestamped(values: &[f64], start: DateTime<Utc>, interval_secs: f64) -> Result<Vec<Sample>> {
    if !(interval_secs.is_finite() && interval_secs > 0.0) {
        bail!("interval_secs must be positive, got {interval_secs}");
    }
    let step = Duration::milliseconds((interval_secs * 1000.0).round() as i64);

    let mut timestamp = start;
    Ok(values
        .iter()
        .map(|&value| {
            let sample = Sample::new(timestamp, value);
            timestamp += step;
            sample
        })
        .collect())
}

/// Read `input`, run the job and write a [`JobReport`] to `output`
///
/// The report is written for failed jobs too. The returned error covers
/// failures to read the input or write the report, and the job's own error.
pub fn evaluate_file(input: &Path, output: &Path) -> Result<JobReport> {
    info!("Evaluating job {}", input.display());

    let outcome = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read job file {}", input.display()))
        .and_then(|content| {
            serde_json::from_str::<JobInput>(&content)
                .with_context(|| format!("Failed to parse job file {}", input.display()))
        })
        .and_then(run_job);

    let report = match &outcome {
        Ok(result) => JobReport {
            status: JobStatus::Succeeded,
            finished_at: Utc::now(),
            result: Some(result.clone()),
            error: None,
        },
        Err(e) => {
            error!("Job failed: {e:#}");
            JobReport {
                status: JobStatus::Failed,
                finished_at: Utc::now(),
                result: None,
                error: Some(format!("{e:#}")),
            }
        }
    };

    write_report(&report, output)?;
    info!("Wrote job result to {}", output.display());

    outcome.map(|_| report)
}

fn write_report(report: &JobReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move result into {}", path.display()))?;
    Ok(())
}
