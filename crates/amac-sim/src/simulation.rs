// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

//! Controller replays and scheduler runs shared by the CLI commands and job mode.

use amac_core::{
    AmacController, RlScheduler, TickInput, TickOutput, TickStatus, TrainingOptions,
    TrainingReport, Trajectory,
};
use amac_types::{AmacSettings, Sample, SchedulerConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============= Controller replay =============

/// Aggregate view of a replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSummary {
    pub samples: usize,
    pub dispatched: usize,
    pub warming_up: usize,
    pub window_collapsed: usize,
    pub forecast_unavailable: usize,
    /// Non-finite samples the controller dropped
    #[serde(default)]
    pub invalid_input: usize,
    pub saturated: usize,
    /// Standard deviation of the raw input over dispatched ticks (kW)
    pub input_std_kw: f64,
    /// Standard deviation of the setpoint over dispatched ticks (kW)
    pub setpoint_std_kw: f64,
    pub initial_soc_pct: f64,
    pub final_soc_pct: f64,
    pub min_soc_pct: f64,
    pub max_soc_pct: f64,
}

#[derive(Debug, Clone)]
pub struct ControlRun {
    pub ticks: Vec<TickOutput>,
    pub summary: ControlSummary,
}

/// Feed `samples` through a fresh controller, starting at `initial_soc_pct`
/// or the effective reference SOC
pub fn run_controller(
    settings: &AmacSettings,
    samples: &[Sample],
    initial_soc_pct: Option<f64>,
) -> Result<ControlRun> {
    let controller = AmacController::from_settings(settings)
        .context("Failed to build AMAC controller")?;
    let initial_soc = initial_soc_pct.unwrap_or_else(|| controller.reference_soc_pct());

    info!(
        "Replaying {} samples through AMAC (initial SOC {:.1}%)",
        samples.len(),
        initial_soc
    );

    let mut state = controller.initial_state(initial_soc);
    let mut ticks = Vec::with_capacity(samples.len());
    for sample in samples {
        let (next, output) = controller.step(state, TickInput::new(sample.timestamp, sample.value));
        state = next;
        ticks.push(output);
    }

    let summary = summarize(samples, &ticks, initial_soc);
    info!(
        "Replay finished: {} dispatched, setpoint σ {:.3} kW vs input σ {:.3} kW, final SOC {:.2}%",
        summary.dispatched, summary.setpoint_std_kw, summary.input_std_kw, summary.final_soc_pct
    );
    Ok(ControlRun { ticks, summary })
}

fn summarize(samples: &[Sample], ticks: &[TickOutput], initial_soc: f64) -> ControlSummary {
    let count = |status: TickStatus| ticks.iter().filter(|t| t.status == status).count();

    let (inputs, setpoints): (Vec<f64>, Vec<f64>) = samples
        .iter()
        .zip(ticks)
        .filter(|(_, t)| t.status == TickStatus::Dispatched)
        .map(|(s, t)| (s.value, t.setpoint_kw))
        .unzip();

    let socs = ticks.iter().map(|t| t.soc_pct);
    ControlSummary {
        samples: ticks.len(),
        dispatched: count(TickStatus::Dispatched),
        warming_up: count(TickStatus::WarmingUp),
        window_collapsed: count(TickStatus::WindowCollapsed),
        forecast_unavailable: count(TickStatus::ForecastUnavailable),
        invalid_input: count(TickStatus::InvalidInput),
        saturated: ticks.iter().filter(|t| t.diagnostics.saturated).count(),
        input_std_kw: std_dev(&inputs),
        setpoint_std_kw: std_dev(&setpoints),
        initial_soc_pct: initial_soc,
        final_soc_pct: ticks.last().map_or(initial_soc, |t| t.soc_pct),
        min_soc_pct: socs.clone().fold(initial_soc, f64::min),
        max_soc_pct: socs.fold(initial_soc, f64::max),
    }
}

/// Sample standard deviation, 0 below two values
#[expect(clippy::cast_precision_loss)]
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
}

// ============= Scheduler run =============

#[derive(Debug, Clone)]
pub struct ScheduleRun {
    pub prices: Vec<f64>,
    pub report: TrainingReport,
    /// Greedy policy rollout after training
    pub plan: Trajectory,
}

pub fn run_scheduler(
    config: &SchedulerConfig,
    prices: Vec<f64>,
    options: TrainingOptions,
) -> Result<ScheduleRun> {
    let scheduler =
        RlScheduler::new(config.clone(), prices).context("Failed to build RL scheduler")?;
    let report = scheduler
        .train_with(options)
        .context("Scheduler training failed")?;
    let plan = scheduler
        .greedy_rollout(&report.q_table)
        .context("Greedy rollout failed")?;

    Ok(ScheduleRun {
        prices: scheduler.prices().to_vec(),
        report,
        plan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use amac_types::{ControllerConfig, LearningConfig, VariabilityConfig};
    use chrono::{Duration, Utc};

    fn settings() -> AmacSettings {
        AmacSettings {
            controller: ControllerConfig {
                max_window_samples: 30.0,
                variability: VariabilityConfig {
                    horizon_samples: 10,
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn samples(values: &[f64]) -> Vec<Sample> {
        let start = Utc::now();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(start + Duration::seconds(i as i64), v))
            .collect()
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[3.0]), 0.0);
        assert!((std_dev(&[1.0, 3.0]) - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_replay_counts_statuses() {
        let values: Vec<f64> = (0..40_u32).map(|i| if i.is_multiple_of(2) { 20.0 } else { 80.0 }).collect();
        let run = run_controller(&settings(), &samples(&values), None).unwrap();

        let s = &run.summary;
        assert_eq!(s.samples, 40);
        assert_eq!(s.warming_up, 9);
        assert_eq!(s.dispatched, 31);
        assert_eq!(s.initial_soc_pct, 50.0);
        assert!(s.setpoint_std_kw < s.input_std_kw);
        assert!(s.min_soc_pct <= s.final_soc_pct && s.final_soc_pct <= s.max_soc_pct);
    }

    #[test]
    fn test_replay_counts_dropped_samples() {
        let mut values: Vec<f64> = (0..40_u32).map(|i| if i.is_multiple_of(2) { 20.0 } else { 80.0 }).collect();
        values[20] = f64::NAN;
        let run = run_controller(&settings(), &samples(&values), None).unwrap();

        let s = &run.summary;
        assert_eq!(s.invalid_input, 1);
        assert_eq!(s.dispatched, 30);
        assert!(s.input_std_kw.is_finite());
        assert!(s.setpoint_std_kw.is_finite());
    }

    #[test]
    fn test_scheduler_run_returns_plan() {
        let config = SchedulerConfig {
            learning: LearningConfig {
                iterations: 20,
                discrete_levels: 5,
                seed: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        let run = run_scheduler(&config, vec![0.1, 0.3, 0.2], TrainingOptions::default()).unwrap();
        assert_eq!(run.plan.len(), 3);
        assert_eq!(run.prices, vec![0.1, 0.3, 0.2]);
        assert_eq!(run.report.episodes_completed, 20);
    }

    #[test]
    fn test_scheduler_run_rejects_empty_prices() {
        let err = run_scheduler(&SchedulerConfig::default(), vec![], TrainingOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("RL scheduler"));
    }
}
