// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use amac_core::{
    CancellationToken, CheckpointPolicy, PolicyCheckpoint, RlScheduler, SchedulerError,
    TrainingOptions,
};
use amac_types::{Approach, LearningConfig, SchedulerBatteryConfig, SchedulerConfig, UseCase};
use tempfile::tempdir;

fn arbitrage_config(iterations: usize, levels: usize) -> SchedulerConfig {
    SchedulerConfig {
        use_case: UseCase::EnergyArbitrage,
        approach: Approach::QLearning,
        resolution_hours: 1.0,
        battery: SchedulerBatteryConfig {
            rated_power_kw: 100.0,
            rated_energy_kwh: 10.0,
            efficiency: 0.9,
            soc_low_pct: 0.0,
            soc_high_pct: 100.0,
            initial_soc_pct: 50.0,
        },
        learning: LearningConfig {
            iterations,
            discrete_levels: levels,
            seed: Some(42),
            ..Default::default()
        },
    }
}

#[test]
fn test_short_horizon_trains_every_episode() {
    let config = SchedulerConfig {
        learning: LearningConfig {
            iterations: 40,
            discrete_levels: 5,
            seed: Some(1),
            ..Default::default()
        },
        ..Default::default()
    };
    let scheduler = RlScheduler::new(config, vec![0.12, 0.35, 0.08]).unwrap();
    let report = scheduler.train().unwrap();

    assert_eq!(report.episodes_completed, 40);
    assert_eq!(report.last_episode.soc_pct.len(), 3);
    assert_eq!(report.last_episode.power_kw.len(), 3);
    for soc in &report.last_episode.soc_pct {
        assert!((10.0..=90.0).contains(soc));
    }
    for power in &report.last_episode.power_kw {
        assert!(power.abs() <= 1.0 + 1e-9);
    }
}

#[test]
fn test_learns_to_buy_low_and_sell_high() {
    let scheduler = RlScheduler::new(arbitrage_config(500, 3), vec![0.1, 0.5, 0.1]).unwrap();
    let report = scheduler.train().unwrap();
    let plan = scheduler.greedy_rollout(&report.q_table).unwrap();

    assert!(plan.power_kw[0] > 0.0, "should charge in the cheap hour");
    assert!(plan.power_kw[1] < 0.0, "should discharge in the expensive hour");
    // Charge 50 -> 100 %, empty at the peak, then hold
    assert_eq!(plan.soc_bins, vec![2, 0, 0]);
    let expected = -(5.0 / 0.9) * 0.1 + 9.0 * 0.5;
    assert!((plan.total_cost - expected).abs() < 1e-9);
}

#[test]
fn test_terminal_step_uses_reward_only() {
    // One step, full learning rate: Q equals the step value of the chosen move
    let scheduler = RlScheduler::new(arbitrage_config(50, 3), vec![0.2]).unwrap();
    let report = scheduler.train().unwrap();
    let plan = scheduler.greedy_rollout(&report.q_table).unwrap();

    // Selling the upper half is the only profitable single move
    assert_eq!(plan.soc_bins, vec![0]);
    let q = report.q_table.get(0, 1, 0);
    assert!((q - 4.5 * 0.2).abs() < 1e-12);
}

#[test]
fn test_frequency_regulation_prefers_large_moves() {
    let mut config = arbitrage_config(300, 3);
    config.use_case = UseCase::FrequencyRegulation;
    config.approach = Approach::Sarsa;
    let scheduler = RlScheduler::new(config, vec![0.3, 0.3]).unwrap();
    let report = scheduler.train().unwrap();
    let plan = scheduler.greedy_rollout(&report.q_table).unwrap();

    assert!(plan.power_kw.iter().all(|p| p.abs() > 0.0));
}

#[test]
fn test_unreachable_bins_from_initial_soc() {
    let mut config = arbitrage_config(10, 3);
    config.battery.rated_power_kw = 1.0;
    config.battery.initial_soc_pct = 30.0;
    let scheduler = RlScheduler::new(config, vec![0.1, 0.2]).unwrap();

    let err = scheduler.train().unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::NoFeasibleAction { step: 0, soc_pct } if soc_pct == 30.0
    ));
}

#[test]
fn test_cancellation_mid_run_keeps_finished_episodes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("policy.json");
    let iterations = 5_000_000;
    let scheduler = RlScheduler::new(arbitrage_config(iterations, 3), vec![0.1, 0.5, 0.1]).unwrap();

    let token = CancellationToken::new();
    let watcher = {
        let token = token.clone();
        let path = path.clone();
        std::thread::spawn(move || {
            // The first periodic checkpoint proves training is under way
            while !path.exists() {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            token.cancel();
        })
    };

    let report = scheduler
        .train_with(
            TrainingOptions::default()
                .with_cancellation(token.clone())
                .with_checkpoint(CheckpointPolicy::new(&path, 100)),
        )
        .unwrap();
    watcher.join().unwrap();

    assert!(report.cancelled);
    assert!(report.episodes_completed >= 100);
    assert!(report.episodes_completed < iterations);
    assert_eq!(report.last_episode.len(), 3);
    assert!(report.last_episode.total_cost.is_finite());

    let saved = PolicyCheckpoint::load(&path).unwrap();
    assert_eq!(saved.episodes_completed, report.episodes_completed);
}

#[test]
fn test_checkpoint_then_resume() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("policy.json");

    let first = RlScheduler::new(arbitrage_config(60, 3), vec![0.1, 0.5, 0.1]).unwrap();
    let report = first
        .train_with(TrainingOptions::default().with_checkpoint(CheckpointPolicy::new(&path, 20)))
        .unwrap();
    assert_eq!(report.episodes_completed, 60);

    let checkpoint = PolicyCheckpoint::load(&path).unwrap();
    assert_eq!(checkpoint.episodes_completed, 60);
    let q = &checkpoint.q_table;
    assert_eq!((q.steps(), q.bins()), (3, 3));
    for step in 0..3 {
        for state in 0..3 {
            let trained = report.q_table.row(step, state);
            for (saved, trained) in q.row(step, state).iter().zip(trained) {
                assert!((saved - trained).abs() < 1e-9);
            }
        }
    }

    let second = RlScheduler::new(arbitrage_config(100, 3), vec![0.1, 0.5, 0.1]).unwrap();
    let resumed = second
        .train_with(TrainingOptions::default().resume_from(checkpoint))
        .unwrap();
    assert_eq!(resumed.episodes_completed, 100);
    assert!(resumed.final_epsilon <= report.final_epsilon);
}

#[test]
fn test_resume_rejects_other_horizon() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("policy.json");

    RlScheduler::new(arbitrage_config(5, 3), vec![0.1, 0.5])
        .unwrap()
        .train_with(TrainingOptions::default().with_checkpoint(CheckpointPolicy::new(&path, 0)))
        .unwrap();
    let checkpoint = PolicyCheckpoint::load(&path).unwrap();

    let other = RlScheduler::new(arbitrage_config(5, 3), vec![0.1, 0.5, 0.1]).unwrap();
    let err = other
        .train_with(TrainingOptions::default().resume_from(checkpoint))
        .unwrap_err();
    assert!(matches!(err, SchedulerError::CheckpointMismatch { .. }));
}
