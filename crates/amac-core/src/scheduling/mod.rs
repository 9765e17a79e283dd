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

//! Offline battery dispatch scheduling with tabular reinforcement learning.
//!
//! The battery moves between evenly spaced SOC bins once per price
//! interval. A time-indexed Q-table over (step, SOC bin, target bin) is
//! trained with ε-greedy episodes, using either Q-learning or SARSA
//! targets. Only transitions within the power rating are ever chosen.

mod checkpoint;
mod dynamics;
mod exploration;
mod q_table;

pub use checkpoint::{CheckpointPolicy, PolicyCheckpoint};
pub use dynamics::{SocGrid, Transition, feasible_transitions, step_value, transition_power};
pub use exploration::{EpsilonSchedule, choose_action};
pub use q_table::{LearningRates, QTable, temporal_difference};

use amac_types::{Approach, SchedulerConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::error::{Result, SchedulerError};

// ============= Cancellation =============

/// Cooperative stop signal checked between training episodes
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ============= Results =============

/// One pass over the horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    /// Sum of step values, the quantity training maximizes
    pub total_cost: f64,
    /// SOC (%) reached after each step
    pub soc_pct: Vec<f64>,
    pub soc_bins: Vec<usize>,
    /// Grid-side power per step (kW), positive while charging
    pub power_kw: Vec<f64>,
}

impl Trajectory {
    fn with_capacity(steps: usize) -> Self {
        Self {
            total_cost: 0.0,
            soc_pct: Vec::with_capacity(steps),
            soc_bins: Vec::with_capacity(steps),
            power_kw: Vec::with_capacity(steps),
        }
    }

    fn push(&mut self, transition: Transition, value: f64) {
        self.total_cost += value;
        self.soc_pct.push(transition.soc_pct);
        self.soc_bins.push(transition.bin);
        self.power_kw.push(transition.power_kw);
    }

    pub fn len(&self) -> usize {
        self.power_kw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power_kw.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Trajectory of the last training episode (exploration included)
    pub last_episode: Trajectory,
    pub q_table: QTable,
    pub episodes_completed: usize,
    pub cancelled: bool,
    pub final_epsilon: f64,
}

/// Optional training controls
#[derive(Debug, Clone, Default)]
pub struct TrainingOptions {
    pub cancellation: Option<CancellationToken>,
    pub checkpoint: Option<CheckpointPolicy>,
    pub resume_from: Option<PolicyCheckpoint>,
}

impl TrainingOptions {
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    #[must_use]
    pub fn with_checkpoint(mut self, policy: CheckpointPolicy) -> Self {
        self.checkpoint = Some(policy);
        self
    }

    #[must_use]
    pub fn resume_from(mut self, checkpoint: PolicyCheckpoint) -> Self {
        self.resume_from = Some(checkpoint);
        self
    }
}

// ============= Scheduler =============

/// Tabular RL scheduler for one price series
#[derive(Debug, Clone)]
pub struct RlScheduler {
    config: SchedulerConfig,
    prices: Vec<f64>,
    grid: SocGrid,
}

impl RlScheduler {
    pub fn new(config: SchedulerConfig, prices: Vec<f64>) -> Result<Self> {
        config.validate()?;
        if prices.is_empty() {
            return Err(SchedulerError::EmptyPrices);
        }
        if let Some((step, &value)) = prices.iter().enumerate().find(|(_, p)| !p.is_finite()) {
            return Err(SchedulerError::NonFinitePrice { step, value });
        }

        let grid = SocGrid::for_battery(&config.battery, config.learning.discrete_levels);
        Ok(Self {
            config,
            prices,
            grid,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn grid(&self) -> &SocGrid {
        &self.grid
    }

    /// Number of decision steps (one per price)
    pub fn steps(&self) -> usize {
        self.prices.len()
    }

    pub fn train(&self) -> Result<TrainingReport> {
        self.train_with(TrainingOptions::default())
    }

    pub fn train_with(&self, options: TrainingOptions) -> Result<TrainingReport> {
        let TrainingOptions {
            cancellation,
            checkpoint,
            resume_from,
        } = options;
        let learning = &self.config.learning;
        let steps = self.steps();
        let bins = self.grid.len();
        let rates = LearningRates {
            alpha: learning.alpha,
            gamma: learning.gamma,
        };

        let (mut q, mut schedule, start) = match resume_from {
            Some(resumed) => {
                resumed.ensure_shape(steps, bins)?;
                info!(
                    "Resuming training at episode {} (epsilon={:.4})",
                    resumed.episodes_completed,
                    resumed.schedule.epsilon()
                );
                (
                    resumed.q_table,
                    resumed.schedule,
                    resumed.episodes_completed,
                )
            }
            None => (
                QTable::new(steps, bins),
                EpsilonSchedule::new(
                    learning.epsilon_initial,
                    learning.epsilon_decay,
                    learning.epsilon_interval_for(steps),
                ),
                0,
            ),
        };

        let mut rng = match learning.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(start as u64)),
            None => StdRng::from_entropy(),
        };

        info!(
            "Training {:?} scheduler ({:?}): {} steps, {} SOC bins, {} episodes",
            self.config.approach, self.config.use_case, steps, bins, learning.iterations
        );

        let progress_every = learning.iterations.div_ceil(10).max(1);
        let mut last_episode = None;
        let mut completed = start;
        let mut cancelled = false;

        for episode in start..learning.iterations {
            if cancellation
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                warn!("Training cancelled after {} episodes", completed);
                cancelled = true;
                break;
            }

            let epsilon = schedule.for_episode(episode);
            last_episode = Some(self.run_episode(&mut q, &mut rng, epsilon, rates)?);
            completed = episode + 1;

            if let Some(policy) = &checkpoint
                && policy.is_due(completed)
            {
                PolicyCheckpoint::new(completed, schedule, q.clone()).save(&policy.path)?;
            }

            if completed.is_multiple_of(progress_every)
                && let Some(trajectory) = &last_episode
            {
                debug!(
                    "Episode {}/{}: epsilon={:.4}, total={:.4}",
                    completed, learning.iterations, epsilon, trajectory.total_cost
                );
            }
        }

        if let Some(policy) = &checkpoint {
            PolicyCheckpoint::new(completed, schedule, q.clone()).save(&policy.path)?;
        }

        let last_episode = match last_episode {
            Some(trajectory) => trajectory,
            None => self.greedy_rollout(&q)?,
        };

        info!(
            "Training finished: {} episodes, last total {:.4}",
            completed, last_episode.total_cost
        );

        Ok(TrainingReport {
            last_episode,
            q_table: q,
            episodes_completed: completed,
            cancelled,
            final_epsilon: schedule.epsilon(),
        })
    }

    /// Follow the learned policy without exploration
    pub fn greedy_rollout(&self, q: &QTable) -> Result<Trajectory> {
        if q.steps() != self.steps() || q.bins() != self.grid.len() {
            return Err(SchedulerError::CheckpointMismatch {
                expected_steps: self.steps(),
                expected_bins: self.grid.len(),
                found_steps: q.steps(),
                found_bins: q.bins(),
            });
        }

        let mut soc = self.config.battery.initial_soc_pct;
        let mut state = self.grid.nearest(soc);
        let mut trajectory = Trajectory::with_capacity(self.steps());

        for (step, &price) in self.prices.iter().enumerate() {
            let actions = self.feasible_from(soc);
            let action = q
                .best_action(step, state, &actions)
                .ok_or(SchedulerError::NoFeasibleAction { step, soc_pct: soc })?;
            let value = step_value(self.config.use_case, action.power_kw, price);
            trajectory.push(action, value);
            soc = action.soc_pct;
            state = action.bin;
        }

        Ok(trajectory)
    }

    fn feasible_from(&self, soc_pct: f64) -> Vec<Transition> {
        feasible_transitions(
            &self.grid,
            soc_pct,
            &self.config.battery,
            self.config.resolution_hours,
        )
    }

    /// One ε-greedy episode. The first state is the bin nearest the initial
    /// SOC, while its transition powers use the exact initial SOC.
    fn run_episode<R: Rng>(
        &self,
        q: &mut QTable,
        rng: &mut R,
        epsilon: f64,
        rates: LearningRates,
    ) -> Result<Trajectory> {
        let steps = self.steps();
        let mut soc = self.config.battery.initial_soc_pct;
        let mut state = self.grid.nearest(soc);
        let mut trajectory = Trajectory::with_capacity(steps);

        for (step, &price) in self.prices.iter().enumerate() {
            let actions = self.feasible_from(soc);
            let action = choose_action(rng, epsilon, q, step, state, &actions)
                .ok_or(SchedulerError::NoFeasibleAction { step, soc_pct: soc })?;
            let value = step_value(self.config.use_case, action.power_kw, price);

            let next_value = if step + 1 < steps {
                let next_actions = self.feasible_from(action.soc_pct);
                let next = match self.config.approach {
                    Approach::QLearning => q.max_value(step + 1, action.bin, &next_actions),
                    Approach::Sarsa => {
                        choose_action(rng, epsilon, q, step + 1, action.bin, &next_actions)
                            .map(|next| q.get(step + 1, action.bin, next.bin))
                    }
                };
                Some(next.ok_or(SchedulerError::NoFeasibleAction {
                    step: step + 1,
                    soc_pct: action.soc_pct,
                })?)
            } else {
                None
            };

            q.update(step, state, action.bin, value, next_value, rates);
            trajectory.push(action, value);
            soc = action.soc_pct;
            state = action.bin;
        }

        Ok(trajectory)
    }
}
