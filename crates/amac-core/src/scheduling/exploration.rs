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

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::dynamics::Transition;
use super::q_table::QTable;

/// Stepwise ε decay: divided by `decay` every `interval` episodes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpsilonSchedule {
    epsilon: f64,
    decay: f64,
    interval: usize,
    next_decay_episode: usize,
}

impl EpsilonSchedule {
    pub fn new(initial: f64, decay: f64, interval: usize) -> Self {
        let interval = interval.max(1);
        Self {
            epsilon: initial,
            decay,
            interval,
            next_decay_episode: interval,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    /// ε to use for `episode`, decaying first when a boundary is reached
    ///
    /// Episodes are expected in increasing order.
    pub fn for_episode(&mut self, episode: usize) -> f64 {
        while episode >= self.next_decay_episode {
            self.epsilon /= self.decay;
            self.next_decay_episode += self.interval;
        }
        self.epsilon
    }
}

/// ε-greedy pick among feasible actions
///
/// Explores uniformly with probability ε, otherwise takes the best
/// action in `q`. Returns `None` when `actions` is empty.
pub fn choose_action<R: Rng + ?Sized>(
    rng: &mut R,
    epsilon: f64,
    q: &QTable,
    step: usize,
    state: usize,
    actions: &[Transition],
) -> Option<Transition> {
    if actions.is_empty() {
        return None;
    }
    if rng.gen_range(0.0..1.0) < epsilon {
        Some(actions[rng.gen_range(0..actions.len())])
    } else {
        q.best_action(step, state, actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn actions() -> Vec<Transition> {
        (0..3)
            .map(|bin| Transition {
                bin,
                soc_pct: 0.0,
                power_kw: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_epsilon_decays_at_interval_boundaries() {
        let mut schedule = EpsilonSchedule::new(0.8, 2.0, 10);
        assert_eq!(schedule.for_episode(0), 0.8);
        assert_eq!(schedule.for_episode(9), 0.8);
        assert_eq!(schedule.for_episode(10), 0.4);
        assert_eq!(schedule.for_episode(19), 0.4);
        assert_eq!(schedule.for_episode(20), 0.2);
    }

    #[test]
    fn test_epsilon_catches_up_after_skipped_episodes() {
        let mut schedule = EpsilonSchedule::new(0.8, 2.0, 10);
        assert_eq!(schedule.for_episode(35), 0.1);
    }

    #[test]
    fn test_zero_interval_treated_as_one() {
        let schedule = EpsilonSchedule::new(0.5, 1.1, 0);
        assert_eq!(schedule.interval(), 1);
    }

    #[test]
    fn test_greedy_when_epsilon_zero() {
        let mut q = QTable::new(1, 3);
        q.set(0, 0, 2, 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let pick = choose_action(&mut rng, 0.0, &q, 0, 0, &actions());
            assert_eq!(pick.map(|a| a.bin), Some(2));
        }
    }

    #[test]
    fn test_full_exploration_visits_every_action() {
        let q = QTable::new(1, 3);
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 3];
        for _ in 0..200 {
            if let Some(action) = choose_action(&mut rng, 1.0, &q, 0, 0, &actions()) {
                seen[action.bin] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_no_actions_no_choice() {
        let q = QTable::new(1, 3);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(choose_action(&mut rng, 0.5, &q, 0, 0, &[]).is_none());
    }
}
