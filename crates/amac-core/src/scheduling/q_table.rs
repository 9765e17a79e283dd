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

use serde::{Deserialize, Serialize};

use super::dynamics::Transition;

/// Action values indexed by (time step, SOC bin, target SOC bin)
///
/// Stored flat in row-major order so the whole table serializes as one array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    steps: usize,
    bins: usize,
    values: Vec<f64>,
}

impl QTable {
    pub fn new(steps: usize, bins: usize) -> Self {
        Self {
            steps,
            bins,
            values: vec![0.0; steps * bins * bins],
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// True when the stored array matches the declared shape
    pub fn is_consistent(&self) -> bool {
        self.values.len() == self.steps * self.bins * self.bins
    }

    fn index(&self, step: usize, state: usize, action: usize) -> usize {
        (step * self.bins + state) * self.bins + action
    }

    pub fn get(&self, step: usize, state: usize, action: usize) -> f64 {
        self.values[self.index(step, state, action)]
    }

    pub fn set(&mut self, step: usize, state: usize, action: usize, value: f64) {
        let idx = self.index(step, state, action);
        self.values[idx] = value;
    }

    /// Values of every action from `state` at `step`
    pub fn row(&self, step: usize, state: usize) -> &[f64] {
        let start = self.index(step, state, 0);
        &self.values[start..start + self.bins]
    }

    /// Highest-valued feasible action; the first one wins ties
    pub fn best_action(
        &self,
        step: usize,
        state: usize,
        actions: &[Transition],
    ) -> Option<Transition> {
        let row = self.row(step, state);
        let mut best: Option<Transition> = None;
        for action in actions {
            match best {
                Some(current) if row[action.bin] <= row[current.bin] => {}
                _ => best = Some(*action),
            }
        }
        best
    }

    /// Value of the best feasible action, `None` when nothing is feasible
    pub fn max_value(&self, step: usize, state: usize, actions: &[Transition]) -> Option<f64> {
        self.best_action(step, state, actions)
            .map(|action| self.get(step, state, action.bin))
    }

    /// Blend a new target into `Q(step, state, action)` and return the result
    pub fn update(
        &mut self,
        step: usize,
        state: usize,
        action: usize,
        reward: f64,
        next_value: Option<f64>,
        rates: LearningRates,
    ) -> f64 {
        let old = self.get(step, state, action);
        let value = temporal_difference(old, reward, next_value, rates);
        self.set(step, state, action, value);
        value
    }
}

/// Learning rate and discount factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningRates {
    pub alpha: f64,
    pub gamma: f64,
}

/// `(1 - α)·old + α·(reward + γ·next)`; terminal steps have no `next`
pub fn temporal_difference(
    old: f64,
    reward: f64,
    next_value: Option<f64>,
    rates: LearningRates,
) -> f64 {
    let target = match next_value {
        Some(next) => reward + rates.gamma * next,
        None => reward,
    };
    (1.0 - rates.alpha) * old + rates.alpha * target
}
