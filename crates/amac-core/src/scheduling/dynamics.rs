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

//! Battery dynamics on the discretized SOC grid

use amac_types::{SchedulerBatteryConfig, UseCase};
use serde::{Deserialize, Serialize};

/// Slack when comparing implied power with the rating
const POWER_TOLERANCE_KW: f64 = 1e-9;

/// Evenly spaced SOC levels covering `[soc_low, soc_high]` inclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocGrid {
    levels: Vec<f64>,
}

impl SocGrid {
    /// `bins` must be at least 2 (enforced by config validation)
    #[expect(clippy::cast_precision_loss)]
    pub fn new(soc_low_pct: f64, soc_high_pct: f64, bins: usize) -> Self {
        let step = (soc_high_pct - soc_low_pct) / (bins.max(2) - 1) as f64;
        let levels = (0..bins)
            .map(|i| {
                if i + 1 == bins {
                    soc_high_pct
                } else {
                    soc_low_pct + step * i as f64
                }
            })
            .collect();
        Self { levels }
    }

    pub fn for_battery(battery: &SchedulerBatteryConfig, bins: usize) -> Self {
        Self::new(battery.soc_low_pct, battery.soc_high_pct, bins)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn level(&self, bin: usize) -> f64 {
        self.levels[bin]
    }

    /// Bin closest to `soc_pct`; the lower bin wins ties
    pub fn nearest(&self, soc_pct: f64) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (bin, level) in self.levels.iter().enumerate() {
            let distance = (level - soc_pct).abs();
            if distance < best_distance {
                best = bin;
                best_distance = distance;
            }
        }
        best
    }
}

/// A move to a target SOC bin and the grid-side power it implies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub bin: usize,
    pub soc_pct: f64,
    /// Positive while charging (kW)
    pub power_kw: f64,
}

/// Grid-side power for moving between two SOC levels in one interval
///
/// Charging draws `ΔE / η`, discharging delivers `ΔE · η`.
pub fn transition_power(
    from_soc_pct: f64,
    to_soc_pct: f64,
    battery: &SchedulerBatteryConfig,
    resolution_hours: f64,
) -> f64 {
    let stored_kw =
        (to_soc_pct - from_soc_pct) / 100.0 * battery.rated_energy_kwh / resolution_hours;
    if stored_kw > 0.0 {
        stored_kw / battery.efficiency
    } else {
        stored_kw * battery.efficiency
    }
}

/// Feasibility mask: every bin reachable from `from_soc_pct` within the power rating
pub fn feasible_transitions(
    grid: &SocGrid,
    from_soc_pct: f64,
    battery: &SchedulerBatteryConfig,
    resolution_hours: f64,
) -> Vec<Transition> {
    grid.levels()
        .iter()
        .enumerate()
        .filter_map(|(bin, &level)| {
            let power_kw = transition_power(from_soc_pct, level, battery, resolution_hours);
            (power_kw.abs() <= battery.rated_power_kw + POWER_TOLERANCE_KW).then_some(
                Transition {
                    bin,
                    soc_pct: level,
                    power_kw,
                },
            )
        })
        .collect()
}

/// Per-step value of drawing `power_kw` at `price`; the learner maximizes it
pub fn step_value(use_case: UseCase, power_kw: f64, price: f64) -> f64 {
    match use_case {
        UseCase::EnergyArbitrage => -power_kw * price,
        UseCase::FrequencyRegulation => power_kw.abs() * price,
    }
}
