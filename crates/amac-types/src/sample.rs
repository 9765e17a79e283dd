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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single measurement of the load/PV signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Measurement time. Callers append in non-decreasing order.
    pub timestamp: DateTime<Utc>,

    /// Measured power (kW)
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Sample stamped with the current wall-clock time
    pub fn now(value: f64) -> Self {
        Self::new(Utc::now(), value)
    }
}

/// Battery state threaded through controller ticks and RL episodes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryState {
    /// State of charge (%)
    pub soc_pct: f64,
}

impl BatteryState {
    pub fn new(soc_pct: f64) -> Self {
        Self { soc_pct }
    }
}
