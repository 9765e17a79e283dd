// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

//! Synthetic price series for scheduler training.
//!
//! Each scenario describes a daily shape sampled at `steps` evenly spaced
//! points, so one day can be planned at hourly or quarter-hourly resolution:
//!
//! - **Flat**: constant price with a little noise, nothing to arbitrage
//! - **Usual Day**: cheap overnight, morning ramp, noon dip, evening peak
//! - **Volatile**: large swings across the whole day
//! - **Arbitrage**: clean two-level night/evening spread, no noise

use anyhow::{Result, anyhow};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceScenario {
    Flat,
    UsualDay,
    Volatile,
    Arbitrage,
}

impl PriceScenario {
    pub fn name(&self) -> &str {
        match self {
            Self::Flat => "Flat",
            Self::UsualDay => "Usual Day",
            Self::Volatile => "Volatile Prices",
            Self::Arbitrage => "Arbitrage Spread",
        }
    }

    pub fn from_id(id: &str) -> Result<Self> {
        PRICE_PRESETS
            .iter()
            .find(|preset| preset.id == id)
            .map(|preset| preset.scenario)
            .ok_or_else(|| {
                let known: Vec<&str> = PRICE_PRESETS.iter().map(|p| p.id).collect();
                anyhow!("Unknown price scenario '{id}' (known: {})", known.join(", "))
            })
    }

    /// Prices (per kWh) for one day split into `steps` intervals
    pub fn generate<R: Rng + ?Sized>(&self, steps: usize, rng: &mut R) -> Vec<f64> {
        (0..steps)
            .map(|i| {
                let hour = hour_of(i, steps);
                match self {
                    Self::Flat => 0.25 * (1.0 + rng.gen_range(-0.02..0.02)),
                    Self::UsualDay => usual_day_base(hour) * (1.0 + rng.gen_range(-0.10..0.10)),
                    Self::Volatile => {
                        let (low, high) = volatile_band(hour);
                        rng.gen_range(low..high)
                    }
                    Self::Arbitrage => arbitrage_level(hour),
                }
            })
            .collect()
    }
}

/// Scenario preset with metadata
#[derive(Debug, Clone)]
pub struct PriceScenarioPreset {
    pub id: &'static str,
    pub description: &'static str,
    pub scenario: PriceScenario,
}

pub const PRICE_PRESETS: &[PriceScenarioPreset] = &[
    PriceScenarioPreset {
        id: "flat",
        description: "Constant price with ±2% noise",
        scenario: PriceScenario::Flat,
    },
    PriceScenarioPreset {
        id: "usual_day",
        description: "Cheap overnight (0-6), elevated day, noon dip (12-14), evening peak (17-20)",
        scenario: PriceScenario::UsualDay,
    },
    PriceScenarioPreset {
        id: "volatile",
        description: "Large price swings throughout the day",
        scenario: PriceScenario::Volatile,
    },
    PriceScenarioPreset {
        id: "arbitrage",
        description: "0.10 overnight and midday, 0.50 in the evening peak, no noise",
        scenario: PriceScenario::Arbitrage,
    },
];

/// Hour of day (0..24) at which interval `i` of `steps` starts
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn hour_of(i: usize, steps: usize) -> u32 {
    (24.0 * i as f64 / steps.max(1) as f64).floor() as u32
}

fn usual_day_base(hour: u32) -> f64 {
    match hour {
        0..=5 => 0.15,
        6..=11 => 0.35,
        12..=13 => 0.28,
        14..=16 => 0.32,
        17..=19 => 0.45,
        _ => 0.25,
    }
}

fn volatile_band(hour: u32) -> (f64, f64) {
    match hour {
        0..=2 => (0.05, 0.12),
        3..=5 => (0.15, 0.40),
        6..=9 => (0.40, 0.75),
        10..=13 => (0.10, 0.25),
        14..=16 => (0.40, 0.65),
        17..=19 => (0.70, 0.90),
        _ => (0.15, 0.35),
    }
}

fn arbitrage_level(hour: u32) -> f64 {
    match hour {
        17..=20 => 0.50,
        _ => 0.10,
    }
}
