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

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::components::TimeSeriesBuffer;

/// Persistence forecast of the power signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Rolling mean (kW)
    pub value: f64,

    /// Timestamp of the newest sample in the window
    pub issued_at: DateTime<Utc>,

    /// `issued_at` plus the forecaster lead time, or `issued_at` when that
    /// is past the representable range
    pub valid_at: DateTime<Utc>,

    /// Samples actually averaged (may be fewer than requested)
    pub samples_used: usize,
}

/// Map a real-valued window size onto a sample count.
///
/// Truncates toward zero. Negative, NaN and infinite windows map to zero
/// samples, which yields no forecast.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn window_samples(window: f64) -> usize {
    if window.is_finite() && window >= 1.0 {
        window.trunc() as usize
    } else {
        0
    }
}

/// Rolling-mean forecaster with `min_periods = 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceForecaster {
    lead: Duration,
}

impl PersistenceForecaster {
    /// Forecaster whose results are stamped `lead` after the newest sample
    pub fn new(lead: Duration) -> Self {
        Self { lead }
    }

    pub fn lead(&self) -> Duration {
        self.lead
    }

    /// Mean of the latest `window` samples, or all of them if fewer exist.
    ///
    /// Returns `None` for an empty buffer or a zero window.
    #[expect(clippy::cast_precision_loss)]
    pub fn forecast(&self, buffer: &TimeSeriesBuffer, window: usize) -> Option<Forecast> {
        if window == 0 {
            return None;
        }
        let latest = buffer.latest()?;

        let samples_used = window.min(buffer.len());
        let value = buffer.recent_values(samples_used).sum::<f64>() / samples_used as f64;

        Some(Forecast {
            value,
            issued_at: latest.timestamp,
            valid_at: latest
                .timestamp
                .checked_add_signed(self.lead)
                .unwrap_or(latest.timestamp),
            samples_used,
        })
    }

    /// Forecast over a real-valued window, see [`window_samples`]
    pub fn forecast_real(&self, buffer: &TimeSeriesBuffer, window: f64) -> Option<Forecast> {
        self.forecast(buffer, window_samples(window))
    }
}

impl Default for PersistenceForecaster {
    fn default() -> Self {
        Self::new(Duration::zero())
    }
}
