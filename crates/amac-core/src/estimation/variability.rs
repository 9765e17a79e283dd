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

use crate::components::TimeSeriesBuffer;

/// Latest rolling statistics of the power signal (kW)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariabilityEstimate {
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std_dev: f64,
}

/// Result of asking for variability on a buffer that may not be warm yet
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariabilityReading {
    /// Fewer samples than the horizon; dispatch must be skipped
    Warming { available: usize, required: usize },
    Ready(VariabilityEstimate),
}

impl VariabilityReading {
    pub fn estimate(&self) -> Option<VariabilityEstimate> {
        match self {
            Self::Ready(estimate) => Some(*estimate),
            Self::Warming { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Rolling mean/std over a fixed horizon with `min_periods = horizon`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariabilityEstimator {
    horizon: usize,
}

impl VariabilityEstimator {
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Statistics over the most recent `horizon` samples
    #[expect(clippy::cast_precision_loss)]
    pub fn estimate(&self, buffer: &TimeSeriesBuffer) -> VariabilityReading {
        // A standard deviation needs two points even if the horizon says less
        let required = self.horizon.max(2);
        if buffer.len() < required {
            return VariabilityReading::Warming {
                available: buffer.len(),
                required,
            };
        }

        let n = required as f64;
        let mean = buffer.recent_values(required).sum::<f64>() / n;
        let sum_sq: f64 = buffer
            .recent_values(required)
            .map(|v| (v - mean).powi(2))
            .sum();
        let std_dev = (sum_sq / (n - 1.0)).sqrt();

        VariabilityReading::Ready(VariabilityEstimate { mean, std_dev })
    }
}

impl Default for VariabilityEstimator {
    fn default() -> Self {
        Self::new(900)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(values: &[f64]) -> TimeSeriesBuffer {
        let mut buffer = TimeSeriesBuffer::new(values.len().max(1));
        for &v in values {
            buffer.append(v);
        }
        buffer
    }

    #[test]
    fn test_not_ready_below_horizon() {
        let estimator = VariabilityEstimator::new(4);
        let reading = estimator.estimate(&buffer_with(&[1.0, 2.0, 3.0]));
        assert_eq!(
            reading,
            VariabilityReading::Warming {
                available: 3,
                required: 4
            }
        );
        assert!(reading.estimate().is_none());
    }

    #[test]
    fn test_sample_std_over_latest_window() {
        let estimator = VariabilityEstimator::new(4);
        // Only the last four values (2, 4, 4, 6) are in the window
        let buffer = buffer_with(&[100.0, 2.0, 4.0, 4.0, 6.0]);
        let estimate = estimator.estimate(&buffer).estimate().unwrap();

        assert!((estimate.mean - 4.0).abs() < 1e-12);
        // Deviations: -2, 0, 0, 2 -> 8 / 3
        assert!((estimate.std_dev - (8.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_constant_signal_has_zero_variability() {
        let estimator = VariabilityEstimator::new(10);
        let buffer = buffer_with(&[42.5; 10]);
        let estimate = estimator.estimate(&buffer).estimate().unwrap();
        assert_eq!(estimate.mean, 42.5);
        assert_eq!(estimate.std_dev, 0.0);
    }

    #[test]
    fn test_default_horizon_matches_controller_default() {
        assert_eq!(VariabilityEstimator::default().horizon(), 900);
    }
}
