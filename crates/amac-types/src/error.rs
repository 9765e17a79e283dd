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

//! Configuration validation errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        value: usize,
        min: usize,
    },

    #[error(
        "reference variability equals minimum variability ({value} kW); acceleration would divide by zero"
    )]
    ZeroVariabilitySpan { value: f64 },

    #[error(
        "variability thresholds out of order: min {min} kW, reference {reference} kW, max {max} kW"
    )]
    ThresholdOrder { min: f64, reference: f64, max: f64 },

    #[error("SOC bounds inverted: min {min}% must be below max {max}%")]
    SocBounds { min: f64, max: f64 },

    #[error("reference margin {margin}% leaves no admissible reference SOC between {min}% and {max}%")]
    ReferenceMargin { margin: f64, min: f64, max: f64 },

    #[error("reference SOC {reference}% equals maximum SOC {max}%; recovery power would divide by zero")]
    ZeroSocHeadroom { reference: f64, max: f64 },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Rejects zero, negative and NaN values.
pub(crate) fn ensure_positive(field: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

pub(crate) fn ensure_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

pub(crate) fn ensure_at_least(field: &'static str, value: usize, min: usize) -> Result<()> {
    if value >= min {
        Ok(())
    } else {
        Err(ConfigError::TooSmall { field, value, min })
    }
}
