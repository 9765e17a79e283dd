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

//! Closed-form pieces of the AMAC control law
//!
//! Kept free of state so each term can be checked on its own. Sign
//! convention: positive power charges the battery / raises SOC.

use amac_types::VariabilityThresholds;

/// Smoothing window (samples, real-valued) for the current variability
///
/// `W_max * (σ - σ_min) / (σ + (σ_max - σ) / damping)`. Grows with σ.
/// A non-positive or non-finite result means "do not dispatch".
pub fn adaptive_window(
    sigma: f64,
    thresholds: &VariabilityThresholds,
    max_window: f64,
    damping: f64,
) -> f64 {
    let denominator = sigma + (thresholds.max - sigma) / damping;
    if denominator <= 0.0 {
        return 0.0;
    }
    max_window * (sigma - thresholds.min) / denominator
}

/// How hard SOC recovery pushes, in `[0, 1]`
pub fn acceleration(sigma: f64, thresholds: &VariabilityThresholds) -> f64 {
    if sigma > thresholds.min {
        ((sigma - thresholds.min) / (thresholds.reference - thresholds.min)).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// SOC recovery contribution and the acceleration that scaled it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryTerm {
    pub power_kw: f64,
    pub acceleration: f64,
}

/// Power steering SOC back toward the reference
///
/// Discharges (negative) above the reference, charges below it. Zero when
/// SOC sits on the reference or variability is below the minimum threshold.
pub fn recovery_power(
    soc_pct: f64,
    reference_soc_pct: f64,
    soc_max_pct: f64,
    rated_power_kw: f64,
    sigma: f64,
    thresholds: &VariabilityThresholds,
) -> RecoveryTerm {
    let acceleration = acceleration(sigma, thresholds);
    let delta = soc_pct - reference_soc_pct;

    if delta == 0.0 || sigma < thresholds.min {
        return RecoveryTerm {
            power_kw: 0.0,
            acceleration,
        };
    }

    let sign = if delta > 0.0 { -1.0 } else { 1.0 };
    let depth = (delta.abs() / (soc_max_pct - reference_soc_pct)).min(1.0);

    RecoveryTerm {
        power_kw: sign * rated_power_kw * depth * acceleration,
        acceleration,
    }
}

/// SOC after applying `power_kw` for one tick
///
/// `soc + power / (energy_kwh * interval_secs) / conversion`.
pub fn soc_after(
    soc_pct: f64,
    power_kw: f64,
    rated_energy_kwh: f64,
    data_interval_secs: f64,
    conversion: f64,
) -> f64 {
    soc_pct + power_kw / (rated_energy_kwh * data_interval_secs) / conversion
}

#[cfg(test)]
mod tests {
    use super::*;
    use amac_types::SOC_UNIT_CONVERSION;

    fn thresholds() -> VariabilityThresholds {
        VariabilityThresholds {
            min: 2.0,
            reference: 10.0,
            max: 50.0,
        }
    }

    #[test]
    fn test_window_negative_below_min_variability() {
        assert!(adaptive_window(1.0, &thresholds(), 2100.0, 8.0) < 0.0);
        assert_eq!(adaptive_window(2.0, &thresholds(), 2100.0, 8.0), 0.0);
    }

    #[test]
    fn test_window_grows_with_variability() {
        let low = adaptive_window(5.0, &thresholds(), 2100.0, 8.0);
        let high = adaptive_window(30.0, &thresholds(), 2100.0, 8.0);
        assert!(low > 0.0);
        assert!(high > low);

        // σ = σ_max: W_max * (50 - 2) / 50
        let at_max = adaptive_window(50.0, &thresholds(), 2100.0, 8.0);
        assert!((at_max - 2016.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_with_degenerate_denominator() {
        let t = VariabilityThresholds {
            min: 0.0,
            reference: 1.0,
            max: 0.0,
        };
        assert_eq!(adaptive_window(0.0, &t, 100.0, 8.0), 0.0);
    }

    #[test]
    fn test_acceleration_clamped() {
        assert_eq!(acceleration(1.0, &thresholds()), 0.0);
        assert_eq!(acceleration(2.0, &thresholds()), 0.0);
        assert!((acceleration(6.0, &thresholds()) - 0.5).abs() < 1e-12);
        assert_eq!(acceleration(40.0, &thresholds()), 1.0);
    }

    #[test]
    fn test_recovery_zero_below_min_variability() {
        let term = recovery_power(80.0, 50.0, 90.0, 125.0, 1.5, &thresholds());
        assert_eq!(term.power_kw, 0.0);
    }

    #[test]
    fn test_recovery_zero_on_reference_regardless_of_variability() {
        for sigma in [0.0, 2.0, 6.0, 100.0] {
            let term = recovery_power(50.0, 50.0, 90.0, 125.0, sigma, &thresholds());
            assert_eq!(term.power_kw, 0.0);
        }
    }

    #[test]
    fn test_recovery_direction_and_scale() {
        // Above reference by 20 of 40 headroom, full acceleration
        let above = recovery_power(70.0, 50.0, 90.0, 125.0, 20.0, &thresholds());
        assert!((above.power_kw + 62.5).abs() < 1e-9);

        // Below reference by 30: depth saturates at 0.75, half acceleration
        let below = recovery_power(20.0, 50.0, 90.0, 125.0, 6.0, &thresholds());
        assert!((below.power_kw - 125.0 * 0.75 * 0.5).abs() < 1e-9);

        // Far below: depth capped at 1
        let far = recovery_power(0.0, 50.0, 90.0, 100.0, 20.0, &thresholds());
        assert!((far.power_kw - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_soc_update_uses_named_conversion() {
        // 72 kW into 200 kWh over one second: 72 / 200 / 36 = 0.01 %
        let soc = soc_after(50.0, 72.0, 200.0, 1.0, SOC_UNIT_CONVERSION);
        assert!((soc - 50.01).abs() < 1e-12);

        let soc = soc_after(50.0, -72.0, 200.0, 1.0, SOC_UNIT_CONVERSION);
        assert!((soc - 49.99).abs() < 1e-12);

        assert_eq!(soc_after(50.0, 0.0, 200.0, 1.0, SOC_UNIT_CONVERSION), 50.0);
    }
}
