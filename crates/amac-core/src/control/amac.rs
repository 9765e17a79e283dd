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

use amac_types::{
    AmacSettings, BatteryConfig, BatteryState, ConfigError, ControllerConfig, Sample,
    SocUpdateBasis, VariabilityThresholds,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::recovery::{adaptive_window, recovery_power, soc_after};
use crate::components::TimeSeriesBuffer;
use crate::estimation::{
    PersistenceForecaster, VariabilityEstimator, VariabilityReading, window_samples,
};

/// Everything the controller carries from one tick to the next
///
/// Owned by the caller and threaded through [`AmacController::step`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub buffer: TimeSeriesBuffer,
    pub battery: BatteryState,
}

impl ControllerState {
    pub fn new(buffer_capacity: usize, soc_pct: f64) -> Self {
        Self {
            buffer: TimeSeriesBuffer::new(buffer_capacity),
            battery: BatteryState::new(soc_pct),
        }
    }

    /// Replace the SOC with an externally measured value
    pub fn with_soc(mut self, soc_pct: f64) -> Self {
        self.battery.soc_pct = soc_pct;
        self
    }

    pub fn soc_pct(&self) -> f64 {
        self.battery.soc_pct
    }

    /// Grow the buffer to what `config` needs. Never shrinks.
    pub fn fit_to(&mut self, config: &ControllerConfig) {
        self.buffer.grow(config.buffer_capacity());
    }
}

/// One measurement fed to the controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    pub timestamp: DateTime<Utc>,

    /// Load/PV power (kW)
    pub power_kw: f64,

    /// Measured SOC; when absent the SOC carried in the state is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_soc_pct: Option<f64>,
}

impl TickInput {
    pub fn new(timestamp: DateTime<Utc>, power_kw: f64) -> Self {
        Self {
            timestamp,
            power_kw,
            measured_soc_pct: None,
        }
    }

    pub fn with_measured_soc(mut self, soc_pct: f64) -> Self {
        self.measured_soc_pct = Some(soc_pct);
        self
    }
}

/// Why a tick did or did not dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickStatus {
    /// Not enough samples for a variability estimate
    WarmingUp,
    /// Variability too low for a positive smoothing window
    WindowCollapsed,
    /// No forecast could be produced from the buffer
    ForecastUnavailable,
    Dispatched,
    /// Non-finite power sample, dropped before reaching the buffer
    InvalidInput,
}

/// Intermediate terms of a tick, all in kW unless noted
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TickDiagnostics {
    /// Fast forecast minus slow forecast
    pub ama_power_kw: f64,

    /// SOC recovery term
    pub asc_power_kw: f64,

    pub instantaneous_residual_kw: f64,

    /// Real-valued smoothing window (samples)
    pub window: f64,

    /// Window after truncation to whole samples
    pub window_samples: usize,

    /// Rolling standard deviation, when warm
    pub variability_kw: Option<f64>,

    /// Rolling mean, when warm
    pub mean_kw: Option<f64>,

    /// Recovery acceleration in `[0, 1]`
    pub acceleration: f64,

    /// The SOC update hit a bound and was clamped
    pub saturated: bool,
}

/// Controller decision for one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    pub timestamp: DateTime<Utc>,

    /// Net power delivered downstream after battery action (kW)
    pub setpoint_kw: f64,

    /// SOC after this tick (%)
    pub soc_pct: f64,

    pub status: TickStatus,

    pub diagnostics: TickDiagnostics,
}

/// Adaptive Moving-Average Controller
///
/// Smooths the fast component of the power signal with the battery while
/// steering SOC back toward a reference. Holds only immutable, validated
/// parameters; per-tick state lives in [`ControllerState`].
#[derive(Debug, Clone)]
pub struct AmacController {
    config: ControllerConfig,
    battery: BatteryConfig,
    thresholds: VariabilityThresholds,
    reference_soc_pct: f64,
    estimator: VariabilityEstimator,
    forecaster: PersistenceForecaster,
}

impl AmacController {
    /// Validate the configuration and build a controller
    pub fn new(config: ControllerConfig, battery: BatteryConfig) -> Result<Self, ConfigError> {
        battery.validate()?;
        config.validate()?;

        let thresholds = config.thresholds();
        let reference_soc_pct = battery.effective_reference_soc();
        let estimator = VariabilityEstimator::new(config.variability.horizon_samples);
        let forecaster = PersistenceForecaster::new(interval_duration(config.data_interval_secs));

        debug!(
            "AMAC thresholds: min {:.3} kW, ref {:.3} kW, max {:.3} kW; reference SOC {:.1}%",
            thresholds.min, thresholds.reference, thresholds.max, reference_soc_pct
        );

        Ok(Self {
            config,
            battery,
            thresholds,
            reference_soc_pct,
            estimator,
            forecaster,
        })
    }

    pub fn from_settings(settings: &AmacSettings) -> Result<Self, ConfigError> {
        Self::new(settings.controller.clone(), settings.battery.clone())
    }

    /// Fresh state with an empty buffer sized for this controller
    pub fn initial_state(&self, soc_pct: f64) -> ControllerState {
        ControllerState::new(self.config.buffer_capacity(), soc_pct)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn battery(&self) -> &BatteryConfig {
        &self.battery
    }

    pub fn thresholds(&self) -> &VariabilityThresholds {
        &self.thresholds
    }

    pub fn reference_soc_pct(&self) -> f64 {
        self.reference_soc_pct
    }

    /// Run one control tick
    ///
    /// Consumes the state and returns the updated one with the decision.
    /// Skipped ticks return a zero setpoint and leave SOC unchanged. A state
    /// whose buffer is smaller than this controller needs is grown first.
    pub fn step(&self, mut state: ControllerState, input: TickInput) -> (ControllerState, TickOutput) {
        state.fit_to(&self.config);
        if let Some(measured) = input.measured_soc_pct {
            state.battery.soc_pct = measured;
        }
        let soc = state.battery.soc_pct;

        let mut diagnostics = TickDiagnostics::default();
        let skip = |status: TickStatus, diagnostics: TickDiagnostics| TickOutput {
            timestamp: input.timestamp,
            setpoint_kw: 0.0,
            soc_pct: soc,
            status,
            diagnostics,
        };

        if !input.power_kw.is_finite() {
            warn!(
                "AMAC dropped non-finite sample {} at {}",
                input.power_kw, input.timestamp
            );
            return (state, skip(TickStatus::InvalidInput, diagnostics));
        }
        state
            .buffer
            .push(Sample::new(input.timestamp, input.power_kw));

        let estimate = match self.estimator.estimate(&state.buffer) {
            VariabilityReading::Ready(estimate) => estimate,
            VariabilityReading::Warming {
                available,
                required,
            } => {
                debug!("AMAC warming up: {available}/{required} samples");
                return (state, skip(TickStatus::WarmingUp, diagnostics));
            }
        };
        let sigma = estimate.std_dev;
        diagnostics.variability_kw = Some(sigma);
        diagnostics.mean_kw = Some(estimate.mean);

        let window = adaptive_window(
            sigma,
            &self.thresholds,
            self.config.max_window_samples,
            self.config.damping,
        );
        let window_len = window_samples(window);
        diagnostics.window = window;
        diagnostics.window_samples = window_len;

        if window_len == 0 {
            debug!("AMAC window collapsed (σ {sigma:.4} kW, window {window:.3})");
            return (state, skip(TickStatus::WindowCollapsed, diagnostics));
        }

        let recovery = recovery_power(
            soc,
            self.reference_soc_pct,
            self.battery.soc_max_pct,
            self.battery.rated_power_kw,
            sigma,
            &self.thresholds,
        );
        diagnostics.asc_power_kw = recovery.power_kw;
        diagnostics.acceleration = recovery.acceleration;

        let fast = self
            .forecaster
            .forecast(&state.buffer, self.config.short_window_samples);
        let slow = self.forecaster.forecast(&state.buffer, window_len);
        let (Some(fast), Some(slow)) = (fast, slow) else {
            warn!("AMAC forecast unavailable with {} samples", state.buffer.len());
            return (state, skip(TickStatus::ForecastUnavailable, diagnostics));
        };

        let ama_power = fast.value - slow.value;
        let residual = ama_power + recovery.power_kw;
        let setpoint = input.power_kw - residual;

        let integrated_power = match self.config.soc_update_basis {
            SocUpdateBasis::Setpoint => setpoint,
            SocUpdateBasis::BatteryPower => residual,
        };
        let raw_soc = soc_after(
            soc,
            integrated_power,
            self.battery.rated_energy_kwh,
            self.config.data_interval_secs,
            self.config.soc_unit_conversion,
        );
        let new_soc = self.battery.clamp_soc(raw_soc);
        if new_soc != raw_soc {
            warn!(
                "SOC {raw_soc:.3}% outside [{}, {}]%, clamped to {new_soc:.3}%",
                self.battery.soc_min_pct, self.battery.soc_max_pct
            );
            diagnostics.saturated = true;
        }

        diagnostics.ama_power_kw = ama_power;
        diagnostics.instantaneous_residual_kw = residual;
        state.battery.soc_pct = new_soc;

        debug!(
            "AMAC tick: load {:.3} kW, ama {:.3} kW, asc {:.3} kW, setpoint {:.3} kW, SOC {:.3}%",
            input.power_kw, ama_power, recovery.power_kw, setpoint, new_soc
        );

        let output = TickOutput {
            timestamp: input.timestamp,
            setpoint_kw: setpoint,
            soc_pct: new_soc,
            status: TickStatus::Dispatched,
            diagnostics,
        };
        (state, output)
    }
}

/// Data interval as a chrono duration, at millisecond resolution
#[expect(clippy::cast_possible_truncation)]
fn interval_duration(secs: f64) -> Duration {
    Duration::milliseconds((secs * 1000.0).round() as i64)
}
