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
use tracing::warn;

use crate::error::{ConfigError, Result, ensure_at_least, ensure_positive, ensure_range};

/// Divisor turning `kW / (kWh * s)` into percent SOC per tick.
///
/// 3600 s/h divided by the 100 % scale. Only dimensionally exact for a
/// 1-second data interval, see [`ControllerConfig::validate`].
pub const SOC_UNIT_CONVERSION: f64 = 36.0;

// ============= Settings Root =============

/// All engine settings, as loaded from `amac.toml` / `amac.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmacSettings {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub battery: BatteryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl AmacSettings {
    pub fn validate(&self) -> Result<()> {
        self.battery.validate()?;
        self.controller.validate()?;
        self.scheduler.validate()
    }
}

// ============= Battery (real-time controller) =============

fn default_rated_power_kw() -> f64 {
    125.0
}

fn default_rated_energy_kwh() -> f64 {
    200.0
}

fn default_efficiency() -> f64 {
    0.925
}

fn default_soc_min() -> f64 {
    10.0
}

fn default_soc_max() -> f64 {
    90.0
}

fn default_reference_soc() -> f64 {
    50.0
}

fn default_reference_margin() -> f64 {
    10.0
}

/// BESS parameters used by the AMAC controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryConfig {
    /// Rated charge/discharge power (kW)
    #[serde(default = "default_rated_power_kw")]
    pub rated_power_kw: f64,

    /// Rated energy capacity (kWh)
    #[serde(default = "default_rated_energy_kwh")]
    pub rated_energy_kwh: f64,

    /// Round-trip efficiency (0.0 to 1.0)
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,

    #[serde(default = "default_soc_min")]
    pub soc_min_pct: f64,

    #[serde(default = "default_soc_max")]
    pub soc_max_pct: f64,

    /// SOC the recovery term steers toward (%)
    #[serde(default = "default_reference_soc")]
    pub reference_soc_pct: f64,

    /// The reference is kept this far inside the SOC bounds (%)
    #[serde(default = "default_reference_margin")]
    pub reference_soc_margin_pct: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            rated_power_kw: default_rated_power_kw(),
            rated_energy_kwh: default_rated_energy_kwh(),
            efficiency: default_efficiency(),
            soc_min_pct: default_soc_min(),
            soc_max_pct: default_soc_max(),
            reference_soc_pct: default_reference_soc(),
            reference_soc_margin_pct: default_reference_margin(),
        }
    }
}

impl BatteryConfig {
    /// Reference SOC clamped into `[soc_min + margin, soc_max - margin]`
    pub fn effective_reference_soc(&self) -> f64 {
        let upper = self.soc_max_pct - self.reference_soc_margin_pct;
        let lower = self.soc_min_pct + self.reference_soc_margin_pct;
        self.reference_soc_pct.min(upper).max(lower)
    }

    /// Clamp an SOC value into the usable band
    pub fn clamp_soc(&self, soc_pct: f64) -> f64 {
        soc_pct.max(self.soc_min_pct).min(self.soc_max_pct)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("battery.rated_power_kw", self.rated_power_kw)?;
        ensure_positive("battery.rated_energy_kwh", self.rated_energy_kwh)?;
        ensure_positive("battery.efficiency", self.efficiency)?;
        ensure_range("battery.efficiency", self.efficiency, 0.0, 1.0)?;
        ensure_range("battery.soc_min_pct", self.soc_min_pct, 0.0, 100.0)?;
        ensure_range("battery.soc_max_pct", self.soc_max_pct, 0.0, 100.0)?;
        ensure_range(
            "battery.reference_soc_margin_pct",
            self.reference_soc_margin_pct,
            0.0,
            50.0,
        )?;

        if self.soc_min_pct >= self.soc_max_pct {
            return Err(ConfigError::SocBounds {
                min: self.soc_min_pct,
                max: self.soc_max_pct,
            });
        }

        if self.soc_min_pct + self.reference_soc_margin_pct
            > self.soc_max_pct - self.reference_soc_margin_pct
        {
            return Err(ConfigError::ReferenceMargin {
                margin: self.reference_soc_margin_pct,
                min: self.soc_min_pct,
                max: self.soc_max_pct,
            });
        }

        let reference = self.effective_reference_soc();
        if reference == self.soc_max_pct {
            return Err(ConfigError::ZeroSocHeadroom {
                reference,
                max: self.soc_max_pct,
            });
        }

        Ok(())
    }
}

// ============= Variability =============

fn default_min_variability_pct() -> f64 {
    2.0
}

fn default_reference_variability_pct() -> f64 {
    10.0
}

fn default_max_variability_pct() -> f64 {
    50.0
}

fn default_variability_horizon() -> usize {
    900
}

/// Variability regime boundaries, as percent of rated PV power
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariabilityConfig {
    #[serde(default = "default_min_variability_pct")]
    pub min_pct: f64,

    #[serde(default = "default_reference_variability_pct")]
    pub reference_pct: f64,

    #[serde(default = "default_max_variability_pct")]
    pub max_pct: f64,

    /// Rolling window (samples) for the standard deviation
    #[serde(default = "default_variability_horizon")]
    pub horizon_samples: usize,
}

impl Default for VariabilityConfig {
    fn default() -> Self {
        Self {
            min_pct: default_min_variability_pct(),
            reference_pct: default_reference_variability_pct(),
            max_pct: default_max_variability_pct(),
            horizon_samples: default_variability_horizon(),
        }
    }
}

/// Absolute variability thresholds (kW)
///
/// Derived once from the rated PV power and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariabilityThresholds {
    pub min: f64,
    pub reference: f64,
    pub max: f64,
}

impl VariabilityThresholds {
    pub fn from_rated_power(pv_rated_power_kw: f64, config: &VariabilityConfig) -> Self {
        Self {
            min: pv_rated_power_kw * config.min_pct / 100.0,
            reference: pv_rated_power_kw * config.reference_pct / 100.0,
            max: pv_rated_power_kw * config.max_pct / 100.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.reference == self.min {
            return Err(ConfigError::ZeroVariabilitySpan { value: self.min });
        }
        if !(self.min < self.reference && self.reference <= self.max) {
            return Err(ConfigError::ThresholdOrder {
                min: self.min,
                reference: self.reference,
                max: self.max,
            });
        }
        Ok(())
    }
}

// ============= Controller =============

fn default_damping() -> f64 {
    8.0
}

fn default_max_window() -> f64 {
    2100.0
}

fn default_short_window() -> usize {
    1
}

fn default_pv_rated_power_kw() -> f64 {
    100.0
}

fn default_data_interval_secs() -> f64 {
    1.0
}

fn default_soc_unit_conversion() -> f64 {
    SOC_UNIT_CONVERSION
}

/// Which power the per-tick SOC update integrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocUpdateBasis {
    /// The downstream setpoint (`load - residual`)
    #[default]
    Setpoint,
    /// Power absorbed by the battery, i.e. the instantaneous residual
    BatteryPower,
}

/// Adaptive moving-average controller parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Damping of the window-size response to variability
    #[serde(default = "default_damping")]
    pub damping: f64,

    /// Largest smoothing window (samples)
    #[serde(default = "default_max_window")]
    pub max_window_samples: f64,

    /// Window (samples) of the fast forecast in the smoothing residual
    #[serde(default = "default_short_window")]
    pub short_window_samples: usize,

    /// Rated PV power the variability percentages refer to (kW)
    #[serde(default = "default_pv_rated_power_kw")]
    pub pv_rated_power_kw: f64,

    #[serde(default)]
    pub variability: VariabilityConfig,

    /// Seconds between ticks
    #[serde(default = "default_data_interval_secs")]
    pub data_interval_secs: f64,

    /// Divisor of the SOC update, see [`SOC_UNIT_CONVERSION`]
    #[serde(default = "default_soc_unit_conversion")]
    pub soc_unit_conversion: f64,

    #[serde(default)]
    pub soc_update_basis: SocUpdateBasis,

    /// Sample buffer capacity. Defaults to the variability horizon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_capacity: Option<usize>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            max_window_samples: default_max_window(),
            short_window_samples: default_short_window(),
            pv_rated_power_kw: default_pv_rated_power_kw(),
            variability: VariabilityConfig::default(),
            data_interval_secs: default_data_interval_secs(),
            soc_unit_conversion: default_soc_unit_conversion(),
            soc_update_basis: SocUpdateBasis::default(),
            buffer_capacity: None,
        }
    }
}

impl ControllerConfig {
    pub fn thresholds(&self) -> VariabilityThresholds {
        VariabilityThresholds::from_rated_power(self.pv_rated_power_kw, &self.variability)
    }

    /// Effective buffer capacity, never below the variability horizon
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
            .unwrap_or(self.variability.horizon_samples)
            .max(self.variability.horizon_samples)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("controller.damping", self.damping)?;
        ensure_positive("controller.max_window_samples", self.max_window_samples)?;
        ensure_at_least(
            "controller.short_window_samples",
            self.short_window_samples,
            1,
        )?;
        ensure_positive("controller.pv_rated_power_kw", self.pv_rated_power_kw)?;
        ensure_positive("controller.data_interval_secs", self.data_interval_secs)?;
        ensure_positive("controller.soc_unit_conversion", self.soc_unit_conversion)?;
        ensure_at_least(
            "controller.variability.horizon_samples",
            self.variability.horizon_samples,
            2,
        )?;
        ensure_range("controller.variability.min_pct", self.variability.min_pct, 0.0, 100.0)?;
        ensure_range(
            "controller.variability.reference_pct",
            self.variability.reference_pct,
            0.0,
            100.0,
        )?;
        ensure_range("controller.variability.max_pct", self.variability.max_pct, 0.0, 100.0)?;
        self.thresholds().validate()?;

        if (self.data_interval_secs - 1.0).abs() > f64::EPSILON {
            warn!(
                "SOC update divides by the data interval ({}s); conversion constant {} assumes 1s ticks",
                self.data_interval_secs, self.soc_unit_conversion
            );
        }

        Ok(())
    }
}

// ============= RL Scheduler =============

/// What the scheduler is paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    /// Buy low, sell high: charging costs, discharging earns
    #[default]
    EnergyArbitrage,
    /// Any activity is priced regardless of direction
    FrequencyRegulation,
}

/// Temporal-difference target used by the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    #[default]
    #[serde(alias = "q-learning", alias = "Q-learning")]
    QLearning,
    #[serde(alias = "SARSA")]
    Sarsa,
}

fn default_scheduler_power_kw() -> f64 {
    1.0
}

fn default_scheduler_energy_kwh() -> f64 {
    4.0
}

fn default_scheduler_efficiency() -> f64 {
    0.95
}

fn default_soc_low() -> f64 {
    10.0
}

fn default_soc_high() -> f64 {
    90.0
}

fn default_initial_soc() -> f64 {
    50.0
}

/// Battery as seen by the offline scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerBatteryConfig {
    #[serde(default = "default_scheduler_power_kw")]
    pub rated_power_kw: f64,

    #[serde(default = "default_scheduler_energy_kwh")]
    pub rated_energy_kwh: f64,

    /// Applied on both charge and discharge legs
    #[serde(default = "default_scheduler_efficiency")]
    pub efficiency: f64,

    #[serde(default = "default_soc_low")]
    pub soc_low_pct: f64,

    #[serde(default = "default_soc_high")]
    pub soc_high_pct: f64,

    #[serde(default = "default_initial_soc")]
    pub initial_soc_pct: f64,
}

impl Default for SchedulerBatteryConfig {
    fn default() -> Self {
        Self {
            rated_power_kw: default_scheduler_power_kw(),
            rated_energy_kwh: default_scheduler_energy_kwh(),
            efficiency: default_scheduler_efficiency(),
            soc_low_pct: default_soc_low(),
            soc_high_pct: default_soc_high(),
            initial_soc_pct: default_initial_soc(),
        }
    }
}

impl SchedulerBatteryConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("scheduler.battery.rated_power_kw", self.rated_power_kw)?;
        ensure_positive("scheduler.battery.rated_energy_kwh", self.rated_energy_kwh)?;
        ensure_positive("scheduler.battery.efficiency", self.efficiency)?;
        ensure_range("scheduler.battery.efficiency", self.efficiency, 0.0, 1.0)?;
        ensure_range("scheduler.battery.soc_low_pct", self.soc_low_pct, 0.0, 100.0)?;
        ensure_range("scheduler.battery.soc_high_pct", self.soc_high_pct, 0.0, 100.0)?;
        if self.soc_low_pct >= self.soc_high_pct {
            return Err(ConfigError::SocBounds {
                min: self.soc_low_pct,
                max: self.soc_high_pct,
            });
        }
        ensure_range(
            "scheduler.battery.initial_soc_pct",
            self.initial_soc_pct,
            self.soc_low_pct,
            self.soc_high_pct,
        )
    }
}

fn default_iterations() -> usize {
    2000
}

fn default_epsilon_initial() -> f64 {
    0.7
}

fn default_epsilon_decay() -> f64 {
    1.07
}

fn default_alpha() -> f64 {
    1.0
}

fn default_gamma() -> f64 {
    1.0
}

fn default_discrete_levels() -> usize {
    20
}

/// Tabular learner hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Number of training episodes
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    #[serde(default = "default_epsilon_initial")]
    pub epsilon_initial: f64,

    /// ε is divided by this factor at every decay interval
    #[serde(default = "default_epsilon_decay")]
    pub epsilon_decay: f64,

    /// Episodes between ε decays. Defaults to 50·K/24 for a K-step horizon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon_interval: Option<usize>,

    /// Learning rate
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Discount factor
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// Number of SOC bins
    #[serde(default = "default_discrete_levels")]
    pub discrete_levels: usize,

    /// RNG seed for reproducible training
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            epsilon_initial: default_epsilon_initial(),
            epsilon_decay: default_epsilon_decay(),
            epsilon_interval: None,
            alpha: default_alpha(),
            gamma: default_gamma(),
            discrete_levels: default_discrete_levels(),
            seed: None,
        }
    }
}

impl LearningConfig {
    /// Episodes between ε decays for a horizon of `steps`
    pub fn epsilon_interval_for(&self, steps: usize) -> usize {
        let interval = match self.epsilon_interval {
            Some(interval) => interval,
            None => decay_interval_for_horizon(steps),
        };
        interval.max(1)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_at_least("scheduler.learning.iterations", self.iterations, 1)?;
        ensure_range(
            "scheduler.learning.epsilon_initial",
            self.epsilon_initial,
            0.0,
            1.0,
        )?;
        ensure_positive("scheduler.learning.epsilon_decay", self.epsilon_decay)?;
        ensure_range("scheduler.learning.alpha", self.alpha, 0.0, 1.0)?;
        ensure_range("scheduler.learning.gamma", self.gamma, 0.0, 1.0)?;
        ensure_at_least("scheduler.learning.discrete_levels", self.discrete_levels, 2)
    }
}

/// 50 episodes per 24 steps of horizon
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn decay_interval_for_horizon(steps: usize) -> usize {
    (50.0 * steps as f64 / 24.0).round() as usize
}

fn default_resolution_hours() -> f64 {
    1.0
}

/// Offline RL scheduler parameters. The price series is supplied per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub use_case: UseCase,

    #[serde(default)]
    pub approach: Approach,

    /// Length of one price interval (hours)
    #[serde(default = "default_resolution_hours")]
    pub resolution_hours: f64,

    #[serde(default)]
    pub battery: SchedulerBatteryConfig,

    #[serde(default)]
    pub learning: LearningConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            use_case: UseCase::default(),
            approach: Approach::default(),
            resolution_hours: default_resolution_hours(),
            battery: SchedulerBatteryConfig::default(),
            learning: LearningConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("scheduler.resolution_hours", self.resolution_hours)?;
        self.battery.validate()?;
        self.learning.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = AmacSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.controller.damping, 8.0);
        assert_eq!(settings.controller.max_window_samples, 2100.0);
        assert_eq!(settings.battery.rated_power_kw, 125.0);
        assert_eq!(settings.battery.rated_energy_kwh, 200.0);
        assert_eq!(settings.scheduler.learning.discrete_levels, 20);
    }

    #[test]
    fn test_thresholds_from_rated_power() {
        let config = ControllerConfig {
            pv_rated_power_kw: 200.0,
            ..Default::default()
        };
        let thresholds = config.thresholds();
        assert_eq!(thresholds.min, 4.0);
        assert_eq!(thresholds.reference, 20.0);
        assert_eq!(thresholds.max, 100.0);
    }

    #[test]
    fn test_equal_reference_and_min_variability_rejected() {
        let config = ControllerConfig {
            variability: VariabilityConfig {
                min_pct: 5.0,
                reference_pct: 5.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroVariabilitySpan { .. })
        ));
    }

    #[test]
    fn test_reference_soc_at_max_rejected() {
        let battery = BatteryConfig {
            reference_soc_pct: 90.0,
            reference_soc_margin_pct: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            battery.validate(),
            Err(ConfigError::ZeroSocHeadroom { .. })
        ));
    }

    #[test]
    fn test_reference_soc_clamped_by_margin() {
        let battery = BatteryConfig {
            reference_soc_pct: 95.0,
            ..Default::default()
        };
        assert_eq!(battery.effective_reference_soc(), 80.0);
        assert!(battery.validate().is_ok());

        let battery = BatteryConfig {
            reference_soc_pct: 0.0,
            ..Default::default()
        };
        assert_eq!(battery.effective_reference_soc(), 20.0);
    }

    #[test]
    fn test_oversized_margin_rejected() {
        let battery = BatteryConfig {
            soc_min_pct: 40.0,
            soc_max_pct: 60.0,
            reference_soc_margin_pct: 15.0,
            ..Default::default()
        };
        assert!(matches!(
            battery.validate(),
            Err(ConfigError::ReferenceMargin { .. })
        ));
    }

    #[test]
    fn test_buffer_capacity_never_below_horizon() {
        let mut config = ControllerConfig::default();
        assert_eq!(config.buffer_capacity(), 900);

        config.buffer_capacity = Some(100);
        assert_eq!(config.buffer_capacity(), 900);

        config.buffer_capacity = Some(2100);
        assert_eq!(config.buffer_capacity(), 2100);
    }

    #[test]
    fn test_epsilon_interval_default_scales_with_horizon() {
        let learning = LearningConfig::default();
        assert_eq!(learning.epsilon_interval_for(24), 50);
        assert_eq!(learning.epsilon_interval_for(48), 100);
        assert_eq!(learning.epsilon_interval_for(3), 6);
        assert_eq!(learning.epsilon_interval_for(0), 1);
    }

    #[test]
    fn test_scheduler_initial_soc_outside_bounds_rejected() {
        let battery = SchedulerBatteryConfig {
            initial_soc_pct: 95.0,
            ..Default::default()
        };
        assert!(battery.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: AmacSettings = toml::from_str(
            r#"
            [controller]
            damping = 4.0

            [scheduler]
            use_case = "frequency_regulation"
            approach = "sarsa"

            [scheduler.learning]
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(settings.controller.damping, 4.0);
        assert_eq!(settings.controller.max_window_samples, 2100.0);
        assert_eq!(settings.scheduler.use_case, UseCase::FrequencyRegulation);
        assert_eq!(settings.scheduler.approach, Approach::Sarsa);
        assert_eq!(settings.scheduler.learning.seed, Some(7));
        assert_eq!(settings.battery.reference_soc_pct, 50.0);
    }

    #[test]
    fn test_approach_accepts_legacy_spelling() {
        let approach: Approach = serde_json::from_str("\"SARSA\"").unwrap();
        assert_eq!(approach, Approach::Sarsa);
        let approach: Approach = serde_json::from_str("\"Q-learning\"").unwrap();
        assert_eq!(approach, Approach::QLearning);
    }
}
