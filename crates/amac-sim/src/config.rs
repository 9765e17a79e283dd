// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

//! Settings loading for the CLI.
//!
//! Settings come from a TOML or JSON file (chosen by extension), fall back
//! to defaults, and are then patched by `AMAC_*` environment variables.

use amac_types::AmacSettings;
use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::{info, warn};

pub const ENV_DATA_INTERVAL_SECS: &str = "AMAC_DATA_INTERVAL_SECS";
pub const ENV_REFERENCE_SOC: &str = "AMAC_REFERENCE_SOC";
pub const ENV_RL_SEED: &str = "AMAC_RL_SEED";
pub const ENV_RL_ITERATIONS: &str = "AMAC_RL_ITERATIONS";

/// Load, patch from the process environment and validate
pub fn load_settings(path: Option<&Path>) -> Result<AmacSettings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_settings`] with an injectable environment lookup
pub fn load_settings_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<AmacSettings> {
    let mut settings = match path {
        Some(path) => read_settings_file(path)?,
        None => {
            info!("No settings file given, using defaults");
            AmacSettings::default()
        }
    };

    apply_env_overrides(&mut settings, env);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<AmacSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let settings: AmacSettings = match extension.as_deref() {
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML settings {}", path.display()))?,
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON settings {}", path.display()))?,
        other => bail!(
            "Unsupported settings format {:?} for {} (expected .toml or .json)",
            other.unwrap_or(""),
            path.display()
        ),
    };

    info!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Apply `AMAC_*` overrides; unparsable values are logged and ignored
pub fn apply_env_overrides(settings: &mut AmacSettings, env: impl Fn(&str) -> Option<String>) {
    if let Some(raw) = env(ENV_DATA_INTERVAL_SECS) {
        match raw.parse::<f64>() {
            Ok(secs) => settings.controller.data_interval_secs = secs,
            Err(_) => warn!("Ignoring {ENV_DATA_INTERVAL_SECS}={raw:?}: not a number"),
        }
    }

    if let Some(raw) = env(ENV_REFERENCE_SOC) {
        match raw.parse::<f64>() {
            Ok(soc) => settings.battery.reference_soc_pct = soc,
            Err(_) => warn!("Ignoring {ENV_REFERENCE_SOC}={raw:?}: not a number"),
        }
    }

    if let Some(raw) = env(ENV_RL_SEED) {
        match raw.parse::<u64>() {
            Ok(seed) => settings.scheduler.learning.seed = Some(seed),
            Err(_) => warn!("Ignoring {ENV_RL_SEED}={raw:?}: not an unsigned integer"),
        }
    }

    if let Some(raw) = env(ENV_RL_ITERATIONS) {
        match raw.parse::<usize>() {
            Ok(iterations) => settings.scheduler.learning.iterations = iterations,
            Err(_) => warn!("Ignoring {ENV_RL_ITERATIONS}={raw:?}: not an unsigned integer"),
        }
    }
}
