// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

//! Synthetic per-second PV output for controller replays.
//!
//! A midday irradiance envelope is scaled by a cloud multiplier that
//! follows a first-order autoregressive process, so clouds come and go
//! with realistic persistence instead of as independent per-sample noise.

use anyhow::{Result, anyhow};
use rand::Rng;
use serde::{Deserialize, Serialize};

const MULTIPLIER_MIN: f64 = 0.2;
const MULTIPLIER_MAX: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PvProfile {
    /// Clear sky, almost no variability
    Clear,
    /// Overcast with slow, deep dips
    Cloudy,
    /// Broken clouds: fast, large swings
    Broken,
}

/// AR(1) parameters for one profile
#[derive(Debug, Clone, Copy)]
struct CloudModel {
    /// Persistence of the multiplier between samples
    alpha: f64,
    /// Level the multiplier is pulled toward
    target: f64,
    /// Innovation noise (standard deviation)
    noise_std: f64,
}

impl PvProfile {
    pub const ALL: [Self; 3] = [Self::Clear, Self::Cloudy, Self::Broken];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Cloudy => "cloudy",
            Self::Broken => "broken",
        }
    }

    pub fn from_id(id: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| anyhow!("Unknown PV profile '{id}' (known: clear, cloudy, broken)"))
    }

    fn cloud_model(&self) -> CloudModel {
        match self {
            Self::Clear => CloudModel {
                alpha: 0.99,
                target: 1.0,
                noise_std: 0.02,
            },
            Self::Cloudy => CloudModel {
                alpha: 0.97,
                target: 0.5,
                noise_std: 0.4,
            },
            Self::Broken => CloudModel {
                alpha: 0.9,
                target: 0.75,
                noise_std: 1.5,
            },
        }
    }

    /// `samples` consecutive 1-second values (kW) for a plant rated `rated_kw`
    #[expect(clippy::cast_precision_loss)]
    pub fn generate<R: Rng + ?Sized>(
        &self,
        samples: usize,
        rated_kw: f64,
        rng: &mut R,
    ) -> Vec<f64> {
        let model = self.cloud_model();
        let span = samples.max(1) as f64;
        let mut multiplier = model.target;

        (0..samples)
            .map(|i| {
                let innovation = model.target + gaussian(rng, model.noise_std);
                multiplier = (model.alpha * multiplier + (1.0 - model.alpha) * innovation)
                    .clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);

                let envelope = 0.85 + 0.15 * (std::f64::consts::PI * i as f64 / span).sin();
                (rated_kw * envelope * multiplier).max(0.0)
            })
            .collect()
    }
}

/// Zero-mean normal sample via Box-Muller
fn gaussian<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn std_dev(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    }

    #[test]
    fn test_output_within_plant_limits() {
        let mut rng = StdRng::seed_from_u64(42);
        for profile in PvProfile::ALL {
            let values = profile.generate(3600, 100.0, &mut rng);
            assert_eq!(values.len(), 3600);
            assert!(values.iter().all(|v| (0.0..=120.0).contains(v)));
        }
    }

    #[test]
    fn test_broken_clouds_vary_more_than_clear_sky() {
        let clear = PvProfile::Clear.generate(3600, 100.0, &mut StdRng::seed_from_u64(1));
        let broken = PvProfile::Broken.generate(3600, 100.0, &mut StdRng::seed_from_u64(1));
        assert!(std_dev(&broken) > 3.0 * std_dev(&clear));
    }

    #[test]
    fn test_seed_determinism() {
        let a = PvProfile::Cloudy.generate(500, 50.0, &mut StdRng::seed_from_u64(9));
        let b = PvProfile::Cloudy.generate(500, 50.0, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_profile_ids_round_trip() {
        for profile in PvProfile::ALL {
            assert_eq!(PvProfile::from_id(profile.id()).unwrap(), profile);
        }
        assert!(PvProfile::from_id("sunny").is_err());
    }
}
