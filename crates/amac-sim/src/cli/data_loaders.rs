// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

//! Loaders turning CSV files or synthetic generators into controller samples
//! and scheduler price series.

use amac_types::Sample;
use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::price_scenarios::PriceScenario;
use crate::pv_profiles::PvProfile;

/// Trait for loading the per-second power series a replay runs on
pub trait DataLoader {
    fn load(&self) -> Result<Vec<Sample>>;
}

/// Trait for loading the per-interval price series a scheduler trains on
pub trait PriceLoader {
    fn load(&self) -> Result<Vec<f64>>;
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

// ============= Power series =============

/// Loader for synthetic PV output from a built-in profile
#[derive(Debug, Clone)]
pub struct SyntheticLoader {
    pub profile: PvProfile,
    pub samples: usize,
    pub rated_kw: f64,
    pub interval: Duration,
    pub start: DateTime<Utc>,
    pub seed: Option<u64>,
}

impl SyntheticLoader {
    pub fn new(profile: PvProfile, samples: usize, rated_kw: f64) -> Self {
        Self {
            profile,
            samples,
            rated_kw,
            interval: Duration::seconds(1),
            start: Utc::now(),
            seed: None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

impl DataLoader for SyntheticLoader {
    fn load(&self) -> Result<Vec<Sample>> {
        let mut rng = seeded_rng(self.seed);
        let values = self.profile.generate(self.samples, self.rated_kw, &mut rng);

        let mut timestamp = self.start;
        let samples = values
            .into_iter()
            .map(|value| {
                let sample = Sample::new(timestamp, value);
                timestamp += self.interval;
                sample
            })
            .collect();

        info!(
            "Generated {} samples of '{}' PV output ({:.0} kW rated)",
            self.samples,
            self.profile.id(),
            self.rated_kw
        );
        Ok(samples)
    }
}

/// Loader for a `timestamp,power_kw` CSV export
///
/// Timestamps are RFC 3339 or `YYYY-MM-DD HH:MM:SS` (read as UTC). Rows
/// must be in time order.
#[derive(Debug, Clone)]
pub struct CsvPowerLoader {
    path: PathBuf,
}

impl CsvPowerLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataLoader for CsvPowerLoader {
    fn load(&self) -> Result<Vec<Sample>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file {}", self.path.display()))?;

        let mut samples: Vec<Sample> = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.context("Failed to read CSV record")?;
            let line = row + 2;

            let timestamp = record
                .get(0)
                .ok_or_else(|| anyhow!("Row {line}: missing timestamp"))
                .and_then(parse_timestamp)
                .with_context(|| format!("Row {line} of {}", self.path.display()))?;
            let value: f64 = record
                .get(1)
                .ok_or_else(|| anyhow!("Row {line}: missing power_kw"))?
                .trim()
                .parse()
                .with_context(|| format!("Row {line}: power_kw is not a number"))?;

            if let Some(previous) = samples.last()
                && timestamp < previous.timestamp
            {
                bail!("Row {line}: timestamp {timestamp} goes back in time");
            }
            samples.push(Sample::new(timestamp, value));
        }

        if samples.is_empty() {
            bail!("No samples in {}", self.path.display());
        }
        info!("Loaded {} samples from {}", samples.len(), self.path.display());
        Ok(samples)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .with_context(|| format!("Failed to parse timestamp: {raw}"))
}

// ============= Price series =============

/// Loader for a built-in price scenario
#[derive(Debug, Clone)]
pub struct ScenarioPriceLoader {
    pub scenario: PriceScenario,
    pub steps: usize,
    pub seed: Option<u64>,
}

impl PriceLoader for ScenarioPriceLoader {
    fn load(&self) -> Result<Vec<f64>> {
        let mut rng = seeded_rng(self.seed);
        let prices = self.scenario.generate(self.steps, &mut rng);
        info!(
            "Generated {} prices for scenario '{}'",
            prices.len(),
            self.scenario.name()
        );
        Ok(prices)
    }
}

/// Loader for a price CSV: a `price` column, or the last column otherwise
#[derive(Debug, Clone)]
pub struct CsvPriceLoader {
    path: PathBuf,
}

impl CsvPriceLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PriceLoader for CsvPriceLoader {
    fn load(&self) -> Result<Vec<f64>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file {}", self.path.display()))?;

        let headers = reader.headers().context("Failed to read CSV header")?;
        let column = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case("price"))
            .or_else(|| headers.len().checked_sub(1))
            .ok_or_else(|| anyhow!("Empty CSV header in {}", self.path.display()))?;

        let mut prices = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.context("Failed to read CSV record")?;
            let line = row + 2;
            let price: f64 = record
                .get(column)
                .ok_or_else(|| anyhow!("Row {line}: missing price"))?
                .trim()
                .parse()
                .with_context(|| format!("Row {line}: price is not a number"))?;
            prices.push(price);
        }

        info!("Loaded {} prices from {}", prices.len(), self.path.display());
        Ok(prices)
    }
}
