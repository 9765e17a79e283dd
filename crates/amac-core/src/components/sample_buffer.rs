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

use amac_types::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bounded, time-ordered store of power samples
///
/// Samples are kept oldest first. When the buffer is full, appending evicts
/// the oldest sample. The buffer never sorts; callers append in
/// non-decreasing timestamp order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl TimeSeriesBuffer {
    /// Create an empty buffer holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value stamped with the current time
    pub fn append(&mut self, value: f64) {
        self.push(Sample::now(value));
    }

    /// Append a value with an explicit timestamp
    pub fn append_at(&mut self, timestamp: DateTime<Utc>, value: f64) {
        self.push(Sample::new(timestamp, value));
    }

    /// Append a sample, evicting the oldest one when full
    pub fn push(&mut self, sample: Sample) {
        if self.capacity == 0 {
            return;
        }
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Append a batch of samples in order
    pub fn extend<I: IntoIterator<Item = Sample>>(&mut self, samples: I) {
        for sample in samples {
            self.push(sample);
        }
    }

    /// Raise the capacity, keeping every stored sample
    ///
    /// No-op when `new_capacity` does not exceed the current capacity.
    pub fn grow(&mut self, new_capacity: usize) {
        if new_capacity <= self.capacity {
            return;
        }
        self.samples.reserve(new_capacity - self.samples.len());
        self.capacity = new_capacity;
    }

    /// The most recent `horizon` samples, oldest first
    ///
    /// A zero horizon or one longer than the buffer returns everything.
    pub fn series(&self, horizon: usize) -> Vec<Sample> {
        let skip = if horizon == 0 || horizon > self.samples.len() {
            0
        } else {
            self.samples.len() - horizon
        };
        self.samples.iter().skip(skip).copied().collect()
    }

    /// Values of the most recent `count` samples, newest first
    pub fn recent_values(&self, count: usize) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().rev().take(count).map(|s| s.value)
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
