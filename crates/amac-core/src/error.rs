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

//! Error types for the dispatch scheduler

use amac_types::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("price series is empty")]
    EmptyPrices,

    #[error("price at step {step} is not finite: {value}")]
    NonFinitePrice { step: usize, value: f64 },

    #[error(
        "no feasible action at step {step} from SOC {soc_pct:.2}%: power/energy limits are too tight"
    )]
    NoFeasibleAction { step: usize, soc_pct: f64 },

    #[error(
        "checkpoint shape {found_steps}x{found_bins} does not match scheduler shape {expected_steps}x{expected_bins}"
    )]
    CheckpointMismatch {
        expected_steps: usize,
        expected_bins: usize,
        found_steps: usize,
        found_bins: usize,
    },

    #[error("checkpoint {} does not hold a well-formed Q-table", .0.display())]
    CorruptCheckpoint(PathBuf),

    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
