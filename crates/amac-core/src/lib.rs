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

//! PV smoothing and battery dispatch.
//!
//! - [`control`]: the AMAC real-time controller, one setpoint per measured sample
//! - [`scheduling`]: offline tabular RL scheduler over a price series
//! - [`estimation`]: rolling variability and persistence forecasts feeding the controller
//! - [`components`]: bounded time-series storage

pub mod components;
pub mod control;
pub mod error;
pub mod estimation;
pub mod scheduling;

pub use components::*;
pub use control::{
    AmacController, ControllerState, TickDiagnostics, TickInput, TickOutput, TickStatus,
};
pub use error::SchedulerError;
pub use estimation::*;
pub use scheduling::{
    CancellationToken, CheckpointPolicy, PolicyCheckpoint, QTable, RlScheduler, TrainingOptions,
    TrainingReport, Trajectory,
};

pub use amac_types as types;
