// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

//! Offline harness for the AMAC controller and the RL scheduler.
//!
//! Replays power series through the controller, trains dispatch policies
//! on synthetic or recorded prices, and evaluates JSON job files.

pub mod cli;
pub mod config;
pub mod jobs;
pub mod logging;
pub mod price_scenarios;
pub mod pv_profiles;
pub mod simulation;

pub use config::load_settings;
pub use jobs::{JobInput, JobOutput, JobReport, JobStatus, evaluate_file, run_job};
pub use price_scenarios::{PRICE_PRESETS, PriceScenario};
pub use pv_profiles::PvProfile;
pub use simulation::{ControlRun, ControlSummary, ScheduleRun, run_controller, run_scheduler};
