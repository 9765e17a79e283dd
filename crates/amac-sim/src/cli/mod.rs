// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

//! CLI module for the simulator command-line interface.

pub mod args;
pub mod commands;
pub mod data_loaders;
pub mod formatters;

pub use args::{Cli, Commands, ControlArgs, EvaluateArgs, ScheduleArgs};
pub use commands::run;
pub use data_loaders::{
    CsvPowerLoader, CsvPriceLoader, DataLoader, PriceLoader, ScenarioPriceLoader, SyntheticLoader,
};
pub use formatters::{CsvFormatter, TableFormatter};
