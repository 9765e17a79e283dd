// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "amac-sim")]
#[command(author, version, about = "AMAC smoothing and RL scheduling simulator")]
#[command(
    long_about = "Offline harness for the adaptive moving-average controller and the\n\
    reinforcement-learning battery scheduler.\n\
    \nReplays recorded or synthetic PV output through the controller, trains\n\
    dispatch policies against price series, and evaluates JSON job files.\n\
    \nExamples:\n  \
    amac-sim control                              # Replay a synthetic broken-cloud hour\n  \
    amac-sim control --input pv.csv --output both --csv-path ticks.csv\n  \
    amac-sim schedule --scenario volatile --iterations 5000\n  \
    amac-sim evaluate --input input.json --output output.json"
)]
pub struct Cli {
    /// Settings file (.toml or .json); AMAC_* variables override it
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a power series through the AMAC controller
    #[command(
        long_about = "Feed a power series through the controller one sample per tick.\n\
        \nData Sources (choose one):\n  \
        - Synthetic: --profile <name> (clear, cloudy, broken)\n  \
        - CSV: --input <path> with columns timestamp,power_kw\n\
        \nExamples:\n  \
        amac-sim control --profile cloudy --samples 7200\n  \
        amac-sim control --input pv.csv --initial-soc 70"
    )]
    Control(ControlArgs),

    /// Train a dispatch policy for a price series
    #[command(
        long_about = "Train a Q-learning or SARSA policy over one horizon of prices and\n\
        print the greedy plan.\n\
        \nPrice Sources (choose one):\n  \
        - Synthetic: --scenario <name> (flat, usual_day, volatile, arbitrage)\n  \
        - CSV: --prices <path> with a 'price' column\n\
        \nTraining can checkpoint periodically and resume from a checkpoint.\n\
        \nExamples:\n  \
        amac-sim schedule --scenario arbitrage --steps 24 --seed 7\n  \
        amac-sim schedule --prices day.csv --checkpoint policy.json --checkpoint-every 500\n  \
        amac-sim schedule --prices day.csv --resume policy.json --iterations 20000"
    )]
    Schedule(ScheduleArgs),

    /// Run a job file and write its result
    #[command(
        long_about = "Read a job description (control replay or scheduler training) from a\n\
        JSON file and write the result to another JSON file.\n\
        \nA result file is written even when the job fails, carrying the error.\n\
        \nExamples:\n  \
        amac-sim evaluate\n  \
        amac-sim evaluate --input jobs/day1.json --output results/day1.json"
    )]
    Evaluate(EvaluateArgs),
}

#[derive(Debug, Parser)]
pub struct ControlArgs {
    /// CSV file with timestamp,power_kw rows
    #[arg(long, value_name = "PATH", conflicts_with = "profile")]
    pub input: Option<PathBuf>,

    /// Synthetic PV profile
    #[arg(
        long,
        default_value = "broken",
        value_parser = ["clear", "cloudy", "broken"],
        help = "Synthetic PV profile to replay",
        long_help = "Synthetic PV profiles:\n  \
          - clear: clear sky, almost no variability\n  \
          - cloudy: overcast with slow, deep dips\n  \
          - broken: broken clouds, fast large swings\n\
          \nIgnored when using --input"
    )]
    pub profile: String,

    /// Number of synthetic samples (seconds)
    #[arg(long, default_value_t = 3600)]
    pub samples: usize,

    /// RNG seed for synthetic data
    #[arg(long)]
    pub seed: Option<u64>,

    /// Initial SOC (%), defaults to the reference SOC
    #[arg(long)]
    pub initial_soc: Option<f64>,

    /// Output format: table, csv, or both
    #[arg(long, default_value = "table", value_parser = ["table", "csv", "both"])]
    pub output: String,

    /// CSV file path (required when output is csv or both)
    #[arg(long, value_name = "PATH")]
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct ScheduleArgs {
    /// CSV file with one price per interval
    #[arg(long, value_name = "PATH", conflicts_with = "scenario")]
    pub prices: Option<PathBuf>,

    /// Synthetic price scenario
    #[arg(
        long,
        default_value = "usual_day",
        help = "Synthetic price scenario to train on",
        long_help = "Available scenarios:\n  \
          - flat: constant price, nothing to arbitrage\n  \
          - usual_day: cheap night, morning ramp, noon dip, evening peak\n  \
          - volatile: large swings throughout the day\n  \
          - arbitrage: clean two-level night/evening spread\n\
          \nIgnored when using --prices"
    )]
    pub scenario: String,

    /// Intervals per synthetic day
    #[arg(long, default_value_t = 24)]
    pub steps: usize,

    /// Seed for price generation and training
    #[arg(long)]
    pub seed: Option<u64>,

    /// Training episodes (overrides settings)
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Learning rule (overrides settings)
    #[arg(long, value_parser = ["q_learning", "sarsa"])]
    pub approach: Option<String>,

    /// Objective (overrides settings)
    #[arg(long, value_parser = ["energy_arbitrage", "frequency_regulation"])]
    pub use_case: Option<String>,

    /// Write the policy to this file while training
    #[arg(long, value_name = "PATH")]
    pub checkpoint: Option<PathBuf>,

    /// Episodes between checkpoints (0 = only at the end)
    #[arg(long, default_value_t = 1000)]
    pub checkpoint_every: usize,

    /// Continue training from a checkpoint
    #[arg(long, value_name = "PATH")]
    pub resume: Option<PathBuf>,

    /// Stop training after this many seconds, keeping the policy so far
    #[arg(long, value_name = "SECS")]
    pub time_limit: Option<u64>,

    /// Output format: table, csv, or both
    #[arg(long, default_value = "table", value_parser = ["table", "csv", "both"])]
    pub output: String,

    /// CSV file path (required when output is csv or both)
    #[arg(long, value_name = "PATH")]
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct EvaluateArgs {
    /// Job description
    #[arg(long, default_value = "input.json", value_name = "PATH")]
    pub input: PathBuf,

    /// Where to write the result
    #[arg(long, default_value = "output.json", value_name = "PATH")]
    pub output: PathBuf,
}
