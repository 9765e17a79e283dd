// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

use amac_sim::cli::{self, Cli};
use amac_sim::logging::init_tracing;
use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;
    cli::run(cli)
}
