// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.

//! Output formatters for replay and scheduling results.

use amac_core::{TickOutput, TickStatus};
use anyhow::{Context, Result};
use comfy_table::{Attribute, Cell, Color, Table, presets::UTF8_FULL};
use std::fmt::Write as _;
use std::path::Path;

use crate::simulation::{ControlSummary, ScheduleRun};

/// Formatter for pretty terminal tables
#[derive(Debug)]
pub struct TableFormatter;

/// Formatter for CSV export
#[derive(Debug)]
pub struct CsvFormatter;

fn status_label(status: TickStatus) -> &'static str {
    match status {
        TickStatus::WarmingUp => "warming_up",
        TickStatus::WindowCollapsed => "window_collapsed",
        TickStatus::ForecastUnavailable => "forecast_unavailable",
        TickStatus::Dispatched => "dispatched",
        TickStatus::InvalidInput => "invalid_input",
    }
}

impl TableFormatter {
    /// Replay summary as a two-column table
    pub fn format_control_summary(summary: &ControlSummary) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        let smoothing = if summary.input_std_kw > 0.0 {
            100.0 * (1.0 - summary.setpoint_std_kw / summary.input_std_kw)
        } else {
            0.0
        };
        let smoothing_cell = Cell::new(format!("{smoothing:.1}%"));
        let smoothing_cell = if smoothing > 0.0 {
            smoothing_cell.fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            smoothing_cell.fg(Color::Red)
        };

        let rows = [
            ("Samples", summary.samples.to_string()),
            ("Dispatched", summary.dispatched.to_string()),
            ("Warming up", summary.warming_up.to_string()),
            ("Window collapsed", summary.window_collapsed.to_string()),
            ("Forecast unavailable", summary.forecast_unavailable.to_string()),
            ("Invalid input", summary.invalid_input.to_string()),
            ("SOC saturated", summary.saturated.to_string()),
            ("Input σ (kW)", format!("{:.3}", summary.input_std_kw)),
            ("Setpoint σ (kW)", format!("{:.3}", summary.setpoint_std_kw)),
        ];
        for (metric, value) in rows {
            table.add_row(vec![Cell::new(metric), Cell::new(value)]);
        }
        table.add_row(vec![Cell::new("Variability reduction"), smoothing_cell]);
        table.add_row(vec![
            Cell::new("SOC (%)"),
            Cell::new(format!(
                "{:.2} → {:.2} (range {:.2} - {:.2})",
                summary.initial_soc_pct,
                summary.final_soc_pct,
                summary.min_soc_pct,
                summary.max_soc_pct
            )),
        ]);

        let mut output = table.to_string();
        output.push('\n');
        output
    }

    /// Per-step plan of the trained policy
    pub fn format_schedule(run: &ScheduleRun) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("Step").add_attribute(Attribute::Bold),
            Cell::new("Price").add_attribute(Attribute::Bold),
            Cell::new("Power\n(kW)").add_attribute(Attribute::Bold),
            Cell::new("SOC after\n(%)").add_attribute(Attribute::Bold),
            Cell::new("Action").add_attribute(Attribute::Bold),
        ]);

        let plan = &run.plan;
        for (step, ((price, power), soc)) in run
            .prices
            .iter()
            .zip(&plan.power_kw)
            .zip(&plan.soc_pct)
            .enumerate()
        {
            let action = if *power > 0.0 {
                Cell::new("charge").fg(Color::Green)
            } else if *power < 0.0 {
                Cell::new("discharge").fg(Color::Yellow)
            } else {
                Cell::new("hold")
            };
            table.add_row(vec![
                Cell::new(step),
                Cell::new(format!("{price:.4}")),
                Cell::new(format!("{power:.2}")),
                Cell::new(format!("{soc:.1}")),
                action,
            ]);
        }

        let mut output = table.to_string();
        output.push('\n');
        let report = &run.report;
        let _ = writeln!(
            output,
            "Policy value: {:.4} | Episodes: {}{} | Final ε: {:.4}",
            plan.total_cost,
            report.episodes_completed,
            if report.cancelled { " (cancelled)" } else { "" },
            report.final_epsilon
        );
        output
    }
}

impl CsvFormatter {
    /// Tick-by-tick replay export
    pub fn write_ticks(ticks: &[TickOutput], path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
        writer.write_record([
            "timestamp",
            "status",
            "setpoint_kw",
            "soc_pct",
            "ama_power_kw",
            "asc_power_kw",
            "variability_kw",
            "window",
            "saturated",
        ])?;

        for tick in ticks {
            let d = &tick.diagnostics;
            writer.write_record([
                tick.timestamp.to_rfc3339(),
                status_label(tick.status).to_owned(),
                format!("{:.4}", tick.setpoint_kw),
                format!("{:.4}", tick.soc_pct),
                format!("{:.4}", d.ama_power_kw),
                format!("{:.4}", d.asc_power_kw),
                d.variability_kw.map(|v| format!("{v:.4}")).unwrap_or_default(),
                format!("{:.3}", d.window),
                d.saturated.to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Step-by-step export of the greedy plan
    pub fn write_schedule(run: &ScheduleRun, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
        writer.write_record(["step", "price", "power_kw", "soc_pct", "soc_bin"])?;

        let plan = &run.plan;
        for (step, price) in run.prices.iter().enumerate() {
            let cell = |values: &[f64]| {
                values
                    .get(step)
                    .map(|v| format!("{v:.4}"))
                    .unwrap_or_default()
            };
            writer.write_record([
                step.to_string(),
                format!("{price:.4}"),
                cell(&plan.power_kw),
                cell(&plan.soc_pct),
                plan.soc_bins.get(step).map(ToString::to_string).unwrap_or_default(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}
