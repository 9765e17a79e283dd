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

use amac_core::{AmacController, ControllerState, TickInput, TickOutput, TickStatus};
use amac_types::{BatteryConfig, ControllerConfig, SocUpdateBasis};
use chrono::{Duration, TimeZone, Utc};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

/// 100 kW plant: slow swell, fast ripple and a passing cloud every minute
fn pv_trace(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let t = i as f64;
            let cloud = if i.div_euclid(30).is_multiple_of(2) {
                0.0
            } else {
                -20.0
            };
            (55.0 + 25.0 * (t / 7.0).sin() + cloud).max(0.0)
        })
        .collect()
}

fn replay(
    controller: &AmacController,
    soc: f64,
    values: &[f64],
) -> (ControllerState, Vec<TickOutput>) {
    let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
    let mut state = controller.initial_state(soc);
    let mut outputs = Vec::with_capacity(values.len());
    for (i, &v) in values.iter().enumerate() {
        let input = TickInput::new(start + Duration::seconds(i as i64), v);
        let (next, out) = controller.step(state, input);
        state = next;
        outputs.push(out);
    }
    (state, outputs)
}

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
}

#[test]
fn test_warm_up_lasts_one_horizon() {
    init_tracing();
    let controller =
        AmacController::new(ControllerConfig::default(), BatteryConfig::default()).unwrap();
    let (_, outputs) = replay(&controller, 50.0, &pv_trace(1200));

    assert!(outputs[..899].iter().all(|o| o.status == TickStatus::WarmingUp));
    assert!(outputs[899..].iter().all(|o| o.status == TickStatus::Dispatched));
}

#[test]
fn test_setpoint_smoother_than_input() {
    init_tracing();
    let config = ControllerConfig {
        soc_update_basis: SocUpdateBasis::BatteryPower,
        ..Default::default()
    };
    let controller = AmacController::new(config, BatteryConfig::default()).unwrap();
    let trace = pv_trace(2400);
    let (state, outputs) = replay(&controller, 50.0, &trace);

    let dispatched: Vec<&TickOutput> = outputs
        .iter()
        .filter(|o| o.status == TickStatus::Dispatched)
        .collect();
    assert!(dispatched.len() > 1000);

    let setpoints: Vec<f64> = dispatched.iter().map(|o| o.setpoint_kw).collect();
    let inputs = &trace[trace.len() - setpoints.len()..];
    assert!(std_dev(&setpoints) < 0.5 * std_dev(inputs));

    // Zero-mean battery action keeps SOC close to where it started
    assert!((state.soc_pct() - 50.0).abs() < 5.0);
}

#[test]
fn test_soc_stays_within_bounds_on_long_replay() {
    init_tracing();
    let controller =
        AmacController::new(ControllerConfig::default(), BatteryConfig::default()).unwrap();
    let (state, outputs) = replay(&controller, 85.0, &pv_trace(6000));

    let battery = controller.battery();
    for out in &outputs {
        assert!(out.soc_pct >= battery.soc_min_pct && out.soc_pct <= battery.soc_max_pct);
    }
    assert!(outputs.iter().any(|o| o.diagnostics.saturated));
    assert_eq!(state.soc_pct(), outputs.last().unwrap().soc_pct);
}

#[test]
fn test_state_survives_serialization_between_ticks() {
    init_tracing();
    let controller =
        AmacController::new(ControllerConfig::default(), BatteryConfig::default()).unwrap();
    let trace = pv_trace(1000);
    let (state, _) = replay(&controller, 50.0, &trace[..950]);

    let json = serde_json::to_string(&state).unwrap();
    let restored: ControllerState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.buffer.len(), state.buffer.len());

    let input = TickInput::new(Utc::now(), trace[950]);
    let (_, from_restored) = controller.step(restored, input);
    let (_, from_original) = controller.step(state, input);
    assert_eq!(from_restored.status, TickStatus::Dispatched);
    assert!((from_restored.setpoint_kw - from_original.setpoint_kw).abs() < 1e-9);
}
