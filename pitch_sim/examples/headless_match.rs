// pitch_sim/examples/headless_match.rs

//! Runs both teams on an empty field and prints what a consumer would see.
//!
//! This example demonstrates how to:
//! 1. Load the simulator configuration and a robot roster preset.
//! 2. Build a `Simulator` with logging enabled.
//! 3. Drive it with a fixed-step or a wall-clock tick source.
//! 4. Send radio commands and read vision, ground truth and errors.
//!
//! To run this example:
//! `cargo run --example headless_match -- --duration 5 --realistic`

use bevy::log::LogPlugin;
use clap::Parser;
use pitch_core::realism::RealismConfig;
use pitch_sim::cli::Cli;
use pitch_sim::prelude::*;
use pitch_sim::simulation::config::ConfigError;
use pitch_core::types::{secs_to_nanos, NANOS_PER_MILLI};
use std::time::Duration;

fn main() -> Result<(), ConfigError> {
    let cli = Cli::parse();

    // --- 1. Configuration ---
    let mut config = SimulatorConfig::load_or_default(&cli.config);
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(cameras) = cli.cameras {
        config.cameras.count = cameras;
    }
    if cli.realistic {
        config.realism = RealismConfig::realistic();
    }
    if cli.dump_config {
        println!("{}", config.to_toml_string()?);
        return Ok(());
    }
    let catalog = RobotCatalog::load(&cli.catalog);
    let preset = catalog.get(&cli.roster).cloned().unwrap_or_default();

    // --- 2. Simulator ---
    let mode = if cli.realtime {
        SchedulingMode::Realtime
    } else {
        SchedulingMode::Manual
    };
    let tick = config.timing.tick_nanos();
    let mut sim = Simulator::build(config, mode, |app| {
        app.add_plugins(LogPlugin {
            level: bevy::log::Level::INFO,
            // A good filter for focusing on our crate's logs.
            filter: "info,pitch_sim=debug,pitch_core=debug".to_string(),
            ..default()
        });
    })?;
    sim.set_scaling(cli.scaling);
    for team in TeamColor::ALL {
        sim.set_team(team, &preset.roster());
    }

    // --- 3. Run ---
    let mut frames = 0usize;
    let mut responses = 0usize;
    let mut on_tick = |sim: &mut Simulator| {
        // Every robot drives a slow circle.
        for team in TeamColor::ALL {
            let commands = (0..preset.count)
                .map(|id| RobotCommand::drive(id, 0.5, 0.0, 1.0))
                .collect();
            let now = sim.now();
            sim.handle_radio_commands(team, commands, now);
        }
        for output in sim.take_outputs() {
            match output {
                SimulatorOutput::Vision(_) => frames += 1,
                SimulatorOutput::RadioResponses(batch) => responses += batch.len(),
                _ => {}
            }
        }
    };

    if cli.realtime {
        let wall = Duration::from_secs_f64(cli.duration / cli.scaling.max(1e-3));
        RealtimeDriver::new().run_for(&mut sim, wall, &mut on_tick);
    } else {
        StepDriver::new(tick).go_delta_with(
            &mut sim,
            secs_to_nanos(cli.duration),
            10 * NANOS_PER_MILLI,
            &mut on_tick,
        );
    }

    // --- 4. Report ---
    let state = sim.ground_truth();
    info!(
        "Ran {:.1} s: {} vision frames, {} radio responses (simulator {})",
        cli.duration,
        frames,
        responses,
        if sim.is_enabled() { "enabled" } else { "disabled" }
    );
    if let Some(ball) = state.ball {
        info!("Ball at ({:.3}, {:.3})", ball.p_x, ball.p_y);
    }
    for (source, errors) in sim.get_and_clear_errors() {
        for error in errors {
            warn!("{:?}: {}", source, error);
        }
    }
    Ok(())
}
