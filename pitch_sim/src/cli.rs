// pitch_sim/src/cli.rs

use bevy::prelude::Resource;
use clap::Parser;
use std::path::PathBuf;

/// Pitch: a headless robot-soccer field simulator.
///
/// This struct defines the command-line arguments that can be passed to any
/// binary application that uses the pitch simulation library.
#[derive(Parser, Debug, Resource, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The simulator configuration TOML file.
    #[arg(short, long, default_value = "assets/config/simulator.toml")]
    pub config: PathBuf,

    /// Directory with robot roster presets.
    #[arg(long, default_value = "assets/robots")]
    pub catalog: PathBuf,

    /// Roster preset used for both teams.
    #[arg(short, long, default_value = "default")]
    pub roster: String,

    /// Overrides the configured random seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulated seconds to run.
    #[arg(short, long, default_value_t = 10.0)]
    pub duration: f64,

    /// Speed of simulated time relative to the wall clock.
    #[arg(long, default_value_t = 1.0)]
    pub scaling: f64,

    /// Overrides the configured number of cameras.
    #[arg(long)]
    pub cameras: Option<u32>,

    /// Follow the wall clock instead of stepping as fast as possible.
    #[arg(long, default_value_t = false)]
    pub realtime: bool,

    /// Start with the measured sensor noise and radio loss.
    #[arg(long, default_value_t = false)]
    pub realistic: bool,

    /// Print the effective configuration and exit.
    #[arg(long, default_value_t = false)]
    pub dump_config: bool,
}
