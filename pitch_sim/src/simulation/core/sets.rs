// pitch_sim/src/simulation/core/sets.rs

use bevy::prelude::*;

/// Ordering of the per-substep logic. Runs ahead of every physics step, so
/// it is ordered against all of the engine's own velocity and position
/// writers.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubstepSet {
    /// Advances the substep clock.
    Clock,
    /// Puts a broken ball back onto the field.
    RespawnBall,
    /// Puts flipped robots back onto their wheels.
    RespawnRobots,
    /// Ball moves and rolling friction.
    Ball,
    /// Robot moves, drive, dribbler and kicker.
    Robots,
}
