// pitch_sim/src/simulation/core/components.rs

use bevy::prelude::*;
use nalgebra::{Vector2, Vector3};
use pitch_core::{
    messages::{RobotCommand, RobotSpecs},
    models::drive::OmniDrive,
    types::{Nanos, RobotKey},
};

// =========================================================================
// == Global Simulation State ==
// =========================================================================

/// Switches set by control commands.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationFlags {
    /// Whether kickers recharge after a shot.
    pub charge: bool,
    /// Whether the reported frame is rotated by half a turn.
    pub flip: bool,
}

/// Timing constants used inside the physics step.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct PhysicsTuning {
    /// Length of one physics step in seconds.
    pub sub_timestep: f32,
    pub command_timeout: f32,
    pub kicker_recharge_time: f32,
}

/// Simulated time as seen by the physics step, in seconds.
/// Advanced once at the start of every step.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct SubstepClock {
    pub now: f64,
    pub steps: u64,
}

/// Marks static field geometry.
#[derive(Component, Debug, Clone, Copy)]
pub struct FieldElement;

/// Marks the floor. Ball visibility rays ignore it.
#[derive(Component, Debug, Clone, Copy)]
pub struct Floor;

// =========================================================================
// == Ball ==
// =========================================================================

/// A staged change to the ball, consumed by the next physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BallMove {
    /// Puts the ball at a position with a given velocity. Cleared once applied.
    Place {
        position: Vector3<f32>,
        velocity: Vector3<f32>,
        angular: Vector3<f32>,
    },
    /// Pushes the ball towards a target every step. Stays active until
    /// another move replaces it.
    Push { target: Vector2<f32> },
}

#[derive(Component, Debug, Default)]
pub struct SimBall {
    pub pending_move: Option<BallMove>,
    /// Simulation time of the last detection sent for the ball.
    pub last_send_time: Option<Nanos>,
}

// =========================================================================
// == Robots ==
// =========================================================================

/// A staged change to a robot's pose. Metric, simulation frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotMove {
    pub position: Vector2<f32>,
    pub orientation: f32,
    /// `(v_x, v_y, omega)` in the field frame.
    pub velocity: Vector3<f32>,
    /// Drive towards the target instead of jumping there.
    pub by_force: bool,
}

#[derive(Component, Debug)]
pub struct SimRobot {
    pub key: RobotKey,
    pub specs: RobotSpecs,
    /// Position within the team roster. Decides the holding position.
    pub roster_index: usize,
    pub drive: OmniDrive,
    pub command: RobotCommand,
    /// Step time at which the last command was delivered.
    pub command_time: f64,
    pub in_standby: bool,
    /// Charge flag of the last delivered command.
    pub charge: bool,
    pub is_charged: bool,
    pub shoot_time: f64,
    /// Simulation time of the last detection sent for this robot.
    pub last_send_time: Option<Nanos>,
    pub pending_move: Option<RobotMove>,
    pub touches_ball: bool,
}

impl SimRobot {
    pub fn new(key: RobotKey, specs: RobotSpecs, drive: OmniDrive, roster_index: usize) -> Self {
        Self {
            key,
            specs,
            roster_index,
            drive,
            command: RobotCommand::default(),
            command_time: f64::NEG_INFINITY,
            in_standby: true,
            charge: false,
            is_charged: false,
            shoot_time: f64::NEG_INFINITY,
            last_send_time: None,
            pending_move: None,
            touches_ball: false,
        }
    }
}
