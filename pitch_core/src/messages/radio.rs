// pitch_core/src/messages/radio.rs

use serde::{Deserialize, Serialize};

use crate::types::{Nanos, TeamColor};

/// Drive part of a radio command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MoveCommand {
    /// Velocity in the robot frame: `forward` along the kicker, `left` sideways.
    LocalVelocity { forward: f32, left: f32, angular: f32 },
    /// Velocity in the field frame. Converted to the robot frame on delivery.
    GlobalVelocity { x: f32, y: f32, angular: f32 },
    /// Raw wheel speeds. The drive model has no wheel-level input, so these are rejected.
    WheelVelocity {
        front_right: f32,
        back_right: f32,
        back_left: f32,
        front_left: f32,
    },
}

/// One robot's command inside a radio batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotCommand {
    pub id: u32,
    pub move_command: Option<MoveCommand>,
    /// Straight kick speed in m/s, or chip distance in metres when `kick_angle` is 45.
    pub kick_speed: Option<f32>,
    /// Kick angle in degrees. Only 0 (straight) and 45 (chip) are supported.
    pub kick_angle: Option<f32>,
    /// Dribbler speed, normalized to `[0, 1]`.
    pub dribbler_speed: Option<f32>,
}

impl RobotCommand {
    pub fn drive(id: u32, forward: f32, left: f32, angular: f32) -> Self {
        Self {
            id,
            move_command: Some(MoveCommand::LocalVelocity {
                forward,
                left,
                angular,
            }),
            ..Default::default()
        }
    }
}

/// Measured local velocity reported back by a robot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalSpeed {
    pub forward: f32,
    pub left: f32,
    pub angular: f32,
}

/// Telemetry response sent by a robot for every command it receives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadioResponse {
    pub id: u32,
    pub generation: u32,
    pub team: TeamColor,
    /// Simulation time at which the command was delivered.
    pub time: Nanos,
    pub ball_detected: bool,
    pub cap_charged: bool,
    pub estimated_speed: LocalSpeed,
}
