// pitch_core/src/messages/command.rs

use serde::{Deserialize, Serialize};

use crate::messages::state::SimulatorState;
use crate::realism::RealismUpdate;
use crate::types::TeamColor;

// =========================================================================
// == Simulator Control Command ==
// =========================================================================

/// A sparse control command for the simulator.
///
/// Every field is optional. Absent fields leave the corresponding part of the
/// simulation untouched, so a command can be as small as a single teleport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorCommand {
    /// Starts or stops the simulation. Enabling resyncs the virtual clock.
    pub enable: Option<bool>,
    /// Virtual time multiplier. Values `<= 0` pause the tick trigger.
    pub scaling: Option<f64>,
    /// Mirrors the field so that blue and yellow exchange their halves.
    pub flip: Option<bool>,
    /// Whether kickers recharge after a shot.
    pub charge: Option<bool>,
    pub realism: Option<RealismUpdate>,
    pub teleport_ball: Option<TeleportBall>,
    pub teleport_robots: Vec<TeleportRobot>,
    /// Replaces the whole blue roster.
    pub set_team_blue: Option<Vec<RobotSpecs>>,
    /// Replaces the whole yellow roster.
    pub set_team_yellow: Option<Vec<RobotSpecs>>,
    pub vision_worst_case: Option<VisionWorstCase>,
    /// Authoritative pose injection for the ball and every listed robot.
    pub restore_state: Option<SimulatorState>,
}

impl SimulatorCommand {
    pub fn roster(&self, team: TeamColor) -> Option<&Vec<RobotSpecs>> {
        match team {
            TeamColor::Blue => self.set_team_blue.as_ref(),
            TeamColor::Yellow => self.set_team_yellow.as_ref(),
        }
    }
}

/// Moves the ball. Coordinates are in metres in the vision frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportBall {
    pub x: f32,
    pub y: f32,
    /// Height of the ball's bottom above the floor.
    pub z: Option<f32>,
    pub vx: Option<f32>,
    pub vy: Option<f32>,
    pub vz: Option<f32>,
    /// Also clears robots that overlap the target position.
    pub teleport_safely: bool,
    /// Push the ball towards the target by hand instead of placing it.
    /// The push persists until another ball move replaces it.
    pub by_force: bool,
}

/// Moves one robot. Missing position fields keep the current value,
/// missing velocity fields are zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeleportRobot {
    pub id: u32,
    pub team: TeamColor,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub orientation: Option<f32>,
    #[serde(default)]
    pub v_x: Option<f32>,
    #[serde(default)]
    pub v_y: Option<f32>,
    #[serde(default)]
    pub v_angular: Option<f32>,
    #[serde(default)]
    pub by_force: bool,
}

impl TeleportRobot {
    pub fn to(team: TeamColor, id: u32, x: f32, y: f32, orientation: f32) -> Self {
        Self {
            id,
            team,
            x: Some(x),
            y: Some(y),
            orientation: Some(orientation),
            v_x: None,
            v_y: None,
            v_angular: None,
            by_force: false,
        }
    }
}

/// Lower bounds on the interval between two detections of the same object.
/// Values are in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionWorstCase {
    pub min_ball_detection_time: Option<f32>,
    pub min_robot_detection_time: Option<f32>,
}

// =========================================================================
// == Robot Specifications ==
// =========================================================================

/// Per-axis acceleration bounds in m/s^2 (rad/s^2 for `phi`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccelerationLimits {
    pub speedup_f: f32,
    pub speedup_s: f32,
    pub speedup_phi: f32,
    pub brake_f: f32,
    pub brake_s: f32,
    pub brake_phi: f32,
}

impl Default for AccelerationLimits {
    fn default() -> Self {
        Self {
            speedup_f: 7.0,
            speedup_s: 6.0,
            speedup_phi: 60.0,
            brake_f: 7.0,
            brake_s: 6.0,
            brake_phi: 60.0,
        }
    }
}

/// Physical description of a robot, as sent in a roster command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotSpecs {
    pub id: u32,
    pub generation: u32,
    /// Radius of the round body in metres.
    pub radius: f32,
    pub height: f32,
    pub mass: f32,
    /// Opening angle (radians) of the flat front, measured at the centre.
    pub angle: f32,
    pub v_max: f32,
    pub omega_max: f32,
    /// Maximum straight kick speed in m/s.
    pub shot_linear_max: f32,
    /// Maximum chip kick distance in metres.
    pub shot_chip_max: f32,
    pub dribbler_width: f32,
    /// Distance from the centre to the dribbler bar.
    pub shoot_radius: f32,
    pub dribbler_height: f32,
    /// Wheel mounting angles in radians, measured from the forward axis.
    pub wheel_angles: [f32; 4],
    pub acceleration: Option<AccelerationLimits>,
}

impl Default for RobotSpecs {
    fn default() -> Self {
        Self {
            id: 0,
            generation: 0,
            radius: 0.09,
            height: 0.15,
            mass: 1.5,
            angle: 0.98291,
            v_max: 3.0,
            omega_max: 6.0,
            shot_linear_max: 8.0,
            shot_chip_max: 3.0,
            dribbler_width: 0.07,
            shoot_radius: 0.067,
            dribbler_height: 0.04,
            wheel_angles: [
                60f32.to_radians(),
                135f32.to_radians(),
                225f32.to_radians(),
                300f32.to_radians(),
            ],
            acceleration: Some(AccelerationLimits::default()),
        }
    }
}

impl RobotSpecs {
    pub fn with_id(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}
