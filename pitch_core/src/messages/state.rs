// pitch_core/src/messages/state.rs

use serde::{Deserialize, Serialize};

use crate::types::{RobotKey, TeamColor};

/// Exact state of the ball in metres and m/s, vision frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallState {
    pub p_x: f32,
    pub p_y: f32,
    pub p_z: f32,
    pub v_x: f32,
    pub v_y: f32,
    pub v_z: f32,
    pub angular_x: f32,
    pub angular_y: f32,
    pub angular_z: f32,
}

/// Exact state of one robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub id: u32,
    pub p_x: f32,
    pub p_y: f32,
    pub p_z: f32,
    /// Body orientation as a unit quaternion `[x, y, z, w]`.
    pub rotation: [f32; 4],
    pub v_x: f32,
    pub v_y: f32,
    pub v_z: f32,
    pub angular_x: f32,
    pub angular_y: f32,
    pub angular_z: f32,
    /// Whether the ball currently touches the dribbler bar.
    #[serde(default)]
    pub touches_ball: bool,
}

impl RobotState {
    /// Heading around the vertical axis, in radians.
    pub fn yaw(&self) -> f32 {
        let [x, y, z, w] = self.rotation;
        (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z))
    }
}

/// Ground truth snapshot of the whole field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorState {
    pub ball: Option<BallState>,
    pub blue_robots: Vec<RobotState>,
    pub yellow_robots: Vec<RobotState>,
}

impl SimulatorState {
    pub fn robots(&self, team: TeamColor) -> &[RobotState] {
        match team {
            TeamColor::Blue => &self.blue_robots,
            TeamColor::Yellow => &self.yellow_robots,
        }
    }

    pub fn robots_mut(&mut self, team: TeamColor) -> &mut Vec<RobotState> {
        match team {
            TeamColor::Blue => &mut self.blue_robots,
            TeamColor::Yellow => &mut self.yellow_robots,
        }
    }

    pub fn robot(&self, key: RobotKey) -> Option<&RobotState> {
        self.robots(key.team).iter().find(|r| r.id == key.id)
    }
}
