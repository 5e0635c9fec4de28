// pitch_core/src/messages/mod.rs

//! In-process protocol messages exchanged with the simulator.
//! Ground truth and commands use metres, vision detections use millimetres.

pub mod command;
pub mod radio;
pub mod state;
pub mod vision;

use serde::{Deserialize, Serialize};

use crate::types::Nanos;

pub use command::{
    AccelerationLimits, RobotSpecs, SimulatorCommand, TeleportBall, TeleportRobot,
    VisionWorstCase,
};
pub use radio::{LocalSpeed, MoveCommand, RadioResponse, RobotCommand};
pub use state::{BallState, RobotState, SimulatorState};
pub use vision::{
    CameraCalibration, DetectionBall, DetectionFrame, DetectionRobot, FieldCircularArc,
    FieldLineSegment, FieldSize, GeometryData, WrapperPacket,
};

/// Wall-clock cost of one simulator tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorTiming {
    /// Simulation time at the end of the tick.
    pub time: Nanos,
    /// Seconds of real time the tick took to compute.
    pub simulator: f64,
}
