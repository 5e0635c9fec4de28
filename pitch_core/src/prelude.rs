// pitch_core/src/prelude.rs

// --- Core Data Structures ---
pub use crate::camera::{CameraInfo, CameraLayout};
pub use crate::geometry::FieldGeometry;
pub use crate::realism::{RealismConfig, RealismUpdate};
pub use crate::types::{Nanos, RobotKey, TeamColor, BALL_MASS, BALL_RADIUS};

// --- Errors ---
pub use crate::errors::{codes, CoreError, ErrorAggregator, ErrorSource, SimulatorError};

// --- Protocol ---
pub use crate::messages::{
    RadioResponse, RobotCommand, RobotSpecs, SimulatorCommand, SimulatorState, WrapperPacket,
};

// --- Models ---
pub use crate::models::drive::OmniDrive;
pub use crate::noise::NoiseSampler;
