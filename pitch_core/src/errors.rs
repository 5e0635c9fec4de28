// pitch_core/src/errors.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TeamColor;

// =========================================================================
// == Library Errors ==
// =========================================================================

/// Errors returned by the pure geometry and config helpers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("unsupported camera count {0}, expected one of 1, 2, 4 or 8")]
    UnsupportedCameraCount(u32),

    #[error("camera id {id} is out of range for a layout of {count} cameras")]
    CameraOutOfRange { id: u32, count: u32 },

    #[error("field dimension '{name}' must be positive, got {value}")]
    InvalidFieldDimension { name: &'static str, value: f32 },

    #[error("wheel angles do not span the robot's three degrees of freedom")]
    DegenerateWheelLayout,
}

// =========================================================================
// == Reported Simulator Errors ==
// =========================================================================

/// Error codes reported back to the command sources.
pub mod codes {
    pub const VELOCITY_TYPE: &str = "VELOCITY_TYPE";
    pub const ANGLE_VALUE: &str = "ANGLE_VALUE";
    pub const UNKNOWN_ROBOT: &str = "UNKNOWN_ROBOT";
    pub const REALISM_VALUE: &str = "REALISM_VALUE";
    pub const ACCELERATION_LIMITS: &str = "ACCELERATION_LIMITS";
    pub const ROBOT_SPECS: &str = "ROBOT_SPECS";
}

/// A non-fatal error reported through the error drain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorError {
    pub code: String,
    pub message: String,
}

impl SimulatorError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Who caused an error, and therefore who gets to see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSource {
    Blue,
    Yellow,
    Config,
}

impl From<TeamColor> for ErrorSource {
    fn from(team: TeamColor) -> Self {
        match team {
            TeamColor::Blue => ErrorSource::Blue,
            TeamColor::Yellow => ErrorSource::Yellow,
        }
    }
}

/// Collects errors per source until the caller drains them.
#[derive(Debug, Default, Clone)]
pub struct ErrorAggregator {
    blue: Vec<SimulatorError>,
    yellow: Vec<SimulatorError>,
    config: Vec<SimulatorError>,
}

impl ErrorAggregator {
    pub fn push(&mut self, source: ErrorSource, error: SimulatorError) {
        self.bucket_mut(source).push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.blue.is_empty() && self.yellow.is_empty() && self.config.is_empty()
    }

    /// Returns and removes every error of one source.
    pub fn get_and_clear(&mut self, source: ErrorSource) -> Vec<SimulatorError> {
        std::mem::take(self.bucket_mut(source))
    }

    /// Drains all sources. Sources without errors are skipped.
    pub fn drain_all(&mut self) -> Vec<(ErrorSource, Vec<SimulatorError>)> {
        [ErrorSource::Blue, ErrorSource::Yellow, ErrorSource::Config]
            .into_iter()
            .map(|source| (source, self.get_and_clear(source)))
            .filter(|(_, errors)| !errors.is_empty())
            .collect()
    }

    fn bucket_mut(&mut self, source: ErrorSource) -> &mut Vec<SimulatorError> {
        match source {
            ErrorSource::Blue => &mut self.blue,
            ErrorSource::Yellow => &mut self.yellow,
            ErrorSource::Config => &mut self.config,
        }
    }
}
