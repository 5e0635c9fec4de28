// pitch_core/src/types.rs

use serde::{Deserialize, Serialize};

// --- Core Type Aliases ---

/// Virtual simulation time in nanoseconds.
pub type Nanos = i64;

pub const NANOS_PER_MILLI: Nanos = 1_000_000;
pub const NANOS_PER_SEC: Nanos = 1_000_000_000;

pub fn secs_to_nanos(secs: f64) -> Nanos {
    (secs * NANOS_PER_SEC as f64).round() as Nanos
}

pub fn nanos_to_secs(nanos: Nanos) -> f64 {
    nanos as f64 / NANOS_PER_SEC as f64
}

// --- Physical constants of the ball ---
// The ball is the same for every field, so these are not part of the config.

/// Ball radius in metres.
pub const BALL_RADIUS: f32 = 0.0215;
/// Ball mass in kilograms.
pub const BALL_MASS: f32 = 0.046;

// --- Core Identifiers ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamColor {
    Blue,
    Yellow,
}

impl TeamColor {
    pub const ALL: [TeamColor; 2] = [TeamColor::Blue, TeamColor::Yellow];

    /// The half of the field a team's robots are parked on.
    /// Blue waits on the positive x half, yellow on the negative one.
    pub fn side(self) -> f32 {
        match self {
            TeamColor::Blue => 1.0,
            TeamColor::Yellow => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TeamColor::Blue => "blue",
            TeamColor::Yellow => "yellow",
        }
    }
}

impl std::fmt::Display for TeamColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique address of a robot on the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RobotKey {
    pub team: TeamColor,
    pub id: u32,
}

impl RobotKey {
    pub fn new(team: TeamColor, id: u32) -> Self {
        Self { team, id }
    }
}

impl std::fmt::Display for RobotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.team, self.id)
    }
}
