// pitch_sim/src/prelude.rs

// Re-export the entire Bevy prelude for convenience.
pub use bevy::prelude::*;

// Re-export the pitch_core prelude so plain types like `RobotKey`,
// `RobotCommand` or `SimulatorState` are at hand.
pub use pitch_core::prelude::*;

// Re-export common simulation-specific types for easy access.
pub use crate::simulation::config::{RobotCatalog, RosterPreset, SimulatorConfig};
pub use crate::simulation::core::components::{SimBall, SimRobot, SimulationFlags};
pub use crate::simulation::core::registry::RobotRegistry;
pub use crate::simulation::core::transforms::{ReportFrame, WorldScale};
pub use crate::simulation::scheduling::{RealtimeDriver, StepDriver, TickSource, VirtualClock};
pub use crate::simulation::simulator::{SchedulingMode, Simulator, SimulatorOutput};
pub use crate::PitchSimulationPlugin;
