// pitch_sim/src/simulation/config/mod.rs

//! This module handles loading and validating the simulator configuration,
//! including the robot roster catalog.

mod catalog;

pub use catalog::{RobotCatalog, RosterPreset};

use bevy::prelude::*;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use pitch_core::{
    camera::CameraLayout, errors::CoreError, geometry::FieldGeometry, realism::RealismConfig,
    types::{secs_to_nanos, Nanos},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] CoreError),

    #[error("invalid configuration value '{name}': {reason}")]
    Value { name: &'static str, reason: String },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// =========================================================================
// == Top-Level Configuration Resource ==
// =========================================================================

/// # SimulatorConfig
/// Everything needed to build a simulator. Immutable after construction,
/// except for the realism parameters which commands may update.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Seed of the simulation's random number generator.
    pub seed: u64,
    pub geometry: FieldGeometry,
    pub cameras: CameraConfig,
    pub physics: PhysicsConfig,
    pub timing: TimingConfig,
    pub realism: RealismConfig,
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    /// One of 1, 2, 4 or 8.
    pub count: u32,
    /// Mounting height above the floor, in metres.
    pub height: f32,
    /// Focal length in pixels, used for the apparent ball size.
    pub focal_length: f32,
    /// Sample points per axis when checking how much of the ball a camera sees.
    pub ball_visibility_samples: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            count: 4,
            height: 4.0,
            focal_length: 390.0,
            ball_visibility_samples: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConfig {
    /// Factor between metres and rigid-body world units. The solver is more
    /// stable with objects of roughly unit size than with 2 cm balls.
    pub world_scale: f32,
    /// Fixed physics step in seconds.
    pub sub_timestep: f64,
    /// Upper bound on physics steps per tick. Time beyond it is dropped.
    pub max_substeps: u32,
    pub gravity: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            world_scale: 10.0,
            sub_timestep: 1.0 / 200.0,
            max_substeps: 10,
            gravity: 9.81,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Nominal tick period of the scheduler, in seconds of simulated time.
    pub tick_period: f64,
    /// Minimum spacing of two vision frames. Half a tick below three ticks
    /// so that every third tick produces a frame.
    pub vision_interval: f64,
    /// A robot without a fresh command goes to standby after this long.
    pub command_timeout: f64,
    /// Time the kicker needs to recharge after a shot.
    pub kicker_recharge_time: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_period: 0.005,
            vision_interval: 0.0125,
            command_timeout: 0.1,
            kicker_recharge_time: 0.5,
        }
    }
}

impl TimingConfig {
    pub fn tick_nanos(&self) -> Nanos {
        secs_to_nanos(self.tick_period)
    }

    pub fn vision_interval_nanos(&self) -> Nanos {
        secs_to_nanos(self.vision_interval)
    }
}

// =========================================================================
// == Loading ==
// =========================================================================

impl SimulatorConfig {
    /// Loads the defaults, overlaid by a TOML file and then by `PITCH_`
    /// environment variables (`PITCH_CAMERAS__COUNT=8`).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: SimulatorConfig = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PITCH_").split("__"))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Self::load`], but an unreadable or invalid file only costs a log
    /// line. The simulator then runs with the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded simulator configuration from {:?}", path);
                config
            }
            Err(e) => {
                error!(
                    "Could not use simulator configuration at {:?}: {}. Falling back to defaults.",
                    path, e
                );
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry.validate()?;
        CameraLayout::grid(self.cameras.count)?;

        let positive = [
            ("cameras.height", self.cameras.height as f64),
            ("cameras.focal_length", self.cameras.focal_length as f64),
            ("physics.world_scale", self.physics.world_scale as f64),
            ("physics.sub_timestep", self.physics.sub_timestep),
            ("timing.tick_period", self.timing.tick_period),
            ("timing.vision_interval", self.timing.vision_interval),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Value {
                    name,
                    reason: format!("must be positive, got {}", value),
                });
            }
        }
        if self.physics.max_substeps == 0 {
            return Err(ConfigError::Value {
                name: "physics.max_substeps",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimulatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = SimulatorConfig::load_or_default(Path::new("does/not/exist.toml"));
        assert_eq!(config, SimulatorConfig::default());
    }

    #[test]
    fn test_invalid_camera_count_is_rejected() {
        let mut config = SimulatorConfig::default();
        config.cameras.count = 3;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(CoreError::UnsupportedCameraCount(3)))
        ));
    }

    #[test]
    fn test_non_positive_scale_is_rejected() {
        let mut config = SimulatorConfig::default();
        config.physics.world_scale = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Value {
                name: "physics.world_scale",
                ..
            })
        ));
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = SimulatorConfig::default();
        let text = config.to_toml_string().expect("serializable");
        let parsed: SimulatorConfig = toml::from_str(&text).expect("parsable");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let parsed: SimulatorConfig = Figment::from(Serialized::defaults(SimulatorConfig::default()))
            .merge(Toml::string("seed = 42\n[cameras]\ncount = 8\n"))
            .extract()
            .expect("valid toml");
        assert_eq!(parsed.seed, 42);
        assert_eq!(parsed.cameras.count, 8);
        assert_eq!(parsed.cameras.height, 4.0);
        assert_eq!(parsed.physics, PhysicsConfig::default());
    }
}
