// pitch_core/src/realism.rs

//! Noise, loss and delay parameters that degrade ground truth into emulated
//! sensor output.

use serde::{Deserialize, Serialize};

use crate::errors::{codes, SimulatorError};
use crate::types::{secs_to_nanos, Nanos};

/// The active realism parameters. Distances are in metres, angles in radians,
/// times in seconds and probabilities in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(bevy_ecs::prelude::Resource))]
#[serde(default, deny_unknown_fields)]
pub struct RealismConfig {
    pub stddev_ball_p: f32,
    /// Standard deviation of the reported ball area, in pixels.
    pub stddev_ball_area: f32,
    pub stddev_robot_p: f32,
    pub stddev_robot_phi: f32,
    pub robot_command_loss: f32,
    pub robot_response_loss: f32,
    /// Probability that a visible ball is not reported in a frame.
    pub missing_ball_detections: f32,
    /// Probability that a ball held in a dribbler is still reported.
    pub dribbler_ball_detections: f32,
    pub vision_delay: f32,
    pub vision_processing_time: f32,
    pub min_ball_detection_time: f32,
    pub min_robot_detection_time: f32,
    /// Distance by which each camera's field of view reaches into its neighbours.
    pub camera_overlap: f32,
    /// Offset between the real camera positions and the calibrated ones.
    pub camera_position_error: f32,
    pub enable_invisible_ball: bool,
    pub ball_visibility_threshold: f32,
}

impl Default for RealismConfig {
    fn default() -> Self {
        Self::none()
    }
}

impl RealismConfig {
    /// Perfect sensors. Only the vision pipeline latency is kept.
    pub fn none() -> Self {
        Self {
            stddev_ball_p: 0.0,
            stddev_ball_area: 0.0,
            stddev_robot_p: 0.0,
            stddev_robot_phi: 0.0,
            robot_command_loss: 0.0,
            robot_response_loss: 0.0,
            missing_ball_detections: 0.0,
            dribbler_ball_detections: 1.0,
            vision_delay: 0.035,
            vision_processing_time: 0.005,
            min_ball_detection_time: 0.0,
            min_robot_detection_time: 0.0,
            camera_overlap: 0.3,
            camera_position_error: 0.0,
            enable_invisible_ball: false,
            ball_visibility_threshold: 0.4,
        }
    }

    /// Values measured on a competition field.
    pub fn realistic() -> Self {
        Self {
            stddev_ball_p: 0.0014,
            stddev_ball_area: 3.0,
            stddev_robot_p: 0.0012,
            stddev_robot_phi: 0.01,
            robot_command_loss: 0.03,
            robot_response_loss: 0.1,
            missing_ball_detections: 0.05,
            dribbler_ball_detections: 0.3,
            camera_overlap: 0.4,
            camera_position_error: 0.1,
            enable_invisible_ball: true,
            ..Self::none()
        }
    }

    pub fn vision_delay_nanos(&self) -> Nanos {
        secs_to_nanos(self.vision_delay as f64)
    }

    pub fn vision_processing_nanos(&self) -> Nanos {
        secs_to_nanos(self.vision_processing_time as f64)
    }

    pub fn min_ball_detection_nanos(&self) -> Nanos {
        secs_to_nanos(self.min_ball_detection_time as f64)
    }

    pub fn min_robot_detection_nanos(&self) -> Nanos {
        secs_to_nanos(self.min_robot_detection_time as f64)
    }

    /// Merges a sparse update. Only fields present in `update` change.
    ///
    /// Out of range values are clamped into their valid range and reported,
    /// so applying the same update twice leaves the config unchanged.
    pub fn apply(&mut self, update: &RealismUpdate) -> Vec<SimulatorError> {
        fn set<T: Copy>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        set(&mut self.stddev_ball_p, update.stddev_ball_p);
        set(&mut self.stddev_ball_area, update.stddev_ball_area);
        set(&mut self.stddev_robot_p, update.stddev_robot_p);
        set(&mut self.stddev_robot_phi, update.stddev_robot_phi);
        set(&mut self.robot_command_loss, update.robot_command_loss);
        set(&mut self.robot_response_loss, update.robot_response_loss);
        set(&mut self.missing_ball_detections, update.missing_ball_detections);
        set(&mut self.dribbler_ball_detections, update.dribbler_ball_detections);
        set(&mut self.vision_delay, update.vision_delay);
        set(&mut self.vision_processing_time, update.vision_processing_time);
        set(&mut self.min_ball_detection_time, update.min_ball_detection_time);
        set(&mut self.min_robot_detection_time, update.min_robot_detection_time);
        set(&mut self.camera_overlap, update.camera_overlap);
        set(&mut self.camera_position_error, update.camera_position_error);
        set(&mut self.enable_invisible_ball, update.enable_invisible_ball);
        set(&mut self.ball_visibility_threshold, update.ball_visibility_threshold);

        self.sanitize()
    }

    /// Clamps every value into its valid range and reports what was changed.
    pub fn sanitize(&mut self) -> Vec<SimulatorError> {
        let mut errors = Vec::new();
        {
            let mut non_negative = |name: &str, value: &mut f32| {
                if !(*value >= 0.0) {
                    errors.push(SimulatorError::new(
                        codes::REALISM_VALUE,
                        format!("{} must not be negative, got {}", name, value),
                    ));
                    *value = 0.0;
                }
            };
            non_negative("stddev_ball_p", &mut self.stddev_ball_p);
            non_negative("stddev_ball_area", &mut self.stddev_ball_area);
            non_negative("stddev_robot_p", &mut self.stddev_robot_p);
            non_negative("stddev_robot_phi", &mut self.stddev_robot_phi);
            non_negative("vision_delay", &mut self.vision_delay);
            non_negative("vision_processing_time", &mut self.vision_processing_time);
            non_negative("min_ball_detection_time", &mut self.min_ball_detection_time);
            non_negative("min_robot_detection_time", &mut self.min_robot_detection_time);
            non_negative("camera_overlap", &mut self.camera_overlap);
            non_negative("camera_position_error", &mut self.camera_position_error);
        }
        {
            let mut probability = |name: &str, value: &mut f32| {
                if !(0.0..=1.0).contains(&*value) {
                    errors.push(SimulatorError::new(
                        codes::REALISM_VALUE,
                        format!("{} must be within [0, 1], got {}", name, value),
                    ));
                    *value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
                }
            };
            probability("robot_command_loss", &mut self.robot_command_loss);
            probability("robot_response_loss", &mut self.robot_response_loss);
            probability("missing_ball_detections", &mut self.missing_ball_detections);
            probability("dribbler_ball_detections", &mut self.dribbler_ball_detections);
            probability("ball_visibility_threshold", &mut self.ball_visibility_threshold);
        }
        // A packet cannot be captured before the simulation produced it.
        if self.vision_processing_time > self.vision_delay {
            errors.push(SimulatorError::new(
                codes::REALISM_VALUE,
                format!(
                    "vision_processing_time {} exceeds vision_delay {}",
                    self.vision_processing_time, self.vision_delay
                ),
            ));
            self.vision_processing_time = self.vision_delay;
        }
        errors
    }
}

/// A sparse update of [`RealismConfig`]. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RealismUpdate {
    pub stddev_ball_p: Option<f32>,
    pub stddev_ball_area: Option<f32>,
    pub stddev_robot_p: Option<f32>,
    pub stddev_robot_phi: Option<f32>,
    pub robot_command_loss: Option<f32>,
    pub robot_response_loss: Option<f32>,
    pub missing_ball_detections: Option<f32>,
    pub dribbler_ball_detections: Option<f32>,
    pub vision_delay: Option<f32>,
    pub vision_processing_time: Option<f32>,
    pub min_ball_detection_time: Option<f32>,
    pub min_robot_detection_time: Option<f32>,
    pub camera_overlap: Option<f32>,
    pub camera_position_error: Option<f32>,
    pub enable_invisible_ball: Option<bool>,
    pub ball_visibility_threshold: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_update_only_changes_set_fields() {
        let mut config = RealismConfig::none();
        let errors = config.apply(&RealismUpdate {
            stddev_ball_p: Some(0.01),
            enable_invisible_ball: Some(true),
            ..Default::default()
        });
        assert!(errors.is_empty());
        assert_eq!(config.stddev_ball_p, 0.01);
        assert!(config.enable_invisible_ball);
        assert_eq!(config.stddev_robot_p, 0.0);
        assert_eq!(config.vision_delay, 0.035);
    }

    #[test]
    fn test_applying_an_update_twice_is_idempotent() {
        let update = RealismUpdate {
            stddev_robot_phi: Some(0.02),
            robot_command_loss: Some(0.5),
            vision_delay: Some(0.02),
            ..Default::default()
        };
        let mut once = RealismConfig::realistic();
        once.apply(&update);
        let mut twice = once.clone();
        twice.apply(&update);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_out_of_range_values_are_clamped_and_reported() {
        let mut config = RealismConfig::none();
        let update = RealismUpdate {
            robot_response_loss: Some(1.5),
            stddev_ball_p: Some(-1.0),
            ..Default::default()
        };
        let errors = config.apply(&update);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code == codes::REALISM_VALUE));
        assert_eq!(config.robot_response_loss, 1.0);
        assert_eq!(config.stddev_ball_p, 0.0);

        // The clamped state is stable under the same update.
        let snapshot = config.clone();
        config.apply(&update);
        assert_eq!(config, snapshot);
    }

    #[test]
    fn test_processing_time_is_bounded_by_delay() {
        let mut config = RealismConfig::none();
        let errors = config.apply(&RealismUpdate {
            vision_delay: Some(0.001),
            ..Default::default()
        });
        assert_eq!(errors.len(), 1);
        assert_eq!(config.vision_processing_time, 0.001);
    }

    #[test]
    fn test_nanosecond_accessors() {
        let config = RealismConfig::none();
        assert_eq!(config.vision_delay_nanos(), 35_000_000);
        assert_eq!(config.vision_processing_nanos(), 5_000_000);
    }
}
