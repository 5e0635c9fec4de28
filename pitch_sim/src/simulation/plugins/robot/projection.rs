// pitch_sim/src/simulation/plugins/robot/projection.rs

//! Camera detections and ground truth of a robot.

use nalgebra::{Vector2, Vector3};
use pitch_core::{
    camera::CameraInfo,
    messages::{DetectionRobot, RobotSpecs, RobotState},
    noise::NoiseSampler,
    realism::RealismConfig,
};
use rand::Rng;

use crate::simulation::core::transforms::{normalize_angle, ReportFrame};
use crate::simulation::plugins::camera::CameraRig;

/// Pose of a robot in the simulation frame, metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotPose {
    pub position: Vector2<f32>,
    pub yaw: f32,
}

/// The detection of a robot by `camera`, if the camera covers it.
#[allow(clippy::too_many_arguments)]
pub fn detect_robot<R: Rng>(
    id: u32,
    specs: &RobotSpecs,
    pose: &RobotPose,
    camera: &CameraInfo,
    rig: &CameraRig,
    realism: &RealismConfig,
    frame: ReportFrame,
    noise: &mut NoiseSampler<'_, R>,
) -> Option<DetectionRobot> {
    let p = pose.position;
    if !rig.layout.sees(camera.id, p.x, p.y, realism.camera_overlap) {
        return None;
    }

    let measured = p + noise.gaussian_vector(realism.stddev_robot_p);
    let yaw = normalize_angle(pose.yaw + noise.gaussian(realism.stddev_robot_phi));
    let pixel = rig.pixel_position(camera, measured);
    let reported = frame.point(measured) * 1000.0;
    Some(DetectionRobot {
        confidence: 1.0,
        robot_id: id,
        x: reported.x,
        y: reported.y,
        orientation: frame.angle(yaw),
        pixel_x: pixel.x,
        pixel_y: pixel.y,
        height: specs.height * 1000.0,
    })
}

/// Exact state of a robot as seen by a consumer. Velocities are metric,
/// in the field frame.
pub fn robot_state(
    id: u32,
    position: &Vector3<f32>,
    rotation: [f32; 4],
    velocity: &Vector3<f32>,
    angular: &Vector3<f32>,
    touches_ball: bool,
    frame: ReportFrame,
) -> RobotState {
    let p = frame.planar(*position);
    let v = frame.planar(*velocity);
    let w = frame.planar(*angular);
    let [x, y, z, qw] = rotation;
    // Half a turn around z maps (x, y, z, w) to (-y, x, w, -z).
    let rotation = if frame.flipped {
        [-y, x, qw, -z]
    } else {
        [x, y, z, qw]
    };
    RobotState {
        id,
        p_x: p.x,
        p_y: p.y,
        p_z: p.z,
        rotation,
        v_x: v.x,
        v_y: v.y,
        v_z: v.z,
        angular_x: w.x,
        angular_y: w.y,
        angular_z: w.z,
        touches_ball,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pitch_core::{camera::CameraLayout, geometry::FieldGeometry};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::f32::consts::PI;

    fn rig() -> CameraRig {
        let layout = CameraLayout::new(4, &FieldGeometry::default(), 4.0).expect("layout");
        CameraRig::new(layout, 390.0)
    }

    #[test]
    fn test_detection_without_noise_is_exact() {
        let rig = rig();
        let realism = RealismConfig::none();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut noise = NoiseSampler::new(&mut rng);
        let pose = RobotPose {
            position: Vector2::new(5.8, -4.3),
            yaw: 0.25,
        };
        let camera = rig.cameras()[1];
        let detection = detect_robot(
            3,
            &RobotSpecs::default(),
            &pose,
            &camera,
            &rig,
            &realism,
            ReportFrame::default(),
            &mut noise,
        )
        .expect("covered by camera 1");
        assert_eq!(detection.robot_id, 3);
        assert_abs_diff_eq!(detection.x, 5800.0, epsilon = 1e-2);
        assert_abs_diff_eq!(detection.y, -4300.0, epsilon = 1e-2);
        assert_abs_diff_eq!(detection.orientation, 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(detection.height, 150.0, epsilon = 1e-3);

        // The diagonal camera does not cover the corner.
        let far = rig.cameras()[2];
        assert!(detect_robot(
            3,
            &RobotSpecs::default(),
            &pose,
            &far,
            &rig,
            &realism,
            ReportFrame::default(),
            &mut noise,
        )
        .is_none());
    }

    #[test]
    fn test_flipped_ground_truth_turns_the_robot_around() {
        let half = 0.25f32;
        let rotation = [0.0, 0.0, half.sin(), half.cos()];
        let state = robot_state(
            1,
            &Vector3::new(1.0, 2.0, 0.075),
            rotation,
            &Vector3::new(0.5, 0.0, 0.0),
            &Vector3::new(0.0, 0.0, 1.0),
            false,
            ReportFrame::new(true),
        );
        assert_abs_diff_eq!(state.p_x, -1.0);
        assert_abs_diff_eq!(state.p_y, -2.0);
        assert_abs_diff_eq!(state.p_z, 0.075);
        assert_abs_diff_eq!(state.v_x, -0.5);
        assert_abs_diff_eq!(state.angular_z, 1.0);
        assert_abs_diff_eq!(normalize_angle(state.yaw() - (0.5 + PI)), 0.0, epsilon = 1e-5);
    }
}
