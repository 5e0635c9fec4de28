// pitch_sim/src/simulation/core/transforms.rs

use bevy::prelude::{Quat, Resource, Vec3};
use nalgebra::{Vector2, Vector3};
use std::f32::consts::PI;

// =========================================================================
// == World Scale ==
// =========================================================================

/// Factor between metric vision-frame values and rigid-body world units.
///
/// The physics frame shares its axes with the vision frame (x along the
/// field length, z up), it is only scaled. Masses and angular quantities are
/// not affected.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct WorldScale(pub f32);

impl Default for WorldScale {
    fn default() -> Self {
        Self(10.0)
    }
}

impl WorldScale {
    /// Metric position or velocity into world units.
    pub fn to_world(&self, v: &Vector3<f32>) -> Vec3 {
        Vec3::new(v.x, v.y, v.z) * self.0
    }

    /// World units back into metres (or m/s).
    pub fn to_metric(&self, v: Vec3) -> Vector3<f32> {
        Vector3::new(v.x, v.y, v.z) / self.0
    }

    pub fn length(&self, metres: f32) -> f32 {
        metres * self.0
    }
}

// =========================================================================
// == Orientation Helpers ==
// =========================================================================

/// Heading around the vertical axis.
pub fn yaw_of(rotation: Quat) -> f32 {
    let forward = rotation * Vec3::X;
    forward.y.atan2(forward.x)
}

/// Vertical component of the body's up axis. Negative when upside down.
pub fn up_z(rotation: Quat) -> f32 {
    (rotation * Vec3::Z).z
}

pub fn yaw_rotation(yaw: f32) -> Quat {
    Quat::from_rotation_z(yaw)
}

/// Wraps an angle into `(-pi, pi]`.
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

// =========================================================================
// == Reporting Frame ==
// =========================================================================

/// Mapping between the simulated field and the frame consumers see.
///
/// A flipped field swaps the team halves by rotating every reported pose by
/// half a turn around the centre. Inputs are mapped with the same
/// transform, which is its own inverse.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportFrame {
    pub flipped: bool,
}

impl ReportFrame {
    pub fn new(flipped: bool) -> Self {
        Self { flipped }
    }

    fn sign(&self) -> f32 {
        if self.flipped {
            -1.0
        } else {
            1.0
        }
    }

    pub fn point(&self, p: Vector2<f32>) -> Vector2<f32> {
        p * self.sign()
    }

    /// Maps only the horizontal part of a 3D vector.
    pub fn planar(&self, v: Vector3<f32>) -> Vector3<f32> {
        Vector3::new(v.x * self.sign(), v.y * self.sign(), v.z)
    }

    pub fn angle(&self, phi: f32) -> f32 {
        if self.flipped {
            normalize_angle(phi + PI)
        } else {
            phi
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_world_scale_round_trip() {
        let scale = WorldScale(10.0);
        let v = Vector3::new(0.1, -0.2, 0.0215);
        let world = scale.to_world(&v);
        assert_abs_diff_eq!(world.z, 0.215, epsilon = 1e-6);
        let back = scale.to_metric(world);
        assert_abs_diff_eq!(back.y, -0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_yaw_and_up_axis() {
        let rotation = yaw_rotation(1.0);
        assert_abs_diff_eq!(yaw_of(rotation), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(up_z(rotation), 1.0, epsilon = 1e-6);
        let upside_down = Quat::from_rotation_x(PI);
        assert!(up_z(upside_down) < 0.0);
    }

    #[test]
    fn test_flipped_frame_is_an_involution() {
        let frame = ReportFrame::new(true);
        let p = Vector2::new(1.5, -2.0);
        assert_eq!(frame.point(frame.point(p)), p);
        let phi = 0.3;
        assert_abs_diff_eq!(frame.angle(frame.angle(phi)), phi, epsilon = 1e-6);
        assert_abs_diff_eq!(frame.angle(0.0), PI, epsilon = 1e-6);
        assert_eq!(ReportFrame::default().point(p), p);
    }
}
