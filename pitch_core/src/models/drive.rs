// pitch_core/src/models/drive.rs

//! Acceleration-limited four wheel omni drive.
//!
//! Body velocities are `(forward, left, angular)` in the robot frame.

use nalgebra::{Matrix3x4, Matrix4x3, Vector2, Vector3, Vector4};

use crate::errors::CoreError;
use crate::messages::{AccelerationLimits, RobotSpecs};

/// Integral gain of the per-wheel error correction, in 1/s.
const WHEEL_ERROR_GAIN: f32 = 2.0;
/// Anti-windup bound of the accumulated wheel error, in m/s * s.
const WHEEL_ERROR_LIMIT: f32 = 0.5;

/// Rotates a field-frame vector into a frame rotated by `yaw`.
pub fn world_to_local(v: Vector2<f32>, yaw: f32) -> Vector2<f32> {
    let (sin, cos) = yaw.sin_cos();
    Vector2::new(cos * v.x + sin * v.y, -sin * v.x + cos * v.y)
}

/// Inverse of [`world_to_local`].
pub fn local_to_world(v: Vector2<f32>, yaw: f32) -> Vector2<f32> {
    let (sin, cos) = yaw.sin_cos();
    Vector2::new(cos * v.x - sin * v.y, sin * v.x + cos * v.y)
}

/// Bounds one axis of acceleration.
///
/// Speeding up (acceleration with the direction of motion, or starting from
/// rest) is limited by `speedup`, slowing down by `brake`.
pub fn bound(acceleration: f32, old_speed: f32, speedup: f32, brake: f32) -> f32 {
    let speeding_up = old_speed == 0.0 || acceleration.signum() == old_speed.signum();
    let limit = if speeding_up { speedup } else { brake };
    acceleration.clamp(-limit, limit)
}

#[derive(Debug, Clone, PartialEq)]
pub struct OmniDrive {
    coupling: Matrix4x3<f32>,
    inverse_coupling: Matrix3x4<f32>,
    limits: AccelerationLimits,
    v_max: f32,
    omega_max: f32,
    wheel_error: Vector4<f32>,
}

impl OmniDrive {
    pub fn new(specs: &RobotSpecs) -> Result<Self, CoreError> {
        // Each wheel rolls perpendicular to its mounting radius.
        let mut coupling = Matrix4x3::zeros();
        for (i, angle) in specs.wheel_angles.iter().enumerate() {
            let (sin, cos) = angle.sin_cos();
            coupling[(i, 0)] = -sin;
            coupling[(i, 1)] = cos;
            coupling[(i, 2)] = specs.radius;
        }
        let inverse_coupling = coupling
            .pseudo_inverse(1e-6)
            .map_err(|_| CoreError::DegenerateWheelLayout)?;
        if (inverse_coupling * coupling - nalgebra::Matrix3::identity()).norm() > 1e-3 {
            return Err(CoreError::DegenerateWheelLayout);
        }

        Ok(Self {
            coupling,
            inverse_coupling,
            limits: specs.acceleration.unwrap_or_default(),
            v_max: specs.v_max,
            omega_max: specs.omega_max,
            wheel_error: Vector4::zeros(),
        })
    }

    pub fn limits(&self) -> &AccelerationLimits {
        &self.limits
    }

    /// Wheel speeds for a body velocity.
    pub fn wheel_speeds(&self, body: &Vector3<f32>) -> Vector4<f32> {
        self.coupling * body
    }

    /// Body velocity that best explains the given wheel speeds.
    pub fn body_velocity(&self, wheels: &Vector4<f32>) -> Vector3<f32> {
        self.inverse_coupling * wheels
    }

    pub fn reset_errors(&mut self) {
        self.wheel_error = Vector4::zeros();
    }

    pub fn wheel_error(&self) -> &Vector4<f32> {
        &self.wheel_error
    }

    /// Clamps a commanded body velocity to the robot's speed limits.
    pub fn clamp_target(&self, target: &Vector3<f32>) -> Vector3<f32> {
        let linear = Vector2::new(target.x, target.y);
        let speed = linear.norm();
        let linear = if speed > self.v_max && speed > 0.0 {
            linear * (self.v_max / speed)
        } else {
            linear
        };
        Vector3::new(
            linear.x,
            linear.y,
            target.z.clamp(-self.omega_max, self.omega_max),
        )
    }

    /// Per-axis acceleration bounds applied to a desired body acceleration.
    pub fn limit_acceleration(
        &self,
        desired: &Vector3<f32>,
        current: &Vector3<f32>,
    ) -> Vector3<f32> {
        let l = &self.limits;
        Vector3::new(
            bound(desired.x, current.x, l.speedup_f, l.brake_f),
            bound(desired.y, current.y, l.speedup_s, l.brake_s),
            bound(desired.z, current.z, l.speedup_phi, l.brake_phi),
        )
    }

    /// Body acceleration that moves `current` towards `target` during one step.
    ///
    /// The bounded acceleration is taken into wheel space, corrected by the
    /// accumulated per-wheel tracking error and mapped back to the body.
    pub fn control(
        &mut self,
        target: &Vector3<f32>,
        current: &Vector3<f32>,
        dt: f32,
    ) -> Vector3<f32> {
        if dt <= 0.0 {
            return Vector3::zeros();
        }
        let target = self.clamp_target(target);
        let error = target - current;
        let bounded = self.limit_acceleration(&(error / dt), current);

        let wheel_error = self.coupling * error;
        self.wheel_error = (self.wheel_error + wheel_error * dt)
            .map(|e| e.clamp(-WHEEL_ERROR_LIMIT, WHEEL_ERROR_LIMIT));

        let wheel_acceleration = self.coupling * bounded + self.wheel_error * WHEEL_ERROR_GAIN;
        let corrected = self.inverse_coupling * wheel_acceleration;
        self.limit_acceleration(&corrected, current)
    }
}
