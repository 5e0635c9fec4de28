// pitch_core/src/models/ball.rs

//! Ball behaviour the rigid-body engine does not provide: rolling friction,
//! hand pushes and the camera projection of a possibly occluded ball.
//! All values are metric, in the vision frame.

use nalgebra::{Vector2, Vector3};
use std::f32::consts::PI;

/// Deceleration of a rolling ball on the carpet, in m/s^2.
/// Measured at 0.35 and scaled up to cover losses the solver does not model.
pub const ROLLING_DECELERATION: f32 = 1.4 * 0.35;
/// Below this speed a grounded ball snaps into a carpet dimple and stops.
pub const STOP_SPEED: f32 = 0.01;
/// Fraction of the remaining distance a hand push covers per physics step.
pub const HAND_PUSH_GAIN: f32 = 0.1;
/// Linear damping while the ball is pushed by hand.
pub const HAND_PUSH_DAMPING: f32 = 0.99;
/// A ball is never corrected for more than this fraction of the camera height.
const PARALLAX_LIMIT: f32 = 0.9;

pub fn is_grounded(z: f32, radius: f32) -> bool {
    z < radius * 1.1
}

/// Velocity after one step of rolling friction. Airborne balls are unaffected.
pub fn rolling_friction(velocity: Vector3<f32>, z: f32, radius: f32, dt: f32) -> Vector3<f32> {
    if !is_grounded(z, radius) {
        return velocity;
    }
    if velocity.norm() < STOP_SPEED {
        return Vector3::zeros();
    }
    let horizontal = velocity.xy();
    let speed = horizontal.norm();
    if speed == 0.0 {
        return velocity;
    }
    // Friction only slows the ball down, it never reverses it.
    let new_speed = (speed - ROLLING_DECELERATION * dt).max(0.0);
    let horizontal = horizontal * (new_speed / speed);
    Vector3::new(horizontal.x, horizontal.y, velocity.z)
}

/// Velocity change of one hand-push step towards `target`.
pub fn hand_push(position: Vector2<f32>, target: Vector2<f32>) -> Vector2<f32> {
    (target - position) * HAND_PUSH_GAIN
}

/// Ground position at which a camera reports a ball.
///
/// A camera looking at an elevated ball sees it further away from its
/// optical axis than the ball's ground projection.
pub fn parallax_correct(ball: &Vector3<f32>, camera: &Vector3<f32>, radius: f32) -> Vector2<f32> {
    let height = (ball.z - radius).max(0.0).min(PARALLAX_LIMIT * camera.z);
    let scale = camera.z / (camera.z - height);
    camera.xy() + (ball.xy() - camera.xy()) * scale
}

/// Apparent ball size in pixels.
pub fn pixel_area(visibility: f32, distance: f32, focal_length: f32, radius: f32) -> f32 {
    if distance <= 0.0 {
        return 0.0;
    }
    let pixel_radius = focal_length * radius / distance;
    visibility * PI * pixel_radius * pixel_radius
}

/// Sample points on the disc through the ball centre that faces the camera.
///
/// `resolution` points per axis are laid on a square grid; points outside
/// the disc are dropped.
pub fn disc_samples(
    center: &Vector3<f32>,
    camera: &Vector3<f32>,
    radius: f32,
    resolution: usize,
) -> Vec<Vector3<f32>> {
    let Some(toward_camera) = (camera - center).try_normalize(1e-6) else {
        return vec![*center];
    };
    // Any vector not parallel to the view direction spans the disc plane.
    let helper = if toward_camera.z.abs() < 0.9 {
        Vector3::z()
    } else {
        Vector3::x()
    };
    let u = toward_camera.cross(&helper).normalize();
    let v = toward_camera.cross(&u);

    let resolution = resolution.max(1);
    let step = if resolution > 1 {
        2.0 / (resolution - 1) as f32
    } else {
        0.0
    };
    let mut samples = Vec::with_capacity(resolution * resolution);
    for i in 0..resolution {
        for j in 0..resolution {
            let a = if resolution > 1 { -1.0 + i as f32 * step } else { 0.0 };
            let b = if resolution > 1 { -1.0 + j as f32 * step } else { 0.0 };
            if a * a + b * b <= 1.0 + 1e-6 {
                samples.push(center + (u * a + v * b) * radius);
            }
        }
    }
    samples
}

/// Fraction of unoccluded samples.
pub fn visibility(unoccluded: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    unoccluded as f32 / total as f32
}

/// A ball exactly at the threshold still counts as visible.
pub fn is_visible(visibility: f32, threshold: f32) -> bool {
    visibility >= threshold
}
