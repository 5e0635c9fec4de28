// pitch_core/src/models/robot.rs

//! Body shape, dribbler and kicker geometry of a robot.
//! Positions are in the robot frame: x forward, y left, z up from the floor.

use nalgebra::{Vector2, Vector3};
use std::f32::consts::{FRAC_1_SQRT_2, PI};

use crate::messages::RobotSpecs;
use crate::types::BALL_RADIUS;

/// Gravity used for the chip kick ballistics, in m/s^2.
pub const GRAVITY: f32 = 9.81;
/// Tolerance in front of the dribbler bar in which the ball still counts as touching.
const CONTACT_TOLERANCE: f32 = 0.01;
/// How strongly a spinning dribbler pulls the ball towards its bar, in 1/s.
const DRIBBLE_GAIN: f32 = 20.0;
/// Number of vertices approximating the round part of the body.
const HULL_SEGMENTS: usize = 24;

/// Kick kinds supported by the kicker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KickStyle {
    Linear,
    Chip,
}

impl KickStyle {
    /// Kick style for an angle in degrees. Only 0 and 45 degrees exist.
    pub fn from_angle(angle_deg: f32) -> Option<Self> {
        if angle_deg.abs() < 1e-3 {
            Some(KickStyle::Linear)
        } else if (angle_deg - 45.0).abs() < 1e-3 {
            Some(KickStyle::Chip)
        } else {
            None
        }
    }
}

/// Distance from the body centre to the flat front.
pub fn front_distance(specs: &RobotSpecs) -> f32 {
    specs.radius * (specs.angle / 2.0).cos()
}

/// Convex hull of the body, centred at half height.
pub fn hull_points(specs: &RobotSpecs) -> Vec<Vector3<f32>> {
    let half_opening = specs.angle / 2.0;
    let half_height = specs.height / 2.0;
    let span = 2.0 * PI - specs.angle;

    let mut outline = Vec::with_capacity(HULL_SEGMENTS + 1);
    for i in 0..=HULL_SEGMENTS {
        let phi = half_opening + span * i as f32 / HULL_SEGMENTS as f32;
        outline.push(Vector2::new(specs.radius * phi.cos(), specs.radius * phi.sin()));
    }

    outline
        .iter()
        .flat_map(|p| {
            [
                Vector3::new(p.x, p.y, -half_height),
                Vector3::new(p.x, p.y, half_height),
            ]
        })
        .collect()
}

/// Whether a ball at `ball` (robot frame, ball centre) touches the dribbler bar.
pub fn touches_dribbler(specs: &RobotSpecs, ball: &Vector3<f32>) -> bool {
    let front = front_distance(specs);
    let in_front = ball.x >= front && ball.x <= front + BALL_RADIUS + CONTACT_TOLERANCE;
    let centred = ball.y.abs() <= specs.dribbler_width / 2.0;
    let low = ball.z <= specs.dribbler_height + BALL_RADIUS;
    in_front && centred && low
}

/// Whether the kicker can hit a ball at `ball` (robot frame, ball centre).
pub fn can_kick(specs: &RobotSpecs, ball: &Vector3<f32>) -> bool {
    let reach = specs.shoot_radius.max(front_distance(specs)) + BALL_RADIUS + CONTACT_TOLERANCE;
    ball.x > 0.0
        && ball.x <= reach
        && ball.y.abs() <= specs.dribbler_width / 2.0
        && ball.z <= specs.dribbler_height + BALL_RADIUS
}

/// Ball velocity produced by a kick, in the robot frame.
///
/// `power` is a speed in m/s for linear kicks and a flight distance in metres
/// for chips. Both are clamped to the robot's kicker limits.
pub fn kick_velocity(specs: &RobotSpecs, style: KickStyle, power: f32) -> Vector3<f32> {
    match style {
        KickStyle::Linear => {
            let speed = power.clamp(0.0, specs.shot_linear_max);
            Vector3::new(speed, 0.0, 0.0)
        }
        KickStyle::Chip => {
            // At 45 degrees the flight distance is v^2 / g.
            let distance = power.clamp(0.0, specs.shot_chip_max);
            let speed = (distance * GRAVITY).sqrt();
            Vector3::new(speed * FRAC_1_SQRT_2, 0.0, speed * FRAC_1_SQRT_2)
        }
    }
}

/// Relative velocity, robot frame, at which a spinning dribbler pulls the ball
/// onto its bar.
pub fn dribble_velocity(specs: &RobotSpecs, ball: &Vector3<f32>, dribbler_speed: f32) -> Vector2<f32> {
    let bar = Vector2::new(front_distance(specs) + BALL_RADIUS, 0.0);
    (bar - ball.xy()) * DRIBBLE_GAIN * dribbler_speed.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn specs() -> RobotSpecs {
        RobotSpecs::default()
    }

    fn ball_at_bar(specs: &RobotSpecs) -> Vector3<f32> {
        Vector3::new(front_distance(specs) + BALL_RADIUS, 0.0, BALL_RADIUS)
    }

    #[test]
    fn test_hull_stays_inside_the_radius() {
        let specs = specs();
        let hull = hull_points(&specs);
        assert_eq!(hull.len(), 2 * (HULL_SEGMENTS + 1));
        for p in &hull {
            assert!(p.xy().norm() <= specs.radius + 1e-5);
            // The flat front cuts the circle.
            assert!(p.x <= front_distance(&specs) + 1e-5);
        }
    }

    #[test]
    fn test_ball_at_bar_touches_and_is_kickable() {
        let specs = specs();
        let ball = ball_at_bar(&specs);
        assert!(touches_dribbler(&specs, &ball));
        assert!(can_kick(&specs, &ball));

        let behind = Vector3::new(-0.1, 0.0, BALL_RADIUS);
        assert!(!touches_dribbler(&specs, &behind));
        assert!(!can_kick(&specs, &behind));

        let aside = Vector3::new(ball.x, 0.1, BALL_RADIUS);
        assert!(!can_kick(&specs, &aside));
    }

    #[test]
    fn test_kick_styles() {
        assert_eq!(KickStyle::from_angle(0.0), Some(KickStyle::Linear));
        assert_eq!(KickStyle::from_angle(45.0), Some(KickStyle::Chip));
        assert_eq!(KickStyle::from_angle(30.0), None);
    }

    #[test]
    fn test_kicks_are_clamped_to_limits() {
        let specs = specs();
        let linear = kick_velocity(&specs, KickStyle::Linear, 20.0);
        assert_abs_diff_eq!(linear.x, specs.shot_linear_max);

        let chip = kick_velocity(&specs, KickStyle::Chip, 10.0);
        let speed = chip.norm();
        assert_abs_diff_eq!(speed * speed / GRAVITY, specs.shot_chip_max, epsilon = 1e-4);
        assert_abs_diff_eq!(chip.x, chip.z, epsilon = 1e-6);
    }

    #[test]
    fn test_dribbler_pulls_towards_bar() {
        let specs = specs();
        let mut ball = ball_at_bar(&specs);
        ball.y = 0.02;
        let v = dribble_velocity(&specs, &ball, 1.0);
        assert!(v.y < 0.0);
        assert_eq!(dribble_velocity(&specs, &ball, 0.0), Vector2::zeros());
    }
}
