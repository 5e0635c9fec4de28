// pitch_sim/src/simulation/plugins/ball/mod.rs

//! The ball entity and its per-step logic.

pub mod projection;

use avian3d::prelude::*;
use bevy::prelude::*;
use nalgebra::{Vector2, Vector3};
use pitch_core::{
    models::ball::{hand_push, rolling_friction, HAND_PUSH_DAMPING},
    types::{BALL_MASS, BALL_RADIUS},
};

use crate::simulation::core::{
    components::{BallMove, PhysicsTuning, SimBall},
    sets::SubstepSet,
    transforms::WorldScale,
};
use crate::simulation::plugins::field::surface;

pub struct BallPlugin;

impl Plugin for BallPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_ball).add_systems(
            PhysicsSchedule,
            (
                respawn_invalid_ball.in_set(SubstepSet::RespawnBall),
                ball_begin.in_set(SubstepSet::Ball),
            ),
        );
    }
}

/// Resting position of a freshly spawned ball.
pub fn rest_position() -> Vector3<f32> {
    Vector3::new(0.0, 0.0, BALL_RADIUS)
}

fn spawn_ball(mut commands: Commands, scale: Res<WorldScale>) {
    let position = scale.to_world(&rest_position());
    commands.spawn((
        Name::new("Ball"),
        SimBall::default(),
        RigidBody::Dynamic,
        Collider::sphere(scale.length(BALL_RADIUS)),
        Mass(BALL_MASS),
        surface(1.0, 1.0),
        SweptCcd::default(),
        LinearDamping(0.0),
        Transform::from_translation(position),
        Position(position),
        LinearVelocity::ZERO,
        AngularVelocity::ZERO,
    ));
}

/// A ball with non-finite state or with its centre below the floor.
pub fn is_invalid(position: &Vector3<f32>, velocity: &Vector3<f32>) -> bool {
    let finite = position.iter().chain(velocity.iter()).all(|v| v.is_finite());
    !finite || position.z < 0.0
}

/// Velocity change of a kick with the given force over one step.
pub fn kick_delta(force: &Vector3<f32>, dt: f32) -> Vector3<f32> {
    force * dt / BALL_MASS
}

/// A damping fraction per second expressed as a continuous damping rate.
fn damping_rate(fraction: f32) -> f32 {
    -(1.0 - fraction.clamp(0.0, 0.999)).ln()
}

fn respawn_invalid_ball(
    mut balls: Query<(&mut Position, &mut LinearVelocity, &mut AngularVelocity), With<SimBall>>,
    scale: Res<WorldScale>,
) {
    for (mut position, mut velocity, mut angular) in &mut balls {
        let p = scale.to_metric(position.0);
        let v = scale.to_metric(velocity.0);
        if is_invalid(&p, &v) {
            debug!("Ball state {:?} / {:?} is invalid, respawning at the centre", p, v);
            position.0 = scale.to_world(&rest_position());
            velocity.0 = Vec3::ZERO;
            angular.0 = Vec3::ZERO;
        }
    }
}

/// Rolling friction, then the staged move.
fn ball_begin(
    mut balls: Query<(
        &mut SimBall,
        &mut Position,
        &mut LinearVelocity,
        &mut AngularVelocity,
        &mut LinearDamping,
    )>,
    scale: Res<WorldScale>,
    tuning: Res<PhysicsTuning>,
) {
    let dt = tuning.sub_timestep;
    for (mut ball, mut position, mut velocity, mut angular, mut damping) in &mut balls {
        let p = scale.to_metric(position.0);
        let v = rolling_friction(scale.to_metric(velocity.0), p.z, BALL_RADIUS, dt);
        velocity.0 = scale.to_world(&v);

        match ball.pending_move {
            Some(BallMove::Place {
                position: target,
                velocity: target_velocity,
                angular: target_angular,
            }) => {
                position.0 = scale.to_world(&target);
                velocity.0 = scale.to_world(&target_velocity);
                angular.0 = Vec3::new(target_angular.x, target_angular.y, target_angular.z);
                damping.0 = 0.0;
                ball.pending_move = None;
            }
            Some(BallMove::Push { target }) => {
                let push = hand_push(Vector2::new(p.x, p.y), target);
                velocity.0 += scale.to_world(&Vector3::new(push.x, push.y, 0.0));
                damping.0 = damping_rate(HAND_PUSH_DAMPING);
            }
            None => damping.0 = 0.0,
        }
    }
}
