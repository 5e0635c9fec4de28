// pitch_sim/src/simulation/plugins/robot/mod.rs

//! Robot entities: spawning, the per-step drive, dribbler and kicker, and
//! recovery of robots that tipped over.

pub mod projection;
pub mod radio;

use avian3d::prelude::*;
use bevy::prelude::*;
use nalgebra::{Vector2, Vector3};
use pitch_core::{
    errors::CoreError,
    geometry::FieldGeometry,
    messages::{MoveCommand, RobotSpecs},
    models::{
        drive::{local_to_world, world_to_local, OmniDrive},
        robot::{
            can_kick, dribble_velocity, hull_points, kick_velocity, touches_dribbler, KickStyle,
        },
    },
    types::{RobotKey, TeamColor, BALL_MASS},
};
use std::f32::consts::FRAC_PI_2;

use crate::simulation::core::{
    components::{PhysicsTuning, RobotMove, SimBall, SimRobot, SimulationFlags, SubstepClock},
    sets::SubstepSet,
    transforms::{normalize_angle, up_z, yaw_of, yaw_rotation, ReportFrame, WorldScale},
};
use crate::simulation::plugins::{ball::kick_delta, field::surface};

/// Below this up-axis height a robot counts as tipped over.
const FLIP_THRESHOLD: f32 = 0.1;
/// Proportional gain of forced moves, in 1/s.
const FORCED_MOVE_GAIN: f32 = 10.0;
/// A forced move ends once the robot is this close to its target.
const FORCED_MOVE_TOLERANCE: f32 = 0.01;

pub struct RobotPlugin;

impl Plugin for RobotPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PhysicsSchedule,
            (
                respawn_flipped_robots.in_set(SubstepSet::RespawnRobots),
                robot_begin.in_set(SubstepSet::Robots),
            ),
        );
    }
}

// =========================================================================
// == Spawning ==
// =========================================================================

/// The x sign of a team's own half in the simulation frame.
pub fn simulation_side(team: TeamColor, flipped: bool) -> f32 {
    if flipped {
        -team.side()
    } else {
        team.side()
    }
}

fn robot_collider(specs: &RobotSpecs, scale: &WorldScale) -> Collider {
    let points: Vec<Vec3> = hull_points(specs)
        .iter()
        .map(|p| scale.to_world(p))
        .collect();
    Collider::convex_hull(points).unwrap_or_else(|| {
        warn!("Robot hull is degenerate, falling back to a cylinder");
        // Cylinders are built along y.
        Collider::compound(vec![(
            Vec3::ZERO,
            Quat::from_rotation_x(FRAC_PI_2),
            Collider::cylinder(scale.length(specs.radius), scale.length(specs.height)),
        )])
    })
}

/// Spawns a robot upright on its holding position.
pub fn spawn_robot(
    world: &mut World,
    key: RobotKey,
    specs: RobotSpecs,
    roster_index: usize,
) -> Result<Entity, CoreError> {
    let drive = OmniDrive::new(&specs)?;
    let scale = *world.resource::<WorldScale>();
    let flipped = world.resource::<SimulationFlags>().flip;
    let (x, y) = world
        .resource::<FieldGeometry>()
        .holding_position(simulation_side(key.team, flipped), roster_index);

    let position = scale.to_world(&Vector3::new(x, y, specs.height / 2.0));
    let rotation = Quat::IDENTITY;
    let entity = world
        .spawn((
            Name::new(format!("Robot {}", key)),
            RigidBody::Dynamic,
            robot_collider(&specs, &scale),
            Mass(specs.mass),
            surface(0.6, 0.22),
            Transform::from_translation(position).with_rotation(rotation),
            Position(position),
            Rotation(rotation),
            LinearVelocity::ZERO,
            AngularVelocity::ZERO,
            SimRobot::new(key, specs, drive, roster_index),
        ))
        .id();
    debug!("Spawned robot {} at ({:.2}, {:.2})", key, x, y);
    Ok(entity)
}

// =========================================================================
// == Per-Step Systems ==
// =========================================================================

pub fn is_flipped(rotation: Quat) -> bool {
    up_z(rotation) < FLIP_THRESHOLD
}

fn respawn_flipped_robots(
    mut robots: Query<(
        &mut SimRobot,
        &mut Position,
        &mut Rotation,
        &mut LinearVelocity,
        &mut AngularVelocity,
    )>,
    geometry: Res<FieldGeometry>,
    flags: Res<SimulationFlags>,
    scale: Res<WorldScale>,
) {
    for (mut robot, mut position, mut rotation, mut velocity, mut angular) in &mut robots {
        if !is_flipped(rotation.0) {
            continue;
        }
        let side = simulation_side(robot.key.team, flags.flip);
        let (x, y) = geometry.holding_position(side, robot.roster_index);
        debug!("Robot {} tipped over, respawning at ({:.2}, {:.2})", robot.key, x, y);
        position.0 = scale.to_world(&Vector3::new(x, y, robot.specs.height / 2.0));
        rotation.0 = Quat::IDENTITY;
        velocity.0 = Vec3::ZERO;
        angular.0 = Vec3::ZERO;
        robot.drive.reset_errors();
        robot.pending_move = None;
    }
}

/// Local target velocity `(forward, left, angular)` of the current command.
fn target_velocity(robot: &SimRobot, yaw: f32, frame: ReportFrame) -> Vector3<f32> {
    if robot.in_standby {
        return Vector3::zeros();
    }
    match robot.command.move_command {
        Some(MoveCommand::LocalVelocity {
            forward,
            left,
            angular,
        }) => Vector3::new(forward, left, angular),
        Some(MoveCommand::GlobalVelocity { x, y, angular }) => {
            let global = frame.point(Vector2::new(x, y));
            let local = world_to_local(global, yaw);
            Vector3::new(local.x, local.y, angular)
        }
        // Rejected on delivery.
        Some(MoveCommand::WheelVelocity { .. }) | None => Vector3::zeros(),
    }
}

/// Applies a staged move. Returns true while the move is still in progress.
fn apply_move(
    robot: &mut SimRobot,
    target: RobotMove,
    position: &mut Position,
    rotation: &mut Rotation,
    velocity: &mut LinearVelocity,
    angular: &mut AngularVelocity,
    scale: &WorldScale,
) -> bool {
    if target.by_force {
        let current = scale.to_metric(position.0);
        let offset = target.position - current.xy();
        let turn = normalize_angle(target.orientation - yaw_of(rotation.0));
        if offset.norm() < FORCED_MOVE_TOLERANCE && turn.abs() < FORCED_MOVE_TOLERANCE {
            return false;
        }
        let push = offset * FORCED_MOVE_GAIN;
        let push = push.cap_magnitude(robot.specs.v_max);
        let spin = (turn * FORCED_MOVE_GAIN).clamp(-robot.specs.omega_max, robot.specs.omega_max);
        let z = velocity.0.z;
        velocity.0 = scale.to_world(&Vector3::new(push.x, push.y, 0.0));
        velocity.0.z = z;
        angular.0 = Vec3::new(0.0, 0.0, spin);
        return true;
    }

    position.0 = scale.to_world(&Vector3::new(
        target.position.x,
        target.position.y,
        robot.specs.height / 2.0,
    ));
    rotation.0 = yaw_rotation(target.orientation);
    velocity.0 = scale.to_world(&Vector3::new(target.velocity.x, target.velocity.y, 0.0));
    angular.0 = Vec3::new(0.0, 0.0, target.velocity.z);
    robot.drive.reset_errors();
    false
}

/// Staged moves, then drive, dribbler and kicker.
#[allow(clippy::type_complexity)]
fn robot_begin(
    mut robots: Query<
        (
            &mut SimRobot,
            &mut Position,
            &mut Rotation,
            &mut LinearVelocity,
            &mut AngularVelocity,
        ),
        Without<SimBall>,
    >,
    mut balls: Query<(&Position, &mut LinearVelocity), (With<SimBall>, Without<SimRobot>)>,
    scale: Res<WorldScale>,
    tuning: Res<PhysicsTuning>,
    clock: Res<SubstepClock>,
    flags: Res<SimulationFlags>,
) {
    let dt = tuning.sub_timestep;
    let frame = ReportFrame::new(flags.flip);
    let mut ball = balls.single_mut().ok();

    for (mut robot, mut position, mut rotation, mut velocity, mut angular) in &mut robots {
        if let Some(target) = robot.pending_move {
            let in_progress = apply_move(
                &mut robot,
                target,
                &mut position,
                &mut rotation,
                &mut velocity,
                &mut angular,
                &scale,
            );
            if !in_progress {
                robot.pending_move = None;
            }
            continue;
        }

        if clock.now - robot.command_time > tuning.command_timeout as f64 {
            robot.in_standby = true;
        }
        if robot.charge
            && !robot.is_charged
            && clock.now - robot.shoot_time >= tuning.kicker_recharge_time as f64
        {
            robot.is_charged = true;
        }

        // --- Drive ---
        // The wheels act as a body-frame impulse: the bounded acceleration
        // is added to the velocity left by the last solve, so contacts keep
        // their effect and the drive never exceeds its force limits.
        let yaw = yaw_of(rotation.0);
        let world_velocity = scale.to_metric(velocity.0);
        let local = world_to_local(world_velocity.xy(), yaw);
        let current = Vector3::new(local.x, local.y, angular.0.z);
        let target = target_velocity(&robot, yaw, frame);
        let acceleration = robot.drive.control(&target, &current, dt);
        let next = current + acceleration * dt;
        let next_world = local_to_world(next.xy(), yaw);
        velocity.0 = scale.to_world(&Vector3::new(next_world.x, next_world.y, world_velocity.z));
        angular.0.z = next.z;

        // --- Dribbler and kicker ---
        let Some((ball_position, ball_velocity)) = ball.as_mut() else {
            robot.touches_ball = false;
            continue;
        };
        let robot_position = scale.to_metric(position.0);
        let ball_metric = scale.to_metric(ball_position.0);
        let relative = world_to_local((ball_metric - robot_position).xy(), yaw);
        let ball_local = Vector3::new(relative.x, relative.y, ball_metric.z);
        robot.touches_ball = touches_dribbler(&robot.specs, &ball_local);

        let dribbler_speed = robot.command.dribbler_speed.unwrap_or(0.0);
        if robot.touches_ball && dribbler_speed > 0.0 {
            let pull = local_to_world(
                dribble_velocity(&robot.specs, &ball_local, dribbler_speed),
                yaw,
            );
            let carried = next_world + pull;
            let z = ball_velocity.0.z;
            ball_velocity.0 = scale.to_world(&Vector3::new(carried.x, carried.y, 0.0));
            ball_velocity.0.z = z;
        }

        let power = robot.command.kick_speed.unwrap_or(0.0);
        let style = KickStyle::from_angle(robot.command.kick_angle.unwrap_or(0.0));
        if let Some(style) = style.filter(|_| power > 0.0 && robot.is_charged) {
            if can_kick(&robot.specs, &ball_local) {
                let shot = kick_velocity(&robot.specs, style, power);
                let shot_xy = local_to_world(shot.xy(), yaw);
                let force = Vector3::new(shot_xy.x, shot_xy.y, shot.z) * BALL_MASS / dt;
                ball_velocity.0 += scale.to_world(&kick_delta(&force, dt));
                robot.is_charged = false;
                robot.shoot_time = clock.now;
                robot.command.kick_speed = None;
                debug!("Robot {} kicked with {:?} at {:.2}", robot.key, style, power);
            }
        }
    }
}
