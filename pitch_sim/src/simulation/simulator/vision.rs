// pitch_sim/src/simulation/simulator/vision.rs

//! Builds one vision frame and the ground truth from the ECS world.

use avian3d::prelude::*;
use bevy::prelude::*;
use nalgebra::{Vector2, Vector3};
use pitch_core::{
    geometry::FieldGeometry,
    messages::{
        BallState, DetectionFrame, GeometryData, RobotSpecs, SimulatorState, WrapperPacket,
    },
    noise::NoiseSampler,
    realism::RealismConfig,
    types::{Nanos, RobotKey, TeamColor},
};

use crate::simulation::core::{
    components::{Floor, SimBall, SimRobot, SimulationFlags},
    prng::SimulationRng,
    registry::RobotRegistry,
    transforms::{yaw_of, ReportFrame, WorldScale},
};
use crate::simulation::plugins::{
    ball::projection::BallProjection,
    camera::CameraRig,
    robot::projection::{detect_robot, robot_state, RobotPose},
};

/// Timestamps and counters of the frame to build.
#[derive(Debug, Clone, Copy)]
pub struct VisionRequest {
    pub time: Nanos,
    pub frame_number: u32,
    pub t_capture: f64,
    pub t_sent: f64,
    pub visibility_samples: usize,
}

struct RobotSnapshot {
    key: RobotKey,
    entity: Entity,
    specs: RobotSpecs,
    pose: RobotPose,
    touches_ball: bool,
    due: bool,
}

fn is_due(last_send_time: Option<Nanos>, min_interval: Nanos, time: Nanos) -> bool {
    last_send_time.is_none_or(|last| last + min_interval <= time)
}

/// One wrapper packet per camera that detected something. The first packet
/// carries the geometry. Without any detection a single geometry packet for
/// camera 0 is emitted so consumers always learn the field.
#[allow(clippy::too_many_arguments)]
pub fn build_vision_frame(
    In(request): In<VisionRequest>,
    spatial: SpatialQuery,
    mut balls: Query<(Entity, &mut SimBall, &Position)>,
    mut robots: Query<(&mut SimRobot, &Position, &Rotation)>,
    floors: Query<Entity, With<Floor>>,
    registry: Res<RobotRegistry>,
    rig: Res<CameraRig>,
    geometry: Res<FieldGeometry>,
    realism: Res<RealismConfig>,
    scale: Res<WorldScale>,
    flags: Res<SimulationFlags>,
    mut rng: ResMut<SimulationRng>,
) -> Vec<WrapperPacket> {
    let time = request.time;
    let frame = ReportFrame::new(flags.flip);
    let mut noise = NoiseSampler::new(&mut rng.0);

    let snapshots: Vec<RobotSnapshot> = registry
        .iter()
        .filter_map(|(key, slot)| {
            let (robot, position, rotation) = robots.get(slot.entity).ok()?;
            let metric = scale.to_metric(position.0);
            Some(RobotSnapshot {
                key,
                entity: slot.entity,
                specs: robot.specs.clone(),
                pose: RobotPose {
                    position: Vector2::new(metric.x, metric.y),
                    yaw: yaw_of(rotation.0),
                },
                touches_ball: robot.touches_ball,
                due: is_due(robot.last_send_time, realism.min_robot_detection_nanos(), time),
            })
        })
        .collect();
    let ball_in_dribbler = snapshots.iter().any(|robot| robot.touches_ball);

    let ball = balls
        .single()
        .ok()
        .map(|(entity, ball, position)| (entity, ball.last_send_time, scale.to_metric(position.0)));
    let ball_due = ball.is_some_and(|(_, last, _)| {
        is_due(last, realism.min_ball_detection_nanos(), time)
    });

    let mut excluded: Vec<Entity> = floors.iter().collect();
    if let Some((entity, _, _)) = ball {
        excluded.push(entity);
    }
    let filter = SpatialQueryFilter::default().with_excluded_entities(excluded);
    let occluded = |sample: &Vector3<f32>, camera: &Vector3<f32>| {
        let origin = scale.to_world(sample);
        let delta = scale.to_world(camera) - origin;
        let Ok(direction) = Dir3::new(delta) else {
            return false;
        };
        spatial
            .cast_ray(origin, direction, delta.length(), true, &filter)
            .is_some()
    };

    let projection = BallProjection {
        rig: &rig,
        geometry: &geometry,
        realism: &realism,
        frame,
        samples: request.visibility_samples,
    };

    let mut ball_sent = false;
    let mut robots_sent: Vec<Entity> = Vec::new();
    let mut detections = Vec::new();
    for camera in rig.cameras() {
        let mut detection = DetectionFrame {
            frame_number: request.frame_number,
            t_capture: request.t_capture,
            t_sent: request.t_sent,
            camera_id: camera.id,
            ..Default::default()
        };

        if let Some((_, _, position)) = ball.filter(|_| ball_due) {
            let seen = projection
                .detect(&position, &camera, occluded, &mut noise)
                .filter(|_| !noise.chance(realism.missing_ball_detections))
                .filter(|_| !ball_in_dribbler || noise.chance(realism.dribbler_ball_detections));
            if let Some(seen) = seen {
                detection.balls.push(seen);
                ball_sent = true;
            }
        }

        for robot in snapshots.iter().filter(|robot| robot.due) {
            let Some(seen) = detect_robot(
                robot.key.id,
                &robot.specs,
                &robot.pose,
                &camera,
                &rig,
                &realism,
                frame,
                &mut noise,
            ) else {
                continue;
            };
            match robot.key.team {
                TeamColor::Blue => detection.robots_blue.push(seen),
                TeamColor::Yellow => detection.robots_yellow.push(seen),
            }
            robots_sent.push(robot.entity);
        }

        if !detection.is_empty() {
            detections.push(detection);
        }
    }

    if ball_sent {
        if let Ok((_, mut ball, _)) = balls.single_mut() {
            ball.last_send_time = Some(time);
        }
    }
    for entity in robots_sent {
        if let Ok((mut robot, _, _)) = robots.get_mut(entity) {
            robot.last_send_time = Some(time);
        }
    }

    let geometry_data = GeometryData {
        field: geometry.field_size(),
        calib: rig
            .cameras()
            .iter()
            .map(|camera| rig.calibration(camera, frame))
            .collect(),
    };

    if detections.is_empty() {
        return vec![WrapperPacket {
            detection: Some(DetectionFrame {
                frame_number: request.frame_number,
                t_capture: request.t_capture,
                t_sent: request.t_sent,
                camera_id: 0,
                ..Default::default()
            }),
            geometry: Some(geometry_data),
        }];
    }

    let mut geometry_data = Some(geometry_data);
    detections
        .into_iter()
        .map(|detection| WrapperPacket {
            detection: Some(detection),
            geometry: geometry_data.take(),
        })
        .collect()
}

/// Exact state of the ball and every robot, in the reported frame.
pub fn collect_ground_truth(
    balls: Query<(&Position, &LinearVelocity, &AngularVelocity), With<SimBall>>,
    robots: Query<(
        &SimRobot,
        &Position,
        &Rotation,
        &LinearVelocity,
        &AngularVelocity,
    )>,
    registry: Res<RobotRegistry>,
    scale: Res<WorldScale>,
    flags: Res<SimulationFlags>,
) -> SimulatorState {
    let frame = ReportFrame::new(flags.flip);
    let mut state = SimulatorState {
        ball: balls.single().ok().map(|(position, velocity, angular)| {
            let p = frame.planar(scale.to_metric(position.0));
            let v = frame.planar(scale.to_metric(velocity.0));
            let w = frame.planar(Vector3::new(angular.0.x, angular.0.y, angular.0.z));
            BallState {
                p_x: p.x,
                p_y: p.y,
                p_z: p.z,
                v_x: v.x,
                v_y: v.y,
                v_z: v.z,
                angular_x: w.x,
                angular_y: w.y,
                angular_z: w.z,
            }
        }),
        ..Default::default()
    };

    for (key, slot) in registry.iter() {
        let Ok((robot, position, rotation, velocity, angular)) = robots.get(slot.entity) else {
            continue;
        };
        let q = rotation.0;
        let robot_state = robot_state(
            key.id,
            &scale.to_metric(position.0),
            [q.x, q.y, q.z, q.w],
            &scale.to_metric(velocity.0),
            &Vector3::new(angular.0.x, angular.0.y, angular.0.z),
            robot.touches_ball,
            frame,
        );
        state.robots_mut(key.team).push(robot_state);
    }
    state
}
