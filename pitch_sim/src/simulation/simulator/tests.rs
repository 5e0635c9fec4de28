// pitch_sim/src/simulation/simulator/tests.rs

//! Whole-simulator scenarios, stepped with a fixed 5 ms tick.

use super::*;
use crate::simulation::scheduling::{StepDriver, TickSource};
use approx::assert_abs_diff_eq;
use pitch_core::{
    geometry::FieldGeometry,
    messages::{DetectionFrame, MoveCommand, RobotState},
    models::ball::ROLLING_DECELERATION,
    types::{nanos_to_secs, NANOS_PER_MILLI},
};
use std::collections::BTreeSet;

const TICK: Nanos = 5 * NANOS_PER_MILLI;

fn simulator(mode: SchedulingMode) -> Simulator {
    Simulator::new(SimulatorConfig::default(), mode).expect("default config is valid")
}

fn roster(ids: &[u32]) -> Vec<RobotSpecs> {
    ids.iter().map(|id| RobotSpecs::with_id(*id)).collect()
}

fn run(simulator: &mut Simulator, millis: i64) {
    StepDriver::new(TICK).go_delta(simulator, millis * NANOS_PER_MILLI);
}

fn vision_packets(outputs: &[SimulatorOutput]) -> Vec<&Vec<WrapperPacket>> {
    outputs
        .iter()
        .filter_map(|output| match output {
            SimulatorOutput::Vision(wrappers) => Some(wrappers),
            _ => None,
        })
        .collect()
}

fn radio_responses(outputs: &[SimulatorOutput]) -> Vec<RadioResponse> {
    outputs
        .iter()
        .filter_map(|output| match output {
            SimulatorOutput::RadioResponses(responses) => Some(responses.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

fn robot(state: &SimulatorState, team: TeamColor, id: u32) -> RobotState {
    *state
        .robot(RobotKey::new(team, id))
        .expect("robot in ground truth")
}

fn speed(robot: &RobotState) -> f32 {
    Vector2::new(robot.v_x, robot.v_y).norm()
}

#[test]
fn test_single_team_is_detected() {
    let mut sim = simulator(SchedulingMode::Manual);
    sim.set_team(TeamColor::Blue, &roster(&[0, 1, 2]));
    run(&mut sim, 100);

    let outputs = sim.take_outputs();
    let packets = vision_packets(&outputs);
    let last = packets.last().expect("vision was produced");
    let detections: Vec<&DetectionFrame> = last.iter().filter_map(|w| w.detection.as_ref()).collect();

    let blue: Vec<u32> = detections
        .iter()
        .flat_map(|d| d.robots_blue.iter().map(|r| r.robot_id))
        .collect();
    // Every robot sits well inside one camera cell, so each is seen once.
    assert_eq!(blue.len(), 3);
    assert_eq!(blue.iter().copied().collect::<BTreeSet<_>>(), BTreeSet::from([0, 1, 2]));
    assert!(detections.iter().all(|d| d.robots_yellow.is_empty()));
    assert!(last[0].geometry.is_some());
    assert!(last.iter().skip(1).all(|w| w.geometry.is_none()));
}

#[test]
fn test_single_tick_steps_the_physics() {
    let mut sim = simulator(SchedulingMode::Manual);
    assert!(StepDriver::new(TICK).tick(&mut sim));

    assert_eq!(sim.time(), TICK);
    assert_eq!(sim.world().resource::<SubstepClock>().steps, 1);
    let outputs = sim.take_outputs();
    assert!(outputs
        .iter()
        .any(|output| matches!(output, SimulatorOutput::Timing(timing) if timing.time == TICK)));
}

#[test]
fn test_detections_respect_minimum_spacing() {
    let mut sim = simulator(SchedulingMode::Manual);
    sim.set_team(TeamColor::Blue, &roster(&[0]));
    sim.handle_command(&SimulatorCommand {
        realism: Some(RealismUpdate {
            min_robot_detection_time: Some(0.05),
            min_ball_detection_time: Some(0.1),
            ..Default::default()
        }),
        ..Default::default()
    });
    run(&mut sim, 500);

    let outputs = sim.take_outputs();
    let frames = vision_packets(&outputs);
    let captures = |seen: fn(&DetectionFrame) -> bool| -> Vec<f64> {
        frames
            .iter()
            .filter_map(|wrappers| {
                wrappers
                    .iter()
                    .filter_map(|w| w.detection.as_ref())
                    .find(|d| seen(d))
                    .map(|d| d.t_capture)
            })
            .collect()
    };
    let robot_frames = captures(|d| !d.robots_blue.is_empty());
    let ball_frames = captures(|d| !d.balls.is_empty());

    // Frames keep coming every 15 ms, detections only after their spacing.
    assert!(frames.len() > 30);
    for (times, spacing) in [(&robot_frames, 0.05), (&ball_frames, 0.1)] {
        assert!(times.len() >= 4, "only {} detections", times.len());
        for pair in times.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= spacing - 1e-6, "gap of {} s", gap);
            assert!(gap <= spacing + 0.015 + 1e-6, "gap of {} s", gap);
        }
    }
}

#[test]
fn test_resting_ball_stays_put() {
    let mut sim = simulator(SchedulingMode::Manual);
    run(&mut sim, 1_000);

    let ball = sim.ground_truth().ball.expect("ball exists");
    assert_abs_diff_eq!(ball.p_x, 0.0, epsilon = 0.01);
    assert_abs_diff_eq!(ball.p_y, 0.0, epsilon = 0.01);
    assert_abs_diff_eq!(ball.p_z, BALL_RADIUS, epsilon = 0.01);
}

#[test]
fn test_command_is_not_applied_before_its_time() {
    let mut sim = simulator(SchedulingMode::Manual);
    sim.set_team(TeamColor::Blue, &roster(&[0]));
    let origin = sim.now() + 100 * NANOS_PER_MILLI;
    sim.handle_radio_commands(TeamColor::Blue, vec![RobotCommand::drive(0, 1.0, 0.0, 0.0)], origin);

    run(&mut sim, 50);
    assert!(radio_responses(&sim.take_outputs()).is_empty());
    assert!(speed(&robot(&sim.ground_truth(), TeamColor::Blue, 0)) < 0.01);

    run(&mut sim, 100);
    let responses = radio_responses(&sim.take_outputs());
    assert_eq!(responses.len(), 1);
    assert!(responses[0].time > origin);
    assert!(speed(&robot(&sim.ground_truth(), TeamColor::Blue, 0)) > 0.01);
}

#[test]
fn test_tick_and_vision_cadence() {
    let mut sim = simulator(SchedulingMode::Manual);
    let mut callbacks = 0;
    StepDriver::new(TICK).go_delta_with(&mut sim, 10_000 * NANOS_PER_MILLI, 10 * NANOS_PER_MILLI, |_| {
        callbacks += 1
    });
    assert_eq!(callbacks, 1001);

    let frames = vision_packets(&sim.take_outputs()).len();
    let rate = frames as f64 / 10.0;
    assert!((60.0..70.0).contains(&rate), "vision at {} Hz", rate);
}

#[test]
fn test_realtime_mode_holds_packets_until_sent() {
    let mut sim = simulator(SchedulingMode::Realtime);
    // The first frame is taken at 15 ms and sent 35 ms later.
    run(&mut sim, 40);
    assert!(vision_packets(&sim.take_outputs()).is_empty());
    run(&mut sim, 15);
    assert_eq!(vision_packets(&sim.take_outputs()).len(), 1);
}

#[test]
fn test_manual_mode_releases_packets_immediately() {
    let mut sim = simulator(SchedulingMode::Manual);
    run(&mut sim, 15);
    let outputs = sim.take_outputs();
    assert_eq!(vision_packets(&outputs).len(), 1);
    assert!(outputs
        .iter()
        .any(|output| matches!(output, SimulatorOutput::GroundTruth(_))));
}

#[test]
fn test_tipped_robot_is_put_back() {
    let mut sim = simulator(SchedulingMode::Manual);
    sim.set_team(TeamColor::Yellow, &roster(&[3]));
    let slot = sim
        .world()
        .resource::<RobotRegistry>()
        .get(RobotKey::new(TeamColor::Yellow, 3))
        .expect("spawned");
    let mut rotation = sim
        .world_mut()
        .get_mut::<Rotation>(slot.entity)
        .expect("rigid body");
    rotation.0 = Quat::from_rotation_x(PI);
    run(&mut sim, 20);

    let state = robot(&sim.ground_truth(), TeamColor::Yellow, 3);
    let (x, y) = FieldGeometry::default().holding_position(TeamColor::Yellow.side(), 0);
    assert_abs_diff_eq!(state.p_x, x, epsilon = 0.02);
    assert_abs_diff_eq!(state.p_y, y, epsilon = 0.02);
    let up = Quat::from_xyzw(
        state.rotation[0],
        state.rotation[1],
        state.rotation[2],
        state.rotation[3],
    ) * Vec3::Z;
    assert!(up.z > 0.9);
}

#[test]
fn test_ball_below_the_floor_is_respawned() {
    let mut sim = simulator(SchedulingMode::Manual);
    let scale = sim.scale();
    {
        let world = sim.world_mut();
        let mut balls = world.query_filtered::<&mut Position, With<SimBall>>();
        let mut position = balls.single_mut(world).expect("one ball");
        position.0 = scale.to_world(&Vector3::new(1.0, 1.0, -0.5));
    }
    run(&mut sim, 10);

    let ball = sim.ground_truth().ball.expect("ball exists");
    assert_abs_diff_eq!(ball.p_x, 0.0, epsilon = 0.01);
    assert_abs_diff_eq!(ball.p_y, 0.0, epsilon = 0.01);
}

#[test]
fn test_duplicate_ids_keep_the_first_robot() {
    let mut sim = simulator(SchedulingMode::Manual);
    sim.set_team(TeamColor::Blue, &roster(&[1, 1, 2]));
    assert_eq!(sim.world().resource::<RobotRegistry>().len(), 2);
    assert_eq!(sim.ground_truth().blue_robots.len(), 2);

    // Replacing the team drops the old robots.
    sim.set_team(TeamColor::Blue, &roster(&[5]));
    let state = sim.ground_truth();
    assert_eq!(state.blue_robots.len(), 1);
    assert_eq!(state.blue_robots[0].id, 5);
}

#[test]
fn test_commands_for_unknown_robots_are_dropped() {
    let mut sim = simulator(SchedulingMode::Manual);
    sim.set_team(TeamColor::Blue, &roster(&[0]));
    sim.handle_radio_commands(TeamColor::Yellow, vec![RobotCommand::drive(7, 1.0, 0.0, 0.0)], 0);
    run(&mut sim, 20);
    assert!(radio_responses(&sim.take_outputs()).is_empty());
    assert!(sim.get_and_clear_errors().is_empty());
}

#[test]
fn test_drive_speeds_up_within_its_acceleration_limit() {
    let mut sim = simulator(SchedulingMode::Manual);
    sim.set_team(TeamColor::Blue, &roster(&[0]));
    sim.handle_radio_commands(TeamColor::Blue, vec![RobotCommand::drive(0, 2.0, 0.0, 0.0)], 0);
    let limit = RobotSpecs::with_id(0).acceleration.unwrap_or_default().speedup_f;

    // Delivered at the start of the second tick, then driven for one step.
    let mut driver = StepDriver::new(TICK);
    assert!(driver.tick(&mut sim));
    assert!(driver.tick(&mut sim));
    let first = speed(&robot(&sim.ground_truth(), TeamColor::Blue, 0));
    assert!(first > 1e-3);
    assert!(first <= limit * nanos_to_secs(TICK) as f32 + 1e-3, "{} m/s after one step", first);

    run(&mut sim, 45);
    let later = speed(&robot(&sim.ground_truth(), TeamColor::Blue, 0));
    assert!(later > first);
    assert!(later <= limit * 0.05 + 1e-3, "{} m/s after 50 ms", later);
}

#[test]
fn test_wheel_velocity_command_is_reported_to_its_team() {
    let mut sim = simulator(SchedulingMode::Manual);
    sim.set_team(TeamColor::Blue, &roster(&[0]));
    let command = RobotCommand {
        id: 0,
        move_command: Some(MoveCommand::WheelVelocity {
            front_right: 1.0,
            back_right: 1.0,
            back_left: 1.0,
            front_left: 1.0,
        }),
        ..Default::default()
    };
    sim.handle_radio_commands(TeamColor::Blue, vec![command], 0);
    run(&mut sim, 20);

    let errors = sim.take_errors(ErrorSource::Blue);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, codes::VELOCITY_TYPE);
    assert!(sim.take_errors(ErrorSource::Yellow).is_empty());
}

#[test]
fn test_radio_loss_extremes() {
    let mut sim = simulator(SchedulingMode::Manual);
    sim.set_team(TeamColor::Blue, &roster(&[0, 1]));
    let commands = || {
        vec![
            RobotCommand::drive(0, 0.5, 0.0, 0.0),
            RobotCommand::drive(1, 0.5, 0.0, 0.0),
        ]
    };

    sim.handle_command(&SimulatorCommand {
        realism: Some(RealismUpdate {
            robot_command_loss: Some(1.0),
            ..Default::default()
        }),
        ..Default::default()
    });
    for _ in 0..10 {
        sim.handle_radio_commands(TeamColor::Blue, commands(), sim.now());
        run(&mut sim, 10);
    }
    assert!(radio_responses(&sim.take_outputs()).is_empty());

    sim.handle_command(&SimulatorCommand {
        realism: Some(RealismUpdate {
            robot_command_loss: Some(0.0),
            ..Default::default()
        }),
        ..Default::default()
    });
    for _ in 0..10 {
        sim.handle_radio_commands(TeamColor::Blue, commands(), sim.now());
        run(&mut sim, 10);
    }
    assert_eq!(radio_responses(&sim.take_outputs()).len(), 20);
}

#[test]
fn test_teleport_lands_where_requested() {
    for flip in [false, true] {
        let mut sim = simulator(SchedulingMode::Manual);
        sim.set_team(TeamColor::Blue, &roster(&[4]));
        sim.handle_command(&SimulatorCommand {
            flip: Some(flip),
            teleport_robots: vec![TeleportRobot::to(TeamColor::Blue, 4, 1.0, -0.5, 0.3)],
            teleport_ball: Some(TeleportBall {
                x: -2.0,
                y: 1.0,
                ..Default::default()
            }),
            ..Default::default()
        });
        run(&mut sim, 10);

        let state = sim.ground_truth();
        let robot = robot(&state, TeamColor::Blue, 4);
        assert_abs_diff_eq!(robot.p_x, 1.0, epsilon = 0.01);
        assert_abs_diff_eq!(robot.p_y, -0.5, epsilon = 0.01);
        assert_abs_diff_eq!(normalize_angle(robot.yaw() - 0.3), 0.0, epsilon = 0.01);
        let ball = state.ball.expect("ball exists");
        assert_abs_diff_eq!(ball.p_x, -2.0, epsilon = 0.01);
        assert_abs_diff_eq!(ball.p_y, 1.0, epsilon = 0.01);
    }
}

#[test]
fn test_teleported_ball_moves_at_most_one_friction_step() {
    for flip in [false, true] {
        let mut sim = simulator(SchedulingMode::Manual);
        sim.handle_command(&SimulatorCommand {
            flip: Some(flip),
            teleport_ball: Some(TeleportBall {
                x: 1.5,
                y: -2.0,
                vx: Some(0.0),
                vy: Some(0.0),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(StepDriver::new(TICK).tick(&mut sim));

        let ball = sim.ground_truth().ball.expect("ball exists");
        let bound = nanos_to_secs(TICK) as f32 * ROLLING_DECELERATION;
        let moved = Vector2::new(ball.p_x - 1.5, ball.p_y + 2.0).norm();
        assert!(moved <= bound, "moved {} m, bound {} m", moved, bound);
        assert_abs_diff_eq!(ball.p_z, BALL_RADIUS, epsilon = 0.005);
    }
}

#[test]
fn test_teleporting_an_unknown_robot_is_an_error() {
    let mut sim = simulator(SchedulingMode::Manual);
    sim.handle_command(&SimulatorCommand {
        teleport_robots: vec![TeleportRobot::to(TeamColor::Yellow, 9, 0.0, 0.0, 0.0)],
        ..Default::default()
    });
    let errors = sim.take_errors(ErrorSource::Config);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, codes::UNKNOWN_ROBOT);
}

#[test]
fn test_disabled_simulator_does_not_advance() {
    let mut sim = simulator(SchedulingMode::Manual);
    sim.handle_command(&SimulatorCommand {
        enable: Some(false),
        ..Default::default()
    });
    assert!(!sim.is_enabled());
    let mut driver = StepDriver::new(TICK);
    assert!(!driver.tick(&mut sim));
    assert!(sim.take_outputs().is_empty());

    sim.set_enabled(true);
    assert!(sim.is_enabled());
    assert!(driver.tick(&mut sim));
    assert!(!sim.take_outputs().is_empty());
}

#[test]
fn test_same_seed_gives_same_detections() {
    let noisy = || {
        let config = SimulatorConfig {
            realism: RealismConfig::realistic(),
            ..Default::default()
        };
        let mut sim = Simulator::new(config, SchedulingMode::Manual).expect("valid config");
        sim.set_team(TeamColor::Blue, &roster(&[0, 1]));
        sim.seed_prng(42);
        run(&mut sim, 60);
        sim.take_outputs()
            .into_iter()
            .filter(|output| matches!(output, SimulatorOutput::Vision(_)))
            .collect::<Vec<_>>()
    };
    assert_eq!(noisy(), noisy());
}

#[test]
fn test_clearing_moves_only_touch_overlapping_robots() {
    let target = Vector2::new(0.0, 0.0);
    let robots = [
        (Vector2::new(0.05, 0.0), 0.09),
        (Vector2::new(1.0, 1.0), 0.09),
    ];
    let moves = clearing_moves(target, &robots);
    let spot = moves[0].expect("overlapping robot moves");
    assert!(spot.norm() >= 0.09 + BALL_RADIUS);
    assert!(spot.x > 0.0);
    assert_eq!(moves[1], None);
}

#[test]
fn test_clearing_moves_avoid_other_robots() {
    let target = Vector2::new(0.0, 0.0);
    let robots = [
        (Vector2::new(0.05, 0.0), 0.09),
        // Sits where the first robot would be pushed.
        (Vector2::new(0.13, 0.0), 0.09),
    ];
    let moves = clearing_moves(target, &robots);
    let spot = moves[0].expect("overlapping robot moves");
    assert!((spot - robots[1].0).norm() >= 0.18 - 1e-4);
}
