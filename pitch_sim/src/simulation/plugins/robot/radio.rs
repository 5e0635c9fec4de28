// pitch_sim/src/simulation/plugins/robot/radio.rs

//! Delivery of radio commands to a robot and its telemetry response.

use nalgebra::Vector3;
use pitch_core::{
    errors::{codes, SimulatorError},
    messages::{LocalSpeed, MoveCommand, RadioResponse, RobotCommand},
    models::robot::KickStyle,
    noise::NoiseSampler,
    types::Nanos,
};
use rand::Rng;

use crate::simulation::core::components::SimRobot;

/// Link conditions at the moment of delivery.
#[derive(Debug, Clone, Copy)]
pub struct RadioLink {
    /// Simulation time stamped on responses.
    pub time: Nanos,
    /// Physics step time, used for command age and kicker recharge.
    pub step_time: f64,
    pub charge: bool,
    pub command_loss: f32,
    pub response_loss: f32,
}

/// Result of delivering one command.
#[derive(Debug, Default)]
pub struct Delivery {
    pub response: Option<RadioResponse>,
    pub errors: Vec<SimulatorError>,
}

/// Drops the parts of a command the robot cannot execute and reports them.
pub fn validate(command: RobotCommand) -> (RobotCommand, Vec<SimulatorError>) {
    let mut command = command;
    let mut errors = Vec::new();

    if let Some(MoveCommand::WheelVelocity { .. }) = command.move_command {
        errors.push(SimulatorError::new(
            codes::VELOCITY_TYPE,
            format!(
                "robot {}: wheel velocity commands are not supported",
                command.id
            ),
        ));
        command.move_command = None;
    }

    if let Some(angle) = command.kick_angle {
        if KickStyle::from_angle(angle).is_none() {
            errors.push(SimulatorError::new(
                codes::ANGLE_VALUE,
                format!(
                    "robot {}: kick angle {} is neither 0 nor 45 degrees",
                    command.id, angle
                ),
            ));
            command.kick_angle = None;
            command.kick_speed = None;
        }
    }

    (command, errors)
}

/// Hands a command to a robot.
///
/// The command is lost first, then the response. A lost command leaves the
/// robot untouched and produces nothing. `measured` is the robot's current
/// local velocity `(forward, left, angular)`.
pub fn deliver<R: Rng>(
    robot: &mut SimRobot,
    command: RobotCommand,
    link: &RadioLink,
    measured: Vector3<f32>,
    noise: &mut NoiseSampler<'_, R>,
) -> Delivery {
    if noise.chance(link.command_loss) {
        return Delivery::default();
    }

    let (command, errors) = validate(command);
    robot.command = command;
    robot.command_time = link.step_time;
    robot.in_standby = false;
    robot.charge = link.charge;
    if !link.charge {
        robot.is_charged = false;
    }

    let response = (!noise.chance(link.response_loss)).then(|| RadioResponse {
        id: robot.key.id,
        generation: robot.specs.generation,
        team: robot.key.team,
        time: link.time,
        ball_detected: robot.touches_ball,
        cap_charged: robot.is_charged,
        estimated_speed: LocalSpeed {
            forward: measured.x,
            left: measured.y,
            angular: measured.z,
        },
    });

    Delivery { response, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitch_core::{
        messages::RobotSpecs,
        models::drive::OmniDrive,
        types::{RobotKey, TeamColor},
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn robot() -> SimRobot {
        let specs = RobotSpecs::with_id(4);
        let drive = OmniDrive::new(&specs).expect("default drive");
        SimRobot::new(RobotKey::new(TeamColor::Yellow, 4), specs, drive, 0)
    }

    fn link(command_loss: f32, response_loss: f32) -> RadioLink {
        RadioLink {
            time: 1_000,
            step_time: 0.5,
            charge: true,
            command_loss,
            response_loss,
        }
    }

    #[test]
    fn test_lossless_delivery_answers_every_command() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut noise = NoiseSampler::new(&mut rng);
        let mut robot = robot();
        for _ in 0..20 {
            let delivery = deliver(
                &mut robot,
                RobotCommand::drive(4, 1.0, 0.0, 0.0),
                &link(0.0, 0.0),
                Vector3::new(0.2, 0.0, 0.0),
                &mut noise,
            );
            let response = delivery.response.expect("lossless link");
            assert_eq!(response.id, 4);
            assert_eq!(response.team, TeamColor::Yellow);
            assert_eq!(response.time, 1_000);
            assert_eq!(response.estimated_speed.forward, 0.2);
        }
        assert!(!robot.in_standby);
        assert_eq!(robot.command_time, 0.5);
    }

    #[test]
    fn test_total_command_loss_leaves_robot_untouched() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut noise = NoiseSampler::new(&mut rng);
        let mut robot = robot();
        let delivery = deliver(
            &mut robot,
            RobotCommand::drive(4, 1.0, 0.0, 0.0),
            &link(1.0, 0.0),
            Vector3::zeros(),
            &mut noise,
        );
        assert!(delivery.response.is_none());
        assert!(delivery.errors.is_empty());
        assert!(robot.in_standby);
        assert_eq!(robot.command, RobotCommand::default());
    }

    #[test]
    fn test_lost_response_still_applies_command() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut noise = NoiseSampler::new(&mut rng);
        let mut robot = robot();
        let delivery = deliver(
            &mut robot,
            RobotCommand::drive(4, 1.0, 0.0, 0.0),
            &link(0.0, 1.0),
            Vector3::zeros(),
            &mut noise,
        );
        assert!(delivery.response.is_none());
        assert!(!robot.in_standby);
    }

    #[test]
    fn test_unsupported_parts_are_reported_and_dropped() {
        let command = RobotCommand {
            id: 2,
            move_command: Some(MoveCommand::WheelVelocity {
                front_right: 1.0,
                back_right: 1.0,
                back_left: 1.0,
                front_left: 1.0,
            }),
            kick_speed: Some(3.0),
            kick_angle: Some(30.0),
            dribbler_speed: Some(0.5),
        };
        let (command, errors) = validate(command);
        let reported: Vec<&str> = errors.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(reported, vec![codes::VELOCITY_TYPE, codes::ANGLE_VALUE]);
        assert_eq!(command.move_command, None);
        assert_eq!(command.kick_speed, None);
        // The dribbler part still applies.
        assert_eq!(command.dribbler_speed, Some(0.5));
    }
}
