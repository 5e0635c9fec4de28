// pitch_sim/src/simulation/simulator/mod.rs

//! The simulator facade: owns the ECS app, steps it tick by tick, delays
//! radio commands and vision packets, and collects errors per source.

mod vision;

#[cfg(test)]
mod tests;

use avian3d::prelude::*;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy::transform::TransformPlugin;
use nalgebra::{Vector2, Vector3};
use pitch_core::{
    camera::CameraLayout,
    errors::{codes, ErrorAggregator, ErrorSource, SimulatorError},
    messages::{
        RadioResponse, RobotCommand, RobotSpecs, SimulatorCommand, SimulatorState,
        SimulatorTiming, TeleportBall, TeleportRobot, VisionWorstCase, WrapperPacket,
    },
    models::drive::world_to_local,
    noise::NoiseSampler,
    realism::{RealismConfig, RealismUpdate},
    types::{nanos_to_secs, Nanos, RobotKey, TeamColor, BALL_RADIUS},
};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::time::{Duration, Instant};

use crate::simulation::config::{ConfigError, SimulatorConfig};
use crate::simulation::core::{
    components::{BallMove, RobotMove, SimBall, SimRobot, SimulationFlags, SubstepClock},
    prng::SimulationRng,
    registry::{RobotRegistry, RobotSlot},
    transforms::{normalize_angle, yaw_of, ReportFrame, WorldScale},
};
use crate::simulation::plugins::{
    camera::CameraRig,
    robot::{
        radio::{deliver, RadioLink},
        spawn_robot,
    },
};
use crate::simulation::scheduling::VirtualClock;
use crate::PitchSimulationPlugin;

use self::vision::{build_vision_frame, collect_ground_truth, VisionRequest};

/// Extra gap between a safely teleported ball and the robots around it.
const SAFETY_MARGIN: f32 = 0.01;
/// Directions tried when pushing a robot off the ball.
const CLEARING_DIRECTIONS: usize = 12;

/// How delayed vision packets are released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingMode {
    /// Packets wait until the clock reaches their send time.
    #[default]
    Realtime,
    /// Packets are released at the end of the tick that produced them.
    Manual,
}

/// Everything the simulator hands to its consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatorOutput {
    Vision(Vec<WrapperPacket>),
    GroundTruth(SimulatorState),
    RadioResponses(Vec<RadioResponse>),
    Timing(SimulatorTiming),
}

struct VisionPacket {
    wrappers: Vec<WrapperPacket>,
    ground_truth: SimulatorState,
    send_time: Nanos,
}

struct RadioEnvelope {
    commands: Vec<RobotCommand>,
    team: TeamColor,
    origin: Nanos,
}

pub struct Simulator {
    app: App,
    mode: SchedulingMode,
    clock: VirtualClock,
    enabled: bool,
    scaling: f64,
    /// Simulation time of the last processed tick.
    time: Nanos,
    last_vision: Nanos,
    vision_interval: Nanos,
    frame_number: u32,
    visibility_samples: usize,
    radio_queue: VecDeque<RadioEnvelope>,
    vision_queue: VecDeque<VisionPacket>,
    outbox: Vec<SimulatorOutput>,
    errors: ErrorAggregator,
}

impl Simulator {
    pub fn new(config: SimulatorConfig, mode: SchedulingMode) -> Result<Self, ConfigError> {
        Self::build(config, mode, |_| {})
    }

    /// Builds a simulator. `setup` may add plugins, such as logging, before
    /// the simulation plugins are added.
    pub fn build<F>(config: SimulatorConfig, mode: SchedulingMode, setup: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&mut App),
    {
        config.validate()?;
        let layout = CameraLayout::new(
            config.cameras.count,
            &config.geometry,
            config.cameras.height,
        )?;

        let mut app = App::new();
        app.add_plugins((MinimalPlugins, TransformPlugin));
        setup(&mut app);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::ZERO))
            .insert_resource(CameraRig::new(layout, config.cameras.focal_length))
            .add_plugins(PitchSimulationPlugin {
                config: config.clone(),
            });
        app.finish();
        app.cleanup();
        // Runs the startup systems. No physics step happens on a zero delta.
        app.update();

        let mut simulator = Self {
            app,
            mode,
            clock: VirtualClock::default(),
            enabled: true,
            scaling: 1.0,
            time: 0,
            last_vision: 0,
            vision_interval: config.timing.vision_interval_nanos(),
            frame_number: 0,
            visibility_samples: config.cameras.ball_visibility_samples,
            radio_queue: VecDeque::new(),
            vision_queue: VecDeque::new(),
            outbox: Vec::new(),
            errors: ErrorAggregator::default(),
        };

        let errors = simulator
            .app
            .world_mut()
            .resource_mut::<RealismConfig>()
            .sanitize();
        simulator.push_errors(ErrorSource::Config, errors);
        simulator.resample_calibration();
        info!(
            "Simulator ready: {} cameras, {:?} scheduling",
            config.cameras.count, mode
        );
        Ok(simulator)
    }

    // =====================================================================
    // == Accessors ==
    // =====================================================================

    pub fn mode(&self) -> SchedulingMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn scaling(&self) -> f64 {
        self.scaling
    }

    /// Whether a tick source should keep ticking.
    pub fn is_running(&self) -> bool {
        self.enabled && self.scaling > 0.0
    }

    /// Current virtual time.
    pub fn now(&self) -> Nanos {
        self.clock.now()
    }

    /// Simulation time of the last processed tick.
    pub fn time(&self) -> Nanos {
        self.time
    }

    pub fn clock_mut(&mut self) -> &mut VirtualClock {
        &mut self.clock
    }

    pub fn world(&self) -> &World {
        self.app.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    fn frame(&self) -> ReportFrame {
        ReportFrame::new(self.app.world().resource::<SimulationFlags>().flip)
    }

    fn scale(&self) -> WorldScale {
        *self.app.world().resource::<WorldScale>()
    }

    fn push_errors(&mut self, source: ErrorSource, errors: Vec<SimulatorError>) {
        for error in errors {
            self.errors.push(source, error);
        }
    }

    // =====================================================================
    // == Inputs ==
    // =====================================================================

    pub fn seed_prng(&mut self, seed: u64) {
        self.app
            .world_mut()
            .resource_mut::<SimulationRng>()
            .reseed(seed);
    }

    /// Queues radio commands of one team. They reach the robots on the first
    /// tick that starts after `origin`.
    pub fn handle_radio_commands(&mut self, team: TeamColor, commands: Vec<RobotCommand>, origin: Nanos) {
        self.radio_queue.push_back(RadioEnvelope {
            commands,
            team,
            origin,
        });
    }

    /// Applies a control command. Teams are replaced before teleports so one
    /// command can set up a team and place it.
    pub fn handle_command(&mut self, command: &SimulatorCommand) {
        if let Some(update) = &command.realism {
            self.apply_realism(update);
        }
        if let Some(worst_case) = &command.vision_worst_case {
            self.apply_vision_worst_case(worst_case);
        }
        if let Some(charge) = command.charge {
            self.app.world_mut().resource_mut::<SimulationFlags>().charge = charge;
        }
        if let Some(flip) = command.flip {
            self.app.world_mut().resource_mut::<SimulationFlags>().flip = flip;
        }
        for team in TeamColor::ALL {
            if let Some(roster) = command.roster(team) {
                self.set_team(team, roster);
            }
        }
        if let Some(teleport) = &command.teleport_ball {
            self.teleport_ball(teleport);
        }
        for teleport in &command.teleport_robots {
            self.teleport_robot(teleport);
        }
        if let Some(state) = &command.restore_state {
            self.restore_state(state);
        }
        if let Some(scaling) = command.scaling {
            self.set_scaling(scaling);
        }
        if let Some(enable) = command.enable {
            self.set_enabled(enable);
        }
    }

    pub fn set_scaling(&mut self, scaling: f64) {
        if scaling != self.scaling {
            // Send times of queued packets no longer match the clock.
            self.vision_queue.clear();
        }
        self.scaling = scaling;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        if enabled {
            // Skip the time spent disabled.
            self.time = self.clock.now();
        } else {
            self.vision_queue.clear();
        }
        self.enabled = enabled;
        info!("Simulator {}", if enabled { "enabled" } else { "disabled" });
    }

    fn apply_realism(&mut self, update: &RealismUpdate) {
        let mut realism = self.app.world_mut().resource_mut::<RealismConfig>();
        let before = realism.camera_position_error;
        let errors = realism.apply(update);
        let changed = realism.camera_position_error != before;
        self.push_errors(ErrorSource::Config, errors);
        if changed {
            self.resample_calibration();
        }
    }

    fn apply_vision_worst_case(&mut self, worst_case: &VisionWorstCase) {
        self.apply_realism(&RealismUpdate {
            min_ball_detection_time: worst_case.min_ball_detection_time,
            min_robot_detection_time: worst_case.min_robot_detection_time,
            ..Default::default()
        });
    }

    fn resample_calibration(&mut self) {
        let world = self.app.world_mut();
        let error = world.resource::<RealismConfig>().camera_position_error;
        world.resource_scope(|world, mut rng: Mut<SimulationRng>| {
            if let Some(mut rig) = world.get_resource_mut::<CameraRig>() {
                rig.resample_calibration(error, &mut rng.0);
            }
        });
    }

    /// Replaces a team. Duplicate ids keep their first entry.
    pub fn set_team(&mut self, team: TeamColor, roster: &[RobotSpecs]) {
        let world = self.app.world_mut();
        let removed = world.resource_mut::<RobotRegistry>().remove_team(team);
        for entity in removed {
            world.despawn(entity);
        }
        // Queued frames still show the old team.
        self.vision_queue.clear();

        let mut holding_index = 0;
        for specs in roster {
            let key = RobotKey::new(team, specs.id);
            if world.resource::<RobotRegistry>().contains(key) {
                debug!("Skipping duplicate robot {}", key);
                continue;
            }
            if specs.acceleration.is_none() {
                self.errors.push(
                    ErrorSource::Config,
                    SimulatorError::new(
                        codes::ACCELERATION_LIMITS,
                        format!("robot {} has no acceleration limits, using defaults", key),
                    ),
                );
            }
            match spawn_robot(world, key, specs.clone(), holding_index) {
                Ok(entity) => {
                    world.resource_mut::<RobotRegistry>().insert(
                        key,
                        RobotSlot {
                            entity,
                            generation: specs.generation,
                        },
                    );
                    holding_index += 1;
                }
                Err(e) => self.errors.push(
                    ErrorSource::Config,
                    SimulatorError::new(codes::ROBOT_SPECS, format!("robot {}: {}", key, e)),
                ),
            }
        }
        info!("Team {} now has {} robots", team, holding_index);
    }

    fn stage_ball_move(&mut self, pending: BallMove) {
        let world = self.app.world_mut();
        let mut balls = world.query::<&mut SimBall>();
        match balls.single_mut(world) {
            Ok(mut ball) => ball.pending_move = Some(pending),
            Err(e) => warn!("Cannot move the ball: {}", e),
        }
    }

    fn teleport_ball(&mut self, teleport: &TeleportBall) {
        let frame = self.frame();
        let target = frame.point(Vector2::new(teleport.x, teleport.y));
        if teleport.teleport_safely {
            self.clear_ball_area(target);
        }
        let pending = if teleport.by_force {
            BallMove::Push { target }
        } else {
            BallMove::Place {
                position: Vector3::new(target.x, target.y, BALL_RADIUS + teleport.z.unwrap_or(0.0)),
                velocity: frame.planar(Vector3::new(
                    teleport.vx.unwrap_or(0.0),
                    teleport.vy.unwrap_or(0.0),
                    teleport.vz.unwrap_or(0.0),
                )),
                angular: Vector3::zeros(),
            }
        };
        self.stage_ball_move(pending);
    }

    /// Moves every robot that would overlap a ball at `(x, y)` out of the way.
    /// Coordinates are in the reported frame.
    pub fn safely_teleport_ball(&mut self, x: f32, y: f32) {
        let target = self.frame().point(Vector2::new(x, y));
        self.clear_ball_area(target);
    }

    fn clear_ball_area(&mut self, target: Vector2<f32>) {
        let scale = self.scale();
        let world = self.app.world_mut();
        let mut query = world.query::<(Entity, &SimRobot, &Position)>();
        let robots: Vec<(Entity, Vector2<f32>, f32)> = query
            .iter(world)
            .map(|(entity, robot, position)| {
                let p = scale.to_metric(position.0);
                (entity, Vector2::new(p.x, p.y), robot.specs.radius)
            })
            .collect();
        let footprints: Vec<(Vector2<f32>, f32)> =
            robots.iter().map(|(_, p, r)| (*p, *r)).collect();

        for ((entity, _, _), spot) in robots.iter().zip(clearing_moves(target, &footprints)) {
            let Some(spot) = spot else {
                continue;
            };
            debug!("Moving robot {:?} off the ball to {:?}", entity, spot);
            let mut entity = world.entity_mut(*entity);
            if let Some(mut position) = entity.get_mut::<Position>() {
                let z = position.0.z;
                position.0 = scale.to_world(&Vector3::new(spot.x, spot.y, 0.0));
                position.0.z = z;
            }
            if let Some(mut velocity) = entity.get_mut::<LinearVelocity>() {
                velocity.0 = Vec3::ZERO;
            }
            if let Some(mut angular) = entity.get_mut::<AngularVelocity>() {
                angular.0 = Vec3::ZERO;
            }
        }
    }

    fn teleport_robot(&mut self, teleport: &TeleportRobot) {
        let key = RobotKey::new(teleport.team, teleport.id);
        let frame = self.frame();
        let scale = self.scale();
        let world = self.app.world_mut();
        let Some(slot) = world.resource::<RobotRegistry>().get(key) else {
            self.errors.push(
                ErrorSource::Config,
                SimulatorError::new(
                    codes::UNKNOWN_ROBOT,
                    format!("cannot teleport unknown robot {}", key),
                ),
            );
            return;
        };
        let (Some(position), Some(rotation)) = (
            world.get::<Position>(slot.entity).map(|p| p.0),
            world.get::<Rotation>(slot.entity).map(|r| r.0),
        ) else {
            return;
        };

        // Missing fields keep the robot's current value.
        let current = frame.point(scale.to_metric(position).xy());
        let reported = Vector2::new(
            teleport.x.unwrap_or(current.x),
            teleport.y.unwrap_or(current.y),
        );
        let orientation = teleport
            .orientation
            .unwrap_or_else(|| frame.angle(yaw_of(rotation)));
        let velocity = frame.point(Vector2::new(
            teleport.v_x.unwrap_or(0.0),
            teleport.v_y.unwrap_or(0.0),
        ));
        let target = RobotMove {
            position: frame.point(reported),
            orientation: normalize_angle(frame.angle(orientation)),
            velocity: Vector3::new(velocity.x, velocity.y, teleport.v_angular.unwrap_or(0.0)),
            by_force: teleport.by_force,
        };
        if let Some(mut robot) = world.get_mut::<SimRobot>(slot.entity) {
            robot.pending_move = Some(target);
        }
    }

    fn restore_state(&mut self, state: &SimulatorState) {
        let frame = self.frame();
        if let Some(ball) = &state.ball {
            self.stage_ball_move(BallMove::Place {
                position: frame.planar(Vector3::new(ball.p_x, ball.p_y, ball.p_z)),
                velocity: frame.planar(Vector3::new(ball.v_x, ball.v_y, ball.v_z)),
                angular: frame.planar(Vector3::new(ball.angular_x, ball.angular_y, ball.angular_z)),
            });
        }
        for team in TeamColor::ALL {
            for robot in state.robots(team) {
                self.teleport_robot(&TeleportRobot {
                    id: robot.id,
                    team,
                    x: Some(robot.p_x),
                    y: Some(robot.p_y),
                    orientation: Some(robot.yaw()),
                    v_x: Some(robot.v_x),
                    v_y: Some(robot.v_y),
                    v_angular: Some(robot.angular_z),
                    by_force: false,
                });
            }
        }
    }

    // =====================================================================
    // == Tick ==
    // =====================================================================

    /// Runs one tick up to the current virtual time: radio, physics, vision,
    /// then the release of due packets.
    pub fn process(&mut self) {
        if !self.enabled {
            return;
        }
        let started = Instant::now();
        let now = self.clock.now();

        let mut responses = Vec::new();
        while self
            .radio_queue
            .front()
            .is_some_and(|envelope| envelope.origin < self.time)
        {
            let Some(envelope) = self.radio_queue.pop_front() else {
                break;
            };
            responses.extend(self.deliver_radio(envelope));
        }
        if !responses.is_empty() {
            self.outbox.push(SimulatorOutput::RadioResponses(responses));
        }

        let delta = (now - self.time).max(0) as u64;
        self.app
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_nanos(delta)));
        self.app.update();
        self.time = now;

        if self.last_vision + self.vision_interval <= self.time {
            self.create_vision_packet();
            self.last_vision = self.time;
        }
        self.release_vision();

        self.outbox.push(SimulatorOutput::Timing(SimulatorTiming {
            time: self.time,
            simulator: started.elapsed().as_secs_f64(),
        }));
    }

    fn deliver_radio(&mut self, envelope: RadioEnvelope) -> Vec<RadioResponse> {
        let RadioEnvelope { commands, team, .. } = envelope;
        let scale = self.scale();
        let world = self.app.world_mut();
        let realism = world.resource::<RealismConfig>();
        let link = RadioLink {
            time: self.time,
            step_time: world.resource::<SubstepClock>().now,
            charge: world.resource::<SimulationFlags>().charge,
            command_loss: realism.robot_command_loss,
            response_loss: realism.robot_response_loss,
        };

        let mut responses = Vec::new();
        let mut errors = Vec::new();
        world.resource_scope(|world, mut rng: Mut<SimulationRng>| {
            let mut noise = NoiseSampler::new(&mut rng.0);
            for command in commands {
                let key = RobotKey::new(team, command.id);
                let Some(slot) = world.resource::<RobotRegistry>().get(key) else {
                    debug!("Dropping command for unknown robot {}", key);
                    continue;
                };
                let measured = measured_velocity(world, slot.entity, &scale);
                let Some(mut robot) = world.get_mut::<SimRobot>(slot.entity) else {
                    continue;
                };
                let delivery = deliver(&mut robot, command, &link, measured, &mut noise);
                responses.extend(delivery.response);
                errors.extend(delivery.errors);
            }
        });
        self.push_errors(team.into(), errors);
        responses
    }

    fn create_vision_packet(&mut self) {
        let realism = self.app.world().resource::<RealismConfig>();
        let delay = realism.vision_delay_nanos();
        let processing = realism.vision_processing_nanos();
        let request = VisionRequest {
            time: self.time,
            frame_number: self.frame_number,
            t_capture: nanos_to_secs(self.time + delay - processing),
            t_sent: nanos_to_secs(self.time + delay),
            visibility_samples: self.visibility_samples,
        };
        self.frame_number = self.frame_number.wrapping_add(1);

        let world = self.app.world_mut();
        let wrappers = match world.run_system_cached_with(build_vision_frame, request) {
            Ok(wrappers) => wrappers,
            Err(e) => {
                error!("Failed to build vision frame: {}", e);
                return;
            }
        };
        let ground_truth = match world.run_system_cached(collect_ground_truth) {
            Ok(state) => state,
            Err(e) => {
                error!("Failed to collect ground truth: {}", e);
                return;
            }
        };
        self.vision_queue.push_back(VisionPacket {
            wrappers,
            ground_truth,
            send_time: self.time + delay,
        });
    }

    fn release_vision(&mut self) {
        while let Some(packet) = self.vision_queue.front() {
            if self.mode == SchedulingMode::Realtime && packet.send_time > self.clock.now() {
                break;
            }
            let Some(packet) = self.vision_queue.pop_front() else {
                break;
            };
            self.outbox.push(SimulatorOutput::Vision(packet.wrappers));
            self.outbox.push(SimulatorOutput::GroundTruth(packet.ground_truth));
        }
    }

    // =====================================================================
    // == Outputs ==
    // =====================================================================

    /// Everything produced since the last call, oldest first.
    pub fn take_outputs(&mut self) -> Vec<SimulatorOutput> {
        std::mem::take(&mut self.outbox)
    }

    /// Exact state of the ball and robots right now.
    pub fn ground_truth(&mut self) -> SimulatorState {
        self.app
            .world_mut()
            .run_system_cached(collect_ground_truth)
            .unwrap_or_else(|e| {
                error!("Failed to collect ground truth: {}", e);
                SimulatorState::default()
            })
    }

    /// Every collected error, grouped by source. Sources without errors are
    /// left out.
    pub fn get_and_clear_errors(&mut self) -> Vec<(ErrorSource, Vec<SimulatorError>)> {
        self.errors.drain_all()
    }

    pub fn take_errors(&mut self, source: ErrorSource) -> Vec<SimulatorError> {
        self.errors.get_and_clear(source)
    }
}

/// Local velocity `(forward, left, angular)` of a robot.
fn measured_velocity(world: &World, entity: Entity, scale: &WorldScale) -> Vector3<f32> {
    let (Some(velocity), Some(angular), Some(rotation)) = (
        world.get::<LinearVelocity>(entity),
        world.get::<AngularVelocity>(entity),
        world.get::<Rotation>(entity),
    ) else {
        return Vector3::zeros();
    };
    let local = world_to_local(scale.to_metric(velocity.0).xy(), yaw_of(rotation.0));
    Vector3::new(local.x, local.y, angular.0.z)
}

/// New positions for the robots that overlap a ball placed at `target`.
///
/// Each robot is pushed radially outwards. If that spot overlaps another
/// robot, the direction is turned in steps until a free spot is found.
fn clearing_moves(target: Vector2<f32>, robots: &[(Vector2<f32>, f32)]) -> Vec<Option<Vector2<f32>>> {
    let mut placed: Vec<Vector2<f32>> = robots.iter().map(|(p, _)| *p).collect();
    let mut moves = vec![None; robots.len()];

    for (i, (position, radius)) in robots.iter().enumerate() {
        let clearance = radius + BALL_RADIUS + SAFETY_MARGIN;
        let offset = position - target;
        if offset.norm() >= clearance {
            continue;
        }
        let base = if offset.norm() > 1e-6 {
            offset.y.atan2(offset.x)
        } else {
            0.0
        };
        let spot_at = |angle: f32| target + Vector2::new(angle.cos(), angle.sin()) * clearance;
        let step = 2.0 * PI / CLEARING_DIRECTIONS as f32;
        let spot = (0..CLEARING_DIRECTIONS)
            .map(|k| spot_at(base + k as f32 * step))
            .find(|candidate| {
                robots.iter().enumerate().all(|(j, (_, other))| {
                    j == i || (candidate - placed[j]).norm() >= radius + other
                })
            })
            .unwrap_or_else(|| spot_at(base));
        placed[i] = spot;
        moves[i] = Some(spot);
    }
    moves
}
