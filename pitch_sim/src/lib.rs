// pitch_sim/src/lib.rs

use avian3d::prelude::*;
use bevy::prelude::*;
use std::time::Duration;

use crate::simulation::config::SimulatorConfig;
use crate::simulation::core::{
    components::{PhysicsTuning, SimulationFlags, SubstepClock},
    prng::SimulationRng,
    registry::RobotRegistry,
    sets::SubstepSet,
    transforms::WorldScale,
};
use crate::simulation::plugins::{ball::BallPlugin, field::FieldPlugin, robot::RobotPlugin};

// This prelude is for convenience for other files WITHIN the pitch_sim crate.
pub mod prelude;

// This module contains all the simulation-specific logic.
pub mod cli;
pub mod simulation;

/// The plugin that brings together all the simulation parts: the rigid-body
/// world, the field, the ball and the robots.
///
/// Does not drive itself. A [`simulation::simulator::Simulator`] owns the
/// `App` and steps it.
pub struct PitchSimulationPlugin {
    pub config: SimulatorConfig,
}

impl Plugin for PitchSimulationPlugin {
    fn build(&self, app: &mut App) {
        let config = &self.config;
        let scale = config.physics.world_scale;
        let sub_timestep = config.physics.sub_timestep;
        let max_delta = sub_timestep * config.physics.max_substeps as f64;

        app.insert_resource(WorldScale(scale))
            .insert_resource(config.geometry.clone())
            .insert_resource(config.realism.clone())
            .insert_resource(SimulationRng::from_seed(config.seed))
            .insert_resource(SimulationFlags::default())
            .insert_resource(PhysicsTuning {
                sub_timestep: sub_timestep as f32,
                command_timeout: config.timing.command_timeout as f32,
                kicker_recharge_time: config.timing.kicker_recharge_time as f32,
            })
            .init_resource::<SubstepClock>()
            .init_resource::<RobotRegistry>()
            // One physics step per fixed tick, and never more than
            // `max_substeps` of them per update.
            .insert_resource(Time::<Fixed>::from_seconds(sub_timestep))
            .insert_resource(Time::<Virtual>::from_max_delta(Duration::from_secs_f64(
                max_delta,
            )))
            .insert_resource(Gravity(Vec3::NEG_Z * config.physics.gravity * scale))
            .add_plugins(PhysicsPlugins::default().with_length_unit(scale))
            .configure_sets(
                PhysicsSchedule,
                (
                    SubstepSet::Clock,
                    SubstepSet::RespawnBall,
                    SubstepSet::RespawnRobots,
                    SubstepSet::Ball,
                    SubstepSet::Robots,
                )
                    .chain()
                    .before(PhysicsStepSet::First),
            )
            .add_systems(
                PhysicsSchedule,
                advance_substep_clock.in_set(SubstepSet::Clock),
            )
            .add_plugins((
                // Static walls, floor and goals.
                FieldPlugin,
                // The ball and its rolling friction.
                BallPlugin,
                // Drive, dribbler and kicker.
                RobotPlugin,
            ));
    }
}

fn advance_substep_clock(mut clock: ResMut<SubstepClock>, tuning: Res<PhysicsTuning>) {
    clock.now += tuning.sub_timestep as f64;
    clock.steps += 1;
}
