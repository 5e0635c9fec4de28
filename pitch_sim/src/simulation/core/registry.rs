// pitch_sim/src/simulation/core/registry.rs

use bevy::prelude::*;
use pitch_core::types::{RobotKey, TeamColor};
use std::collections::BTreeMap;

/// Where a robot lives in the ECS world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotSlot {
    pub entity: Entity,
    pub generation: u32,
}

/// Maps `(team, id)` to the entity that owns the robot.
///
/// Ordered so that iteration, and with it every random draw made per robot,
/// follows the same sequence on every run.
#[derive(Resource, Debug, Default)]
pub struct RobotRegistry {
    slots: BTreeMap<RobotKey, RobotSlot>,
}

impl RobotRegistry {
    /// Registers a robot. Returns false, leaving the existing slot untouched,
    /// if the key is taken.
    pub fn insert(&mut self, key: RobotKey, slot: RobotSlot) -> bool {
        if self.slots.contains_key(&key) {
            return false;
        }
        self.slots.insert(key, slot);
        true
    }

    pub fn get(&self, key: RobotKey) -> Option<RobotSlot> {
        self.slots.get(&key).copied()
    }

    pub fn contains(&self, key: RobotKey) -> bool {
        self.slots.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RobotKey, RobotSlot)> + '_ {
        self.slots.iter().map(|(key, slot)| (*key, *slot))
    }

    pub fn team(&self, team: TeamColor) -> impl Iterator<Item = (u32, RobotSlot)> + '_ {
        self.slots
            .iter()
            .filter(move |(key, _)| key.team == team)
            .map(|(key, slot)| (key.id, *slot))
    }

    /// Forgets every robot of a team and returns their entities for despawning.
    pub fn remove_team(&mut self, team: TeamColor) -> Vec<Entity> {
        let keys: Vec<RobotKey> = self
            .slots
            .keys()
            .filter(|key| key.team == team)
            .copied()
            .collect();
        keys.into_iter()
            .filter_map(|key| self.slots.remove(&key))
            .map(|slot| slot.entity)
            .collect()
    }
}
