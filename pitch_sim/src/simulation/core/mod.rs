// pitch_sim/src/simulation/core/mod.rs

pub mod components;
pub mod prng;
pub mod registry;
pub mod sets;
pub mod transforms;
