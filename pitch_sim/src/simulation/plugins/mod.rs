// pitch_sim/src/simulation/plugins/mod.rs

pub mod ball;
pub mod camera;
pub mod field;
pub mod robot;
