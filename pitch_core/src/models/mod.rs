// pitch_core/src/models/mod.rs

pub mod ball;
pub mod drive;
pub mod robot;
