// pitch_core/src/lib.rs

// Engine-independent building blocks of the field simulator.
pub mod camera;
pub mod errors;
pub mod geometry;
pub mod messages;
pub mod models;
pub mod noise;
pub mod prelude;
pub mod realism;
pub mod types;
