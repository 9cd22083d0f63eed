pub mod config;
pub mod control;
pub mod geometry;
pub mod simulation;

pub use config::*;
pub use simulation::*;
