//! Cooperative discrete-event process scheduler.

pub mod simulation;
pub mod observable;
pub mod resource;

pub use self::simulation::*;
