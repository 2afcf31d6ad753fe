//! Pure forward-simulation game engine and tree search used to decide the
//! next move for an agarcup-style strategy bot.

pub mod config;
pub mod entities;
pub mod geometry;
pub mod planner;
pub mod predictor;
pub mod scoring;
pub mod snapshot;
pub mod tree;

pub use config::Config;
pub use entities::{Command, Enemy, EntityId, OwnCell, Pellet, PelletKind, Virus};
pub use planner::{Decision, Planner};
pub use snapshot::Snapshot;
