//! Authoritative game simulation.
//!
//! Single-owner, synchronous: the network layer feeds decoded intents in and
//! reads snapshots out; nothing here is shared across tasks.

pub mod harpoon;
pub mod input;
pub mod level;
pub mod resolve;
pub mod state;
pub mod tick;
pub mod treasure;

pub use input::TickIntent;
pub use level::{LevelData, LevelError, Pose};
pub use state::{
    GamePhase, GameState, Harpoon, HarpoonState, Nickname, Player, PlayerId, Team, Treasure,
};
pub use tick::{tick, Simulation, TickResult};
