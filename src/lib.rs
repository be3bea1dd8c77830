//! Harpoon Hunt Server
//!
//! Authoritative server for a two-team underwater capture-the-treasure game:
//! players harpoon each other, steal the opposing team's treasure and carry
//! it home to score. The server owns the whole game state; clients send
//! intents and receive world snapshots over a compact tag-byte TCP protocol.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     harpoon_hunt                        │
//! ├─────────────────────────────────────────────────────────┤
//! │  core/       Vec3, Quat                                 │
//! │  game/       entity store, harpoon & treasure FSMs,     │
//! │              contact resolution, simulation tick        │
//! │  physics/    collision world (proxies, manifolds, rays) │
//! │  network/    wire codec, receive buffer, server loop    │
//! └─────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod physics;

// Re-export the main entry points
pub use game::{tick, GamePhase, GameState, PlayerId, Simulation, Team, TickResult};
pub use network::{GameServer, ServerConfig, ServerError, PROTOCOL_VERSION};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default simulation ticks (and snapshot broadcasts) per second.
pub const TICK_RATE: u32 = 20;
