//! Simulation Tick
//!
//! `Simulation` bundles the entity store, the level and the collision world
//! (plus the proxy handles tying entities to their collision bodies) and is
//! the single owner of all gameplay state. `tick` advances it by one step:
//!
//! win check → apply intents → fire pre-update → proxy sync → detection →
//! contact resolution → harpoon post-update → treasure/scoring update.

use std::collections::BTreeMap;

use crate::core::vec3::Vec3;
use crate::game::harpoon;
use crate::game::input::TickIntent;
use crate::game::level::LevelData;
use crate::game::resolve;
use crate::game::state::{
    GamePhase, GameState, Harpoon, Nickname, Player, PlayerId, Team, Treasure,
};
use crate::game::treasure;
use crate::physics::{BodyId, CollisionWorld, ProxyHandle, Shape};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Teams that scored this tick
    pub scored: Vec<Team>,
    /// Whether the match is over (now or previously)
    pub ended: bool,
    /// Winning team, once the match is over
    pub winner: Option<Team>,
}

// =============================================================================
// SIMULATION
// =============================================================================

/// The complete simulation context: entity store, level, collision world and
/// the proxy handles linking the two.
pub struct Simulation {
    pub state: GameState,
    pub level: LevelData,
    pub world: CollisionWorld,
    player_proxies: BTreeMap<PlayerId, ProxyHandle>,
    harpoon_proxies: BTreeMap<PlayerId, ProxyHandle>,
    treasure_proxies: [ProxyHandle; 2],
}

impl Simulation {
    /// Build a simulation for a level: static geometry and boundary planes
    /// are registered up front, treasures at their homes.
    pub fn new(level: LevelData) -> Self {
        let state = GameState::new(&level);
        let mut world = CollisionWorld::new();

        for sb in &level.static_boxes {
            world.add_proxy(
                BodyId::Static,
                Shape::Aabb { half_extents: sb.half_extents },
                sb.center,
            );
        }

        // Six inward-facing boundary half-spaces around the play area
        let he = level.map_half_extents;
        let planes = [
            (Vec3::new(1.0, 0.0, 0.0), -he.x),
            (Vec3::new(-1.0, 0.0, 0.0), -he.x),
            (Vec3::new(0.0, 1.0, 0.0), -he.y),
            (Vec3::new(0.0, -1.0, 0.0), -he.y),
            (Vec3::new(0.0, 0.0, 1.0), -he.z),
            (Vec3::new(0.0, 0.0, -1.0), -he.z),
        ];
        for (normal, offset) in planes {
            world.add_proxy(BodyId::Static, Shape::Boundary { normal, offset }, Vec3::ZERO);
        }

        let treasure_proxies = [
            world.add_proxy(
                BodyId::Treasure(Team::Red),
                Shape::Sphere { radius: Treasure::RADIUS },
                state.treasures[0].position,
            ),
            world.add_proxy(
                BodyId::Treasure(Team::Blue),
                Shape::Sphere { radius: Treasure::RADIUS },
                state.treasures[1].position,
            ),
        ];

        Self {
            state,
            level,
            world,
            player_proxies: BTreeMap::new(),
            harpoon_proxies: BTreeMap::new(),
            treasure_proxies,
        }
    }

    /// Add a player (and its harpoon) with their collision proxies.
    pub fn add_player(&mut self, id: PlayerId, team: Team, nickname: Nickname) {
        self.state.add_player(id, team, nickname, &self.level);
        let player = &self.state.players[&id];
        let harpoon = &self.state.harpoons[&id];

        let ph = self.world.add_proxy(
            BodyId::Player(id),
            Shape::Sphere { radius: Player::RADIUS },
            player.position,
        );
        let hh = self.world.add_proxy(
            BodyId::Harpoon(id),
            Shape::Sphere { radius: Harpoon::RADIUS },
            harpoon.position,
        );
        self.player_proxies.insert(id, ph);
        self.harpoon_proxies.insert(id, hh);
    }

    /// Leave the lobby and start playing.
    pub fn start(&mut self) {
        self.state.phase = GamePhase::Playing;
    }

    /// Mirror entity poses into the collision world.
    fn sync_proxies(&mut self) {
        for (id, handle) in &self.player_proxies {
            if let Some(player) = self.state.players.get(id) {
                self.world.set_transform(*handle, player.position, player.rotation);
            }
        }
        for (id, handle) in &self.harpoon_proxies {
            if let Some(harpoon) = self.state.harpoons.get(id) {
                self.world.set_transform(*handle, harpoon.position, harpoon.rotation);
            }
        }
        for (k, handle) in self.treasure_proxies.iter().enumerate() {
            let treasure = &self.state.treasures[k];
            self.world.set_transform(*handle, treasure.position, treasure.rotation);
        }
    }
}

// =============================================================================
// TICK
// =============================================================================

/// Run one simulation tick of `dt` seconds.
pub fn tick(
    sim: &mut Simulation,
    intents: &BTreeMap<PlayerId, TickIntent>,
    dt: f32,
) -> TickResult {
    let mut result = TickResult::default();

    // A decided match stays frozen
    if sim.state.is_ended() {
        result.ended = true;
        result.winner = sim.state.winner();
        return result;
    }
    if sim.state.phase != GamePhase::Playing {
        return result;
    }

    sim.state.tick += 1;

    // 1. Client intents (pose latest-wins, edges sticky) and stun decay
    apply_intents(&mut sim.state, intents);
    for player in sim.state.players.values_mut() {
        player.update_stun(dt);
    }

    // 2. Fire requests
    harpoon::pre_update(&mut sim.state, &sim.level);

    // 3. Detection over the synced proxies
    sim.sync_proxies();
    let manifolds = sim.world.detect();

    // 4. Tether overrun outranks contact handling
    harpoon::check_tethers(&mut sim.state);

    // 5. Contact responses (push-out, harpoon landings and hits)
    resolve::resolve(&mut sim.state, &manifolds);

    // 6. Harpoon travel / timers
    harpoon::post_update(&mut sim.state, &sim.level, dt);

    // 7. Possession, auto-return, scoring
    result.scored = treasure::update(&mut sim.state, &sim.level, &sim.world, dt);

    sim.state.check_possession_invariant();

    if let Some(winner) = sim.state.winner() {
        sim.state.phase = GamePhase::Ended;
        result.ended = true;
        result.winner = Some(winner);
    }
    result
}

fn apply_intents(state: &mut GameState, intents: &BTreeMap<PlayerId, TickIntent>) {
    for (id, intent) in intents {
        if let Some(player) = state.players.get_mut(id) {
            if player.connected {
                intent.apply(player);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
