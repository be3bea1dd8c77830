//! Treasure Possession & Scoring
//!
//! Grab/drop handling, forced drops, the away-from-home auto-return timer
//! and the scoring sweep. Grabbing is a reach-limited raycast from the
//! player's camera: the first thing the ray touches must be the *opposing*
//! team's treasure, so level geometry and other bodies block the grab.

use crate::core::vec3::Vec3;
use crate::game::level::{LevelData, Pose};
use crate::game::state::{GameState, PlayerId, Team, Treasure};
use crate::physics::{BodyId, CollisionWorld};

/// Seconds a harpooned player stays stunned.
pub const STUN_DURATION: f32 = 3.0;

/// Max distance of the grab ray.
pub const GRAB_REACH: f32 = 3.0;

/// Carried treasures hang below the carrier.
const CARRY_OFFSET: Vec3 = Vec3::new(0.0, 0.0, -0.8);

/// Sink speed of a force-dropped treasure while it settles.
const DROP_SINK_SPEED: f32 = 4.0;

/// Advance possession, auto-return and scoring by `dt` seconds.
///
/// Returns the teams that scored this tick (usually empty, at most one entry
/// per treasure).
pub fn update(
    state: &mut GameState,
    level: &LevelData,
    world: &CollisionWorld,
    dt: f32,
) -> Vec<Team> {
    process_grabs(state, level, world);
    follow_carriers(state);
    settle_drops(state, dt);
    auto_return(state, dt);
    score_sweep(state, level)
}

// =============================================================================
// GRAB / DROP
// =============================================================================

fn process_grabs(state: &mut GameState, level: &LevelData, world: &CollisionWorld) {
    let ids: Vec<PlayerId> = state.players.keys().copied().collect();
    for id in ids {
        let (wants_grab, holding, stunned) = {
            let Some(player) = state.get_player_mut(id) else { continue };
            let wants = player.grab;
            player.grab = false;
            (wants, player.holds_any_treasure(), player.is_shot)
        };
        if !wants_grab || stunned {
            continue;
        }

        if holding {
            // Voluntary drop
            state.drop_treasure_of(id, false);
            continue;
        }

        try_grab(state, level, world, id);
    }
}

fn try_grab(state: &mut GameState, level: &LevelData, world: &CollisionWorld, id: PlayerId) {
    let Some(player) = state.get_player(id) else { return };
    let pose = Pose::new(player.position, player.rotation);
    let origin = level.camera_position(pose);
    let dir = player.rotation.forward();
    let team = player.team;

    // The grabbing player's own bodies never block the ray
    let hit = world.raycast(origin, dir, GRAB_REACH, |body| {
        body != BodyId::Player(id) && body != BodyId::Harpoon(id)
    });

    let Some(hit) = hit else { return };
    let BodyId::Treasure(target) = hit.body else { return };
    if target != team.opponent() {
        return;
    }

    let treasure = &mut state.treasures[target.index()];
    if treasure.held_by.is_some() {
        return;
    }
    treasure.held_by = Some(id);
    treasure.dropping = false;
    treasure.away_time = 0.0;
    if let Some(player) = state.get_player_mut(id) {
        player.has_treasure[target.index()] = true;
    }
}

// =============================================================================
// MOVEMENT
// =============================================================================

fn follow_carriers(state: &mut GameState) {
    let GameState { players, treasures, .. } = state;
    for treasure in treasures.iter_mut() {
        let Some(carrier_id) = treasure.held_by else { continue };
        if let Some(carrier) = players.get(&carrier_id) {
            treasure.position = carrier.position + carrier.rotation.rotate(CARRY_OFFSET);
            treasure.rotation = carrier.rotation;
        }
    }
}

fn settle_drops(state: &mut GameState, dt: f32) {
    for treasure in state.treasures.iter_mut() {
        if !treasure.dropping || treasure.held_by.is_some() {
            continue;
        }
        treasure.position.z -= DROP_SINK_SPEED * dt;
        if treasure.position.z <= Treasure::RADIUS {
            treasure.position.z = Treasure::RADIUS;
            treasure.dropping = false;
        }
    }
}

// =============================================================================
// AUTO-RETURN
// =============================================================================

fn auto_return(state: &mut GameState, dt: f32) {
    for treasure in state.treasures.iter_mut() {
        if treasure.held_by.is_some()
            || treasure.position.distance(treasure.home) <= Treasure::HOME_RADIUS
        {
            treasure.away_time = 0.0;
            continue;
        }
        treasure.away_time += dt;
        if treasure.away_time > Treasure::RETURN_TIMEOUT {
            treasure.reset_home();
        }
    }
}

// =============================================================================
// SCORING
// =============================================================================

/// A treasure delivered within `HOME_RADIUS` of the opposing team's spawn
/// scores one point for that opposing team and resets the treasure home.
fn score_sweep(state: &mut GameState, level: &LevelData) -> Vec<Team> {
    let mut scored = Vec::new();
    for k in 0..state.treasures.len() {
        let (team, position, holder) = {
            let t = &state.treasures[k];
            (t.team, t.position, t.held_by)
        };
        let opponent = team.opponent();
        let anchor = level.team_spawns[opponent.index()].position;
        if position.distance(anchor) > Treasure::HOME_RADIUS {
            continue;
        }

        state.scores[opponent.index()] += 1;
        if let Some(holder) = holder {
            state.drop_treasure_of(holder, false);
        }
        state.treasures[k].reset_home();
        scored.push(opponent);
    }
    scored
}

// =============================================================================
// TESTS
// =============================================================================
