//! Contact Resolution
//!
//! Classifies each manifold by the `BodyId` pair and applies the response:
//! harpoon contacts are routed into the harpoon state machine, players and
//! treasures get positional push-out from penetrating points. Pairs with no
//! defined response are skipped. Manifolds are processed in detection order.

use crate::core::vec3::Vec3;
use crate::game::harpoon;
use crate::game::state::{GameState, PlayerId, Team};
use crate::physics::{BodyId, ContactManifold, ContactPoint};

/// Apply all contact responses for this tick.
pub fn resolve(state: &mut GameState, manifolds: &[ContactManifold]) {
    for manifold in manifolds {
        match (manifold.a, manifold.b) {
            // Harpoon vs player: only a true penetration counts as a hit;
            // margin contacts are a graze
            (BodyId::Harpoon(owner), BodyId::Player(victim))
            | (BodyId::Player(victim), BodyId::Harpoon(owner)) => {
                if manifold.has_penetration() {
                    harpoon::on_hit_player(state, owner, victim);
                }
            }

            // Harpoon vs harpoon: no-op
            (BodyId::Harpoon(_), BodyId::Harpoon(_)) => {}

            // Harpoon vs anything solid: sticks only on true penetration
            (BodyId::Harpoon(owner), BodyId::Static)
            | (BodyId::Static, BodyId::Harpoon(owner))
            | (BodyId::Harpoon(owner), BodyId::Treasure(_))
            | (BodyId::Treasure(_), BodyId::Harpoon(owner)) => {
                if manifold.has_penetration() {
                    if let Some(h) = state.harpoons.get_mut(&owner) {
                        harpoon::on_hit_world(h);
                    }
                }
            }

            // Player vs level geometry
            (BodyId::Player(id), BodyId::Static) => {
                push_player(state, id, &manifold.points, true);
            }
            (BodyId::Static, BodyId::Player(id)) => {
                push_player(state, id, &manifold.points, false);
            }

            // Player vs player: both sides get pushed apart
            (BodyId::Player(pa), BodyId::Player(pb)) => {
                push_player(state, pa, &manifold.points, true);
                push_player(state, pb, &manifold.points, false);
            }

            // Treasure vs level geometry
            (BodyId::Treasure(team), BodyId::Static) => {
                push_treasure(state, team, &manifold.points, true);
            }
            (BodyId::Static, BodyId::Treasure(team)) => {
                push_treasure(state, team, &manifold.points, false);
            }

            // Everything else (player-treasure, static-static) has no response
            _ => {}
        }
    }
}

/// Positional correction for the `self` side of a manifold:
/// `(point_on_self − point_on_other) × sign(distance)`, summed over
/// penetrating points only.
fn push_vector(points: &[ContactPoint], self_is_a: bool) -> Vec3 {
    let mut total = Vec3::ZERO;
    for point in points {
        if point.distance >= 0.0 {
            continue;
        }
        let delta = if self_is_a {
            point.on_a - point.on_b
        } else {
            point.on_b - point.on_a
        };
        total += -delta; // sign(distance) = -1
    }
    total
}

fn push_player(state: &mut GameState, id: PlayerId, points: &[ContactPoint], self_is_a: bool) {
    let push = push_vector(points, self_is_a);
    if let Some(player) = state.get_player_mut(id) {
        player.position += push;
    }
}

fn push_treasure(state: &mut GameState, team: Team, points: &[ContactPoint], self_is_a: bool) {
    // A carried treasure follows its carrier; only free ones get corrected
    let treasure = &mut state.treasures[team.index()];
    if treasure.held_by.is_none() {
        treasure.position += push_vector(points, self_is_a);
    }
}

// =============================================================================
// TESTS
// =============================================================================
