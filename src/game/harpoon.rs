//! Harpoon Lifecycle
//!
//! State machine for each player's harpoon:
//! Held → Firing → (Landed →) Retracting → Held.
//!
//! Transitions are evaluated in precedence order, once per harpoon per tick:
//! fire intent, tether overrun, contact (handled by the resolver through the
//! entry points below), landed timeout, return to muzzle. Contacts are only
//! honored while `Firing`; a harpoon that is held, stuck or on its way back
//! passes through everything.

use crate::core::quat::Quat;
use crate::core::vec3::Vec3;
use crate::game::level::{LevelData, Pose};
use crate::game::state::{GameState, Harpoon, HarpoonState, PlayerId};
use crate::game::treasure::STUN_DURATION;

// =============================================================================
// FIRE PRE-UPDATE
// =============================================================================

/// Consume fire intents. A held harpoon launches along the owner's forward
/// vector; the intent is cleared whether or not it fires (carrying a
/// treasure or being stunned blocks the shot).
pub fn pre_update(state: &mut GameState, level: &LevelData) {
    let GameState { players, harpoons, .. } = state;

    for (id, harpoon) in harpoons.iter_mut() {
        let Some(player) = players.get_mut(id) else { continue };
        if !player.shot_harpoon {
            continue;
        }
        player.shot_harpoon = false;

        if harpoon.state != HarpoonState::Held {
            continue;
        }
        if player.holds_any_treasure() || player.is_shot {
            continue;
        }

        let pose = level.held_harpoon_pose(Pose::new(player.position, player.rotation));
        harpoon.state = HarpoonState::Firing;
        harpoon.position = pose.position;
        harpoon.velocity = player.rotation.forward().scale(Harpoon::SPEED);
        harpoon.rotation = player.rotation;
        harpoon.landed_time = 0.0;
    }
}

// =============================================================================
// TETHER CHECK
// =============================================================================

/// Retract any firing harpoon that has exceeded its tether. Runs between
/// detection and contact resolution: an overrun harpoon retracts even when
/// this tick's manifolds would have landed it.
pub fn check_tethers(state: &mut GameState) {
    let GameState { players, harpoons, .. } = state;

    for (id, harpoon) in harpoons.iter_mut() {
        if harpoon.state != HarpoonState::Firing {
            continue;
        }
        let Some(player) = players.get(id) else { continue };
        if harpoon.position.distance(player.position) > Harpoon::TETHER_DISTANCE {
            harpoon.state = HarpoonState::Retracting;
        }
    }
}

// =============================================================================
// CONTACT ENTRY POINTS (called by the resolver)
// =============================================================================

/// A firing harpoon truly penetrated level geometry or a treasure: it sticks.
pub fn on_hit_world(harpoon: &mut Harpoon) {
    if harpoon.state != HarpoonState::Firing {
        return;
    }
    harpoon.state = HarpoonState::Landed;
    harpoon.velocity = Vec3::ZERO;
    harpoon.landed_time = 0.0;
}

/// A firing harpoon struck another player: the victim is stunned (dropping
/// any carried treasure) and the harpoon turns back. Self-hits are no-ops.
pub fn on_hit_player(state: &mut GameState, owner: PlayerId, victim: PlayerId) {
    if owner == victim {
        return;
    }
    let Some(harpoon) = state.harpoons.get_mut(&owner) else { return };
    if harpoon.state != HarpoonState::Firing {
        return;
    }
    harpoon.state = HarpoonState::Retracting;

    state.drop_treasure_of(victim, true);
    if let Some(player) = state.get_player_mut(victim) {
        player.stun(STUN_DURATION);
    }
}

// =============================================================================
// POST-UPDATE
// =============================================================================

/// Advance every harpoon by `dt` seconds, after contact resolution.
pub fn post_update(state: &mut GameState, level: &LevelData, dt: f32) {
    let GameState { players, harpoons, .. } = state;

    for (id, harpoon) in harpoons.iter_mut() {
        let Some(player) = players.get(id) else { continue };
        let owner_pose = Pose::new(player.position, player.rotation);

        match harpoon.state {
            HarpoonState::Held => {
                // Rigid attachment through the gun offset chain
                let pose = level.held_harpoon_pose(owner_pose);
                harpoon.position = pose.position;
                harpoon.rotation = pose.rotation;
                harpoon.velocity = Vec3::ZERO;
            }
            HarpoonState::Firing => {
                harpoon.position += harpoon.velocity.scale(dt);
                if harpoon.velocity != Vec3::ZERO {
                    harpoon.rotation = Quat::looking_along(harpoon.velocity);
                }
                if harpoon.position.distance(player.position) > Harpoon::TETHER_DISTANCE {
                    harpoon.state = HarpoonState::Retracting;
                }
            }
            HarpoonState::Landed => {
                harpoon.landed_time += dt;
                if harpoon.landed_time > Harpoon::LANDED_TIMEOUT {
                    harpoon.state = HarpoonState::Retracting;
                }
            }
            HarpoonState::Retracting => {
                let muzzle = level.muzzle_pose(owner_pose).position;
                let to_muzzle = muzzle - harpoon.back_end();
                let dist = to_muzzle.length();
                // Arrived if within the epsilon, or if one step would
                // overshoot the muzzle
                if dist <= Harpoon::MUZZLE_EPSILON || dist <= Harpoon::SPEED * dt {
                    let pose = level.held_harpoon_pose(owner_pose);
                    harpoon.state = HarpoonState::Held;
                    harpoon.position = pose.position;
                    harpoon.rotation = pose.rotation;
                    harpoon.velocity = Vec3::ZERO;
                } else {
                    // Re-aim toward the muzzle every tick; the owner may move
                    harpoon.velocity = to_muzzle.normalize().scale(Harpoon::SPEED);
                    harpoon.position += harpoon.velocity.scale(dt);
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Nickname, Team};

    fn two_player_state(level: &LevelData) -> GameState {
        let mut state = GameState::new(level);
        state.add_player(PlayerId::new(0), Team::Red, Nickname::from_str("a"), level);
        state.add_player(PlayerId::new(1), Team::Blue, Nickname::from_str("b"), level);
        state
    }

    #[test]
    fn test_fire_launches_harpoon() {
        let level = LevelData::default();
        let mut state = two_player_state(&level);
        let id = PlayerId::new(0);
        state.get_player_mut(id).unwrap().shot_harpoon = true;

        pre_update(&mut state, &level);

        let harpoon = &state.harpoons[&id];
        assert_eq!(harpoon.state, HarpoonState::Firing);
        assert!((harpoon.velocity.length() - Harpoon::SPEED).abs() < 1e-4);
        // Intent consumed
        assert!(!state.get_player(id).unwrap().shot_harpoon);
    }

    #[test]
    fn test_fire_blocked_while_carrying() {
        let level = LevelData::default();
        let mut state = two_player_state(&level);
        let id = PlayerId::new(0);
        {
            let player = state.get_player_mut(id).unwrap();
            player.shot_harpoon = true;
            player.has_treasure[1] = true;
        }
        state.treasures[1].held_by = Some(id);

        pre_update(&mut state, &level);

        assert_eq!(state.harpoons[&id].state, HarpoonState::Held);
        // Intent still consumed so it does not fire after the drop
        assert!(!state.get_player(id).unwrap().shot_harpoon);
    }

    #[test]
    fn test_fire_blocked_while_stunned() {
        let level = LevelData::default();
        let mut state = two_player_state(&level);
        let id = PlayerId::new(0);
        state.get_player_mut(id).unwrap().stun(1.0);
        state.get_player_mut(id).unwrap().shot_harpoon = true;

        pre_update(&mut state, &level);
        assert_eq!(state.harpoons[&id].state, HarpoonState::Held);
    }

    #[test]
    fn test_tether_overrun_retracts() {
        let level = LevelData::default();
        let mut state = two_player_state(&level);
        let id = PlayerId::new(0);
        {
            let harpoon = state.harpoons.get_mut(&id).unwrap();
            harpoon.state = HarpoonState::Firing;
            let owner_pos = state.players[&id].position;
            harpoon.position = owner_pos + Vec3::new(Harpoon::TETHER_DISTANCE + 1.0, 0.0, 0.0);
            harpoon.velocity = Vec3::new(Harpoon::SPEED, 0.0, 0.0);
        }

        post_update(&mut state, &level, 0.05);
        assert_eq!(state.harpoons[&id].state, HarpoonState::Retracting);
    }

    #[test]
    fn test_landed_timeout() {
        let level = LevelData::default();
        let mut state = two_player_state(&level);
        let id = PlayerId::new(0);
        state.harpoons.get_mut(&id).unwrap().state = HarpoonState::Landed;

        let ticks = (Harpoon::LANDED_TIMEOUT / 0.05) as usize + 2;
        for _ in 0..ticks {
            post_update(&mut state, &level, 0.05);
        }
        assert_eq!(state.harpoons[&id].state, HarpoonState::Retracting);
    }

    #[test]
    fn test_retract_returns_to_held() {
        let level = LevelData::default();
        let mut state = two_player_state(&level);
        let id = PlayerId::new(0);
        {
            let owner_pos = state.players[&id].position;
            let harpoon = state.harpoons.get_mut(&id).unwrap();
            harpoon.state = HarpoonState::Retracting;
            harpoon.position = owner_pos + Vec3::new(5.0, 0.0, 0.0);
        }

        // Plenty of ticks to home back in
        for _ in 0..100 {
            post_update(&mut state, &level, 0.05);
            if state.harpoons[&id].state == HarpoonState::Held {
                break;
            }
        }
        assert_eq!(state.harpoons[&id].state, HarpoonState::Held);
        assert_eq!(state.harpoons[&id].velocity, Vec3::ZERO);
    }

    #[test]
    fn test_held_follows_owner() {
        let level = LevelData::default();
        let mut state = two_player_state(&level);
        let id = PlayerId::new(0);

        state.get_player_mut(id).unwrap().position = Vec3::new(3.0, 4.0, 5.0);
        post_update(&mut state, &level, 0.05);
        let first = state.harpoons[&id].position;

        state.get_player_mut(id).unwrap().position = Vec3::new(6.0, 4.0, 5.0);
        post_update(&mut state, &level, 0.05);
        let second = state.harpoons[&id].position;

        assert!((second.x - first.x - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_hit_player_stuns_and_drops() {
        let level = LevelData::default();
        let mut state = two_player_state(&level);
        let shooter = PlayerId::new(0);
        let victim = PlayerId::new(1);

        state.harpoons.get_mut(&shooter).unwrap().state = HarpoonState::Firing;
        state.treasures[0].held_by = Some(victim);
        state.get_player_mut(victim).unwrap().has_treasure[0] = true;

        on_hit_player(&mut state, shooter, victim);

        assert_eq!(state.harpoons[&shooter].state, HarpoonState::Retracting);
        assert!(state.get_player(victim).unwrap().is_shot);
        assert_eq!(state.treasures[0].held_by, None);
        assert!(state.treasures[0].dropping);
    }

    #[test]
    fn test_self_hit_is_noop() {
        let level = LevelData::default();
        let mut state = two_player_state(&level);
        let id = PlayerId::new(0);
        state.harpoons.get_mut(&id).unwrap().state = HarpoonState::Firing;

        on_hit_player(&mut state, id, id);
        assert_eq!(state.harpoons[&id].state, HarpoonState::Firing);
        assert!(!state.get_player(id).unwrap().is_shot);
    }

    #[test]
    fn test_contacts_ignored_unless_firing() {
        let level = LevelData::default();
        let mut state = two_player_state(&level);
        let id = PlayerId::new(0);

        for s in [HarpoonState::Held, HarpoonState::Landed, HarpoonState::Retracting] {
            state.harpoons.get_mut(&id).unwrap().state = s;
            on_hit_player(&mut state, id, PlayerId::new(1));
            assert_eq!(state.harpoons[&id].state, s);

            let harpoon = state.harpoons.get_mut(&id).unwrap();
            on_hit_world(harpoon);
            assert_eq!(harpoon.state, s);
        }
        assert!(!state.get_player(PlayerId::new(1)).unwrap().is_shot);
    }

    #[test]
    fn test_firing_aligns_with_velocity() {
        let level = LevelData::default();
        let mut state = two_player_state(&level);
        let id = PlayerId::new(0);
        {
            let harpoon = state.harpoons.get_mut(&id).unwrap();
            harpoon.state = HarpoonState::Firing;
            harpoon.position = state.players[&id].position;
            harpoon.velocity = Vec3::new(0.0, Harpoon::SPEED, 0.0);
        }
        post_update(&mut state, &level, 0.05);
        let forward = state.harpoons[&id].rotation.forward();
        assert!((forward.y - 1.0).abs() < 1e-4, "forward was {:?}", forward);
    }
}
