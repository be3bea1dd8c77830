//! Client Input
//!
//! The decoded per-tick input packet: the client-reported pose plus the
//! edge-triggered fire and grab intents. Intents accumulate between ticks
//! (pose latest-wins, flags sticky) and are consumed at the top of the tick.

use serde::{Deserialize, Serialize};

use crate::core::quat::Quat;
use crate::core::vec3::Vec3;
use crate::game::state::Player;

/// One client input frame (the `'p'` packet payload).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickIntent {
    /// Client-reported position
    pub position: Vec3,

    /// Client-reported velocity
    pub velocity: Vec3,

    /// Client-reported orientation
    pub rotation: Quat,

    /// Fire-harpoon edge
    pub fire: bool,

    /// Grab/drop edge
    pub grab: bool,
}

impl TickIntent {
    /// Payload size on the wire, excluding the tag byte:
    /// 10 × f32 + 2 × u8.
    pub const WIRE_SIZE: usize = 10 * 4 + 2;

    /// Merge a newer frame into this one: pose latest-wins, edges sticky
    /// until consumed.
    pub fn merge(&mut self, newer: TickIntent) {
        self.position = newer.position;
        self.velocity = newer.velocity;
        self.rotation = newer.rotation;
        self.fire |= newer.fire;
        self.grab |= newer.grab;
    }

    /// Apply to a player. The owning client is authoritative for its own
    /// pose; rotation is renormalized since it came off the wire.
    pub fn apply(&self, player: &mut Player) {
        player.position = self.position;
        player.velocity = self.velocity;
        player.rotation = self.rotation.normalize();
        player.shot_harpoon |= self.fire;
        player.grab |= self.grab;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Nickname, PlayerId, Team};

    #[test]
    fn test_merge_keeps_edges() {
        let mut pending = TickIntent {
            fire: true,
            ..TickIntent::default()
        };
        let newer = TickIntent {
            position: Vec3::new(1.0, 2.0, 3.0),
            fire: false,
            grab: true,
            ..TickIntent::default()
        };
        pending.merge(newer);

        // Pose is latest-wins, edges are sticky
        assert_eq!(pending.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(pending.fire);
        assert!(pending.grab);
    }

    #[test]
    fn test_apply_normalizes_rotation() {
        let mut player = Player::new(
            PlayerId::new(0),
            Team::Red,
            Nickname::default(),
            Vec3::ZERO,
            Quat::IDENTITY,
        );
        let intent = TickIntent {
            rotation: Quat::new(2.0, 0.0, 0.0, 0.0),
            ..TickIntent::default()
        };
        intent.apply(&mut player);
        assert!((player.rotation.norm_squared() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_apply_sets_edge_flags() {
        let mut player = Player::new(
            PlayerId::new(0),
            Team::Red,
            Nickname::default(),
            Vec3::ZERO,
            Quat::IDENTITY,
        );
        let intent = TickIntent {
            fire: true,
            grab: true,
            ..TickIntent::default()
        };
        intent.apply(&mut player);
        assert!(player.shot_harpoon);
        assert!(player.grab);
    }
}
