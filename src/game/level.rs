//! Level Data
//!
//! Immutable world description loaded at startup: team spawn anchors,
//! treasure homes, the camera/gun/harpoon local offset chain, map bounds and
//! static collider boxes. Serialized as JSON; a built-in default level is
//! provided for tests and for running without a level file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::quat::Quat;
use crate::core::vec3::Vec3;

/// Level loading failure.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse level file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("level has no static geometry")]
    Empty,
}

// =============================================================================
// POSE
// =============================================================================

/// A rigid transform: rotation then translation.
///
/// Used for spawn anchors and for the held-harpoon attachment chain
/// (player pose ∘ gun offset ∘ harpoon offset).
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create from parts.
    #[inline]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Compose with a child transform: `self` applied after `child`.
    #[inline]
    pub fn compose(self, child: Pose) -> Pose {
        Pose {
            position: self.position + self.rotation.rotate(child.position),
            rotation: self.rotation * child.rotation,
        }
    }

    /// Map a local point into world space.
    #[inline]
    pub fn transform_point(self, local: Vec3) -> Vec3 {
        self.position + self.rotation.rotate(local)
    }
}

// =============================================================================
// LEVEL DATA
// =============================================================================

/// Axis-aligned static collider box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticBox {
    pub center: Vec3,
    pub half_extents: Vec3,
}

/// Everything the simulation needs to know about the world, fixed at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelData {
    /// Per-team spawn transforms, indexed by `Team::index`
    pub team_spawns: [Pose; 2],

    /// Per-team treasure home anchors, indexed by `Team::index`
    pub treasure_homes: [Vec3; 2],

    /// Camera offset in player-local space; grab rays originate here
    pub camera_offset: Pose,

    /// Gun muzzle offset in player-local space
    pub gun_offset: Pose,

    /// Held-harpoon offset in gun-local space
    pub harpoon_offset: Pose,

    /// Symmetric play-area half extents; players are kept inside
    pub map_half_extents: Vec3,

    /// Static collider boxes (walls, rocks, wrecks)
    pub static_boxes: Vec<StaticBox>,
}

impl LevelData {
    /// Load a level from a JSON file.
    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let text = std::fs::read_to_string(path)?;
        let level: LevelData = serde_json::from_str(&text)?;
        if level.static_boxes.is_empty() {
            return Err(LevelError::Empty);
        }
        Ok(level)
    }

    /// World-space pose of a player's gun muzzle.
    #[inline]
    pub fn muzzle_pose(&self, player_pose: Pose) -> Pose {
        player_pose.compose(self.gun_offset)
    }

    /// World-space pose of a held harpoon, rigidly attached to its owner.
    #[inline]
    pub fn held_harpoon_pose(&self, player_pose: Pose) -> Pose {
        player_pose.compose(self.gun_offset).compose(self.harpoon_offset)
    }

    /// World-space grab-ray origin for a player.
    #[inline]
    pub fn camera_position(&self, player_pose: Pose) -> Vec3 {
        player_pose.compose(self.camera_offset).position
    }
}

impl Default for LevelData {
    /// The built-in arena: a walled box with opposing spawns along the y axis
    /// and a few cover blocks around the middle.
    fn default() -> Self {
        let spawn_red = Pose::new(Vec3::new(0.0, -14.0, 2.0), Quat::IDENTITY);
        let spawn_blue = Pose::new(
            Vec3::new(0.0, 14.0, 2.0),
            Quat::from_axis_angle(Vec3::UP, std::f32::consts::PI),
        );
        Self {
            team_spawns: [spawn_red, spawn_blue],
            treasure_homes: [Vec3::new(0.0, -14.0, 1.0), Vec3::new(0.0, 14.0, 1.0)],
            camera_offset: Pose::new(Vec3::new(0.0, 0.0, 0.6), Quat::IDENTITY),
            gun_offset: Pose::new(Vec3::new(0.4, 0.0, 0.2), Quat::IDENTITY),
            harpoon_offset: Pose::new(Vec3::new(0.0, 0.0, -0.5), Quat::IDENTITY),
            map_half_extents: Vec3::new(20.0, 20.0, 10.0),
            static_boxes: vec![
                // Center wreck
                StaticBox {
                    center: Vec3::new(0.0, 0.0, 1.0),
                    half_extents: Vec3::new(3.0, 1.0, 1.0),
                },
                // Side cover
                StaticBox {
                    center: Vec3::new(-8.0, -5.0, 1.0),
                    half_extents: Vec3::new(1.0, 2.0, 1.0),
                },
                StaticBox {
                    center: Vec3::new(8.0, 5.0, 1.0),
                    half_extents: Vec3::new(1.0, 2.0, 1.0),
                },
            ],
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
