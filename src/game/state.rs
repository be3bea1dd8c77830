//! Game State Definitions
//!
//! The server-owned entity store: players, harpoons, treasures, scores.
//! Uses BTreeMap for deterministic iteration order; snapshot blocks are
//! emitted in id order, so the wire layout depends on it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::quat::Quat;
use crate::core::vec3::Vec3;
use crate::game::level::LevelData;

/// Length of the fixed nickname field, on the wire and in memory.
pub const NICKNAME_LEN: usize = 15;

/// Points needed to win the match.
pub const MAX_POINTS: u32 = 3;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier, assigned sequentially in join order.
///
/// Ids double as the snapshot block index, so they are dense: `0..player_count`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Create from a raw index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

// =============================================================================
// TEAM
// =============================================================================

/// One of the two competing teams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum Team {
    #[default]
    Red = 0,
    Blue = 1,
}

impl Team {
    /// The other team.
    #[inline]
    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    /// Index into per-team arrays (scores, treasures, spawns).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Get team from index (0-1).
    pub fn from_index(index: u32) -> Option<Team> {
        match index {
            0 => Some(Team::Red),
            1 => Some(Team::Blue),
            _ => None,
        }
    }
}

// =============================================================================
// NICKNAME
// =============================================================================

/// Fixed-width nickname, space-padded to `NICKNAME_LEN` bytes.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nickname(pub [u8; NICKNAME_LEN]);

impl Nickname {
    /// Build from a string, truncating and space-padding to the fixed width.
    pub fn from_str(s: &str) -> Self {
        let mut bytes = [b' '; NICKNAME_LEN];
        for (dst, src) in bytes.iter_mut().zip(s.bytes()) {
            *dst = src;
        }
        Self(bytes)
    }

    /// Build from raw wire bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; NICKNAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw padded bytes, as sent on the wire.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; NICKNAME_LEN] {
        &self.0
    }

    /// Trimmed, lossy view for display and logs.
    pub fn display(&self) -> String {
        String::from_utf8_lossy(&self.0).trim_end().to_string()
    }
}

impl Default for Nickname {
    fn default() -> Self {
        Self::from_str("anon")
    }
}

impl std::fmt::Debug for Nickname {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nickname({:?})", self.display())
    }
}

// =============================================================================
// PLAYER STATE
// =============================================================================

/// State of a single player.
///
/// Pose fields are client-reported (the owning client is authoritative for
/// its own movement); everything else is mutated only by the simulation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    /// Unique player ID
    pub id: PlayerId,

    /// Team membership (fixed after the lobby)
    pub team: Team,

    /// Display name
    pub nickname: Nickname,

    /// Current position
    pub position: Vec3,

    /// Current velocity
    pub velocity: Vec3,

    /// Current orientation (unit quaternion)
    pub rotation: Quat,

    /// Which treasures this player is carrying (indexed by team)
    pub has_treasure: [bool; 2],

    /// Currently stunned by a harpoon hit
    pub is_shot: bool,

    /// Seconds of stun remaining (counts down while `is_shot`)
    pub stun_remaining: f32,

    /// Edge-triggered fire intent, consumed by the harpoon pre-update
    pub shot_harpoon: bool,

    /// Edge-triggered grab/drop intent, consumed by the treasure update
    pub grab: bool,

    /// False once the owning connection has gone away mid-match
    pub connected: bool,
}

impl Player {
    /// Collision sphere radius.
    pub const RADIUS: f32 = 1.0;

    /// Create a new player at a spawn transform.
    pub fn new(id: PlayerId, team: Team, nickname: Nickname, position: Vec3, rotation: Quat) -> Self {
        Self {
            id,
            team,
            nickname,
            position,
            velocity: Vec3::ZERO,
            rotation,
            has_treasure: [false; 2],
            is_shot: false,
            stun_remaining: 0.0,
            shot_harpoon: false,
            grab: false,
            connected: true,
        }
    }

    /// Is this player carrying either treasure?
    #[inline]
    pub fn holds_any_treasure(&self) -> bool {
        self.has_treasure[0] || self.has_treasure[1]
    }

    /// Stun the player for `duration` seconds. Refreshes an ongoing stun.
    pub fn stun(&mut self, duration: f32) {
        self.is_shot = true;
        self.stun_remaining = self.stun_remaining.max(duration);
    }

    /// Decay the stun timer; clears `is_shot` when it elapses.
    pub fn update_stun(&mut self, dt: f32) {
        if !self.is_shot {
            return;
        }
        self.stun_remaining -= dt;
        if self.stun_remaining <= 0.0 {
            self.stun_remaining = 0.0;
            self.is_shot = false;
        }
    }
}

// =============================================================================
// HARPOON STATE
// =============================================================================

/// Lifecycle state of a harpoon. Wire-encoded as i32 (0..=3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
#[derive(Default)]
pub enum HarpoonState {
    /// Rigidly attached to the owner's gun
    #[default]
    Held = 0,
    /// In flight, tethered to the owner
    Firing = 1,
    /// Stuck in level geometry
    Landed = 2,
    /// Homing back toward the muzzle
    Retracting = 3,
}

impl HarpoonState {
    /// Wire representation.
    #[inline]
    pub const fn to_wire(self) -> i32 {
        self as i32
    }

    /// Decode the wire representation.
    pub fn from_wire(value: i32) -> Option<HarpoonState> {
        match value {
            0 => Some(HarpoonState::Held),
            1 => Some(HarpoonState::Firing),
            2 => Some(HarpoonState::Landed),
            3 => Some(HarpoonState::Retracting),
            _ => None,
        }
    }
}

/// A player's harpoon. Exactly one exists per player, created with it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Harpoon {
    /// Owning player
    pub owner: PlayerId,

    /// Lifecycle state
    pub state: HarpoonState,

    /// Current position (center of the shaft)
    pub position: Vec3,

    /// Current velocity (meaningful in Firing/Retracting)
    pub velocity: Vec3,

    /// Current orientation; follows the velocity while in flight
    pub rotation: Quat,

    /// Seconds spent in `Landed` so far
    pub landed_time: f32,
}

impl Harpoon {
    /// Collision sphere radius (tip).
    pub const RADIUS: f32 = 0.15;

    /// Shaft length, tip to back end.
    pub const LENGTH: f32 = 1.0;

    /// Flight and retraction speed.
    pub const SPEED: f32 = 20.0;

    /// Max distance from the owner before a fired harpoon retracts.
    pub const TETHER_DISTANCE: f32 = 15.0;

    /// Seconds a landed harpoon stays stuck before retracting.
    pub const LANDED_TIMEOUT: f32 = 3.0;

    /// How close the back end must come to the muzzle to count as returned.
    pub const MUZZLE_EPSILON: f32 = 0.2;

    /// Create a held harpoon for `owner`.
    pub fn new(owner: PlayerId) -> Self {
        Self {
            owner,
            state: HarpoonState::Held,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            landed_time: 0.0,
        }
    }

    /// World position of the shaft's back end (opposite the tip).
    #[inline]
    pub fn back_end(&self) -> Vec3 {
        self.position - self.rotation.forward().scale(Self::LENGTH * 0.5)
    }
}

// =============================================================================
// TREASURE STATE
// =============================================================================

/// One team's treasure. Grabbing the *other* team's treasure and carrying it
/// to your own spawn scores a point.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Treasure {
    /// Team this treasure belongs to
    pub team: Team,

    /// Current position
    pub position: Vec3,

    /// Current orientation
    pub rotation: Quat,

    /// Carrier, if any (wire sentinel -1 when none)
    pub held_by: Option<PlayerId>,

    /// Settling after a forced drop (carrier was shot)
    pub dropping: bool,

    /// Seconds spent unheld away from home (drives auto-return)
    pub away_time: f32,

    /// Home anchor the treasure returns and scores against
    pub home: Vec3,
}

impl Treasure {
    /// Collision sphere radius.
    pub const RADIUS: f32 = 0.5;

    /// Radius around home anchors used for auto-return and scoring.
    pub const HOME_RADIUS: f32 = 2.0;

    /// Seconds away from home before an unheld treasure snaps back.
    pub const RETURN_TIMEOUT: f32 = 10.0;

    /// Create a treasure at its home anchor.
    pub fn new(team: Team, home: Vec3) -> Self {
        Self {
            team,
            position: home,
            rotation: Quat::IDENTITY,
            held_by: None,
            dropping: false,
            away_time: 0.0,
            home,
        }
    }

    /// Snap back to the home anchor, clearing transient state.
    pub fn reset_home(&mut self) {
        self.position = self.home;
        self.rotation = Quat::IDENTITY;
        self.held_by = None;
        self.dropping = false;
        self.away_time = 0.0;
    }
}

// =============================================================================
// GAME PHASE
// =============================================================================

/// Current phase of the match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Default)]
pub enum GamePhase {
    /// Waiting in the lobby for everyone to ready up
    #[default]
    Lobby,
    /// Active gameplay
    Playing,
    /// A team reached `MAX_POINTS`; gameplay updates are suppressed
    Ended,
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete server-owned game state.
///
/// Uses BTreeMap for deterministic iteration order; player and harpoon maps
/// are parallel (one harpoon per player, same key).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    /// Current phase
    pub phase: GamePhase,

    /// Ticks simulated since match start
    pub tick: u64,

    /// Per-team scores, indexed by `Team::index`
    pub scores: [u32; 2],

    /// All players, keyed by id
    pub players: BTreeMap<PlayerId, Player>,

    /// One harpoon per player, keyed by owner id
    pub harpoons: BTreeMap<PlayerId, Harpoon>,

    /// Both treasures, indexed by `Team::index`
    pub treasures: [Treasure; 2],
}

impl GameState {
    /// Create a fresh state with treasures at their home anchors.
    pub fn new(level: &LevelData) -> Self {
        Self {
            phase: GamePhase::Lobby,
            tick: 0,
            scores: [0, 0],
            players: BTreeMap::new(),
            harpoons: BTreeMap::new(),
            treasures: [
                Treasure::new(Team::Red, level.treasure_homes[0]),
                Treasure::new(Team::Blue, level.treasure_homes[1]),
            ],
        }
    }

    /// Add a player at their team spawn, with its harpoon (held).
    ///
    /// The harpoon is created atomically with the player; the two maps stay
    /// parallel for the lifetime of the state.
    pub fn add_player(&mut self, id: PlayerId, team: Team, nickname: Nickname, level: &LevelData) {
        let spawn = &level.team_spawns[team.index()];
        let player = Player::new(id, team, nickname, spawn.position, spawn.rotation);
        self.players.insert(id, player);
        self.harpoons.insert(id, Harpoon::new(id));
    }

    /// Number of players (connected or not) in the store.
    #[inline]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Get a player by ID.
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Get a player mutably by ID.
    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// The winning team, if either side has reached `MAX_POINTS`.
    pub fn winner(&self) -> Option<Team> {
        if self.scores[Team::Red.index()] >= MAX_POINTS {
            Some(Team::Red)
        } else if self.scores[Team::Blue.index()] >= MAX_POINTS {
            Some(Team::Blue)
        } else {
            None
        }
    }

    /// Check if the match has ended.
    pub fn is_ended(&self) -> bool {
        matches!(self.phase, GamePhase::Ended)
    }

    /// Release any treasure `id` is carrying; marks it `dropping` when the
    /// drop is forced (carrier was shot).
    pub fn drop_treasure_of(&mut self, id: PlayerId, forced: bool) {
        for treasure in self.treasures.iter_mut() {
            if treasure.held_by == Some(id) {
                treasure.held_by = None;
                treasure.dropping = forced;
            }
        }
        if let Some(player) = self.players.get_mut(&id) {
            player.has_treasure = [false; 2];
        }
    }

    /// Debug invariant: `has_treasure` flags mirror `held_by` exactly and no
    /// player carries more than one treasure. Compiles to nothing in
    /// release builds.
    pub fn check_possession_invariant(&self) {
        for player in self.players.values() {
            let carried = self
                .treasures
                .iter()
                .filter(|t| t.held_by == Some(player.id))
                .count();
            debug_assert!(carried <= 1, "player {:?} holds {} treasures", player.id, carried);
            for (k, treasure) in self.treasures.iter().enumerate() {
                debug_assert_eq!(
                    player.has_treasure[k],
                    treasure.held_by == Some(player.id),
                    "possession flags out of sync for player {:?}",
                    player.id
                );
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
