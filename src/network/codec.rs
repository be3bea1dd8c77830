//! Wire Protocol
//!
//! Tag-byte binary protocol, little-endian, encoded field by field with
//! fixed-width types. Payload lengths are not self-describing: the receiver
//! derives them from the tag and previously learned metadata (the roster and
//! snapshot lengths are functions of `player_count`).
//!
//! Client → server: `'n'` hello, `'k'` ready, `'p'` input.
//! Server → client: `'u'` lobby update, `'t'` roster, `'b'` begin,
//! `'s'` snapshot.
//!
//! Decoding never consumes a partial message: a short buffer yields
//! `Ok(None)` and the caller waits for more bytes. Queued-up snapshots
//! collapse to the most recent one before decoding.

use thiserror::Error;

use crate::core::quat::Quat;
use crate::core::vec3::Vec3;
use crate::game::input::TickIntent;
use crate::game::state::{
    GameState, HarpoonState, Nickname, PlayerId, Team, NICKNAME_LEN,
};
use crate::network::buffer::RecvBuffer;

/// Protocol version carried in the `'n'` hello; bumped on layout changes.
pub const PROTOCOL_VERSION: u8 = 1;

// Message tags
pub const TAG_HELLO: u8 = b'n';
pub const TAG_READY: u8 = b'k';
pub const TAG_INPUT: u8 = b'p';
pub const TAG_LOBBY: u8 = b'u';
pub const TAG_ROSTER: u8 = b't';
pub const TAG_BEGIN: u8 = b'b';
pub const TAG_SNAPSHOT: u8 = b's';

// Fixed message lengths, tag byte included
const HELLO_LEN: usize = 1 + 1 + 4 + NICKNAME_LEN;
const READY_LEN: usize = 1;
const INPUT_LEN: usize = 1 + TickIntent::WIRE_SIZE;
const LOBBY_LEN: usize = 1 + 4 + 4;
const BEGIN_LEN: usize = 1;

const ROSTER_ENTRY_LEN: usize = 4 + NICKNAME_LEN;
const PLAYER_BLOCK_LEN: usize = 10 * 4 + 4 + 10 * 4;
const TREASURE_BLOCK_LEN: usize = 3 * 4 + 4;

/// Length of a `'t'` roster message for `player_count` players.
#[inline]
pub const fn roster_len(player_count: usize) -> usize {
    1 + ROSTER_ENTRY_LEN * player_count
}

/// Length of an `'s'` snapshot for `player_count` players:
/// tag + is_shot + two scores + one 84-byte block per player + two
/// 16-byte treasure blocks.
#[inline]
pub const fn snapshot_len(player_count: usize) -> usize {
    1 + 1 + 2 * 4 + PLAYER_BLOCK_LEN * player_count + 2 * TREASURE_BLOCK_LEN
}

/// Protocol violation; the connection carrying it is dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown message tag 0x{0:02x}")]
    UnknownTag(u8),

    #[error("invalid team index {0}")]
    BadTeam(u32),

    #[error("invalid harpoon state {0}")]
    BadHarpoonState(i32),
}

// =============================================================================
// MESSAGE TYPES
// =============================================================================

/// Messages a client sends to the server.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientMessage {
    /// `'n'`: announce version, team choice and nickname
    Hello {
        version: u8,
        team: Team,
        nickname: Nickname,
    },
    /// `'k'`: toggle ready in the lobby
    Ready,
    /// `'p'`: per-tick input
    Input(TickIntent),
}

/// One `'t'` roster entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    pub team: Team,
    pub nickname: Nickname,
}

/// Per-player block of a snapshot, in player-id order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
    pub harpoon_state: HarpoonState,
    pub harpoon_position: Vec3,
    pub harpoon_velocity: Vec3,
    pub harpoon_rotation: Quat,
}

/// Per-treasure block of a snapshot. `held_by` uses the wire sentinel -1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreasureSnapshot {
    pub position: Vec3,
    pub held_by: Option<PlayerId>,
}

/// A full `'s'` world snapshot, personalized per recipient (`is_shot` is the
/// recipient's own stun flag).
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub is_shot: bool,
    pub scores: [u32; 2],
    pub players: Vec<PlayerSnapshot>,
    pub treasures: [TreasureSnapshot; 2],
}

impl Snapshot {
    /// Capture the current state for one recipient. Player blocks are
    /// emitted in id order; the layout depends on it.
    pub fn capture(state: &GameState, recipient: PlayerId) -> Self {
        let players = state
            .players
            .values()
            .map(|p| {
                let h = &state.harpoons[&p.id];
                PlayerSnapshot {
                    position: p.position,
                    velocity: p.velocity,
                    rotation: p.rotation,
                    harpoon_state: h.state,
                    harpoon_position: h.position,
                    harpoon_velocity: h.velocity,
                    harpoon_rotation: h.rotation,
                }
            })
            .collect();
        let treasures = [0, 1].map(|k| TreasureSnapshot {
            position: state.treasures[k].position,
            held_by: state.treasures[k].held_by,
        });
        Self {
            is_shot: state.get_player(recipient).is_some_and(|p| p.is_shot),
            scores: state.scores,
            players,
            treasures,
        }
    }
}

/// Messages the server sends to a client.
#[derive(Clone, Debug)]
pub enum ServerMessage {
    /// `'u'`: lobby headcount plus the recipient's id
    LobbyUpdate { player_count: u32, your_id: PlayerId },
    /// `'t'`: team + nickname per player, in id order
    Roster(Vec<RosterEntry>),
    /// `'b'`: the match starts now
    Begin,
    /// `'s'`: full world snapshot
    Snapshot(Snapshot),
}

// =============================================================================
// PRIMITIVE WRITERS / READERS
// =============================================================================

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_vec3(buf: &mut Vec<u8>, v: Vec3) {
    put_f32(buf, v.x);
    put_f32(buf, v.y);
    put_f32(buf, v.z);
}

/// Quaternions travel vector-part first: x, y, z, w.
fn put_quat(buf: &mut Vec<u8>, q: Quat) {
    put_f32(buf, q.x);
    put_f32(buf, q.y);
    put_f32(buf, q.z);
    put_f32(buf, q.w);
}

/// Cursor over one complete message payload. Callers verify the length
/// before constructing one, so reads cannot run off the end.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn u8(&mut self) -> u8 {
        let v = self.buf[self.pos];
        self.pos += 1;
        v
    }

    fn u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        u32::from_le_bytes(bytes)
    }

    fn i32(&mut self) -> i32 {
        self.u32() as i32
    }

    fn f32(&mut self) -> f32 {
        f32::from_bits(self.u32())
    }

    fn vec3(&mut self) -> Vec3 {
        Vec3::new(self.f32(), self.f32(), self.f32())
    }

    fn quat(&mut self) -> Quat {
        let (x, y, z) = (self.f32(), self.f32(), self.f32());
        let w = self.f32();
        Quat::new(w, x, y, z)
    }

    fn nickname(&mut self) -> Nickname {
        let mut bytes = [0u8; NICKNAME_LEN];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + NICKNAME_LEN]);
        self.pos += NICKNAME_LEN;
        Nickname::from_bytes(bytes)
    }
}

// =============================================================================
// ENCODE
// =============================================================================

impl ClientMessage {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ClientMessage::Hello { version, team, nickname } => {
                let mut buf = Vec::with_capacity(HELLO_LEN);
                buf.push(TAG_HELLO);
                buf.push(*version);
                put_u32(&mut buf, team.index() as u32);
                buf.extend_from_slice(nickname.as_bytes());
                buf
            }
            ClientMessage::Ready => vec![TAG_READY],
            ClientMessage::Input(intent) => {
                let mut buf = Vec::with_capacity(INPUT_LEN);
                buf.push(TAG_INPUT);
                put_vec3(&mut buf, intent.position);
                put_vec3(&mut buf, intent.velocity);
                put_quat(&mut buf, intent.rotation);
                buf.push(intent.fire as u8);
                buf.push(intent.grab as u8);
                buf
            }
        }
    }
}

impl ServerMessage {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ServerMessage::LobbyUpdate { player_count, your_id } => {
                let mut buf = Vec::with_capacity(LOBBY_LEN);
                buf.push(TAG_LOBBY);
                put_u32(&mut buf, *player_count);
                put_u32(&mut buf, your_id.index());
                buf
            }
            ServerMessage::Roster(entries) => {
                let mut buf = Vec::with_capacity(roster_len(entries.len()));
                buf.push(TAG_ROSTER);
                for entry in entries {
                    put_u32(&mut buf, entry.team.index() as u32);
                    buf.extend_from_slice(entry.nickname.as_bytes());
                }
                buf
            }
            ServerMessage::Begin => vec![TAG_BEGIN],
            ServerMessage::Snapshot(snapshot) => {
                let mut buf = Vec::with_capacity(snapshot_len(snapshot.players.len()));
                buf.push(TAG_SNAPSHOT);
                buf.push(snapshot.is_shot as u8);
                put_u32(&mut buf, snapshot.scores[0]);
                put_u32(&mut buf, snapshot.scores[1]);
                for p in &snapshot.players {
                    put_vec3(&mut buf, p.position);
                    put_vec3(&mut buf, p.velocity);
                    put_quat(&mut buf, p.rotation);
                    put_i32(&mut buf, p.harpoon_state.to_wire());
                    put_vec3(&mut buf, p.harpoon_position);
                    put_vec3(&mut buf, p.harpoon_velocity);
                    put_quat(&mut buf, p.harpoon_rotation);
                }
                for t in &snapshot.treasures {
                    put_vec3(&mut buf, t.position);
                    put_i32(&mut buf, t.held_by.map_or(-1, |id| id.index() as i32));
                }
                buf
            }
        }
    }
}

// =============================================================================
// DECODE
// =============================================================================

/// Decode one client message, if a whole one is buffered.
pub fn decode_client(buf: &mut RecvBuffer) -> Result<Option<ClientMessage>, DecodeError> {
    if buf.remaining() == 0 {
        return Ok(None);
    }
    let bytes = buf.as_slice();
    match bytes[0] {
        TAG_HELLO => {
            if bytes.len() < HELLO_LEN {
                return Ok(None);
            }
            let mut r = Reader::new(&bytes[1..HELLO_LEN]);
            let version = r.u8();
            let team_index = r.u32();
            let team = Team::from_index(team_index).ok_or(DecodeError::BadTeam(team_index))?;
            let nickname = r.nickname();
            buf.consume(HELLO_LEN);
            Ok(Some(ClientMessage::Hello { version, team, nickname }))
        }
        TAG_READY => {
            buf.consume(READY_LEN);
            Ok(Some(ClientMessage::Ready))
        }
        TAG_INPUT => {
            if bytes.len() < INPUT_LEN {
                return Ok(None);
            }
            let mut r = Reader::new(&bytes[1..INPUT_LEN]);
            let intent = TickIntent {
                position: r.vec3(),
                velocity: r.vec3(),
                rotation: r.quat(),
                fire: r.u8() != 0,
                grab: r.u8() != 0,
            };
            buf.consume(INPUT_LEN);
            Ok(Some(ClientMessage::Input(intent)))
        }
        tag => Err(DecodeError::UnknownTag(tag)),
    }
}

/// Decode one server message, if a whole one is buffered.
///
/// `player_count` frames the roster and snapshot messages; the client learns
/// it from the `'u'` lobby update. Back-to-back snapshots collapse to the
/// newest before decoding.
pub fn decode_server(
    buf: &mut RecvBuffer,
    player_count: usize,
) -> Result<Option<ServerMessage>, DecodeError> {
    if buf.remaining() == 0 {
        return Ok(None);
    }
    match buf.as_slice()[0] {
        TAG_LOBBY => {
            if buf.remaining() < LOBBY_LEN {
                return Ok(None);
            }
            let mut r = Reader::new(&buf.as_slice()[1..LOBBY_LEN]);
            let player_count = r.u32();
            let your_id = PlayerId::new(r.u32());
            buf.consume(LOBBY_LEN);
            Ok(Some(ServerMessage::LobbyUpdate { player_count, your_id }))
        }
        TAG_ROSTER => {
            let len = roster_len(player_count);
            if buf.remaining() < len {
                return Ok(None);
            }
            let mut r = Reader::new(&buf.as_slice()[1..len]);
            let mut entries = Vec::with_capacity(player_count);
            for _ in 0..player_count {
                let team_index = r.u32();
                let team =
                    Team::from_index(team_index).ok_or(DecodeError::BadTeam(team_index))?;
                entries.push(RosterEntry { team, nickname: r.nickname() });
            }
            buf.consume(len);
            Ok(Some(ServerMessage::Roster(entries)))
        }
        TAG_BEGIN => {
            buf.consume(BEGIN_LEN);
            Ok(Some(ServerMessage::Begin))
        }
        TAG_SNAPSHOT => {
            let len = snapshot_len(player_count);

            // Latest wins: skip every complete snapshot that has another
            // complete snapshot queued right behind it.
            while buf.remaining() >= 2 * len && buf.as_slice()[len] == TAG_SNAPSHOT {
                buf.consume(len);
            }
            if buf.remaining() < len {
                return Ok(None);
            }

            let mut r = Reader::new(&buf.as_slice()[1..len]);
            let is_shot = r.u8() != 0;
            let scores = [r.u32(), r.u32()];
            let mut players = Vec::with_capacity(player_count);
            for _ in 0..player_count {
                let position = r.vec3();
                let velocity = r.vec3();
                let rotation = r.quat();
                let raw_state = r.i32();
                let harpoon_state = HarpoonState::from_wire(raw_state)
                    .ok_or(DecodeError::BadHarpoonState(raw_state))?;
                players.push(PlayerSnapshot {
                    position,
                    velocity,
                    rotation,
                    harpoon_state,
                    harpoon_position: r.vec3(),
                    harpoon_velocity: r.vec3(),
                    harpoon_rotation: r.quat(),
                });
            }
            let treasures = [0, 1].map(|_| {
                let position = r.vec3();
                let held = r.i32();
                TreasureSnapshot {
                    position,
                    held_by: (held >= 0).then(|| PlayerId::new(held as u32)),
                }
            });
            buf.consume(len);
            Ok(Some(ServerMessage::Snapshot(Snapshot {
                is_shot,
                scores,
                players,
                treasures,
            })))
        }
        tag => Err(DecodeError::UnknownTag(tag)),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_intent() -> TickIntent {
        TickIntent {
            position: Vec3::new(1.0, -2.5, 3.25),
            velocity: Vec3::new(0.5, 0.0, -1.0),
            rotation: Quat::from_axis_angle(Vec3::UP, 0.7),
            fire: true,
            grab: false,
        }
    }

    fn sample_snapshot(player_count: usize) -> Snapshot {
        let players = (0..player_count)
            .map(|i| PlayerSnapshot {
                position: Vec3::new(i as f32, 2.0, 3.0),
                velocity: Vec3::new(0.0, -1.0, 0.0),
                rotation: Quat::from_axis_angle(Vec3::UP, 0.3 * i as f32),
                harpoon_state: HarpoonState::Firing,
                harpoon_position: Vec3::new(5.0, 6.0, 7.0),
                harpoon_velocity: Vec3::new(0.0, 20.0, 0.0),
                harpoon_rotation: Quat::IDENTITY,
            })
            .collect();
        Snapshot {
            is_shot: true,
            scores: [2, 1],
            players,
            treasures: [
                TreasureSnapshot { position: Vec3::new(0.0, -14.0, 1.0), held_by: None },
                TreasureSnapshot {
                    position: Vec3::new(1.0, 2.0, 3.0),
                    held_by: Some(PlayerId::new(1)),
                },
            ],
        }
    }

    #[test]
    fn test_hello_roundtrip() {
        let msg = ClientMessage::Hello {
            version: PROTOCOL_VERSION,
            team: Team::Blue,
            nickname: Nickname::from_str("diver"),
        };
        let bytes = msg.encode();
        assert_eq!(bytes.len(), HELLO_LEN);

        let mut buf = RecvBuffer::new();
        buf.extend(&bytes);
        match decode_client(&mut buf).unwrap().unwrap() {
            ClientMessage::Hello { version, team, nickname } => {
                assert_eq!(version, PROTOCOL_VERSION);
                assert_eq!(team, Team::Blue);
                assert_eq!(nickname.display(), "diver");
            }
            other => panic!("wrong message: {:?}", other),
        }
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_input_roundtrip() {
        let bytes = ClientMessage::Input(sample_intent()).encode();
        assert_eq!(bytes.len(), INPUT_LEN);

        let mut buf = RecvBuffer::new();
        buf.extend(&bytes);
        match decode_client(&mut buf).unwrap().unwrap() {
            ClientMessage::Input(intent) => {
                assert_eq!(intent.position, sample_intent().position);
                assert_eq!(intent.rotation, sample_intent().rotation);
                assert!(intent.fire);
                assert!(!intent.grab);
            }
            other => panic!("wrong message: {:?}", other),
        }
    }

    #[test]
    fn test_short_buffer_waits_without_consuming() {
        let bytes = ClientMessage::Input(sample_intent()).encode();
        let mut buf = RecvBuffer::new();
        buf.extend(&bytes[..10]);

        assert!(decode_client(&mut buf).unwrap().is_none());
        assert_eq!(buf.remaining(), 10);

        // The rest arrives; now it decodes
        buf.extend(&bytes[10..]);
        assert!(decode_client(&mut buf).unwrap().is_some());
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let mut buf = RecvBuffer::new();
        buf.extend(&[0xff, 1, 2, 3]);
        assert_eq!(decode_client(&mut buf), Err(DecodeError::UnknownTag(0xff)));

        let mut buf = RecvBuffer::new();
        buf.extend(&[b'z']);
        assert!(matches!(
            decode_server(&mut buf, 2),
            Err(DecodeError::UnknownTag(b'z'))
        ));
    }

    #[test]
    fn test_bad_team_rejected() {
        let mut bytes = ClientMessage::Hello {
            version: PROTOCOL_VERSION,
            team: Team::Red,
            nickname: Nickname::default(),
        }
        .encode();
        bytes[2..6].copy_from_slice(&7u32.to_le_bytes());

        let mut buf = RecvBuffer::new();
        buf.extend(&bytes);
        assert_eq!(decode_client(&mut buf), Err(DecodeError::BadTeam(7)));
    }

    #[test]
    fn test_snapshot_len_formula() {
        assert_eq!(snapshot_len(0), 42);
        assert_eq!(snapshot_len(1), 42 + 84);
        assert_eq!(snapshot_len(4), 42 + 4 * 84);

        for pc in [0usize, 1, 2, 4, 8] {
            let bytes = ServerMessage::Snapshot(sample_snapshot(pc)).encode();
            assert_eq!(bytes.len(), snapshot_len(pc));
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let snapshot = sample_snapshot(3);
        let bytes = ServerMessage::Snapshot(snapshot.clone()).encode();

        let mut buf = RecvBuffer::new();
        buf.extend(&bytes);
        match decode_server(&mut buf, 3).unwrap().unwrap() {
            ServerMessage::Snapshot(decoded) => assert_eq!(decoded, snapshot),
            other => panic!("wrong message: {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_backlog_collapses_to_latest() {
        let mut buf = RecvBuffer::new();
        for score in 0..4u32 {
            let mut snap = sample_snapshot(2);
            snap.scores = [score, 0];
            buf.extend(&ServerMessage::Snapshot(snap).encode());
        }

        match decode_server(&mut buf, 2).unwrap().unwrap() {
            ServerMessage::Snapshot(decoded) => assert_eq!(decoded.scores, [3, 0]),
            other => panic!("wrong message: {:?}", other),
        }
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_snapshot_backlog_keeps_trailing_partial() {
        let mut buf = RecvBuffer::new();
        let full = ServerMessage::Snapshot(sample_snapshot(2)).encode();
        buf.extend(&full);
        buf.extend(&full[..20]); // second snapshot incomplete

        // Only one complete snapshot: it decodes, the partial stays
        assert!(decode_server(&mut buf, 2).unwrap().is_some());
        assert_eq!(buf.remaining(), 20);
        assert!(decode_server(&mut buf, 2).unwrap().is_none());
    }

    #[test]
    fn test_lobby_and_roster_roundtrip() {
        let mut buf = RecvBuffer::new();
        buf.extend(
            &ServerMessage::LobbyUpdate { player_count: 3, your_id: PlayerId::new(2) }.encode(),
        );
        let entries = vec![
            RosterEntry { team: Team::Red, nickname: Nickname::from_str("a") },
            RosterEntry { team: Team::Blue, nickname: Nickname::from_str("b") },
            RosterEntry { team: Team::Red, nickname: Nickname::from_str("c") },
        ];
        buf.extend(&ServerMessage::Roster(entries.clone()).encode());
        buf.extend(&ServerMessage::Begin.encode());

        match decode_server(&mut buf, 0).unwrap().unwrap() {
            ServerMessage::LobbyUpdate { player_count, your_id } => {
                assert_eq!(player_count, 3);
                assert_eq!(your_id, PlayerId::new(2));
            }
            other => panic!("wrong message: {:?}", other),
        }
        match decode_server(&mut buf, 3).unwrap().unwrap() {
            ServerMessage::Roster(decoded) => assert_eq!(decoded, entries),
            other => panic!("wrong message: {:?}", other),
        }
        assert!(matches!(
            decode_server(&mut buf, 3).unwrap().unwrap(),
            ServerMessage::Begin
        ));
    }

    #[test]
    fn test_bad_harpoon_state_rejected() {
        let mut bytes = ServerMessage::Snapshot(sample_snapshot(1)).encode();
        // Corrupt the harpoon state field of player 0 (offset 10 + 40)
        bytes[50..54].copy_from_slice(&9i32.to_le_bytes());

        let mut buf = RecvBuffer::new();
        buf.extend(&bytes);
        assert!(matches!(
            decode_server(&mut buf, 1),
            Err(DecodeError::BadHarpoonState(9))
        ));
    }

    #[test]
    fn test_snapshot_capture_personalizes_is_shot() {
        use crate::game::level::LevelData;

        let level = LevelData::default();
        let mut state = GameState::new(&level);
        state.add_player(PlayerId::new(0), Team::Red, Nickname::from_str("a"), &level);
        state.add_player(PlayerId::new(1), Team::Blue, Nickname::from_str("b"), &level);
        state.get_player_mut(PlayerId::new(1)).unwrap().stun(1.0);

        assert!(!Snapshot::capture(&state, PlayerId::new(0)).is_shot);
        assert!(Snapshot::capture(&state, PlayerId::new(1)).is_shot);
        assert_eq!(Snapshot::capture(&state, PlayerId::new(0)).players.len(), 2);
    }

    proptest! {
        /// A client byte stream decodes to the same messages regardless of
        /// how the transport chunks it.
        #[test]
        fn prop_chunking_invariant(chunks in prop::collection::vec(1usize..40, 1..20), seed in 0u8..255) {
            let messages = vec![
                ClientMessage::Hello {
                    version: PROTOCOL_VERSION,
                    team: if seed % 2 == 0 { Team::Red } else { Team::Blue },
                    nickname: Nickname::from_str("prop"),
                },
                ClientMessage::Ready,
                ClientMessage::Input(TickIntent {
                    position: Vec3::new(seed as f32, 0.0, 1.0),
                    ..TickIntent::default()
                }),
                ClientMessage::Input(TickIntent { fire: true, ..TickIntent::default() }),
            ];
            let stream: Vec<u8> = messages.iter().flat_map(|m| m.encode()).collect();

            let mut buf = RecvBuffer::new();
            let mut decoded = Vec::new();
            let mut offset = 0;
            for chunk in chunks.iter().cycle() {
                if offset >= stream.len() {
                    break;
                }
                let end = (offset + chunk).min(stream.len());
                buf.extend(&stream[offset..end]);
                offset = end;
                while let Some(msg) = decode_client(&mut buf).unwrap() {
                    decoded.push(msg);
                }
            }

            prop_assert_eq!(decoded.len(), messages.len());
            for (got, want) in decoded.iter().zip(&messages) {
                match (got, want) {
                    (ClientMessage::Hello { team: a, .. }, ClientMessage::Hello { team: b, .. }) => {
                        prop_assert_eq!(a, b)
                    }
                    (ClientMessage::Ready, ClientMessage::Ready) => {}
                    (ClientMessage::Input(a), ClientMessage::Input(b)) => {
                        prop_assert_eq!(a.position, b.position);
                        prop_assert_eq!(a.fire, b.fire);
                    }
                    _ => prop_assert!(false, "message kind mismatch"),
                }
            }
        }
    }
}
