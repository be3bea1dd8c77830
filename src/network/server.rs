//! TCP Game Server
//!
//! One game-loop task owns everything: the simulation, every connection's
//! receive buffer and the lobby bookkeeping. Per-connection reader tasks do
//! nothing but forward raw bytes over a channel; writer tasks drain outbound
//! queues. No game state is ever shared across tasks.
//!
//! Lobby: clients announce with `'n'` and toggle ready with `'k'`; once at
//! least `min_players` have announced and everyone is ready, the final
//! roster and `'b'` go out and the match starts. From then on a fixed-rate
//! ticker advances the simulation and broadcasts a personalized snapshot to
//! every player each tick.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::game::input::TickIntent;
use crate::game::level::LevelData;
use crate::game::state::{Nickname, PlayerId, Team};
use crate::game::tick::{tick, Simulation};
use crate::network::buffer::RecvBuffer;
use crate::network::codec::{
    decode_client, ClientMessage, RosterEntry, ServerMessage, Snapshot, PROTOCOL_VERSION,
};

/// Server failure.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,
    /// Simulation ticks (and snapshots) per second
    pub tick_rate: u32,
    /// Players required before the match can start
    pub min_players: usize,
    /// Hard cap on announced players
    pub max_players: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:4000".parse().expect("static addr"),
            tick_rate: 20,
            min_players: 2,
            max_players: 8,
        }
    }
}

type ConnId = u64;

/// Events the connection tasks feed into the game loop.
enum Inbound {
    Connected {
        conn: ConnId,
        addr: SocketAddr,
        tx: mpsc::UnboundedSender<Vec<u8>>,
    },
    Data {
        conn: ConnId,
        bytes: Vec<u8>,
    },
    Closed {
        conn: ConnId,
    },
}

/// Per-connection state owned by the game loop.
struct Connection {
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    recv: RecvBuffer,
    /// Team and nickname once the client has announced
    hello: Option<(Team, Nickname)>,
    ready: bool,
    /// Assigned at match start
    player: Option<PlayerId>,
}

impl Connection {
    fn send(&self, msg: &ServerMessage) {
        // A failed send means the writer is gone; the Closed event follows
        let _ = self.tx.send(msg.encode());
    }
}

enum Phase {
    Lobby,
    Playing {
        sim: Simulation,
        intents: BTreeMap<PlayerId, TickIntent>,
    },
}

// =============================================================================
// SERVER
// =============================================================================

pub struct GameServer {
    config: ServerConfig,
    level: LevelData,
}

impl GameServer {
    pub fn new(config: ServerConfig, level: LevelData) -> Self {
        Self { config, level }
    }

    /// Bind and serve forever.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind { addr: self.config.bind_addr, source })?;
        info!(addr = %self.config.bind_addr, "listening");
        self.run_with_listener(listener).await
    }

    /// Serve on an already-bound listener (tests bind to an OS-picked port).
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(accept_loop(listener, inbound_tx));
        game_loop(self.config, self.level, inbound_rx).await;
        Ok(())
    }
}

// =============================================================================
// CONNECTION TASKS
// =============================================================================

async fn accept_loop(listener: TcpListener, inbound: mpsc::UnboundedSender<Inbound>) {
    let mut next_conn: ConnId = 0;
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "accept failed");
                continue;
            }
        };
        let conn = next_conn;
        next_conn += 1;
        spawn_connection(conn, stream, addr, &inbound);
    }
}

fn spawn_connection(
    conn: ConnId,
    stream: TcpStream,
    addr: SocketAddr,
    inbound: &mpsc::UnboundedSender<Inbound>,
) {
    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel();

    if inbound.send(Inbound::Connected { conn, addr, tx }).is_err() {
        return; // game loop is gone
    }
    tokio::spawn(reader_task(conn, read_half, inbound.clone()));
    tokio::spawn(writer_task(write_half, rx));
}

async fn reader_task(conn: ConnId, mut read: OwnedReadHalf, inbound: mpsc::UnboundedSender<Inbound>) {
    let mut chunk = [0u8; 4096];
    loop {
        match read.read(&mut chunk).await {
            Ok(0) | Err(_) => {
                let _ = inbound.send(Inbound::Closed { conn });
                return;
            }
            Ok(n) => {
                if inbound
                    .send(Inbound::Data { conn, bytes: chunk[..n].to_vec() })
                    .is_err()
                {
                    return;
                }
            }
        }
    }
}

async fn writer_task(mut write: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(bytes) = rx.recv().await {
        if write.write_all(&bytes).await.is_err() {
            return;
        }
    }
}

// =============================================================================
// GAME LOOP
// =============================================================================

async fn game_loop(
    config: ServerConfig,
    level: LevelData,
    mut inbound: mpsc::UnboundedReceiver<Inbound>,
) {
    let dt = 1.0 / config.tick_rate as f32;
    let mut ticker = time::interval(Duration::from_secs_f64(1.0 / config.tick_rate as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut conns: BTreeMap<ConnId, Connection> = BTreeMap::new();
    let mut phase = Phase::Lobby;
    let mut announced_end = false;

    loop {
        tokio::select! {
            event = inbound.recv() => {
                let Some(event) = event else { return };
                handle_event(event, &config, &level, &mut conns, &mut phase);
            }
            _ = ticker.tick() => {
                if let Phase::Playing { sim, intents } = &mut phase {
                    let result = tick(sim, intents, dt);
                    intents.clear();

                    for team in &result.scored {
                        info!(?team, scores = ?sim.state.scores, "score");
                    }
                    if result.ended && !announced_end {
                        announced_end = true;
                        info!(winner = ?result.winner, "match over");
                    }

                    broadcast_snapshots(&conns, sim);
                }
            }
        }
    }
}

fn handle_event(
    event: Inbound,
    config: &ServerConfig,
    level: &LevelData,
    conns: &mut BTreeMap<ConnId, Connection>,
    phase: &mut Phase,
) {
    match event {
        Inbound::Connected { conn, addr, tx } => {
            info!(conn, %addr, "client connected");
            conns.insert(
                conn,
                Connection {
                    addr,
                    tx,
                    recv: RecvBuffer::new(),
                    hello: None,
                    ready: false,
                    player: None,
                },
            );
        }
        Inbound::Data { conn, bytes } => {
            let Some(connection) = conns.get_mut(&conn) else { return };
            connection.recv.extend(&bytes);
            if connection.recv.overflowed() {
                warn!(conn, "receive buffer overflow, dropping connection");
                drop_connection(conn, conns, phase);
                return;
            }
            pump_messages(conn, config, level, conns, phase);
        }
        Inbound::Closed { conn } => {
            let Some(connection) = conns.remove(&conn) else { return };
            info!(conn, addr = %connection.addr, "client disconnected");
            match phase {
                Phase::Lobby => broadcast_lobby(conns),
                Phase::Playing { sim, .. } => {
                    // The entity stays: the snapshot layout is a function of
                    // player_count, so mid-match removal would shift framing
                    // for every other client.
                    if let Some(id) = connection.player {
                        if let Some(player) = sim.state.get_player_mut(id) {
                            player.connected = false;
                            warn!(conn, player = id.index(), "player left mid-match");
                        }
                    }
                }
            }
        }
    }
}

/// Decode and apply everything buffered on one connection.
fn pump_messages(
    conn: ConnId,
    config: &ServerConfig,
    level: &LevelData,
    conns: &mut BTreeMap<ConnId, Connection>,
    phase: &mut Phase,
) {
    loop {
        let Some(connection) = conns.get_mut(&conn) else { return };
        match decode_client(&mut connection.recv) {
            Ok(Some(msg)) => {
                if !apply_message(conn, msg, config, level, conns, phase) {
                    drop_connection(conn, conns, phase);
                    return;
                }
            }
            Ok(None) => return,
            Err(err) => {
                error!(conn, %err, "protocol violation, dropping connection");
                drop_connection(conn, conns, phase);
                return;
            }
        }
    }
}

/// Returns false when the message is grounds for dropping the connection.
fn apply_message(
    conn: ConnId,
    msg: ClientMessage,
    config: &ServerConfig,
    level: &LevelData,
    conns: &mut BTreeMap<ConnId, Connection>,
    phase: &mut Phase,
) -> bool {
    match (msg, &mut *phase) {
        (ClientMessage::Hello { version, team, nickname }, Phase::Lobby) => {
            if version != PROTOCOL_VERSION {
                warn!(conn, version, expected = PROTOCOL_VERSION, "version mismatch");
                return false;
            }
            let announced = conns.values().filter(|c| c.hello.is_some()).count();
            let Some(connection) = conns.get_mut(&conn) else { return true };
            let is_new = connection.hello.is_none();
            if is_new && announced >= config.max_players {
                warn!(conn, "lobby full");
                return false;
            }
            info!(conn, ?team, nickname = %nickname.display(), "player announced");
            connection.hello = Some((team, nickname));
            broadcast_lobby(conns);
            true
        }
        (ClientMessage::Ready, Phase::Lobby) => {
            let Some(connection) = conns.get_mut(&conn) else { return true };
            if connection.hello.is_none() {
                debug!(conn, "ready before hello ignored");
                return true;
            }
            connection.ready = !connection.ready;
            debug!(conn, ready = connection.ready, "ready toggled");
            try_start_match(config, level, conns, phase);
            true
        }
        (ClientMessage::Input(intent), Phase::Playing { intents, .. }) => {
            if let Some(id) = conns.get(&conn).and_then(|c| c.player) {
                intents.entry(id).or_default().merge(intent);
            }
            true
        }
        // Inputs before the match and lobby messages after it are noise
        (ClientMessage::Input(_), Phase::Lobby) => true,
        (ClientMessage::Hello { .. } | ClientMessage::Ready, Phase::Playing { .. }) => {
            debug!(conn, "lobby message during play ignored");
            true
        }
    }
}

fn drop_connection(conn: ConnId, conns: &mut BTreeMap<ConnId, Connection>, phase: &mut Phase) {
    // Dropping the sender ends the writer task, which closes our write half;
    // the reader task reports Closed when the peer hangs up.
    let Some(connection) = conns.remove(&conn) else { return };
    match phase {
        Phase::Lobby => broadcast_lobby(conns),
        Phase::Playing { sim, .. } => {
            if let Some(id) = connection.player {
                if let Some(player) = sim.state.get_player_mut(id) {
                    player.connected = false;
                }
            }
        }
    }
}

// =============================================================================
// LOBBY
// =============================================================================

/// Announced connections in join order, with their provisional ids.
fn announced(conns: &BTreeMap<ConnId, Connection>) -> Vec<(ConnId, Team, Nickname)> {
    conns
        .iter()
        .filter_map(|(id, c)| c.hello.map(|(team, nick)| (*id, team, nick)))
        .collect()
}

/// Send everyone a fresh `'u'` headcount (with their own provisional id) and
/// the `'t'` roster.
fn broadcast_lobby(conns: &BTreeMap<ConnId, Connection>) {
    let roster = announced(conns);
    let entries: Vec<RosterEntry> = roster
        .iter()
        .map(|(_, team, nickname)| RosterEntry { team: *team, nickname: *nickname })
        .collect();
    let count = entries.len() as u32;

    for (index, (conn_id, _, _)) in roster.iter().enumerate() {
        if let Some(connection) = conns.get(conn_id) {
            connection.send(&ServerMessage::LobbyUpdate {
                player_count: count,
                your_id: PlayerId::new(index as u32),
            });
            connection.send(&ServerMessage::Roster(entries.clone()));
        }
    }
}

/// Start the match if enough players have announced and all are ready.
fn try_start_match(
    config: &ServerConfig,
    level: &LevelData,
    conns: &mut BTreeMap<ConnId, Connection>,
    phase: &mut Phase,
) {
    let roster = announced(conns);
    if roster.len() < config.min_players {
        return;
    }
    let all_ready = conns
        .values()
        .filter(|c| c.hello.is_some())
        .all(|c| c.ready);
    if !all_ready {
        return;
    }

    // Ids become final here, in join order
    let mut sim = Simulation::new(level.clone());
    for (index, (conn_id, team, nickname)) in roster.iter().enumerate() {
        let id = PlayerId::new(index as u32);
        sim.add_player(id, *team, *nickname);
        if let Some(connection) = conns.get_mut(conn_id) {
            connection.player = Some(id);
        }
    }
    sim.start();

    broadcast_lobby(conns);
    for connection in conns.values() {
        if connection.player.is_some() {
            connection.send(&ServerMessage::Begin);
        }
    }
    info!(players = roster.len(), "match started");

    *phase = Phase::Playing { sim, intents: BTreeMap::new() };
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

fn broadcast_snapshots(conns: &BTreeMap<ConnId, Connection>, sim: &Simulation) {
    for connection in conns.values() {
        let Some(id) = connection.player else { continue };
        let snapshot = Snapshot::capture(&sim.state, id);
        connection.send(&ServerMessage::Snapshot(snapshot));
    }
}

// =============================================================================
// TESTS
// =============================================================================
