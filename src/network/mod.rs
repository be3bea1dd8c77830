//! Networking: wire protocol, receive buffering and the TCP server loop.

pub mod buffer;
pub mod codec;
pub mod server;

pub use buffer::RecvBuffer;
pub use codec::{
    decode_client, decode_server, snapshot_len, ClientMessage, DecodeError, RosterEntry,
    ServerMessage, Snapshot, PROTOCOL_VERSION,
};
pub use server::{GameServer, ServerConfig, ServerError};
