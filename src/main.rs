//! Harpoon Hunt server binary.
//!
//! Parses the CLI, initializes logging, loads the level and runs the
//! authoritative game server until killed.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use harpoon_hunt::game::level::LevelData;
use harpoon_hunt::{GameServer, ServerConfig, TICK_RATE, VERSION};

#[derive(Parser, Debug)]
#[command(name = "harpoon-hunt-server", version, about = "Authoritative capture-the-treasure game server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 4000)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Level file (JSON); the built-in arena is used when omitted
    #[arg(long)]
    level: Option<PathBuf>,

    /// Simulation ticks per second
    #[arg(long, default_value_t = TICK_RATE)]
    tick_rate: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("harpoon-hunt-server v{}", VERSION);

    let level = match &args.level {
        Some(path) => LevelData::load(path)
            .with_context(|| format!("loading level {}", path.display()))?,
        None => LevelData::default(),
    };

    let config = ServerConfig {
        bind_addr: SocketAddr::new(args.bind, args.port),
        tick_rate: args.tick_rate,
        ..ServerConfig::default()
    };
    info!(addr = %config.bind_addr, tick_rate = config.tick_rate, "starting");

    GameServer::new(config, level).run().await?;
    Ok(())
}
