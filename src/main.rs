use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tilegame_client::client::{ClientCore, GameClient};
use tilegame_client::config::ClientConfig;
use tilegame_client::game::input::Keystroke;
use tilegame_client::game::tiles::parse_grid;
use tilegame_client::net::transport::ws::WsTransport;
use tilegame_client::net::transport::Transport;
use tilegame_client::ui::{RenderTarget, SnapshotRenderer, StatusSink, TracingStatus};

/// Transport events buffered between the socket tasks and the client
const EVENT_QUEUE: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Tile game client v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ClientConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: server={}, tick_rate={}, frame_rate={}",
        config.server_url, config.tick_rate, config.frame_rate
    );

    let started = Instant::now();
    let (transport, mut events) = WsTransport::new(EVENT_QUEUE);
    let mut client = GameClient::new(
        &config,
        transport,
        TracingStatus::default(),
        SnapshotRenderer::new(),
        Duration::ZERO,
    );

    if let Some(path) = &config.map_path {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading map {}", path.display()))?;
        let grid = parse_grid(&text)?;
        client.load_map(&grid)?;
        let (width, height) = client.world().dimensions();
        info!("Map loaded from {} ({}x{})", path.display(), width, height);
    }

    client.connect(&config.server_url);

    let mut frames = tokio::time::interval(config.frame_interval());
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    // Shutdown signal handler
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Type to chat; ':wasd' toggles held movement keys; ':quit' exits");

    // All client mutation happens on this one task
    loop {
        tokio::select! {
            _ = frames.tick() => client.game_loop(started.elapsed()),
            Some(event) = events.recv() => client.handle_transport(event, started.elapsed()),
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !handle_line(&mut client, &line) {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("stdin closed: {}", e);
                    stdin_open = false;
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    client.disconnect();
    // Let the socket task send its close frame
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!("Client stopped");
    Ok(())
}

/// Apply one line of stdin; returns false to quit
fn handle_line<T, S, R>(client: &mut GameClient<T, S, R>, line: &str) -> bool
where
    T: Transport,
    S: StatusSink,
    R: RenderTarget,
{
    let Some(keys) = line.strip_prefix(':') else {
        client.handle_text_entry(line);
        return true;
    };
    if keys.trim() == "quit" {
        return false;
    }

    for c in keys.chars().filter(|c| !c.is_whitespace()) {
        let key = Keystroke::char(c);
        if key.code.movement().is_none() {
            warn!("'{}' is not a movement key", c);
            continue;
        }
        let held = client.router().held_keys().contains(&key.code);
        if held {
            client.handle_keyup(key);
        } else {
            client.handle_keydown(key);
        }
    }
    true
}
