// Headless Draw & Conquer bot.
//
// Drives a real `Client` against running matchmaking and game servers:
// connect, enqueue under `--name`, and once a game starts keep claiming the
// first open cell by holding it a little longer than the claim threshold.
// When a winner is declared the ranked scoreboard is logged; after
// `--games` finished games the bot exits. An abandoned session (or a lost
// game connection) sends the bot back to the queue.
//
// Usage:
//   conquer-bot --name <NAME> [--host <HOST>] [--matchmaker-port <PORT>]
//               [--game-port <PORT>] [--games <N>] [--hold-margin-ms <MS>]
//
// Host, ports and name fall back to `CONQUER_HOST`,
// `CONQUER_MATCHMAKER_PORT`, `CONQUER_GAME_PORT`, `CONQUER_NAME`. Log
// verbosity follows `RUST_LOG` (default `info`).

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use conquer_client::config::{DEFAULT_GAME_PORT, DEFAULT_MATCHMAKING_PORT};
use conquer_client::{ChannelKind, Client, ClientConfig, ClientEvent, Mode, Scoreboard};

#[derive(Parser, Debug)]
#[command(name = "conquer-bot", version, about = "Headless Draw & Conquer player")]
struct Args {
    /// Display name sent with `enqueue`.
    #[arg(long, env = "CONQUER_NAME", default_value = "bot")]
    name: String,
    #[arg(long, env = "CONQUER_HOST", default_value = "127.0.0.1")]
    host: String,
    #[arg(long, env = "CONQUER_MATCHMAKER_PORT", default_value_t = DEFAULT_MATCHMAKING_PORT)]
    matchmaker_port: u16,
    #[arg(long, env = "CONQUER_GAME_PORT", default_value_t = DEFAULT_GAME_PORT)]
    game_port: u16,
    /// Finished games to play before exiting.
    #[arg(long, default_value_t = 1)]
    games: u32,
    /// How much longer than the claim threshold to hold each cell.
    #[arg(long, default_value_t = 100)]
    hold_margin_ms: u64,
    /// Main loop tick.
    #[arg(long, default_value_t = 20)]
    tick_ms: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = ClientConfig {
        host: args.host.clone(),
        matchmaking_port: args.matchmaker_port,
        game_port: args.game_port,
        ..ClientConfig::default()
    };
    let hold_for = config.claim_hold_threshold + Duration::from_millis(args.hold_margin_ms);
    let tick = Duration::from_millis(args.tick_ms.max(1));

    let mut client = Client::websocket(config).context("invalid client configuration")?;
    info!("player {} connecting as {:?}", client.player_id(), args.name);
    client.start();

    let mut games_won_or_lost = 0;
    loop {
        let now = Instant::now();
        for event in client.pump(now) {
            match event {
                ClientEvent::ChannelOpened(ChannelKind::Matchmaking) => {
                    if let Err(e) = client.enqueue(&args.name) {
                        warn!("enqueue failed: {e}");
                    }
                }
                ClientEvent::QueueLength(n) => info!("{n} players in queue"),
                ClientEvent::QueueRejected(error) => warn!("queue request rejected: {error}"),
                ClientEvent::QueueTimedOut => {
                    warn!("dropped from queue, re-enqueueing");
                    if let Err(e) = client.enqueue(&args.name) {
                        warn!("enqueue failed: {e}");
                    }
                }
                ClientEvent::GameStarted {
                    session_id,
                    board_len,
                } => info!("joined game {session_id} ({board_len} cells)"),
                ClientEvent::ColourAssigned(colour) => info!("playing as {colour}"),
                ClientEvent::SessionAbandoned(reason) => {
                    warn!("session abandoned ({reason:?}), back to the queue");
                }
                ClientEvent::GameWon(_) => {
                    if let Some(scoreboard) = client.scoreboard() {
                        log_scoreboard(&scoreboard);
                    }
                    games_won_or_lost += 1;
                    if games_won_or_lost >= args.games {
                        return Ok(());
                    }
                    client.return_to_queue();
                }
                ClientEvent::ChannelClosed(ChannelKind::Matchmaking) => {
                    if client.mode() == Mode::Queue {
                        bail!("matchmaking server closed the connection");
                    }
                }
                ClientEvent::ChannelClosed(ChannelKind::Game) => {
                    warn!("game connection lost, back to the queue");
                    client.return_to_queue();
                }
                ClientEvent::ChannelOpened(ChannelKind::Game) => {
                    info!("connected to the game server");
                }
                ClientEvent::RosterUpdated { .. } | ClientEvent::CellChanged { .. } => {}
            }
        }

        if client.mode() == Mode::Game {
            play(&mut client, now, hold_for);
        }
        thread::sleep(tick);
    }
}

/// One step of the claiming strategy: release a held cell once it has been
/// held for `hold_for`, otherwise start holding the first open cell.
fn play(client: &mut Client, now: Instant, hold_for: Duration) {
    let ready = client.is_channel_open(ChannelKind::Game)
        && client.session().is_some_and(|s| s.own_colour().is_some());
    if !ready {
        return;
    }
    let Some(board) = client.board() else {
        return;
    };
    match board.gesture() {
        Some(gesture) if now.saturating_duration_since(gesture.started_at) >= hold_for => {
            client.pointer_up(now);
        }
        Some(_) => {}
        None => {
            if let Some(index) = board.cells().iter().position(|cell| cell.is_open()) {
                client.pointer_down(index, now);
            }
        }
    }
}

fn log_scoreboard(scoreboard: &Scoreboard) {
    let winner = &scoreboard.winner;
    info!("winner: {} ({})", winner.name, winner.colour);
    for ranked in &scoreboard.rows {
        let marker = if ranked.is_self { " <- you" } else { "" };
        info!(
            "#{} {:<16} {:<8} {:>3}/{}{marker}",
            ranked.rank,
            ranked.row.name,
            ranked.row.colour.as_str(),
            ranked.row.score,
            scoreboard.board_len,
        );
    }
}
