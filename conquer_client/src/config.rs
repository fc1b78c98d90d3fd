// Client configuration.
//
// Endpoint host/ports are injected once, when the channels are built; the
// core never reads the environment itself (the `conquer-bot` binary maps
// CLI flags and `CONQUER_*` variables onto this struct). Timing constants
// live here too so tests can shrink them.

use std::time::Duration;

use crate::error::ClientError;

/// Default matchmaker port (the server's `--matchmaker-port` default).
pub const DEFAULT_MATCHMAKING_PORT: u16 = 9437;

/// Default game server port (the server's `--games-server-port` default).
pub const DEFAULT_GAME_PORT: u16 = 9438;

/// Queue heartbeat period. The matchmaker drops players after 30 s of silence.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// A cell is claimed only when held strictly longer than this.
pub const CLAIM_HOLD_THRESHOLD: Duration = Duration::from_millis(1000);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub host: String,
    pub matchmaking_port: u16,
    pub game_port: u16,
    pub heartbeat_interval: Duration,
    pub claim_hold_threshold: Duration,
    /// How long the transport's I/O thread blocks in a read before checking
    /// for outbound frames.
    pub read_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            matchmaking_port: DEFAULT_MATCHMAKING_PORT,
            game_port: DEFAULT_GAME_PORT,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            claim_hold_threshold: CLAIM_HOLD_THRESHOLD,
            read_timeout: Duration::from_millis(20),
        }
    }
}

impl ClientConfig {
    pub fn matchmaking_url(&self) -> String {
        format!("ws://{}:{}", self.host, self.matchmaking_port)
    }

    pub fn game_url(&self) -> String {
        format!("ws://{}:{}", self.host, self.game_port)
    }

    /// Reject configurations that can never connect.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Config("host is empty".into()));
        }
        if self.matchmaking_port == 0 || self.game_port == 0 {
            return Err(ClientError::Config("ports must be non-zero".into()));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ClientError::Config("heartbeat interval must be non-zero".into()));
        }
        if self.read_timeout.is_zero() {
            // A zero read timeout is rejected by `TcpStream::set_read_timeout`.
            return Err(ClientError::Config("read timeout must be non-zero".into()));
        }
        Ok(())
    }
}
