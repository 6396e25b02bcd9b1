//! Runtime configuration
//!
//! Plain values handed in by whatever loads the application's
//! configuration. Every struct deserializes with serde and falls back to
//! defaults for missing fields; durations are given in milliseconds.

use std::time::Duration;

use eppkit_protocol::DEFAULT_MAX_FRAME_SIZE;
use serde::{Deserialize, Serialize};

/// How a session pairs commands with responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// One command, then wait for its response
    #[default]
    Sync,

    /// Send several commands, read the responses later in send order
    Async,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Sync => write!(f, "sync"),
            SessionMode::Async => write!(f, "async"),
        }
    }
}

/// Per-session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Initial mode
    pub mode: SessionMode,

    /// How long a read or a write to the transport waits before failing the session
    pub read_timeout_ms: u64,

    /// Prefix for generated client transaction ids (`<prefix>-<counter>`)
    pub cltrid_prefix: String,

    /// Capacity of the document channels between session and transport
    pub channel_capacity: usize,

    /// Largest frame the transport accepts
    pub max_frame_size: usize,
}

impl SessionConfig {
    #[inline]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_cltrid_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cltrid_prefix = prefix.into();
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::Sync,
            read_timeout_ms: 30_000,
            cltrid_prefix: "EPPKIT".to_owned(),
            channel_capacity: 32,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Pool sizing and validation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Sessions `prewarm` opens ahead of demand
    pub min_idle: usize,

    /// Returned sessions beyond this many idle ones are torn down
    pub max_idle: usize,

    /// Upper bound on idle + borrowed sessions
    pub max_active: usize,

    /// Probe idle sessions with `<hello>` before handing them out
    pub validate_on_borrow: bool,

    /// Idle sessions unused for longer than this are evicted
    pub idle_timeout_ms: Option<u64>,

    /// Sessions older than this are evicted instead of reused
    pub max_session_age_ms: Option<u64>,
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }

    pub fn max_session_age(&self) -> Option<Duration> {
        self.max_session_age_ms.map(Duration::from_millis)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_idle: 0,
            max_idle: 4,
            max_active: 4,
            validate_on_borrow: true,
            idle_timeout_ms: None,
            max_session_age_ms: None,
        }
    }
}

/// Login credentials
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub client_id: String,
    pub password: String,
    /// Sent once as `<newPW>` to change the password at login
    pub new_password: Option<String>,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            password: password.into(),
            new_password: None,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("password", &"<redacted>")
            .field("new_password", &self.new_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything needed to run a pool of TCP sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port` of the EPP server
    pub address: String,
    pub credentials: Credentials,
    pub session: SessionConfig,
    pub pool: PoolConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: "localhost:700".to_owned(),
            credentials: Credentials::default(),
            session: SessionConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}
