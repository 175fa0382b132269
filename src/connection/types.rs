use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Connection state machine states
///
/// `disconnected -> connecting -> connected -> disconnecting -> disconnected`,
/// with `error` reachable from any in-flight transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Runtime state of one connection slot
#[derive(Debug, Clone)]
pub struct Connection {
    /// Caller-chosen slot identifier
    pub id: String,
    /// Bound profile (not owned; may dangle after the profile is deleted)
    pub profile_id: String,
    pub state: ConnectionState,
    /// Set on entering `connected`, cleared on leaving it
    pub started_at: Option<Instant>,
    /// Failure reason of the last transition that landed in `error`
    pub last_error: Option<String>,
}

impl Connection {
    /// New connection in `disconnected` state
    pub fn new(id: impl Into<String>, profile_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            profile_id: profile_id.into(),
            state: ConnectionState::Disconnected,
            started_at: None,
            last_error: None,
        }
    }

    /// Whole seconds since the tunnel came up, zero unless connected
    pub fn uptime_seconds(&self) -> u64 {
        match (self.state, self.started_at) {
            (ConnectionState::Connected, Some(started)) => started.elapsed().as_secs(),
            _ => 0,
        }
    }

    pub fn to_dto(&self) -> ConnectionDto {
        ConnectionDto {
            id: self.id.clone(),
            profile_id: self.profile_id.clone(),
            state: self.state,
            uptime_seconds: self.uptime_seconds(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Serialized shape of a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDto {
    pub id: String,
    pub profile_id: String,
    pub state: ConnectionState,
    pub uptime_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Body of a connect request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectRequest {
    pub profile_id: String,
}
