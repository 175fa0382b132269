//! vpnctl - VPN Client Control Library
//!
//! Async control plane for a VPN client:
//! - Profile Store (named tunnel configurations)
//! - Connection Registry (per-connection state machine driving a tunnel driver)
//! - Event bus carrying every committed registry change
//! - HTTP/JSON and WebSocket gateway (axum)
//!
//! Tunnel establishment itself lives behind the [`TunnelDriver`] trait.

pub mod error;
pub mod validation;
pub mod events;
pub mod config;
pub mod profile;
pub mod connection;
pub mod api;

// Re-export commonly used types
pub use error::{VpnctlError, VpnctlResult};
pub use events::{EventBus, RegistryEvent};
pub use config::DaemonConfig;
pub use profile::{
    CreateProfileRequest, Profile, ProfileStore, TunnelType, UpdateProfileRequest,
};
pub use connection::{
    ConnectRequest, Connection, ConnectionDto, ConnectionRegistry, ConnectionState,
    PendingConnect, RegistrySettings, SimulatedDriver, TunnelDriver,
};
pub use api::AppState;
