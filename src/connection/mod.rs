//! Connection Registry
//!
//! Tracks one state machine per caller-chosen connection id and drives the
//! tunnel driver registered for the bound profile's type.
//!
//! ```text
//!   disconnected ──connect──▶ connecting ──driver ok──▶ connected
//!        ▲                        │                        │
//!        │                 driver err/timeout/cancel   disconnect
//!        │                        ▼                        ▼
//!        └──────driver ok─── disconnecting ◀──────────── (any)
//!                                 │
//!                            driver err ──▶ error
//! ```
//!
//! Transitions are split into a fast "begin" step committed under the
//! registry lock and a completion task that calls the driver with the lock
//! released, so `connecting`/`disconnecting` are visible to concurrent
//! readers.

pub mod driver;
pub mod registry;
pub mod types;

pub use driver::{SimulatedDriver, TunnelDriver};
pub use registry::{ConnectionRegistry, PendingConnect, RegistrySettings};
pub use types::{ConnectRequest, Connection, ConnectionDto, ConnectionState};
