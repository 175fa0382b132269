use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::VpnctlResult;
use crate::profile::Profile;

/// Interface a tunnel implementation exposes to the connection registry
///
/// The registry never holds its lock across these calls. Implementations may
/// take as long as the handshake needs; the registry bounds every call with
/// its own timeout and may drop the future to cancel it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TunnelDriver: Send + Sync {
    /// Name of this driver (e.g. "wireguard-sim")
    fn name(&self) -> &'static str;

    /// Bring the tunnel for `connection_id` up using `profile`
    async fn connect(&self, connection_id: &str, profile: &Profile) -> VpnctlResult<()>;

    /// Tear the tunnel for `connection_id` down
    async fn disconnect(&self, connection_id: &str) -> VpnctlResult<()>;
}

/// Driver that pretends every handshake succeeds
///
/// Stands in for real tunnel establishment, which this crate does not do.
/// An optional delay makes the `connecting` state observable.
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    name: &'static str,
    handshake_delay: Duration,
}

impl SimulatedDriver {
    pub fn new(name: &'static str, handshake_delay: Duration) -> Self {
        Self {
            name,
            handshake_delay,
        }
    }
}

#[async_trait]
impl TunnelDriver for SimulatedDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn connect(&self, connection_id: &str, profile: &Profile) -> VpnctlResult<()> {
        debug!(
            "[{}] handshake for {} using profile {} ({})",
            self.name, connection_id, profile.id, profile.tunnel_type
        );
        if !self.handshake_delay.is_zero() {
            tokio::time::sleep(self.handshake_delay).await;
        }
        info!("[{}] tunnel {} up", self.name, connection_id);
        Ok(())
    }

    async fn disconnect(&self, connection_id: &str) -> VpnctlResult<()> {
        info!("[{}] tunnel {} down", self.name, connection_id);
        Ok(())
    }
}
