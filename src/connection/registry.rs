use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::driver::TunnelDriver;
use super::types::{Connection, ConnectionDto, ConnectionState};
use crate::error::{VpnctlError, VpnctlResult};
use crate::events::{EventBus, RegistryEvent};
use crate::profile::{Profile, ProfileStore, TunnelType};
use crate::validation;

/// Default upper bound for a driver handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound for a driver teardown
pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeouts applied around driver calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySettings {
    pub connect_timeout: Duration,
    pub disconnect_timeout: Duration,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            disconnect_timeout: DEFAULT_DISCONNECT_TIMEOUT,
        }
    }
}

/// Driver that may still hold a tunnel for one connection
///
/// Every driver call for the connection is made with this lock held, so a
/// teardown and a newer handshake never interleave. Lock order is slot
/// first, registry second; the registry lock is never held while waiting
/// for a slot.
type TunnelSlot = Arc<Mutex<Option<Arc<dyn TunnelDriver>>>>;

/// Registry slot for one connection
struct ConnectionEntry {
    connection: Connection,
    /// Bumped whenever a transition starts; a commit whose generation no
    /// longer matches was superseded and must not touch the entry.
    generation: u64,
    /// Cancels the pending connect attempt, if any
    cancel_tx: Option<oneshot::Sender<()>>,
    /// Kept apart from the profile so teardown works after the profile is deleted
    tunnel: TunnelSlot,
}

impl ConnectionEntry {
    fn new(connection: Connection) -> Self {
        Self {
            connection,
            generation: 0,
            cancel_tx: None,
            tunnel: Arc::new(Mutex::new(None)),
        }
    }

    /// Signal the pending connect attempt (if any) to give up
    fn cancel_pending(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            if cancel_tx.send(()).is_err() {
                debug!(
                    "Connect attempt for {} already finished, nothing to cancel",
                    self.connection.id
                );
            }
        }
    }

    /// Apply a state change and publish it
    fn set_state(
        &mut self,
        events: &EventBus,
        state: ConnectionState,
        last_error: Option<String>,
    ) -> ConnectionDto {
        let connection = &mut self.connection;
        connection.state = state;
        connection.started_at = (state == ConnectionState::Connected).then(Instant::now);
        connection.last_error = last_error;

        let dto = connection.to_dto();
        events.publish(RegistryEvent::ConnectionChanged {
            connection: dto.clone(),
        });
        dto
    }
}

/// A connect attempt that has started but not yet resolved
///
/// The attempt runs on its own task and always resolves to `connected` or
/// `error` (or is superseded), whether or not anyone waits for it.
pub struct PendingConnect {
    connection: ConnectionDto,
    handle: JoinHandle<VpnctlResult<ConnectionDto>>,
}

impl PendingConnect {
    /// Snapshot taken when the connection entered `connecting`
    pub fn connection(&self) -> &ConnectionDto {
        &self.connection
    }

    /// Wait for the attempt to resolve
    pub async fn wait(self) -> VpnctlResult<ConnectionDto> {
        self.handle.await.map_err(|e| {
            VpnctlError::ServiceError(format!(
                "connect task for {} failed: {}",
                self.connection.id, e
            ))
        })?
    }
}

/// Connection Registry - one state machine per connection identifier
///
/// All state lives behind a single reader/writer lock. Driver calls are
/// made with the lock released; the lock is re-acquired only to commit the
/// outcome.
#[derive(Clone)]
pub struct ConnectionRegistry {
    /// Connections by caller-chosen id
    connections: Arc<RwLock<HashMap<String, ConnectionEntry>>>,
    /// Tunnel drivers by profile type
    drivers: Arc<HashMap<TunnelType, Arc<dyn TunnelDriver>>>,
    /// Used to resolve profile ids on connect
    profiles: ProfileStore,
    /// Change notifications
    events: EventBus,
    settings: RegistrySettings,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new(profiles: ProfileStore, events: EventBus, settings: RegistrySettings) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            drivers: Arc::new(HashMap::new()),
            profiles,
            events,
            settings,
        }
    }

    /// Register the tunnel driver used for profiles of `tunnel_type`
    ///
    /// Call before cloning the registry; clones made earlier keep the
    /// driver set they were cloned with.
    pub fn register_driver(&mut self, tunnel_type: TunnelType, driver: Arc<dyn TunnelDriver>) {
        info!("Registering tunnel driver {} for {}", driver.name(), tunnel_type);
        Arc::make_mut(&mut self.drivers).insert(tunnel_type, driver);
    }

    /// Check if a driver is registered for a tunnel type
    pub fn has_driver(&self, tunnel_type: TunnelType) -> bool {
        self.drivers.contains_key(&tunnel_type)
    }

    /// Snapshot of all known connections, in no particular order
    pub async fn list(&self) -> Vec<ConnectionDto> {
        let connections = self.connections.read().await;
        connections
            .values()
            .map(|entry| entry.connection.to_dto())
            .collect()
    }

    /// Get a connection by id
    pub async fn get(&self, id: &str) -> Option<ConnectionDto> {
        let connections = self.connections.read().await;
        connections.get(id).map(|entry| entry.connection.to_dto())
    }

    /// Return the connection for `id`, creating it in `disconnected` state
    /// bound to `profile_id` if it does not exist yet
    pub async fn ensure_exists(&self, id: &str, profile_id: &str) -> VpnctlResult<ConnectionDto> {
        validation::validate_connection_id(id)?;
        let mut connections = self.connections.write().await;
        Ok(self
            .ensure_entry(&mut connections, id, profile_id)
            .connection
            .to_dto())
    }

    /// The only place connections are inserted
    fn ensure_entry<'a>(
        &self,
        connections: &'a mut HashMap<String, ConnectionEntry>,
        id: &str,
        profile_id: &str,
    ) -> &'a mut ConnectionEntry {
        connections.entry(id.to_string()).or_insert_with(|| {
            let connection = Connection::new(id, profile_id);
            info!("Created connection {} (profile {})", id, profile_id);
            self.events.publish(RegistryEvent::ConnectionChanged {
                connection: connection.to_dto(),
            });
            ConnectionEntry::new(connection)
        })
    }

    async fn is_current(&self, id: &str, generation: u64) -> bool {
        let connections = self.connections.read().await;
        connections.get(id).map(|entry| entry.generation) == Some(generation)
    }

    /// Commit the outcome of a transition unless a newer one took over
    async fn commit(
        &self,
        id: &str,
        generation: u64,
        outcome: &Result<(), String>,
        success: ConnectionState,
    ) -> Option<ConnectionDto> {
        let mut connections = self.connections.write().await;
        let entry = connections
            .get_mut(id)
            .filter(|entry| entry.generation == generation)?;

        entry.cancel_tx = None;
        Some(match outcome {
            Ok(()) => entry.set_state(&self.events, success, None),
            Err(reason) => entry.set_state(&self.events, ConnectionState::Error, Some(reason.clone())),
        })
    }

    /// Connect and wait for the attempt to resolve
    pub async fn connect(&self, id: &str, profile_id: &str) -> VpnctlResult<ConnectionDto> {
        self.begin_connect(id, profile_id).await?.wait().await
    }

    /// Move the connection to `connecting` and start the driver handshake
    ///
    /// Returns as soon as the `connecting` state is committed. Any pending
    /// attempt for the same id is superseded.
    pub async fn begin_connect(&self, id: &str, profile_id: &str) -> VpnctlResult<PendingConnect> {
        validation::validate_connection_id(id)?;
        if profile_id.trim().is_empty() {
            return Err(VpnctlError::InvalidParameter("profileId required".to_string()));
        }

        let profile = self
            .profiles
            .get(profile_id)
            .await
            .ok_or_else(|| VpnctlError::NotFound(format!("profile {} not found", profile_id)))?;

        let driver = self.drivers.get(&profile.tunnel_type).cloned().ok_or_else(|| {
            VpnctlError::NotSupported(format!(
                "no tunnel driver registered for {}",
                profile.tunnel_type
            ))
        })?;

        let (cancel_tx, cancel_rx) = oneshot::channel();

        let (generation, tunnel, snapshot) = {
            let mut connections = self.connections.write().await;
            let entry = self.ensure_entry(&mut connections, id, profile_id);

            entry.cancel_pending();
            entry.generation += 1;
            entry.cancel_tx = Some(cancel_tx);
            entry.connection.profile_id = profile_id.to_string();
            let snapshot = entry.set_state(&self.events, ConnectionState::Connecting, None);
            (entry.generation, entry.tunnel.clone(), snapshot)
        };

        info!(
            "Connecting {} with profile {} via {}",
            id,
            profile_id,
            driver.name()
        );

        let registry = self.clone();
        let connection_id = id.to_string();
        let handle = tokio::spawn(async move {
            registry
                .complete_connect(connection_id, generation, driver, profile, tunnel, cancel_rx)
                .await
        });

        Ok(PendingConnect {
            connection: snapshot,
            handle,
        })
    }

    /// Drive the handshake with the registry lock released, then commit
    ///
    /// Tearing down whatever tunnel an earlier transition left behind is part
    /// of the attempt, so it is bounded by the connect timeout and aborted
    /// by a cancel like the handshake itself.
    async fn complete_connect(
        self,
        id: String,
        generation: u64,
        driver: Arc<dyn TunnelDriver>,
        profile: Profile,
        tunnel: TunnelSlot,
        cancel_rx: oneshot::Receiver<()>,
    ) -> VpnctlResult<ConnectionDto> {
        let attempt = async {
            let mut slot = tunnel.lock_owned().await;
            if !self.is_current(&id, generation).await {
                return (slot, Err("superseded before the handshake".to_string()));
            }

            if let Some(previous) = (*slot).clone() {
                if let Err(reason) = self.teardown(&id, &previous).await {
                    return (slot, Err(format!("previous tunnel still up: {}", reason)));
                }
            }

            // From here on the driver may hold a tunnel even if the handshake is dropped
            *slot = Some(driver.clone());
            let result = driver.connect(&id, &profile).await.map_err(|e| e.to_string());
            (slot, result)
        };

        let timeout = self.settings.connect_timeout;
        let (slot, outcome) = tokio::select! {
            result = tokio::time::timeout(timeout, attempt) => match result {
                Ok((slot, outcome)) => (Some(slot), outcome),
                Err(_) => (None, Err(format!("handshake timed out after {:?}", timeout))),
            },
            _ = cancel_rx => (None, Err("connect cancelled".to_string())),
        };

        // The slot stays locked until the outcome is committed
        let committed = self
            .commit(&id, generation, &outcome, ConnectionState::Connected)
            .await;
        drop(slot);

        match (committed, outcome) {
            (Some(connection), Ok(())) => {
                info!("Connection {} connected", id);
                Ok(connection)
            }
            (Some(_), Err(reason)) => {
                error!("Connection {} failed: {}", id, reason);
                Err(VpnctlError::ConnectionFailed { reason })
            }
            (None, _) => {
                debug!("Connect attempt {} for {} superseded", generation, id);
                Err(VpnctlError::Cancelled(format!(
                    "connect for {} superseded by a newer transition",
                    id
                )))
            }
        }
    }

    /// Bounded driver teardown; the caller holds the tunnel slot
    async fn teardown(&self, id: &str, driver: &Arc<dyn TunnelDriver>) -> Result<(), String> {
        let timeout = self.settings.disconnect_timeout;
        match tokio::time::timeout(timeout, driver.disconnect(id)).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("teardown timed out after {:?}", timeout)),
        }
    }

    /// Signal a pending connect attempt to give up
    ///
    /// The attempt resolves to `error` unless the handshake already
    /// finished, in which case it resolves to `connected`.
    pub async fn cancel(&self, id: &str) -> VpnctlResult<ConnectionDto> {
        let mut connections = self.connections.write().await;
        let entry = connections
            .get_mut(id)
            .ok_or_else(|| VpnctlError::NotFound(format!("connection {} not found", id)))?;

        if entry.connection.state != ConnectionState::Connecting {
            return Err(VpnctlError::InvalidState(format!(
                "connection {} is {}, not connecting",
                id, entry.connection.state
            )));
        }

        info!("Cancelling connect for {}", id);
        entry.cancel_pending();
        Ok(entry.connection.to_dto())
    }

    /// Tear the connection down
    ///
    /// Returns `Ok(None)` when `id` is unknown.
    pub async fn disconnect(&self, id: &str) -> VpnctlResult<Option<ConnectionDto>> {
        let (generation, previous, tunnel) = {
            let mut connections = self.connections.write().await;
            let Some(entry) = connections.get_mut(id) else {
                debug!("Disconnect of unknown connection {}", id);
                return Ok(None);
            };

            entry.cancel_pending();
            entry.generation += 1;
            let previous = entry.connection.state;
            entry.set_state(&self.events, ConnectionState::Disconnecting, None);
            (entry.generation, previous, entry.tunnel.clone())
        };

        info!("Disconnecting {} (was {})", id, previous);

        let attempt = async {
            let mut slot = tunnel.lock_owned().await;
            if !self.is_current(id, generation).await {
                // The newer transition deals with the tunnel
                return (slot, Ok(()));
            }
            let outcome = match (*slot).clone() {
                Some(driver) => driver.disconnect(id).await.map_err(|e| e.to_string()),
                None => Ok(()),
            };
            if outcome.is_ok() {
                *slot = None;
            }
            (slot, outcome)
        };

        let timeout = self.settings.disconnect_timeout;
        let (slot, outcome) = match tokio::time::timeout(timeout, attempt).await {
            Ok((slot, outcome)) => (Some(slot), outcome),
            Err(_) => (None, Err(format!("teardown timed out after {:?}", timeout))),
        };

        let committed = self
            .commit(id, generation, &outcome, ConnectionState::Disconnected)
            .await;
        drop(slot);

        match (committed, outcome) {
            (Some(connection), Ok(())) => {
                info!("Connection {} disconnected", id);
                Ok(Some(connection))
            }
            (Some(_), Err(reason)) => {
                error!("Disconnect of {} failed: {}", id, reason);
                Err(VpnctlError::ConnectionFailed { reason })
            }
            (None, _) => {
                debug!("Disconnect of {} superseded", id);
                Err(VpnctlError::Cancelled(format!(
                    "disconnect of {} superseded by a newer transition",
                    id
                )))
            }
        }
    }

    /// Disconnect every connection that has or is acquiring a tunnel
    ///
    /// Every connection is attempted; failures are logged and reported
    /// together at the end.
    pub async fn disconnect_all(&self) -> VpnctlResult<()> {
        let ids: Vec<String> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .filter(|entry| entry.connection.state != ConnectionState::Disconnected)
                .map(|entry| entry.connection.id.clone())
                .collect()
        };

        let mut failed = 0usize;
        for id in &ids {
            if let Err(e) = self.disconnect(id).await {
                warn!("Failed to disconnect {}: {}", id, e);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(VpnctlError::ServiceError(format!(
                "failed to disconnect {} of {} connection(s)",
                failed,
                ids.len()
            )));
        }
        Ok(())
    }
}
