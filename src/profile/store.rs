use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::types::{CreateProfileRequest, Profile, TunnelType, UpdateProfileRequest};
use crate::error::{VpnctlError, VpnctlResult};
use crate::events::{EventBus, RegistryEvent};
use crate::validation;

/// Profile Store - CRUD registry of tunnel profiles keyed by identifier
///
/// Cloning the store yields another handle onto the same table.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    /// Profiles by id
    profiles: Arc<RwLock<HashMap<String, Profile>>>,
    /// Change notifications
    events: EventBus,
}

impl ProfileStore {
    /// Create an empty profile store
    pub fn new(events: EventBus) -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    /// Snapshot of all profiles, in no particular order
    pub async fn list(&self) -> Vec<Profile> {
        let profiles = self.profiles.read().await;
        profiles.values().cloned().collect()
    }

    /// Get a profile by id
    pub async fn get(&self, id: &str) -> Option<Profile> {
        let profiles = self.profiles.read().await;
        profiles.get(id).cloned()
    }

    /// Create a profile with a freshly generated id
    pub async fn create(&self, req: CreateProfileRequest) -> VpnctlResult<Profile> {
        if req.name.trim().is_empty() || req.tunnel_type.trim().is_empty() {
            return Err(VpnctlError::Validation("name and type required".to_string()));
        }
        validation::validate_profile_name(&req.name)?;
        validation::validate_config_payload(&req.config)?;
        let tunnel_type: TunnelType = req.tunnel_type.parse()?;

        let profile = Profile {
            id: uuid::Uuid::new_v4().to_string(),
            name: req.name,
            tunnel_type,
            config: req.config,
        };

        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            return Err(VpnctlError::Conflict(format!(
                "profile {} already exists",
                profile.id
            )));
        }
        profiles.insert(profile.id.clone(), profile.clone());
        self.events.publish(RegistryEvent::ProfileCreated {
            profile: profile.clone(),
        });
        info!("Created profile {} ({}, {})", profile.id, profile.name, tunnel_type);

        Ok(profile)
    }

    /// Apply the fields present in `req` to an existing profile
    pub async fn update(&self, id: &str, req: UpdateProfileRequest) -> VpnctlResult<Profile> {
        if let Some(name) = &req.name {
            validation::validate_profile_name(name)?;
        }
        if let Some(config) = &req.config {
            validation::validate_config_payload(config)?;
        }

        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| VpnctlError::NotFound(format!("profile {} not found", id)))?;

        if let Some(name) = req.name {
            profile.name = name;
        }
        if let Some(config) = req.config {
            profile.config = config;
        }

        let updated = profile.clone();
        self.events.publish(RegistryEvent::ProfileUpdated {
            profile: updated.clone(),
        });
        info!("Updated profile {}", id);

        Ok(updated)
    }

    /// Remove a profile; returns whether anything was removed
    pub async fn delete(&self, id: &str) -> bool {
        let mut profiles = self.profiles.write().await;
        if profiles.remove(id).is_some() {
            self.events.publish(RegistryEvent::ProfileDeleted { id: id.to_string() });
            info!("Deleted profile {}", id);
            true
        } else {
            debug!("Delete of unknown profile {} ignored", id);
            false
        }
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}
