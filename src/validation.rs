//! Input validation
//!
//! Checks applied to caller-supplied identifiers and profile fields before
//! they reach the registries.

use crate::error::{VpnctlError, VpnctlResult};

/// Maximum length for profile display names
const MAX_PROFILE_NAME_LEN: usize = 128;

/// Maximum size of a raw profile configuration payload (64 KiB)
const MAX_CONFIG_PAYLOAD_LEN: usize = 64 * 1024;

/// Maximum length for caller-chosen connection identifiers
const MAX_CONNECTION_ID_LEN: usize = 64;

/// Validate a profile display name
///
/// Names must be non-empty after trimming, at most 128 characters and free
/// of control characters.
pub fn validate_profile_name(name: &str) -> VpnctlResult<()> {
    if name.trim().is_empty() {
        return Err(VpnctlError::Validation("name is required".to_string()));
    }

    if name.chars().count() > MAX_PROFILE_NAME_LEN {
        return Err(VpnctlError::Validation(format!(
            "name too long (max {} characters)",
            MAX_PROFILE_NAME_LEN
        )));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(VpnctlError::Validation(
            "name contains control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate the size of a raw configuration payload
pub fn validate_config_payload(config: &str) -> VpnctlResult<()> {
    if config.len() > MAX_CONFIG_PAYLOAD_LEN {
        return Err(VpnctlError::Validation(format!(
            "config too large ({} bytes, max {})",
            config.len(),
            MAX_CONFIG_PAYLOAD_LEN
        )));
    }
    Ok(())
}

/// Validate a connection identifier
///
/// Identifiers name a connection slot and travel in URL paths, so only
/// ASCII alphanumerics, dash, underscore and dot are accepted.
pub fn validate_connection_id(id: &str) -> VpnctlResult<()> {
    if id.is_empty() {
        return Err(VpnctlError::InvalidParameter(
            "connection id cannot be empty".to_string(),
        ));
    }

    if id.len() > MAX_CONNECTION_ID_LEN {
        return Err(VpnctlError::InvalidParameter(format!(
            "connection id too long (max {} characters)",
            MAX_CONNECTION_ID_LEN
        )));
    }

    for c in id.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
            return Err(VpnctlError::InvalidParameter(format!(
                "invalid connection id '{}': contains invalid character '{}'",
                id, c
            )));
        }
    }

    Ok(())
}
