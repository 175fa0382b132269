use crate::error::{VpnctlError, VpnctlResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tunnel protocol discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelType {
    WireGuard,
    OpenVpn,
}

impl TunnelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelType::WireGuard => "wireguard",
            TunnelType::OpenVpn => "openvpn",
        }
    }
}

impl fmt::Display for TunnelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TunnelType {
    type Err = VpnctlError;

    fn from_str(s: &str) -> VpnctlResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(VpnctlError::Validation("type is required".to_string())),
            "wireguard" => Ok(TunnelType::WireGuard),
            "openvpn" => Ok(TunnelType::OpenVpn),
            other => Err(VpnctlError::Validation(format!(
                "unsupported tunnel type '{}' (expected one of: wireguard, openvpn)",
                other
            ))),
        }
    }
}

/// Stored tunnel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tunnel_type: TunnelType,
    /// Raw configuration text, not interpreted yet
    pub config: String,
}

/// Payload for profile creation
///
/// Missing fields decode as empty strings so that they are reported as
/// validation failures rather than malformed bodies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateProfileRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub tunnel_type: String,
    pub config: String,
}

/// Payload for profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub config: Option<String>,
}
