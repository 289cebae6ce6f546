//! Saved network configurations
//!
//! Persistence is somebody else's job; this module only reads what the
//! operating system already stores and reduces it to identities and flags.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::KnownNetworksError;
use crate::scanner::{ScanResultMatchInfo, SecurityType};

/// A stored network configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SavedNetwork {
    pub network_id: i32,
    pub ssid: String,
    pub security: SecurityType,
    pub is_passpoint: bool,
    pub is_ephemeral: bool,
    pub is_trusted: bool,
    pub last_connected: Option<DateTime<Utc>>,
}

impl SavedNetwork {
    pub fn new(network_id: i32, ssid: &str, security: SecurityType) -> Self {
        Self {
            network_id,
            ssid: ssid.to_string(),
            security,
            is_passpoint: false,
            is_ephemeral: false,
            is_trusted: true,
            last_connected: None,
        }
    }

    pub fn identity(&self) -> ScanResultMatchInfo {
        ScanResultMatchInfo::new(&self.ssid, self.security)
    }
}

/// Anything that can list saved networks
pub trait SavedNetworkSource {
    fn saved_networks(&self) -> Result<Vec<SavedNetwork>, KnownNetworksError>;

    fn saved_identities(&self) -> Result<HashSet<ScanResultMatchInfo>, KnownNetworksError> {
        Ok(self
            .saved_networks()?
            .iter()
            .map(SavedNetwork::identity)
            .collect())
    }
}

impl SavedNetworkSource for Vec<SavedNetwork> {
    fn saved_networks(&self) -> Result<Vec<SavedNetwork>, KnownNetworksError> {
        Ok(self.clone())
    }
}

/// Saved networks matching part of [`crate::scanner::demo_scan_results`]
pub fn demo_saved_networks() -> Vec<SavedNetwork> {
    vec![
        SavedNetwork::new(0, "\"HomeNet\"", SecurityType::Psk),
        SavedNetwork::new(1, "CoffeeShop_Free", SecurityType::Open),
        SavedNetwork::new(2, "Library_Public", SecurityType::Open),
        SavedNetwork::new(3, "Office", SecurityType::Eap),
        SavedNetwork::new(4, "Neighbor_6G", SecurityType::Sae),
    ]
}

/// macOS `com.apple.wifi.known-networks.plist`
#[derive(Debug, Clone)]
pub struct KnownNetworksPlist {
    path: PathBuf,
}

impl KnownNetworksPlist {
    pub const SYSTEM_PATH: &'static str = "/Library/Preferences/com.apple.wifi.known-networks.plist";

    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SavedNetworkSource for KnownNetworksPlist {
    fn saved_networks(&self) -> Result<Vec<SavedNetwork>, KnownNetworksError> {
        let file = std::fs::File::open(&self.path)?;
        let networks = read_known_networks(file)?;
        tracing::debug!(path = %self.path.display(), count = networks.len(), "loaded known networks");
        Ok(networks)
    }
}

/// Parse a known-networks plist. Entries without an SSID or a recognizable
/// security type are skipped; network ids follow file order.
pub fn read_known_networks<R: Read + Seek>(reader: R) -> Result<Vec<SavedNetwork>, KnownNetworksError> {
    let plist: plist::Value = plist::from_reader(reader)?;
    let mut networks = Vec::new();

    // Modern format has networks keyed by identifier
    let Some(dict) = plist.as_dictionary() else {
        return Ok(networks);
    };

    for (key, value) in dict {
        let Some(network_dict) = value.as_dictionary() else {
            continue;
        };

        let ssid = network_dict
            .get("SSIDString")
            .and_then(|v| v.as_string())
            .or_else(|| network_dict.get("SSID").and_then(|v| v.as_string()));
        let Some(ssid) = ssid else {
            tracing::debug!(entry = %key, "known network without SSID");
            continue;
        };

        let security = network_dict
            .get("SupportedSecurityTypes")
            .or_else(|| network_dict.get("SecurityType"))
            .and_then(|v| v.as_string())
            .and_then(security_from_description);
        let Some(security) = security else {
            tracing::debug!(ssid, "known network without usable security type");
            continue;
        };

        let last_connected = network_dict
            .get("LastConnected")
            .and_then(|v| v.as_date())
            .map(|d| DateTime::<Utc>::from(SystemTime::from(d)));

        let mut network = SavedNetwork::new(networks.len() as i32, ssid, security);
        network.is_passpoint = network_dict
            .get("Passpoint")
            .and_then(|v| v.as_boolean())
            .unwrap_or(false);
        network.last_connected = last_connected;
        networks.push(network);
    }

    Ok(networks)
}

/// Map a human-readable security label ("WPA2 Personal", "Open", ...) to a type
pub fn security_from_description(description: &str) -> Option<SecurityType> {
    let d = description.to_lowercase();

    if d.contains("enhanced open") || d.contains("owe") {
        Some(SecurityType::Owe)
    } else if d.contains("open") || d == "none" {
        Some(SecurityType::Open)
    } else if d.contains("wep") {
        Some(SecurityType::Wep)
    } else if d.contains("192") {
        Some(SecurityType::EapSuiteB)
    } else if d.contains("enterprise") || d.contains("eap") || d.contains("802.1x") {
        Some(SecurityType::Eap)
    } else if d.contains("wpa3") || d.contains("sae") {
        Some(SecurityType::Sae)
    } else if d.contains("wpa") || d.contains("personal") || d.contains("psk") {
        Some(SecurityType::Psk)
    } else {
        None
    }
}
