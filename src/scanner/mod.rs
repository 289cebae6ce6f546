mod dump;

pub use dump::{demo_scan_results, parse_scan_dump, parse_security};

use std::fmt;

/// Sentinel for an RSSI that was never measured
pub const UNKNOWN_RSSI: i32 = -127;

/// Sentinel for an unknown center frequency
pub const UNKNOWN_FREQUENCY: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SecurityType {
    Open,
    Owe,
    Wep,
    Psk,
    Sae,
    Eap,
    EapSuiteB,
}

impl SecurityType {
    pub fn is_open(self) -> bool {
        matches!(self, SecurityType::Open)
    }
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityType::Open => write!(f, "Open"),
            SecurityType::Owe => write!(f, "OWE"),
            SecurityType::Wep => write!(f, "WEP"),
            SecurityType::Psk => write!(f, "PSK"),
            SecurityType::Sae => write!(f, "SAE"),
            SecurityType::Eap => write!(f, "EAP"),
            SecurityType::EapSuiteB => write!(f, "EAP-SuiteB-192"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyBand {
    Band2_4GHz,
    Band5GHz,
    Band6GHz,
    Unknown,
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyBand::Band2_4GHz => write!(f, "2.4 GHz"),
            FrequencyBand::Band5GHz => write!(f, "5 GHz"),
            FrequencyBand::Band6GHz => write!(f, "6 GHz"),
            FrequencyBand::Unknown => write!(f, "Unknown"),
        }
    }
}

impl FrequencyBand {
    pub fn from_frequency(mhz: i32) -> Self {
        match mhz {
            2400..=2500 => FrequencyBand::Band2_4GHz,
            4900..=5900 => FrequencyBand::Band5GHz,
            5925..=7125 => FrequencyBand::Band6GHz,
            _ => FrequencyBand::Unknown,
        }
    }

    /// 5 GHz and 6 GHz; these earn the high-band preference when scoring
    pub fn is_high_band(self) -> bool {
        matches!(self, FrequencyBand::Band5GHz | FrequencyBand::Band6GHz)
    }
}

/// One sighting of a BSS in a scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub ssid: String,
    pub bssid: String,
    pub frequency: i32,
    pub level: i32,
    pub capabilities: String,
}

impl ScanResult {
    pub fn band(&self) -> FrequencyBand {
        FrequencyBand::from_frequency(self.frequency)
    }

    pub fn security(&self) -> SecurityType {
        parse_security(&self.capabilities)
    }

    pub fn match_info(&self) -> ScanResultMatchInfo {
        ScanResultMatchInfo::from_scan_result(self)
    }

    pub fn signal_bars(&self) -> String {
        let bars = match self.level {
            s if s >= -50 => 5,
            s if s >= -60 => 4,
            s if s >= -70 => 3,
            s if s >= -80 => 2,
            _ => 1,
        };
        let filled = "\u{2593}".repeat(bars);
        let empty = "\u{2591}".repeat(5 - bars);
        format!("{}{}", filled, empty)
    }
}

/// Normalized network identity: SSID plus the essentials of its security.
///
/// Saved networks and scan sightings both reduce to this. Exact equality is what
/// `Eq`/`Hash` use; [`ScanResultMatchInfo::matches`] additionally accepts
/// transition-mode sightings (PSK+SAE, OWE+Open).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanResultMatchInfo {
    pub ssid: String,
    pub security: SecurityType,
    pub psk_sae_transition: bool,
    pub owe_transition: bool,
}

impl ScanResultMatchInfo {
    pub fn new(ssid: &str, security: SecurityType) -> Self {
        Self {
            ssid: normalize_ssid(ssid),
            security,
            psk_sae_transition: false,
            owe_transition: false,
        }
    }

    pub fn from_scan_result(scan: &ScanResult) -> Self {
        let caps = scan.capabilities.to_uppercase();
        let security = parse_security(&scan.capabilities);
        Self {
            ssid: normalize_ssid(&scan.ssid),
            security,
            psk_sae_transition: caps.contains("PSK") && caps.contains("SAE"),
            owe_transition: security == SecurityType::Open && caps.contains("OWE_TRANSITION"),
        }
    }

    pub fn matches(&self, other: &ScanResultMatchInfo) -> bool {
        if self.ssid != other.ssid {
            return false;
        }
        if self.security == other.security {
            return true;
        }
        let transition_covers = |scan: &ScanResultMatchInfo, saved: &ScanResultMatchInfo| {
            (scan.psk_sae_transition && matches!(saved.security, SecurityType::Psk | SecurityType::Sae))
                || (scan.owe_transition && matches!(saved.security, SecurityType::Open | SecurityType::Owe))
        };
        transition_covers(self, other) || transition_covers(other, self)
    }
}

impl fmt::Display for ScanResultMatchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"/{}", self.ssid, self.security)
    }
}

/// Saved configurations quote their SSIDs, scans do not
pub fn normalize_ssid(ssid: &str) -> String {
    ssid.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(ssid)
        .to_string()
}
