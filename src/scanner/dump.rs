use crate::error::ScanParseError;
use crate::scanner::{ScanResult, SecurityType, UNKNOWN_FREQUENCY, UNKNOWN_RSSI};

/// Parse a scan dump: one `SSID|BSSID|FREQ_MHZ|RSSI|CAPABILITIES` line per BSS.
///
/// Blank lines and lines starting with `#` are skipped. Unparsable frequency or
/// RSSI fields become the unknown sentinels rather than errors, so a single bad
/// reading degrades that candidate instead of the whole round.
pub fn parse_scan_dump(input: &str) -> Result<Vec<ScanResult>, ScanParseError> {
    let mut results = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        let line = line.trim_end();
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < 5 {
            return Err(ScanParseError::FieldCount {
                line: idx + 1,
                found: parts.len(),
            });
        }

        let ssid = if parts[0] == "<Hidden>" {
            String::new()
        } else {
            parts[0].to_string()
        };

        results.push(ScanResult {
            ssid,
            bssid: parts[1].trim().to_lowercase(),
            frequency: parts[2].trim().parse::<i32>().unwrap_or(UNKNOWN_FREQUENCY),
            level: parse_level(parts[3]),
            capabilities: parts[4..].join("|"),
        });
    }

    Ok(results)
}

fn parse_level(signal: &str) -> i32 {
    signal
        .trim()
        .trim_end_matches(" dBm")
        .trim_end_matches("dBm")
        .split_whitespace()
        .next()
        .and_then(|s| s.parse::<i32>().ok())
        .filter(|level| (UNKNOWN_RSSI..=0).contains(level))
        .unwrap_or(UNKNOWN_RSSI)
}

/// Derive the security type from a scan capabilities string such as
/// `[WPA2-PSK-CCMP][ESS]`.
pub fn parse_security(capabilities: &str) -> SecurityType {
    let caps = capabilities.to_uppercase();
    // The open half of an OWE transition pair advertises OWE_TRANSITION only
    let owe_caps = caps.replace("OWE_TRANSITION", "");

    if caps.contains("EAP_SUITE_B_192") {
        SecurityType::EapSuiteB
    } else if caps.contains("SAE") {
        SecurityType::Sae
    } else if caps.contains("PSK") {
        SecurityType::Psk
    } else if caps.contains("EAP") {
        SecurityType::Eap
    } else if caps.contains("WEP") {
        SecurityType::Wep
    } else if owe_caps.contains("OWE") {
        SecurityType::Owe
    } else {
        SecurityType::Open
    }
}

/// Fixed set of sightings for demo runs; identical on every call
pub fn demo_scan_results() -> Vec<ScanResult> {
    let base_networks = [
        ("CoffeeShop_Free", "[ESS]", 5180, -42, "a1:b2:c3:d4:e5:f6"),
        ("Airport_WiFi", "[ESS]", 2437, -55, "11:22:33:44:55:66"),
        ("HomeNet", "[WPA2-PSK-CCMP][ESS]", 2462, -62, "aa:bb:cc:dd:ee:ff"),
        ("HomeNet", "[WPA2-PSK-CCMP][ESS]", 5745, -66, "aa:bb:cc:dd:ee:fe"),
        ("Library_Public", "[OWE_TRANSITION][ESS]", 5745, -58, "de:ad:be:ef:ca:fe"),
        ("Office", "[WPA2-EAP-CCMP][ESS]", 5220, -65, "22:33:44:55:66:77"),
        ("Neighbor_6G", "[RSN-SAE-CCMP][ESS]", 5975, -78, "88:99:aa:bb:cc:dd"),
        ("xfinitywifi", "[ESS]", 2412, -72, "ee:ff:00:11:22:33"),
        ("Legacy", "[WEP][ESS]", 2462, -80, "44:55:66:77:88:99"),
        ("<Hidden>", "[WPA2-PSK-CCMP][ESS]", 2437, -85, "00:11:22:33:44:55"),
    ];

    base_networks
        .into_iter()
        .map(|(ssid, caps, frequency, level, bssid)| ScanResult {
            ssid: if ssid == "<Hidden>" {
                String::new()
            } else {
                ssid.to_string()
            },
            bssid: bssid.to_string(),
            frequency,
            level,
            capabilities: caps.to_string(),
        })
        .collect()
}
