//! Decides whether anything in range is worth waking Wi-Fi up for

use std::collections::HashSet;

use crate::scanner::{ScanResult, ScanResultMatchInfo};
use crate::scoring::factors::sanitize_rssi;
use crate::scoring::{ScoringParams, SharedScoringParams};

/// Membership plus a single signal threshold; no scoring
#[derive(Debug, Clone)]
pub struct WakeupEvaluator {
    params: SharedScoringParams,
}

impl WakeupEvaluator {
    pub fn new(params: SharedScoringParams) -> Self {
        Self { params }
    }

    /// A sighting below its band's entry threshold cannot trigger a wakeup
    pub fn is_below_threshold(&self, scan: &ScanResult) -> bool {
        below_threshold(&self.params.snapshot(), scan)
    }

    /// Strongest sighting of a saved network that clears the threshold.
    ///
    /// Equal levels go to the lower BSSID, then SSID, frequency and
    /// capabilities.
    pub fn find_viable_network<'a>(
        &self,
        scans: &'a [ScanResult],
        saved: &HashSet<ScanResultMatchInfo>,
    ) -> Option<&'a ScanResult> {
        let params = self.params.snapshot();

        let viable = scans
            .iter()
            .filter(|scan| {
                let info = scan.match_info();
                saved.contains(&info) || saved.iter().any(|s| info.matches(s))
            })
            .filter(|scan| !below_threshold(&params, scan))
            .min_by(|a, b| {
                b.level
                    .cmp(&a.level)
                    .then_with(|| a.bssid.cmp(&b.bssid))
                    .then_with(|| a.ssid.cmp(&b.ssid))
                    .then_with(|| a.frequency.cmp(&b.frequency))
                    .then_with(|| a.capabilities.cmp(&b.capabilities))
            });

        match viable {
            Some(scan) => tracing::debug!(ssid = %scan.ssid, bssid = %scan.bssid, level = scan.level, "viable wakeup network"),
            None => tracing::debug!(scans = scans.len(), saved = saved.len(), "no viable wakeup network"),
        }
        viable
    }
}

/// Implausible levels count as the weakest possible signal
fn below_threshold(params: &ScoringParams, scan: &ScanResult) -> bool {
    sanitize_rssi(scan.level) < params.entry_rssi(scan.frequency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::SecurityType;

    const SAVED_SSID: &str = "saved ssid";

    fn scan(ssid: &str, bssid: &str, frequency: i32, level: i32, caps: &str) -> ScanResult {
        ScanResult {
            ssid: ssid.to_string(),
            bssid: bssid.to_string(),
            frequency,
            level,
            capabilities: caps.to_string(),
        }
    }

    fn evaluator() -> WakeupEvaluator {
        WakeupEvaluator::new(SharedScoringParams::default())
    }

    fn saved_open() -> HashSet<ScanResultMatchInfo> {
        HashSet::from([ScanResultMatchInfo::new(SAVED_SSID, SecurityType::Open)])
    }

    #[test]
    fn test_thresholds_per_band() {
        let e = evaluator();
        assert!(!e.is_below_threshold(&scan(SAVED_SSID, "00:00:00:00:00:01", 2412, -80, "")));
        assert!(e.is_below_threshold(&scan(SAVED_SSID, "00:00:00:00:00:01", 2412, -81, "")));
        assert!(!e.is_below_threshold(&scan(SAVED_SSID, "00:00:00:00:00:01", 5180, -77, "")));
        assert!(e.is_below_threshold(&scan(SAVED_SSID, "00:00:00:00:00:01", 5180, -78, "")));
        // Unknown frequency uses the 2.4 GHz breakpoints
        assert!(!e.is_below_threshold(&scan(SAVED_SSID, "00:00:00:00:00:01", -1, -80, "")));
    }

    #[test]
    fn test_threshold_follows_params() {
        let params = SharedScoringParams::default();
        let e = WakeupEvaluator::new(params.clone());
        let s = scan(SAVED_SSID, "00:00:00:00:00:01", 2412, -90, "");
        assert!(e.is_below_threshold(&s));
        params.update("rssi2=-120:-100:-2:-1").unwrap();
        assert!(!e.is_below_threshold(&s));
    }

    #[test]
    fn test_unsaved_network_is_not_viable() {
        let scans = [scan("other ssid", "00:00:00:00:00:01", 2412, -40, "[ESS]")];
        assert!(evaluator().find_viable_network(&scans, &saved_open()).is_none());
    }

    #[test]
    fn test_security_must_match() {
        let scans = [scan(SAVED_SSID, "00:00:00:00:00:01", 2412, -40, "[WPA2-PSK-CCMP][ESS]")];
        assert!(evaluator().find_viable_network(&scans, &saved_open()).is_none());
    }

    #[test]
    fn test_match_below_threshold_is_not_viable() {
        let scans = [scan(SAVED_SSID, "00:00:00:00:00:01", 2412, -85, "[ESS]")];
        assert!(evaluator().find_viable_network(&scans, &saved_open()).is_none());
    }

    #[test]
    fn test_single_match_is_returned() {
        let scans = [
            scan("other ssid", "00:00:00:00:00:02", 2412, -30, "[ESS]"),
            scan(SAVED_SSID, "00:00:00:00:00:01", 2412, -60, "[ESS]"),
        ];
        let viable = evaluator().find_viable_network(&scans, &saved_open()).unwrap();
        assert_eq!(viable.bssid, "00:00:00:00:00:01");
    }

    #[test]
    fn test_strongest_match_wins() {
        let scans = [
            scan(SAVED_SSID, "00:00:00:00:00:01", 2412, -70, "[ESS]"),
            scan(SAVED_SSID, "00:00:00:00:00:02", 2412, -50, "[ESS]"),
            scan(SAVED_SSID, "00:00:00:00:00:03", 5180, -90, "[ESS]"),
        ];
        let viable = evaluator().find_viable_network(&scans, &saved_open()).unwrap();
        assert_eq!(viable.bssid, "00:00:00:00:00:02");
    }

    #[test]
    fn test_ties_are_deterministic() {
        let a = scan(SAVED_SSID, "00:00:00:00:00:0a", 2412, -60, "[ESS]");
        let b = scan(SAVED_SSID, "00:00:00:00:00:0b", 5180, -60, "[ESS]");
        let forward = [a.clone(), b.clone()];
        let backward = [b, a];
        let e = evaluator();
        assert_eq!(e.find_viable_network(&forward, &saved_open()).unwrap().bssid, "00:00:00:00:00:0a");
        assert_eq!(e.find_viable_network(&backward, &saved_open()).unwrap().bssid, "00:00:00:00:00:0a");

        // Same BSS heard on two channels
        let low = scan(SAVED_SSID, "00:00:00:00:00:01", 2412, -60, "[ESS]");
        let high = scan(SAVED_SSID, "00:00:00:00:00:01", 5180, -60, "[ESS]");
        let forward = [low.clone(), high.clone()];
        let backward = [high, low];
        assert_eq!(e.find_viable_network(&forward, &saved_open()).unwrap().frequency, 2412);
        assert_eq!(e.find_viable_network(&backward, &saved_open()).unwrap().frequency, 2412);

        // Same BSS and channel, capabilities differ
        let plain = scan(SAVED_SSID, "00:00:00:00:00:01", 2412, -60, "[ESS]");
        let wps = scan(SAVED_SSID, "00:00:00:00:00:01", 2412, -60, "[ESS][WPS]");
        let forward = [wps.clone(), plain.clone()];
        let backward = [plain, wps];
        assert_eq!(e.find_viable_network(&forward, &saved_open()).unwrap().capabilities, "[ESS]");
        assert_eq!(e.find_viable_network(&backward, &saved_open()).unwrap().capabilities, "[ESS]");
    }

    #[test]
    fn test_implausible_level_is_not_viable() {
        let e = evaluator();
        let bogus = scan(SAVED_SSID, "00:00:00:00:00:01", 2412, 40, "[ESS]");
        assert!(e.is_below_threshold(&bogus));
        assert!(e.find_viable_network(&[bogus], &saved_open()).is_none());
    }

    #[test]
    fn test_transition_mode_matches() {
        let saved = HashSet::from([ScanResultMatchInfo::new("home", SecurityType::Psk)]);
        let scans = [scan("home", "00:00:00:00:00:01", 5180, -60, "[WPA2-PSK+SAE-CCMP][ESS]")];
        assert!(evaluator().find_viable_network(&scans, &saved).is_some());

        let owe = HashSet::from([ScanResultMatchInfo::new("cafe", SecurityType::Open)]);
        let scans = [scan("cafe", "00:00:00:00:00:02", 2412, -60, "[OWE_TRANSITION][ESS]")];
        assert!(evaluator().find_viable_network(&scans, &owe).is_some());
    }
}
