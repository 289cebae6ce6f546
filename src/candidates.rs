//! Candidates for network selection
//!
//! A [`Candidate`] is a read-only view of everything the scorers look at. The
//! [`CandidateSet`] builds them from scan sightings and saved networks for one
//! selection round.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{CandidateError, ScoringError};
use crate::saved::SavedNetwork;
use crate::scanner::{ScanResult, ScanResultMatchInfo, SecurityType, UNKNOWN_FREQUENCY, UNKNOWN_RSSI};
use crate::scoring::{CandidateScorer, ScoredCandidate};

pub const EVALUATOR_ID_SAVED: i32 = 0;
pub const EVALUATOR_ID_SUGGESTION: i32 = 1;
pub const EVALUATOR_ID_PASSPOINT: i32 = 2;
pub const EVALUATOR_ID_CARRIER: i32 = 3;
pub const EVALUATOR_ID_SCORED: i32 = 4;
pub const UNKNOWN_EVALUATOR_ID: i32 = -1;

pub const UNKNOWN_NETWORK_ID: i32 = -1;

/// How long the boost for a user-selected network takes to decay to zero
const LAST_USER_SELECTION_DECAY_HOURS: i64 = 8;

/// Kinds of events the score card aggregates signal statistics for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    SignalPoll,
    ScanBeforeSuccessfulConnection,
    FirstPollAfterConnection,
    IpConfigurationSuccess,
    ScanBeforeFailedConnection,
    ConnectionFailure,
    IpReachabilityLost,
    LastPollBeforeRoam,
    RoamSuccess,
    WifiDisabled,
    RoamFailure,
    LastPollBeforeSwitch,
    ValidationSuccess,
}

/// Running count, sum and sum of squares of one measurement
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UnivariateStatistic {
    pub count: u32,
    pub sum: f64,
    pub sum_of_squares: f64,
    pub min_value: f64,
    pub max_value: f64,
}

impl UnivariateStatistic {
    pub fn record(&mut self, value: f64) {
        if self.count == 0 {
            self.min_value = value;
            self.max_value = value;
        } else {
            self.min_value = self.min_value.min(value);
            self.max_value = self.max_value.max(value);
        }
        self.count += 1;
        self.sum += value;
        self.sum_of_squares += value * value;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Population variance; rounding can push the naive formula below zero
    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        let mean_square = self.sum_of_squares / self.count as f64;
        Some((mean_square - mean * mean).max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalStatistics {
    pub rssi: Option<UnivariateStatistic>,
    pub link_speed: Option<UnivariateStatistic>,
}

/// Per-BSSID history, keyed by event kind
#[derive(Debug, Clone, Default)]
pub struct ScoreCard {
    entries: HashMap<MacAddress, BTreeMap<EventKind, SignalStatistics>>,
}

impl ScoreCard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, bssid: MacAddress, event: EventKind, rssi: i32, link_speed: Option<i32>) {
        let stats = self.entries.entry(bssid).or_default().entry(event).or_default();
        stats.rssi.get_or_insert_with(Default::default).record(rssi as f64);
        if let Some(speed) = link_speed {
            stats
                .link_speed
                .get_or_insert_with(Default::default)
                .record(speed as f64);
        }
    }

    pub fn lookup(&self, bssid: &MacAddress) -> BTreeMap<EventKind, SignalStatistics> {
        self.entries.get(bssid).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const ALL_ZEROS: MacAddress = MacAddress([0; 6]);

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = CandidateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CandidateError::InvalidBssid(s.to_string());
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().filter(|p| p.len() == 2).ok_or_else(invalid)?;
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(MacAddress(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

/// Identity of one candidate within a selection round
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateKey {
    pub match_info: ScanResultMatchInfo,
    pub bssid: MacAddress,
    pub network_id: i32,
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.match_info, self.bssid, self.network_id)
    }
}

/// What a scorer may know about a candidate
pub trait Candidate {
    fn key(&self) -> &CandidateKey;
    fn is_open_network(&self) -> bool;
    fn is_passpoint(&self) -> bool;
    fn is_ephemeral(&self) -> bool;
    fn is_trusted(&self) -> bool;
    /// Which evaluator nominated this candidate; lower ids take precedence
    fn evaluator_id(&self) -> i32;
    fn evaluator_score(&self) -> i32;
    /// 1.0 right after the user picked this network, decaying towards 0.0
    fn last_selection_weight(&self) -> f64;
    fn is_current_network(&self) -> bool;
    fn is_current_bssid(&self) -> bool;
    fn scan_rssi(&self) -> i32;
    fn frequency(&self) -> i32;
    fn event_statistics(&self, event: EventKind) -> Option<&SignalStatistics>;
}

/// Candidate built from a scan sighting and the saved network it matched
#[derive(Debug, Clone)]
pub struct ScanCandidate {
    key: CandidateKey,
    scan: ScanResult,
    open: bool,
    passpoint: bool,
    ephemeral: bool,
    trusted: bool,
    evaluator_id: i32,
    evaluator_score: i32,
    last_selection_weight: f64,
    current_network: bool,
    current_bssid: bool,
    statistics: BTreeMap<EventKind, SignalStatistics>,
}

impl ScanCandidate {
    pub fn scan_result(&self) -> &ScanResult {
        &self.scan
    }
}

impl Candidate for ScanCandidate {
    fn key(&self) -> &CandidateKey {
        &self.key
    }
    fn is_open_network(&self) -> bool {
        self.open
    }
    fn is_passpoint(&self) -> bool {
        self.passpoint
    }
    fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
    fn is_trusted(&self) -> bool {
        self.trusted
    }
    fn evaluator_id(&self) -> i32 {
        self.evaluator_id
    }
    fn evaluator_score(&self) -> i32 {
        self.evaluator_score
    }
    fn last_selection_weight(&self) -> f64 {
        self.last_selection_weight
    }
    fn is_current_network(&self) -> bool {
        self.current_network
    }
    fn is_current_bssid(&self) -> bool {
        self.current_bssid
    }
    fn scan_rssi(&self) -> i32 {
        self.scan.level
    }
    fn frequency(&self) -> i32 {
        self.scan.frequency
    }
    fn event_statistics(&self, event: EventKind) -> Option<&SignalStatistics> {
        self.statistics.get(&event)
    }
}

/// Free-standing candidate with every attribute settable; handy for callers
/// that do not go through [`CandidateSet`], and for tests.
#[derive(Debug, Clone)]
pub struct ConcreteCandidate {
    key: CandidateKey,
    open: bool,
    passpoint: bool,
    ephemeral: bool,
    trusted: bool,
    evaluator_id: i32,
    evaluator_score: i32,
    last_selection_weight: f64,
    current_network: bool,
    current_bssid: bool,
    scan_rssi: i32,
    frequency: i32,
    statistics: BTreeMap<EventKind, SignalStatistics>,
}

impl Default for ConcreteCandidate {
    fn default() -> Self {
        Self {
            key: CandidateKey {
                match_info: ScanResultMatchInfo::new("", SecurityType::Open),
                bssid: MacAddress::ALL_ZEROS,
                network_id: UNKNOWN_NETWORK_ID,
            },
            open: true,
            passpoint: false,
            ephemeral: false,
            trusted: true,
            evaluator_id: UNKNOWN_EVALUATOR_ID,
            evaluator_score: 0,
            last_selection_weight: 0.0,
            current_network: false,
            current_bssid: false,
            scan_rssi: UNKNOWN_RSSI,
            frequency: UNKNOWN_FREQUENCY,
            statistics: BTreeMap::new(),
        }
    }
}

impl ConcreteCandidate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(mut self, key: CandidateKey) -> Self {
        self.key = key;
        self
    }
    pub fn set_open_network(mut self, open: bool) -> Self {
        self.open = open;
        self
    }
    pub fn set_passpoint(mut self, passpoint: bool) -> Self {
        self.passpoint = passpoint;
        self
    }
    pub fn set_ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }
    pub fn set_trusted(mut self, trusted: bool) -> Self {
        self.trusted = trusted;
        self
    }
    pub fn set_evaluator_id(mut self, id: i32) -> Self {
        self.evaluator_id = id;
        self
    }
    pub fn set_evaluator_score(mut self, score: i32) -> Self {
        self.evaluator_score = score;
        self
    }
    pub fn set_last_selection_weight(mut self, weight: f64) -> Self {
        self.last_selection_weight = weight;
        self
    }
    pub fn set_current_network(mut self, current: bool) -> Self {
        self.current_network = current;
        self
    }
    pub fn set_current_bssid(mut self, current: bool) -> Self {
        self.current_bssid = current;
        self
    }
    pub fn set_scan_rssi(mut self, rssi: i32) -> Self {
        self.scan_rssi = rssi;
        self
    }
    pub fn set_frequency(mut self, frequency: i32) -> Self {
        self.frequency = frequency;
        self
    }
    pub fn set_event_statistics(mut self, event: EventKind, stats: SignalStatistics) -> Self {
        self.statistics.insert(event, stats);
        self
    }
}

impl Candidate for ConcreteCandidate {
    fn key(&self) -> &CandidateKey {
        &self.key
    }
    fn is_open_network(&self) -> bool {
        self.open
    }
    fn is_passpoint(&self) -> bool {
        self.passpoint
    }
    fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
    fn is_trusted(&self) -> bool {
        self.trusted
    }
    fn evaluator_id(&self) -> i32 {
        self.evaluator_id
    }
    fn evaluator_score(&self) -> i32 {
        self.evaluator_score
    }
    fn last_selection_weight(&self) -> f64 {
        self.last_selection_weight
    }
    fn is_current_network(&self) -> bool {
        self.current_network
    }
    fn is_current_bssid(&self) -> bool {
        self.current_bssid
    }
    fn scan_rssi(&self) -> i32 {
        self.scan_rssi
    }
    fn frequency(&self) -> i32 {
        self.frequency
    }
    fn event_statistics(&self, event: EventKind) -> Option<&SignalStatistics> {
        self.statistics.get(&event)
    }
}

/// Weight for the most recent user selection, decaying linearly to zero
pub fn last_selection_weight(selected_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let decay = TimeDelta::hours(LAST_USER_SELECTION_DECAY_HOURS);
    let elapsed = now - selected_at;
    if elapsed >= decay {
        return 0.0;
    }
    let unclipped = 1.0 - elapsed.num_milliseconds() as f64 / decay.num_milliseconds() as f64;
    unclipped.clamp(0.0, 1.0)
}

/// Candidates gathered for one selection round
#[derive(Debug, Default)]
pub struct CandidateSet {
    candidates: BTreeMap<CandidateKey, ScanCandidate>,
    current_network_id: Option<i32>,
    current_bssid: Option<MacAddress>,
    score_card: ScoreCard,
    fault_count: usize,
    last_fault: Option<CandidateError>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score_card(score_card: ScoreCard) -> Self {
        Self {
            score_card,
            ..Default::default()
        }
    }

    /// Mark the network and BSSID we are associated with, if any
    pub fn set_current(&mut self, network_id: Option<i32>, bssid: Option<MacAddress>) {
        self.current_network_id = network_id;
        self.current_bssid = bssid;
        for candidate in self.candidates.values_mut() {
            candidate.current_network = Some(candidate.key.network_id) == network_id;
            candidate.current_bssid = Some(candidate.key.bssid) == bssid;
        }
    }

    /// Nominate a sighting of a saved network.
    ///
    /// Returns `Ok(false)` when an existing nomination of the same key wins:
    /// a lower evaluator id always does, an equal one does if its score is at
    /// least as high.
    pub fn add(
        &mut self,
        scan: &ScanResult,
        saved: &SavedNetwork,
        evaluator_id: i32,
        evaluator_score: i32,
        last_selection_weight: f64,
    ) -> Result<bool, CandidateError> {
        let bssid = match scan.bssid.parse::<MacAddress>() {
            Ok(bssid) => bssid,
            Err(e) => return Err(self.fault(e)),
        };

        let match_info = scan.match_info();
        if !saved.is_passpoint {
            let saved_info = saved.identity();
            if !match_info.matches(&saved_info) {
                return Err(self.fault(CandidateError::IdentityMismatch {
                    scan: match_info.to_string(),
                    saved: saved_info.to_string(),
                }));
            }
        }

        let key = CandidateKey {
            match_info,
            bssid,
            network_id: saved.network_id,
        };

        if let Some(old) = self.candidates.get(&key) {
            if evaluator_id > old.evaluator_id
                || (evaluator_id == old.evaluator_id && evaluator_score <= old.evaluator_score)
            {
                return Ok(false);
            }
        }

        let weight = if last_selection_weight.is_nan() {
            0.0
        } else {
            last_selection_weight.clamp(0.0, 1.0)
        };

        let candidate = ScanCandidate {
            key: key.clone(),
            scan: scan.clone(),
            open: saved.security.is_open(),
            passpoint: saved.is_passpoint,
            ephemeral: saved.is_ephemeral,
            trusted: saved.is_trusted,
            evaluator_id,
            evaluator_score,
            last_selection_weight: weight,
            current_network: Some(saved.network_id) == self.current_network_id,
            current_bssid: Some(bssid) == self.current_bssid,
            statistics: self.score_card.lookup(&bssid),
        };
        self.candidates.insert(key, candidate);
        Ok(true)
    }

    /// Nominate every sighting of a saved network through the saved-network
    /// evaluator. Returns how many nominations were taken.
    pub fn nominate_saved(&mut self, scans: &[ScanResult], saved: &[SavedNetwork], now: DateTime<Utc>) -> usize {
        let mut taken = 0;
        for scan in scans {
            let info = scan.match_info();
            for network in saved.iter().filter(|n| info.matches(&n.identity())) {
                let weight = network
                    .last_connected
                    .map_or(0.0, |at| last_selection_weight(at, now));
                // Rejections are counted as faults by `add`
                if let Ok(true) = self.add(scan, network, EVALUATOR_ID_SAVED, 0, weight) {
                    taken += 1;
                }
            }
        }
        tracing::debug!(scans = scans.len(), saved = saved.len(), taken, "nominated saved networks");
        taken
    }

    /// Mark the candidate seen at `bssid`, and its network, as current
    pub fn set_current_bssid(&mut self, bssid: MacAddress) {
        let network_id = self
            .candidates
            .keys()
            .find(|key| key.bssid == bssid)
            .map(|key| key.network_id);
        self.set_current(network_id, Some(bssid));
    }

    fn fault(&mut self, error: CandidateError) -> CandidateError {
        self.fault_count += 1;
        tracing::warn!(error = %error, faults = self.fault_count, "candidate rejected");
        self.last_fault = Some(error.clone());
        error
    }

    pub fn remove(&mut self, key: &CandidateKey) -> Option<ScanCandidate> {
        self.candidates.remove(key)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, key: &CandidateKey) -> Option<&ScanCandidate> {
        self.candidates.get(key)
    }

    pub fn fault_count(&self) -> usize {
        self.fault_count
    }

    pub fn last_fault(&self) -> Option<&CandidateError> {
        self.last_fault.as_ref()
    }

    /// All candidates in key order
    pub fn candidates(&self) -> Vec<&dyn Candidate> {
        self.candidates.values().map(|c| c as &dyn Candidate).collect()
    }

    /// Candidates grouped by saved network id
    pub fn grouped_candidates(&self) -> BTreeMap<i32, Vec<&ScanCandidate>> {
        let mut groups: BTreeMap<i32, Vec<&ScanCandidate>> = BTreeMap::new();
        for candidate in self.candidates.values() {
            groups.entry(candidate.key.network_id).or_default().push(candidate);
        }
        groups
    }

    pub fn choose(&self, scorer: &dyn CandidateScorer) -> Result<ScoredCandidate, ScoringError> {
        scorer.score_candidates(&self.candidates())
    }
}
