//! Tunable scoring parameters
//!
//! RSSI breakpoints per band, packet-rate breakpoints, and a handful of scalar
//! knobs. Values can be re-tuned at runtime from a `key=v1:v2,key2=v` string; an
//! update is validated in full on a copy before it replaces anything.

use crate::error::ParamsError;
use crate::scanner::FrequencyBand;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const KEY_RSSI2: &str = "rssi2";
const KEY_RSSI5: &str = "rssi5";
const KEY_RSSI6: &str = "rssi6";
const KEY_PPS: &str = "pps";
const KEY_HORIZON: &str = "horizon";
const KEY_NUD: &str = "nud";
const KEY_EXPID: &str = "expid";

const MIN_RSSI: i64 = -126;
const MAX_RSSI: i64 = 0;
const MAX_OUTPUT_PPS: i64 = 40_000;
const MIN_HORIZON: i64 = -9;
const MAX_HORIZON: i64 = 60;
const MIN_NUD: i64 = 0;
const MAX_NUD: i64 = 10;

// Positions within an RSSI breakpoint tuple
const BAD: usize = 0;
const ENTRY: usize = 1;
const SUFFICIENT: usize = 2;
const GOOD: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringParams {
    rssi2: [i32; 4],
    rssi5: [i32; 4],
    rssi6: [i32; 4],
    pps: [i32; 3],
    horizon: i32,
    nud: i32,
    expid: i32,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            rssi2: [-83, -80, -73, -60],
            rssi5: [-80, -77, -70, -57],
            rssi6: [-80, -77, -70, -57],
            pps: [0, 1, 100],
            horizon: 15,
            nud: 8,
            expid: 0,
        }
    }
}

impl ScoringParams {
    /// Apply a parameter string such as `rssi2=-120:-100:-2:-1,expid=42`.
    ///
    /// The empty string is a no-op. On error `self` is untouched.
    pub fn update(&mut self, kv_list: &str) -> Result<(), ParamsError> {
        if kv_list.is_empty() {
            return Ok(());
        }
        let mut next = self.clone();
        next.apply(kv_list)?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    fn apply(&mut self, kv_list: &str) -> Result<(), ParamsError> {
        let mut seen = HashSet::new();

        for assignment in kv_list.split(',') {
            let (key, value) = split_assignment(assignment)
                .ok_or_else(|| ParamsError::Malformed(kv_list.to_string()))?;
            if !seen.insert(key) {
                return Err(ParamsError::DuplicateKey(key.to_string()));
            }

            match key {
                KEY_RSSI2 => self.rssi2 = parse_ints(KEY_RSSI2, value, MIN_RSSI, MAX_RSSI)?,
                KEY_RSSI5 => self.rssi5 = parse_ints(KEY_RSSI5, value, MIN_RSSI, MAX_RSSI)?,
                KEY_RSSI6 => self.rssi6 = parse_ints(KEY_RSSI6, value, MIN_RSSI, MAX_RSSI)?,
                KEY_PPS => self.pps = parse_ints(KEY_PPS, value, 0, MAX_OUTPUT_PPS)?,
                KEY_HORIZON => self.horizon = parse_int(KEY_HORIZON, value, MIN_HORIZON, MAX_HORIZON)?,
                KEY_NUD => self.nud = parse_int(KEY_NUD, value, MIN_NUD, MAX_NUD)?,
                KEY_EXPID => self.expid = parse_int(KEY_EXPID, value, 0, i32::MAX as i64)?,
                unknown => return Err(ParamsError::UnknownKey(unknown.to_string())),
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ParamsError> {
        check_monotonic(KEY_RSSI2, &self.rssi2)?;
        check_monotonic(KEY_RSSI5, &self.rssi5)?;
        check_monotonic(KEY_RSSI6, &self.rssi6)?;
        check_monotonic(KEY_PPS, &self.pps)
    }

    fn rssi_array(&self, frequency: i32) -> &[i32; 4] {
        match FrequencyBand::from_frequency(frequency) {
            FrequencyBand::Band5GHz => &self.rssi5,
            FrequencyBand::Band6GHz => &self.rssi6,
            // Unknown frequencies get the 2.4 GHz staircase
            FrequencyBand::Band2_4GHz | FrequencyBand::Unknown => &self.rssi2,
        }
    }

    /// Below this the link is considered lost
    pub fn bad_rssi(&self, frequency: i32) -> i32 {
        self.rssi_array(frequency)[BAD]
    }

    /// Minimum RSSI worth associating to
    pub fn entry_rssi(&self, frequency: i32) -> i32 {
        self.rssi_array(frequency)[ENTRY]
    }

    /// Good enough that no new network selection is needed
    pub fn sufficient_rssi(&self, frequency: i32) -> i32 {
        self.rssi_array(frequency)[SUFFICIENT]
    }

    /// Saturation point: stronger signal earns nothing more
    pub fn good_rssi(&self, frequency: i32) -> i32 {
        self.rssi_array(frequency)[GOOD]
    }

    pub fn yippee_skippy_packets_per_second(&self) -> i32 {
        self.pps[2]
    }

    pub fn horizon_seconds(&self) -> i32 {
        self.horizon
    }

    pub fn nud_knob(&self) -> i32 {
        self.nud
    }

    /// Which registered scorer is active; 0 selects the default
    pub fn experiment_identifier(&self) -> i32 {
        self.expid
    }
}

/// `key=value` where key is an identifier and value uses only `0-9.:+-`
fn split_assignment(assignment: &str) -> Option<(&str, &str)> {
    let (key, value) = assignment.split_once('=')?;

    let mut key_chars = key.chars();
    let first = key_chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !key_chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit() || ".:+-".contains(c)) {
        return None;
    }
    Some((key, value))
}

fn parse_ints<const N: usize>(
    key: &'static str,
    value: &str,
    min: i64,
    max: i64,
) -> Result<[i32; N], ParamsError> {
    let fields: Vec<&str> = value.split(':').collect();
    if fields.len() != N {
        return Err(ParamsError::Arity {
            key,
            expected: N,
            found: fields.len(),
        });
    }

    let mut out = [0i32; N];
    for (slot, field) in out.iter_mut().zip(fields) {
        let parsed = field.parse::<i64>().map_err(|_| ParamsError::NotANumber {
            key,
            value: field.to_string(),
        })?;
        if !(min..=max).contains(&parsed) {
            return Err(ParamsError::OutOfRange {
                key,
                value: parsed,
                min,
                max,
            });
        }
        *slot = parsed as i32;
    }
    Ok(out)
}

fn parse_int(key: &'static str, value: &str, min: i64, max: i64) -> Result<i32, ParamsError> {
    let [v] = parse_ints::<1>(key, value, min, max)?;
    Ok(v)
}

fn check_monotonic(key: &'static str, values: &[i32]) -> Result<(), ParamsError> {
    if values.windows(2).all(|w| w[0] <= w[1]) {
        Ok(())
    } else {
        Err(ParamsError::NotMonotonic { key })
    }
}

fn join_ints(values: &[i32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(":")
}

impl fmt::Display for ScoringParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={},{}={},{}={},{}={},{}={},{}={},{}={}",
            KEY_RSSI2,
            join_ints(&self.rssi2),
            KEY_RSSI5,
            join_ints(&self.rssi5),
            KEY_RSSI6,
            join_ints(&self.rssi6),
            KEY_PPS,
            join_ints(&self.pps),
            KEY_HORIZON,
            self.horizon,
            KEY_NUD,
            self.nud,
            KEY_EXPID,
            self.expid
        )
    }
}

impl FromStr for ScoringParams {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut params = ScoringParams::default();
        params.update(s)?;
        Ok(params)
    }
}

/// Parameters shared between scorers and a single configuration writer.
///
/// Readers grab an immutable snapshot; an update builds and validates a new
/// value, then swaps the pointer. Concurrent updates are serialized.
///
/// A snapshot takes the read lock only long enough to clone the `Arc`. A
/// writer holds the write lock only for the pointer store, after validation,
/// so readers never wait on parsing and never see a half-applied update.
#[derive(Clone)]
pub struct SharedScoringParams {
    inner: Arc<SharedInner>,
}

struct SharedInner {
    current: RwLock<Arc<ScoringParams>>,
    writer: Mutex<()>,
}

impl SharedScoringParams {
    pub fn new(params: ScoringParams) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                current: RwLock::new(Arc::new(params)),
                writer: Mutex::new(()),
            }),
        }
    }

    pub fn snapshot(&self) -> Arc<ScoringParams> {
        self.inner.current.read().clone()
    }

    pub fn update(&self, kv_list: &str) -> Result<(), ParamsError> {
        let _writer = self.inner.writer.lock();

        let mut next = ScoringParams::clone(&self.snapshot());
        match next.update(kv_list) {
            Ok(()) => {
                tracing::info!(params = %next, "scoring parameters updated");
                *self.inner.current.write() = Arc::new(next);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, input = kv_list, "rejected scoring parameter update");
                Err(e)
            }
        }
    }
}

impl Default for SharedScoringParams {
    fn default() -> Self {
        Self::new(ScoringParams::default())
    }
}

impl fmt::Debug for SharedScoringParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedScoringParams")
            .field(&*self.snapshot())
            .finish()
    }
}
